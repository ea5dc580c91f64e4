use crate::interpreter::constants::{MAX_SEQUENCE_LEN, MAX_STRING_LEN};
use crate::interpreter::errors::{Exception, ExceptionKind};
use crate::parser::ast::BinOp;
use crate::runtime::format::percent_format;
use crate::runtime::value::Value;
use std::rc::Rc;

/// Numeric view of an operand; bools take part as integers
#[derive(Debug, Clone, Copy)]
enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    fn of(value: &Value) -> Option<Num> {
        match value {
            Value::Int(n) => Some(Num::Int(*n)),
            Value::Bool(b) => Some(Num::Int(i64::from(*b))),
            Value::Float(f) => Some(Num::Float(*f)),
            _ => None,
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Num::Int(n) => n as f64,
            Num::Float(f) => f,
        }
    }
}

fn overflow() -> Exception {
    Exception::new(ExceptionKind::OverflowError, "integer overflow")
}

fn zero_division(message: &str) -> Exception {
    Exception::new(ExceptionKind::ZeroDivisionError, message)
}

fn memory_error() -> Exception {
    Exception::with_args(ExceptionKind::MemoryError, Vec::new())
}

fn unsupported(op: BinOp, left: &Value, right: &Value) -> Exception {
    let message = match (op, left) {
        (BinOp::Add, Value::Str(_)) | (BinOp::Add, Value::List(_)) | (BinOp::Add, Value::Tuple(_)) => {
            format!(
                "can only concatenate {} (not \"{}\") to {}",
                left.type_name(),
                right.type_name(),
                left.type_name()
            )
        }
        (BinOp::Mul, Value::Str(_) | Value::List(_) | Value::Tuple(_))
            if matches!(right, Value::Float(_)) =>
        {
            format!(
                "can't multiply sequence by non-int of type '{}'",
                right.type_name()
            )
        }
        _ => format!(
            "unsupported operand type(s) for {}: '{}' and '{}'",
            op.symbol(),
            left.type_name(),
            right.type_name()
        ),
    };
    Exception::new(ExceptionKind::TypeError, message)
}

/// Apply a binary operator
pub(crate) fn binary_op(op: BinOp, left: &Value, right: &Value) -> Result<Value, Exception> {
    if let (Some(a), Some(b)) = (Num::of(left), Num::of(right)) {
        // bool op bool stays bool for the bitwise operators
        if let (Value::Bool(x), Value::Bool(y)) = (left, right) {
            match op {
                BinOp::BitAnd => return Ok(Value::Bool(x & y)),
                BinOp::BitOr => return Ok(Value::Bool(x | y)),
                BinOp::BitXor => return Ok(Value::Bool(x ^ y)),
                _ => {}
            }
        }
        return numeric_op(op, a, b).map_err(|err| match err {
            Some(exception) => exception,
            None => unsupported(op, left, right),
        });
    }

    match (op, left, right) {
        (BinOp::Add, Value::Str(a), Value::Str(b)) => {
            if a.len() + b.len() > MAX_STRING_LEN {
                return Err(memory_error());
            }
            let mut text = String::with_capacity(a.len() + b.len());
            text.push_str(a);
            text.push_str(b);
            Ok(Value::from(text))
        }
        (BinOp::Add, Value::List(a), Value::List(b)) => {
            let mut items = a.borrow().clone();
            items.extend(b.borrow().iter().cloned());
            Ok(Value::list(items))
        }
        (BinOp::Add, Value::Tuple(a), Value::Tuple(b)) => {
            let items: Vec<Value> = a.iter().chain(b.iter()).cloned().collect();
            Ok(Value::tuple(items))
        }
        (BinOp::Mul, Value::Str(_) | Value::List(_) | Value::Tuple(_), Value::Int(_) | Value::Bool(_)) => {
            repeat(left, right.as_int().unwrap_or_default())
        }
        (BinOp::Mul, Value::Int(_) | Value::Bool(_), Value::Str(_) | Value::List(_) | Value::Tuple(_)) => {
            repeat(right, left.as_int().unwrap_or_default())
        }
        (BinOp::Mod, Value::Str(template), args) => Ok(Value::from(percent_format(template, args)?)),
        (BinOp::BitOr, Value::Dict(a), Value::Dict(b)) => {
            let mut merged = a.borrow().clone();
            for (key, value) in b.borrow().iter() {
                merged.insert(key.clone(), value.clone())?;
            }
            Ok(Value::dict(merged))
        }
        _ => Err(unsupported(op, left, right)),
    }
}

/// `sequence * count`
fn repeat(sequence: &Value, count: i64) -> Result<Value, Exception> {
    let count = usize::try_from(count).unwrap_or(0);
    match sequence {
        Value::Str(s) => {
            if s.len().saturating_mul(count) > MAX_STRING_LEN {
                return Err(memory_error());
            }
            Ok(Value::from(s.repeat(count)))
        }
        Value::List(items) => {
            let items = items.borrow();
            if items.len().saturating_mul(count) > MAX_SEQUENCE_LEN {
                return Err(memory_error());
            }
            Ok(Value::list(repeat_items(&items, count)))
        }
        Value::Tuple(items) => {
            if items.len().saturating_mul(count) > MAX_SEQUENCE_LEN {
                return Err(memory_error());
            }
            Ok(Value::Tuple(Rc::from(repeat_items(items, count))))
        }
        other => Ok(other.clone()),
    }
}

fn repeat_items(items: &[Value], count: usize) -> Vec<Value> {
    let mut out = Vec::with_capacity(items.len() * count);
    for _ in 0..count {
        out.extend_from_slice(items);
    }
    out
}

/// Arithmetic on numbers. `Err(None)` means the operator does not apply.
fn numeric_op(op: BinOp, a: Num, b: Num) -> Result<Value, Option<Exception>> {
    match (a, b) {
        (Num::Int(x), Num::Int(y)) => int_op(op, x, y),
        _ => float_op(op, a.as_f64(), b.as_f64()),
    }
}

fn int_op(op: BinOp, x: i64, y: i64) -> Result<Value, Option<Exception>> {
    let checked = |result: Option<i64>| result.map(Value::Int).ok_or_else(|| Some(overflow()));

    match op {
        BinOp::Add => checked(x.checked_add(y)),
        BinOp::Sub => checked(x.checked_sub(y)),
        BinOp::Mul => checked(x.checked_mul(y)),
        BinOp::Div => {
            if y == 0 {
                return Err(Some(zero_division("division by zero")));
            }
            Ok(Value::Float(x as f64 / y as f64))
        }
        BinOp::FloorDiv => {
            if y == 0 {
                return Err(Some(zero_division("integer division or modulo by zero")));
            }
            checked(floor_div(x, y))
        }
        BinOp::Mod => {
            if y == 0 {
                return Err(Some(zero_division("integer modulo by zero")));
            }
            Ok(Value::Int(floor_mod(x, y)))
        }
        BinOp::Pow => int_pow(x, y).map_err(Some),
        BinOp::BitAnd => Ok(Value::Int(x & y)),
        BinOp::BitOr => Ok(Value::Int(x | y)),
        BinOp::BitXor => Ok(Value::Int(x ^ y)),
        BinOp::Shl => {
            if y < 0 {
                return Err(Some(Exception::new(ExceptionKind::ValueError, "negative shift count")));
            }
            if x == 0 {
                return Ok(Value::Int(0));
            }
            let shift = u32::try_from(y).map_err(|_| Some(overflow()))?;
            let shifted = x.checked_shl(shift).filter(|value| *value >> shift == x);
            checked(shifted)
        }
        BinOp::Shr => {
            if y < 0 {
                return Err(Some(Exception::new(ExceptionKind::ValueError, "negative shift count")));
            }
            Ok(Value::Int(x >> y.min(63)))
        }
    }
}

pub(crate) fn floor_div(x: i64, y: i64) -> Option<i64> {
    let quotient = x.checked_div(y)?;
    if (x % y != 0) && ((x < 0) != (y < 0)) {
        Some(quotient - 1)
    } else {
        Some(quotient)
    }
}

pub(crate) fn floor_mod(x: i64, y: i64) -> i64 {
    let remainder = x.checked_rem(y).unwrap_or(0);
    if remainder != 0 && ((remainder < 0) != (y < 0)) {
        remainder + y
    } else {
        remainder
    }
}

fn int_pow(base: i64, exponent: i64) -> Result<Value, Exception> {
    if exponent < 0 {
        if base == 0 {
            return Err(zero_division("0.0 cannot be raised to a negative power"));
        }
        return Ok(Value::Float((base as f64).powf(exponent as f64)));
    }
    match base {
        0 | 1 => return Ok(Value::Int(if exponent == 0 { 1 } else { base })),
        -1 => return Ok(Value::Int(if exponent % 2 == 0 { 1 } else { -1 })),
        _ => {}
    }
    u32::try_from(exponent)
        .ok()
        .and_then(|exponent| base.checked_pow(exponent))
        .map(Value::Int)
        .ok_or_else(overflow)
}

/// Floor division and modulo for floats, matching `divmod`
pub(crate) fn float_divmod(x: f64, y: f64) -> (f64, f64) {
    let mut modulo = x % y;
    let mut div = (x - modulo) / y;
    if modulo != 0.0 {
        if (y < 0.0) != (modulo < 0.0) {
            modulo += y;
            div -= 1.0;
        }
    } else {
        modulo = 0.0_f64.copysign(y);
    }
    let floor = if div != 0.0 {
        let floor = div.floor();
        if div - floor > 0.5 {
            floor + 1.0
        } else {
            floor
        }
    } else {
        0.0_f64.copysign(x / y)
    };
    (floor, modulo)
}

fn float_op(op: BinOp, x: f64, y: f64) -> Result<Value, Option<Exception>> {
    let value = match op {
        BinOp::Add => x + y,
        BinOp::Sub => x - y,
        BinOp::Mul => x * y,
        BinOp::Div => {
            if y == 0.0 {
                return Err(Some(zero_division("float division by zero")));
            }
            x / y
        }
        BinOp::FloorDiv => {
            if y == 0.0 {
                return Err(Some(zero_division("float floor division by zero")));
            }
            float_divmod(x, y).0
        }
        BinOp::Mod => {
            if y == 0.0 {
                return Err(Some(zero_division("float modulo by zero")));
            }
            float_divmod(x, y).1
        }
        BinOp::Pow => {
            if x == 0.0 && y < 0.0 {
                return Err(Some(zero_division("0.0 cannot be raised to a negative power")));
            }
            if x < 0.0 && y.fract() != 0.0 && y.is_finite() {
                return Err(Some(Exception::new(
                    ExceptionKind::ValueError,
                    "negative number cannot be raised to a fractional power",
                )));
            }
            let result = x.powf(y);
            if result.is_infinite() && x.is_finite() && y.is_finite() {
                return Err(Some(Exception::new(
                    ExceptionKind::OverflowError,
                    "(34, 'Numerical result out of range')",
                )));
            }
            result
        }
        _ => return Err(None),
    };
    Ok(Value::Float(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(value: Result<Value, Exception>) -> i64 {
        match value {
            Ok(Value::Int(n)) => n,
            other => panic!("expected int, got {:?}", other),
        }
    }

    fn float(value: Result<Value, Exception>) -> f64 {
        match value {
            Ok(Value::Float(f)) => f,
            other => panic!("expected float, got {:?}", other),
        }
    }

    #[test]
    fn test_integer_arithmetic() {
        assert_eq!(int(binary_op(BinOp::Add, &Value::Int(1), &Value::Int(1))), 2);
        assert_eq!(int(binary_op(BinOp::FloorDiv, &Value::Int(-7), &Value::Int(2))), -4);
        assert_eq!(int(binary_op(BinOp::Mod, &Value::Int(-7), &Value::Int(2))), 1);
        assert_eq!(int(binary_op(BinOp::Mod, &Value::Int(7), &Value::Int(-2))), -1);
        assert_eq!(int(binary_op(BinOp::Pow, &Value::Int(2), &Value::Int(10))), 1024);
        assert_eq!(int(binary_op(BinOp::Add, &Value::Bool(true), &Value::Int(1))), 2);
        assert_eq!(float(binary_op(BinOp::Div, &Value::Int(7), &Value::Int(2))), 3.5);
        assert_eq!(float(binary_op(BinOp::Pow, &Value::Int(2), &Value::Int(-1))), 0.5);
    }

    #[test]
    fn test_division_by_zero_messages() {
        let err = binary_op(BinOp::Div, &Value::Int(1), &Value::Int(0)).unwrap_err();
        assert_eq!(err.summary(), "ZeroDivisionError: division by zero");
        let err = binary_op(BinOp::Div, &Value::Float(1.0), &Value::Int(0)).unwrap_err();
        assert_eq!(err.summary(), "ZeroDivisionError: float division by zero");
        let err = binary_op(BinOp::FloorDiv, &Value::Int(1), &Value::Int(0)).unwrap_err();
        assert_eq!(err.message(), "integer division or modulo by zero");
    }

    #[test]
    fn test_overflow_is_an_error() {
        let err = binary_op(BinOp::Mul, &Value::Int(i64::MAX), &Value::Int(2)).unwrap_err();
        assert_eq!(err.kind, ExceptionKind::OverflowError);
        let err = binary_op(BinOp::Pow, &Value::Int(10), &Value::Int(30)).unwrap_err();
        assert_eq!(err.kind, ExceptionKind::OverflowError);
    }

    #[test]
    fn test_float_floor_division_and_modulo() {
        assert_eq!(float(binary_op(BinOp::FloorDiv, &Value::Float(7.5), &Value::Int(2))), 3.0);
        assert_eq!(float(binary_op(BinOp::Mod, &Value::Float(-7.5), &Value::Int(2))), 0.5);
    }

    #[test]
    fn test_sequence_operators() {
        let joined = binary_op(BinOp::Add, &Value::from("ab"), &Value::from("cd")).unwrap();
        assert_eq!(joined.as_str(), Some("abcd"));

        let repeated = binary_op(BinOp::Mul, &Value::Int(3), &Value::from("ab")).unwrap();
        assert_eq!(repeated.as_str(), Some("ababab"));

        let list = binary_op(
            BinOp::Mul,
            &Value::list(vec![Value::Int(0)]),
            &Value::Int(3),
        )
        .unwrap();
        assert!(list.py_eq(&Value::list(vec![Value::Int(0); 3])));
    }

    #[test]
    fn test_type_errors() {
        let err = binary_op(BinOp::Add, &Value::from("a"), &Value::Int(1)).unwrap_err();
        assert_eq!(err.message(), "can only concatenate str (not \"int\") to str");
        let err = binary_op(BinOp::Sub, &Value::Int(1), &Value::None).unwrap_err();
        assert_eq!(
            err.message(),
            "unsupported operand type(s) for -: 'int' and 'NoneType'"
        );
    }

    #[test]
    fn test_percent_formatting_through_modulo() {
        let text = binary_op(BinOp::Mod, &Value::from("%d items"), &Value::Int(3)).unwrap();
        assert_eq!(text.as_str(), Some("3 items"));
    }
}
