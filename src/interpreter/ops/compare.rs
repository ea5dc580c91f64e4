use crate::interpreter::errors::{Exception, ExceptionKind};
use crate::parser::ast::CmpOp;
use crate::runtime::value::Value;
use std::cmp::Ordering;

/// Evaluate one link of a comparison chain
pub(crate) fn compare(op: CmpOp, left: &Value, right: &Value) -> Result<bool, Exception> {
    match op {
        CmpOp::Eq => Ok(left.py_eq(right)),
        CmpOp::NotEq => Ok(!left.py_eq(right)),
        CmpOp::Is => Ok(left.is_same(right)),
        CmpOp::IsNot => Ok(!left.is_same(right)),
        CmpOp::In => contains(right, left),
        CmpOp::NotIn => contains(right, left).map(|found| !found),
        CmpOp::Lt | CmpOp::LtE | CmpOp::Gt | CmpOp::GtE => ordered(op, left, right),
    }
}

fn not_supported(op: CmpOp, left: &Value, right: &Value) -> Exception {
    Exception::new(
        ExceptionKind::TypeError,
        format!(
            "'{}' not supported between instances of '{}' and '{}'",
            op.symbol(),
            left.type_name(),
            right.type_name()
        ),
    )
}

fn apply<T: PartialOrd>(op: CmpOp, a: T, b: T) -> bool {
    match op {
        CmpOp::Lt => a < b,
        CmpOp::LtE => a <= b,
        CmpOp::Gt => a > b,
        _ => a >= b,
    }
}

/// `<`, `<=`, `>`, `>=`
fn ordered(op: CmpOp, left: &Value, right: &Value) -> Result<bool, Exception> {
    match (left, right) {
        (Value::Int(_) | Value::Bool(_), Value::Int(_) | Value::Bool(_)) => Ok(apply(
            op,
            left.as_int().unwrap_or_default(),
            right.as_int().unwrap_or_default(),
        )),
        (
            Value::Int(_) | Value::Bool(_) | Value::Float(_),
            Value::Int(_) | Value::Bool(_) | Value::Float(_),
        ) => Ok(apply(
            op,
            left.as_float().unwrap_or_default(),
            right.as_float().unwrap_or_default(),
        )),
        (Value::Str(a), Value::Str(b)) => Ok(apply(op, a, b)),
        (Value::List(a), Value::List(b)) => {
            let (a, b) = (a.borrow().clone(), b.borrow().clone());
            sequence_ordered(op, &a, &b)
        }
        (Value::Tuple(a), Value::Tuple(b)) => sequence_ordered(op, a, b),
        _ => Err(not_supported(op, left, right)),
    }
}

/// Lexicographic comparison: the first unequal pair decides, then length
fn sequence_ordered(op: CmpOp, a: &[Value], b: &[Value]) -> Result<bool, Exception> {
    for (x, y) in a.iter().zip(b) {
        if !x.py_eq(y) {
            return ordered(op, x, y);
        }
    }
    Ok(apply(op, a.len(), b.len()))
}

/// Total order used by `sorted`, `min` and `max`, built from `<` alone
pub(crate) fn less_than(left: &Value, right: &Value) -> Result<bool, Exception> {
    ordered(CmpOp::Lt, left, right)
}

pub(crate) fn order(left: &Value, right: &Value) -> Result<Ordering, Exception> {
    if less_than(left, right)? {
        Ok(Ordering::Less)
    } else if less_than(right, left)? {
        Ok(Ordering::Greater)
    } else {
        Ok(Ordering::Equal)
    }
}

/// `item in container`
pub(crate) fn contains(container: &Value, item: &Value) -> Result<bool, Exception> {
    match container {
        Value::Str(haystack) => match item {
            Value::Str(needle) => Ok(haystack.contains(needle.as_ref())),
            other => Err(Exception::new(
                ExceptionKind::TypeError,
                format!(
                    "'in <string>' requires string as left operand, not {}",
                    other.type_name()
                ),
            )),
        },
        Value::List(items) => Ok(items.borrow().iter().any(|value| value.py_eq(item))),
        Value::Tuple(items) => Ok(items.iter().any(|value| value.py_eq(item))),
        Value::Dict(dict) => dict.borrow().contains_key(item),
        Value::Range(range) => Ok(match item {
            Value::Int(_) | Value::Bool(_) => range.contains(item.as_int().unwrap_or_default()),
            Value::Float(f) if f.fract() == 0.0 && f.is_finite() => range.contains(*f as i64),
            _ => false,
        }),
        other => Err(Exception::new(
            ExceptionKind::TypeError,
            format!("argument of type '{}' is not iterable", other.type_name()),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::value::Range;

    #[test]
    fn test_mixed_numeric_ordering() {
        assert!(compare(CmpOp::Lt, &Value::Int(1), &Value::Float(1.5)).unwrap());
        assert!(compare(CmpOp::GtE, &Value::Bool(true), &Value::Int(1)).unwrap());
        assert!(!compare(CmpOp::Lt, &Value::Float(f64::NAN), &Value::Int(1)).unwrap());
    }

    #[test]
    fn test_sequence_ordering() {
        let a = Value::tuple(vec![Value::Int(1), Value::Int(2)]);
        let b = Value::tuple(vec![Value::Int(1), Value::Int(3)]);
        assert!(compare(CmpOp::Lt, &a, &b).unwrap());
        let shorter = Value::list(vec![Value::Int(1)]);
        let longer = Value::list(vec![Value::Int(1), Value::Int(0)]);
        assert!(compare(CmpOp::Lt, &shorter, &longer).unwrap());
        assert!(compare(CmpOp::Lt, &Value::from("abc"), &Value::from("abd")).unwrap());
    }

    #[test]
    fn test_unorderable_types() {
        let err = compare(CmpOp::Lt, &Value::Int(1), &Value::from("a")).unwrap_err();
        assert_eq!(
            err.message(),
            "'<' not supported between instances of 'int' and 'str'"
        );
    }

    #[test]
    fn test_membership() {
        let range = Value::Range(Range { start: 0, stop: 10, step: 2 });
        assert!(compare(CmpOp::In, &Value::Int(4), &range).unwrap());
        assert!(compare(CmpOp::NotIn, &Value::Int(5), &range).unwrap());
        assert!(compare(CmpOp::In, &Value::from("ell"), &Value::from("hello")).unwrap());
        assert!(compare(CmpOp::In, &Value::Int(1), &Value::Int(1)).is_err());
    }

    #[test]
    fn test_order() {
        assert_eq!(order(&Value::Int(2), &Value::Int(1)).unwrap(), Ordering::Greater);
        assert_eq!(order(&Value::Int(1), &Value::Float(1.0)).unwrap(), Ordering::Equal);
    }
}
