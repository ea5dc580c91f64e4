use crate::interpreter::errors::{Exception, ExceptionKind};
use crate::parser::ast::UnOp;
use crate::runtime::value::Value;

/// Apply a unary operator
pub(crate) fn unary_op(op: UnOp, operand: &Value) -> Result<Value, Exception> {
    if op == UnOp::Not {
        return Ok(Value::Bool(!operand.is_truthy()));
    }

    let result = match (op, operand) {
        (UnOp::Neg, Value::Float(f)) => Some(Value::Float(-f)),
        (UnOp::Pos, Value::Float(f)) => Some(Value::Float(*f)),
        (_, Value::Int(_) | Value::Bool(_)) => {
            let n = operand.as_int().unwrap_or_default();
            let value = match op {
                UnOp::Neg => n.checked_neg().ok_or_else(|| {
                    Exception::new(ExceptionKind::OverflowError, "integer overflow")
                })?,
                UnOp::Invert => !n,
                _ => n,
            };
            Some(Value::Int(value))
        }
        _ => None,
    };

    result.ok_or_else(|| {
        let symbol = match op {
            UnOp::Neg => "-",
            UnOp::Pos => "+",
            _ => "~",
        };
        Exception::new(
            ExceptionKind::TypeError,
            format!(
                "bad operand type for unary {}: '{}'",
                symbol,
                operand.type_name()
            ),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unary_operators() {
        assert!(matches!(unary_op(UnOp::Neg, &Value::Int(5)), Ok(Value::Int(-5))));
        assert!(matches!(unary_op(UnOp::Invert, &Value::Int(5)), Ok(Value::Int(-6))));
        assert!(matches!(unary_op(UnOp::Neg, &Value::Bool(true)), Ok(Value::Int(-1))));
        assert!(matches!(unary_op(UnOp::Not, &Value::from("")), Ok(Value::Bool(true))));
        assert!(matches!(unary_op(UnOp::Neg, &Value::Float(1.5)), Ok(Value::Float(f)) if f == -1.5));
    }

    #[test]
    fn test_bad_operand() {
        let err = unary_op(UnOp::Neg, &Value::from("x")).unwrap_err();
        assert_eq!(err.summary(), "TypeError: bad operand type for unary -: 'str'");
        let err = unary_op(UnOp::Invert, &Value::Float(1.0)).unwrap_err();
        assert_eq!(err.kind, ExceptionKind::TypeError);
    }
}
