use crate::interpreter::errors::{Exception, ExceptionKind};
use crate::interpreter::{methods, modules};
use crate::runtime::value::{BoundMethod, Range, Value};
use std::rc::Rc;

/// Evaluated `lower:upper:step` of a slice subscript
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct SliceBounds {
    pub lower: Option<i64>,
    pub upper: Option<i64>,
    pub step: Option<i64>,
}

impl SliceBounds {
    /// Clamped `(start, stop, step)` for a sequence of `len` items
    pub(crate) fn indices(&self, len: usize) -> Result<(i64, i64, i64), Exception> {
        let step = self.step.unwrap_or(1);
        if step == 0 {
            return Err(Exception::new(
                ExceptionKind::ValueError,
                "slice step cannot be zero",
            ));
        }

        let len = i64::try_from(len).unwrap_or(i64::MAX);
        let clamp = |bound: Option<i64>, default: i64| match bound {
            None => default,
            Some(value) => {
                let value = if value < 0 { value + len } else { value };
                if step > 0 {
                    value.clamp(0, len)
                } else {
                    value.clamp(-1, len - 1)
                }
            }
        };

        Ok(if step > 0 {
            (clamp(self.lower, 0), clamp(self.upper, len), step)
        } else {
            (clamp(self.lower, len - 1), clamp(self.upper, -1), step)
        })
    }

    /// Positions selected by the slice, in order
    pub(crate) fn positions(&self, len: usize) -> Result<Vec<usize>, Exception> {
        let (start, stop, step) = self.indices(len)?;
        let mut positions = Vec::new();
        let mut index = start;
        while (step > 0 && index < stop) || (step < 0 && index > stop) {
            positions.push(index as usize);
            match index.checked_add(step) {
                Some(next) => index = next,
                None => break,
            }
        }
        Ok(positions)
    }
}

fn not_subscriptable(object: &Value) -> Exception {
    Exception::new(
        ExceptionKind::TypeError,
        format!("'{}' object is not subscriptable", object.type_name()),
    )
}

fn no_item_assignment(object: &Value) -> Exception {
    Exception::new(
        ExceptionKind::TypeError,
        format!(
            "'{}' object does not support item assignment",
            object.type_name()
        ),
    )
}

/// Resolve a possibly negative index against `len`
fn sequence_index(index: &Value, len: usize, kind: &str, out_of_range: &str) -> Result<usize, Exception> {
    let Some(position) = index.as_int() else {
        let message = if kind == "string" {
            format!("string indices must be integers, not '{}'", index.type_name())
        } else {
            format!(
                "{} indices must be integers or slices, not {}",
                kind,
                index.type_name()
            )
        };
        return Err(Exception::new(ExceptionKind::TypeError, message));
    };

    let len = len as i64;
    let position = if position < 0 { position + len } else { position };
    if position < 0 || position >= len {
        return Err(Exception::new(ExceptionKind::IndexError, out_of_range));
    }
    Ok(position as usize)
}

fn key_error(key: &Value) -> Exception {
    Exception::with_args(ExceptionKind::KeyError, vec![key.clone()])
}

/// `object[index]`
pub(crate) fn get_item(object: &Value, index: &Value) -> Result<Value, Exception> {
    match object {
        Value::List(items) => {
            let items = items.borrow();
            let position = sequence_index(index, items.len(), "list", "list index out of range")?;
            Ok(items[position].clone())
        }
        Value::Tuple(items) => {
            let position = sequence_index(index, items.len(), "tuple", "tuple index out of range")?;
            Ok(items[position].clone())
        }
        Value::Str(s) => {
            let len = s.chars().count();
            let position = sequence_index(index, len, "string", "string index out of range")?;
            Ok(s.chars()
                .nth(position)
                .map(|ch| Value::from(ch.to_string()))
                .unwrap_or_default())
        }
        Value::Range(range) => {
            let position = sequence_index(
                index,
                range.len(),
                "range",
                "range object index out of range",
            )?;
            Ok(Value::Int(range.get(position)))
        }
        Value::Dict(dict) => dict.borrow().get(index)?.ok_or_else(|| key_error(index)),
        other => Err(not_subscriptable(other)),
    }
}

/// `object[lower:upper:step]`
pub(crate) fn get_slice(object: &Value, bounds: SliceBounds) -> Result<Value, Exception> {
    match object {
        Value::List(items) => {
            let items = items.borrow();
            let selected = bounds
                .positions(items.len())?
                .into_iter()
                .map(|i| items[i].clone())
                .collect();
            Ok(Value::list(selected))
        }
        Value::Tuple(items) => {
            let selected = bounds
                .positions(items.len())?
                .into_iter()
                .map(|i| items[i].clone())
                .collect();
            Ok(Value::tuple(selected))
        }
        Value::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            let selected: String = bounds
                .positions(chars.len())?
                .into_iter()
                .map(|i| chars[i])
                .collect();
            Ok(Value::from(selected))
        }
        Value::Range(range) => {
            let (start, stop, step) = bounds.indices(range.len())?;
            let at = |i: i64| (range.start as i128 + i as i128 * range.step as i128) as i64;
            Ok(Value::Range(Range {
                start: at(start),
                stop: at(stop),
                step: range.step.saturating_mul(step),
            }))
        }
        other => Err(not_subscriptable(other)),
    }
}

/// `object[index] = value`
pub(crate) fn set_item(object: &Value, index: Value, value: Value) -> Result<(), Exception> {
    match object {
        Value::List(items) => {
            let mut items = items.borrow_mut();
            let position = sequence_index(
                &index,
                items.len(),
                "list",
                "list assignment index out of range",
            )?;
            items[position] = value;
            Ok(())
        }
        Value::Dict(dict) => dict.borrow_mut().insert(index, value),
        other => Err(no_item_assignment(other)),
    }
}

/// `object[lower:upper:step] = values`
pub(crate) fn set_slice(object: &Value, bounds: SliceBounds, values: Vec<Value>) -> Result<(), Exception> {
    let Value::List(items) = object else {
        return Err(no_item_assignment(object));
    };
    let mut items = items.borrow_mut();

    if bounds.step.unwrap_or(1) == 1 {
        let (start, stop, _) = bounds.indices(items.len())?;
        let start = start as usize;
        let stop = (stop as usize).max(start);
        items.splice(start..stop, values);
        return Ok(());
    }

    let positions = bounds.positions(items.len())?;
    if positions.len() != values.len() {
        return Err(Exception::new(
            ExceptionKind::ValueError,
            format!(
                "attempt to assign sequence of size {} to extended slice of size {}",
                values.len(),
                positions.len()
            ),
        ));
    }
    for (position, value) in positions.into_iter().zip(values) {
        items[position] = value;
    }
    Ok(())
}

/// `del object[index]`
pub(crate) fn delete_item(object: &Value, index: &Value) -> Result<(), Exception> {
    match object {
        Value::List(items) => {
            let mut items = items.borrow_mut();
            let position = sequence_index(
                index,
                items.len(),
                "list",
                "list assignment index out of range",
            )?;
            items.remove(position);
            Ok(())
        }
        Value::Dict(dict) => match dict.borrow_mut().remove(index)? {
            Some(_) => Ok(()),
            None => Err(key_error(index)),
        },
        other => Err(Exception::new(
            ExceptionKind::TypeError,
            format!("'{}' object doesn't support item deletion", other.type_name()),
        )),
    }
}

/// `del object[lower:upper:step]`
pub(crate) fn delete_slice(object: &Value, bounds: SliceBounds) -> Result<(), Exception> {
    let Value::List(items) = object else {
        return Err(Exception::new(
            ExceptionKind::TypeError,
            format!("'{}' object doesn't support item deletion", object.type_name()),
        ));
    };
    let mut items = items.borrow_mut();
    let mut positions = bounds.positions(items.len())?;
    positions.sort_unstable_by(|a, b| b.cmp(a));
    for position in positions {
        items.remove(position);
    }
    Ok(())
}

/// `object.name`
pub(crate) fn get_attribute(object: &Value, name: &str) -> Result<Value, Exception> {
    let attribute = match (object, name) {
        (Value::Module(module), _) => {
            return modules::attribute(*module, name).ok_or_else(|| {
                Exception::new(
                    ExceptionKind::AttributeError,
                    format!("module '{}' has no attribute '{}'", module, name),
                )
            });
        }
        (Value::Exception(exception), "args") => Some(Value::tuple(exception.args.clone())),
        (Value::Function(function), "__name__") => Some(Value::from(function.def.name.as_str())),
        (Value::Builtin(builtin), "__name__") => Some(Value::from(builtin.name)),
        (Value::Type(type_name), "__name__") => Some(Value::from(type_name.name())),
        (Value::ExceptionClass(kind), "__name__") => Some(Value::from(kind.name())),
        _ if methods::has_method(object, name) => Some(Value::BoundMethod(Rc::new(BoundMethod {
            receiver: object.clone(),
            name: name.to_string(),
        }))),
        _ => None,
    };

    attribute.ok_or_else(|| {
        let message = match object {
            Value::Type(type_name) => {
                format!("type object '{}' has no attribute '{}'", type_name.name(), name)
            }
            other => format!("'{}' object has no attribute '{}'", other.type_name(), name),
        };
        Exception::new(ExceptionKind::AttributeError, message)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(values: &[i64]) -> Value {
        Value::list(values.iter().copied().map(Value::Int).collect())
    }

    fn slice(lower: Option<i64>, upper: Option<i64>, step: Option<i64>) -> SliceBounds {
        SliceBounds { lower, upper, step }
    }

    #[test]
    fn test_negative_indexing() {
        let list = ints(&[1, 2, 3]);
        assert!(matches!(get_item(&list, &Value::Int(-1)), Ok(Value::Int(3))));
        let err = get_item(&list, &Value::Int(3)).unwrap_err();
        assert_eq!(err.summary(), "IndexError: list index out of range");
    }

    #[test]
    fn test_slices() {
        let list = ints(&[0, 1, 2, 3, 4, 5]);
        let result = get_slice(&list, slice(Some(1), Some(4), None)).unwrap();
        assert!(result.py_eq(&ints(&[1, 2, 3])));
        let reversed = get_slice(&list, slice(None, None, Some(-2))).unwrap();
        assert!(reversed.py_eq(&ints(&[5, 3, 1])));
        let tail = get_slice(&Value::from("hello"), slice(Some(-3), None, None)).unwrap();
        assert_eq!(tail.as_str(), Some("llo"));
        assert!(get_slice(&list, slice(None, None, Some(0))).is_err());
    }

    #[test]
    fn test_slice_assignment() {
        let list = ints(&[0, 1, 2, 3]);
        set_slice(&list, slice(Some(1), Some(3), None), vec![Value::Int(9)]).unwrap();
        assert!(list.py_eq(&ints(&[0, 9, 3])));
        delete_slice(&list, slice(None, None, Some(2))).unwrap();
        assert!(list.py_eq(&ints(&[9])));
    }

    #[test]
    fn test_dict_item_access() {
        let dict = Value::dict(Default::default());
        set_item(&dict, Value::from("a"), Value::Int(1)).unwrap();
        assert!(matches!(get_item(&dict, &Value::from("a")), Ok(Value::Int(1))));
        let err = get_item(&dict, &Value::from("b")).unwrap_err();
        assert_eq!(err.summary(), "KeyError: 'b'");
        delete_item(&dict, &Value::from("a")).unwrap();
        assert!(delete_item(&dict, &Value::from("a")).is_err());
    }

    #[test]
    fn test_immutable_sequences_reject_assignment() {
        let err = set_item(&Value::from("abc"), Value::Int(0), Value::from("x")).unwrap_err();
        assert_eq!(err.message(), "'str' object does not support item assignment");
    }

    #[test]
    fn test_attributes() {
        let method = get_attribute(&ints(&[]), "append").unwrap();
        assert!(matches!(method, Value::BoundMethod(_)));
        let err = get_attribute(&Value::Int(1), "nope").unwrap_err();
        assert_eq!(err.summary(), "AttributeError: 'int' object has no attribute 'nope'");
        assert!(matches!(get_attribute(&Value::Module("math"), "pi"), Ok(Value::Float(_))));
    }
}
