//! Methods of built-in types
//!
//! `xs.append` evaluates to a bound method; calling it lands in
//! [`Interpreter::call_method`], which dispatches on the receiver's type.
//! Only `list.sort` can call back into snippet code (through `key=`), so it
//! works on a copy of the list and writes the result back afterwards.

use crate::interpreter::builtins::{arity, int_arg, no_kwargs, str_arg, take_kwarg, type_error, value_error};
use crate::interpreter::constants::MAX_STRING_LEN;
use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::{Exception, ExceptionKind, Interrupt};
use crate::interpreter::ops::access::SliceBounds;
use crate::runtime::format::{format_template, repr};
use crate::runtime::value::{Dict, Value};
use std::cell::RefCell;
use std::rc::Rc;

const STR_METHODS: &[&str] = &[
    "capitalize", "center", "count", "endswith", "find", "format", "index", "isalnum", "isalpha",
    "isdigit", "islower", "isspace", "isupper", "join", "ljust", "lower", "lstrip", "partition",
    "replace", "rfind", "rjust", "rsplit", "rstrip", "split", "splitlines", "startswith", "strip",
    "title", "upper", "zfill",
];

const LIST_METHODS: &[&str] = &[
    "append", "clear", "copy", "count", "extend", "index", "insert", "pop", "remove", "reverse",
    "sort",
];

const DICT_METHODS: &[&str] = &[
    "clear", "copy", "get", "items", "keys", "pop", "popitem", "setdefault", "update", "values",
];

const TUPLE_METHODS: &[&str] = &["count", "index"];

/// Does `value` have a method called `name`?
pub(crate) fn has_method(value: &Value, name: &str) -> bool {
    let table: &[&str] = match value {
        Value::Str(_) => STR_METHODS,
        Value::List(_) => LIST_METHODS,
        Value::Dict(_) => DICT_METHODS,
        Value::Tuple(_) => TUPLE_METHODS,
        Value::Int(_) | Value::Bool(_) => &["bit_length"],
        Value::Float(_) => &["is_integer"],
        _ => &[],
    };
    table.contains(&name)
}

fn missing_method(receiver: &Value, name: &str) -> Exception {
    Exception::new(
        ExceptionKind::AttributeError,
        format!("'{}' object has no attribute '{}'", receiver.type_name(), name),
    )
}

impl Interpreter {
    /// Call `receiver.name(*args, **kwargs)`
    pub(crate) fn call_method(
        &mut self,
        receiver: &Value,
        name: &str,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
    ) -> Result<Value, Interrupt> {
        match receiver {
            Value::Str(text) => match name {
                "format" => Ok(Value::from(format_template(text, &args, &kwargs)?)),
                "split" | "rsplit" => Ok(split_method(text, name, args, kwargs)?),
                _ => {
                    no_kwargs(name, &kwargs)?;
                    Ok(str_method(text, name, &args)?)
                }
            },
            Value::List(items) => {
                if name == "sort" {
                    return self.list_sort(items, args, kwargs);
                }
                no_kwargs(name, &kwargs)?;
                if name == "extend" {
                    arity(name, &args, 1, 1)?;
                    let extra = self.collect_values(&args[0])?;
                    items.borrow_mut().extend(extra);
                    return Ok(Value::None);
                }
                Ok(list_method(items, name, args)?)
            }
            Value::Dict(dict) => {
                if name == "update" {
                    return self.dict_update(dict, args, kwargs);
                }
                no_kwargs(name, &kwargs)?;
                Ok(dict_method(dict, name, args)?)
            }
            Value::Tuple(items) => {
                no_kwargs(name, &kwargs)?;
                Ok(sequence_search(items, "tuple", name, &args)?)
            }
            Value::Int(_) | Value::Bool(_) if name == "bit_length" => {
                arity(name, &args, 0, 0)?;
                let n = int_arg(receiver)?;
                Ok(Value::Int(i64::from(64 - n.unsigned_abs().leading_zeros())))
            }
            Value::Float(f) if name == "is_integer" => {
                arity(name, &args, 0, 0)?;
                Ok(Value::Bool(f.is_finite() && f.fract() == 0.0))
            }
            other => Err(missing_method(other, name).into()),
        }
    }

    fn list_sort(
        &mut self,
        items: &Rc<RefCell<Vec<Value>>>,
        args: Vec<Value>,
        mut kwargs: Vec<(String, Value)>,
    ) -> Result<Value, Interrupt> {
        if !args.is_empty() {
            return Err(type_error("sort() takes no positional arguments").into());
        }
        let key = take_kwarg(&mut kwargs, "key");
        let reverse = take_kwarg(&mut kwargs, "reverse").is_some_and(|r| r.is_truthy());
        no_kwargs("sort", &kwargs)?;

        let snapshot = items.borrow().clone();
        let sorted = self.sort_values(snapshot, key.as_ref(), reverse)?;
        *items.borrow_mut() = sorted;
        Ok(Value::None)
    }

    fn dict_update(
        &mut self,
        dict: &Rc<RefCell<Dict>>,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
    ) -> Result<Value, Interrupt> {
        arity("update", &args, 0, 1)?;
        let mut pairs = Vec::new();
        match args.first() {
            Some(Value::Dict(other)) => pairs.extend(other.borrow().items()),
            Some(source) => {
                for pair in self.collect_values(source)? {
                    let parts = self.collect_values(&pair)?;
                    let [key, value]: [Value; 2] = parts.try_into().map_err(|parts: Vec<Value>| {
                        value_error(format!(
                            "dictionary update sequence element has length {}; 2 is required",
                            parts.len()
                        ))
                    })?;
                    pairs.push((key, value));
                }
            }
            None => {}
        }
        pairs.extend(kwargs.into_iter().map(|(key, value)| (Value::from(key), value)));

        let mut dict = dict.borrow_mut();
        for (key, value) in pairs {
            dict.insert(key, value)?;
        }
        Ok(Value::None)
    }
}

/// Optional string argument; `None` counts as absent
fn opt_str<'a>(name: &str, args: &'a [Value], index: usize) -> Result<Option<&'a str>, Exception> {
    match args.get(index) {
        None | Some(Value::None) => Ok(None),
        Some(value) => str_arg(name, value).map(Some),
    }
}

/// Optional start/end arguments of `find`, `count`, ..., as char offsets
fn search_window(args: &[Value], first: usize, len: usize) -> Result<(usize, usize), Exception> {
    let bound = |index: usize| -> Result<Option<i64>, Exception> {
        match args.get(index) {
            None | Some(Value::None) => Ok(None),
            Some(value) => int_arg(value).map(Some),
        }
    };
    let bounds = SliceBounds {
        lower: bound(first)?,
        upper: bound(first + 1)?,
        step: None,
    };
    let (start, stop, _) = bounds.indices(len)?;
    Ok((start.max(0) as usize, stop.max(start).max(0) as usize))
}

fn char_to_byte(text: &str, chars: usize) -> usize {
    text.char_indices().nth(chars).map_or(text.len(), |(offset, _)| offset)
}

fn str_method(text: &Rc<str>, name: &str, args: &[Value]) -> Result<Value, Exception> {
    let text: &str = text;
    let value = match name {
        "upper" | "lower" | "title" | "capitalize" => {
            arity(name, args, 0, 0)?;
            Value::from(match name {
                "upper" => text.to_uppercase(),
                "lower" => text.to_lowercase(),
                "title" => title_case(text),
                _ => {
                    let mut chars = text.chars();
                    match chars.next() {
                        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                        None => String::new(),
                    }
                }
            })
        }
        "strip" | "lstrip" | "rstrip" => {
            arity(name, args, 0, 1)?;
            let chars: Option<Vec<char>> = opt_str(name, args, 0)?.map(|set| set.chars().collect());
            let matches = |c: char| match &chars {
                Some(set) => set.contains(&c),
                None => c.is_whitespace(),
            };
            Value::from(match name {
                "strip" => text.trim_matches(matches),
                "lstrip" => text.trim_start_matches(matches),
                _ => text.trim_end_matches(matches),
            })
        }
        "join" => {
            arity(name, args, 1, 1)?;
            let items = crate::interpreter::loops::iterate(&args[0])?;
            let mut joined = String::new();
            for (index, item) in items.enumerate() {
                let Value::Str(part) = &item else {
                    return Err(type_error(format!(
                        "sequence item {}: expected str instance, {} found",
                        index,
                        item.type_name()
                    )));
                };
                if index > 0 {
                    joined.push_str(text);
                }
                joined.push_str(part);
                if joined.len() > MAX_STRING_LEN {
                    return Err(Exception::with_args(ExceptionKind::MemoryError, Vec::new()));
                }
            }
            Value::from(joined)
        }
        "replace" => {
            arity(name, args, 2, 3)?;
            let old = str_arg(name, &args[0])?;
            let new = str_arg(name, &args[1])?;
            let count = match args.get(2) {
                Some(count) => int_arg(count)?,
                None => -1,
            };
            let replaced = if count < 0 {
                text.replace(old, new)
            } else {
                text.replacen(old, new, count as usize)
            };
            if replaced.len() > MAX_STRING_LEN {
                return Err(Exception::with_args(ExceptionKind::MemoryError, Vec::new()));
            }
            Value::from(replaced)
        }
        "startswith" | "endswith" => {
            arity(name, args, 1, 3)?;
            let (start, end) = search_window(args, 1, text.chars().count())?;
            let window = &text[char_to_byte(text, start)..char_to_byte(text, end)];
            let test = |affix: &str| {
                if name == "startswith" {
                    window.starts_with(affix)
                } else {
                    window.ends_with(affix)
                }
            };
            let found = match &args[0] {
                Value::Tuple(affixes) => affixes.iter().any(|affix| affix.as_str().is_some_and(test)),
                Value::Str(affix) => test(&**affix),
                other => {
                    return Err(type_error(format!(
                        "{} first arg must be str or a tuple of str, not {}",
                        name,
                        other.type_name()
                    )));
                }
            };
            Value::Bool(found)
        }
        "find" | "rfind" | "index" | "count" => {
            arity(name, args, 1, 3)?;
            let needle = str_arg(name, &args[0])?;
            let (start, end) = search_window(args, 1, text.chars().count())?;
            let offset = char_to_byte(text, start);
            let window = &text[offset..char_to_byte(text, end).max(offset)];
            if name == "count" {
                let count = if needle.is_empty() {
                    window.chars().count() + 1
                } else {
                    window.matches(needle).count()
                };
                return Ok(Value::Int(count as i64));
            }
            let found = if name == "rfind" { window.rfind(needle) } else { window.find(needle) };
            match found {
                Some(byte) => Value::Int((start + text[offset..offset + byte].chars().count()) as i64),
                None if name == "index" => return Err(value_error("substring not found")),
                None => Value::Int(-1),
            }
        }
        "isdigit" | "isalpha" | "isalnum" | "isspace" => {
            arity(name, args, 0, 0)?;
            let test: fn(char) -> bool = match name {
                "isdigit" => |c| c.is_ascii_digit(),
                "isalpha" => char::is_alphabetic,
                "isalnum" => char::is_alphanumeric,
                _ => char::is_whitespace,
            };
            Value::Bool(!text.is_empty() && text.chars().all(test))
        }
        "isupper" | "islower" => {
            arity(name, args, 0, 0)?;
            let cased = text.chars().any(|c| c.is_lowercase() || c.is_uppercase());
            let consistent = if name == "isupper" {
                !text.chars().any(char::is_lowercase)
            } else {
                !text.chars().any(char::is_uppercase)
            };
            Value::Bool(cased && consistent)
        }
        "splitlines" => {
            arity(name, args, 0, 1)?;
            Value::list(text.lines().map(Value::from).collect())
        }
        "partition" => {
            arity(name, args, 1, 1)?;
            let separator = str_arg(name, &args[0])?;
            if separator.is_empty() {
                return Err(value_error("empty separator"));
            }
            let parts = match text.split_once(separator) {
                Some((head, tail)) => vec![Value::from(head), Value::from(separator), Value::from(tail)],
                None => vec![Value::from(text), Value::from(""), Value::from("")],
            };
            Value::tuple(parts)
        }
        "zfill" | "center" | "ljust" | "rjust" => {
            arity(name, args, 1, 2)?;
            let width = usize::try_from(int_arg(&args[0])?).unwrap_or(0);
            if width > MAX_STRING_LEN {
                return Err(Exception::with_args(ExceptionKind::MemoryError, Vec::new()));
            }
            let fill = match opt_str(name, args, 1)? {
                Some(fill) if fill.chars().count() == 1 => fill.chars().next().unwrap_or(' '),
                Some(_) => {
                    return Err(type_error(
                        "The fill character must be exactly one character long",
                    ));
                }
                None => ' ',
            };
            Value::from(justify(text, name, width, fill))
        }
        _ => return Err(missing_method(&Value::from(text), name)),
    };
    Ok(value)
}

fn split_method(
    text: &Rc<str>,
    name: &str,
    mut args: Vec<Value>,
    mut kwargs: Vec<(String, Value)>,
) -> Result<Value, Exception> {
    if let Some(sep) = take_kwarg(&mut kwargs, "sep") {
        args.insert(0, sep);
    }
    if let Some(maxsplit) = take_kwarg(&mut kwargs, "maxsplit") {
        if args.is_empty() {
            args.push(Value::None);
        }
        args.push(maxsplit);
    }
    no_kwargs(name, &kwargs)?;
    arity(name, &args, 0, 2)?;

    let separator = opt_str(name, &args, 0)?;
    let limit = match args.get(1) {
        Some(n) => usize::try_from(int_arg(n)?).ok(),
        None => None,
    };
    let reverse = name == "rsplit";

    let mut parts: Vec<String> = match separator {
        Some("") => return Err(value_error("empty separator")),
        Some(separator) => match (limit, reverse) {
            (None, _) => text.split(separator).map(str::to_string).collect(),
            (Some(n), false) => text.splitn(n + 1, separator).map(str::to_string).collect(),
            (Some(n), true) => {
                let mut parts: Vec<String> = text.rsplitn(n + 1, separator).map(str::to_string).collect();
                parts.reverse();
                parts
            }
        },
        None => split_whitespace(text, limit, reverse),
    };
    parts.shrink_to_fit();
    Ok(Value::list(parts.into_iter().map(Value::from).collect()))
}

/// `str.split()` with no separator: runs of whitespace, no empty strings
fn split_whitespace(text: &str, limit: Option<usize>, reverse: bool) -> Vec<String> {
    let Some(limit) = limit else {
        return text.split_whitespace().map(str::to_string).collect();
    };

    let mut parts = Vec::new();
    let mut rest = if reverse { text.trim_end() } else { text.trim_start() };
    while parts.len() < limit && !rest.is_empty() {
        let split = if reverse {
            rest.rfind(char::is_whitespace).map(|i| {
                let width = rest[i..].chars().next().map_or(1, char::len_utf8);
                (&rest[i + width..], rest[..i].trim_end())
            })
        } else {
            rest.find(char::is_whitespace).map(|i| (&rest[..i], rest[i..].trim_start()))
        };
        match split {
            Some((part, remaining)) => {
                parts.push(part.to_string());
                rest = remaining;
            }
            None => break,
        }
    }
    if !rest.is_empty() {
        parts.push(rest.to_string());
    }
    if reverse {
        parts.reverse();
    }
    parts
}

fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut previous_cased = false;
    for c in text.chars() {
        if previous_cased {
            out.extend(c.to_lowercase());
        } else {
            out.extend(c.to_uppercase());
        }
        previous_cased = c.is_alphabetic();
    }
    out
}

fn justify(text: &str, name: &str, width: usize, fill: char) -> String {
    let len = text.chars().count();
    if width <= len {
        return text.to_string();
    }
    let padding = width - len;
    let repeat = |n: usize| std::iter::repeat(fill).take(n).collect::<String>();
    match name {
        "zfill" => {
            let zeros = "0".repeat(padding);
            match text.strip_prefix(['+', '-']) {
                Some(digits) => format!("{}{}{}", &text[..1], zeros, digits),
                None => format!("{}{}", zeros, text),
            }
        }
        "ljust" => format!("{}{}", text, repeat(padding)),
        "rjust" => format!("{}{}", repeat(padding), text),
        _ => {
            let left = padding / 2 + (padding & width & 1);
            format!("{}{}{}", repeat(left), text, repeat(padding - left))
        }
    }
}

/// `index` and `count` shared by lists and tuples
fn sequence_search(items: &[Value], owner: &str, name: &str, args: &[Value]) -> Result<Value, Exception> {
    match name {
        "count" => {
            arity(name, args, 1, 1)?;
            let count = items.iter().filter(|item| item.py_eq(&args[0])).count();
            Ok(Value::Int(count as i64))
        }
        "index" => {
            arity(name, args, 1, 3)?;
            let (start, end) = search_window(args, 1, items.len())?;
            items
                .iter()
                .enumerate()
                .take(end)
                .skip(start)
                .find(|(_, item)| item.py_eq(&args[0]))
                .map(|(index, _)| Value::Int(index as i64))
                .ok_or_else(|| match owner {
                    "tuple" => value_error("tuple.index(x): x not in tuple"),
                    _ => value_error(format!("{} is not in list", repr(&args[0]))),
                })
        }
        _ => Err(missing_method(&Value::tuple(items.to_vec()), name)),
    }
}

fn list_method(items: &Rc<RefCell<Vec<Value>>>, name: &str, args: Vec<Value>) -> Result<Value, Exception> {
    match name {
        "append" => {
            arity(name, &args, 1, 1)?;
            items.borrow_mut().extend(args);
            Ok(Value::None)
        }
        "insert" => {
            arity(name, &args, 2, 2)?;
            let mut items = items.borrow_mut();
            let len = items.len() as i64;
            let index = int_arg(&args[0])?;
            let index = if index < 0 { (index + len).max(0) } else { index.min(len) };
            items.insert(index as usize, args[1].clone());
            Ok(Value::None)
        }
        "pop" => {
            arity(name, &args, 0, 1)?;
            let mut items = items.borrow_mut();
            if items.is_empty() {
                return Err(Exception::new(ExceptionKind::IndexError, "pop from empty list"));
            }
            let len = items.len() as i64;
            let index = match args.first() {
                Some(index) => int_arg(index)?,
                None => -1,
            };
            let position = if index < 0 { index + len } else { index };
            if !(0..len).contains(&position) {
                return Err(Exception::new(ExceptionKind::IndexError, "pop index out of range"));
            }
            Ok(items.remove(position as usize))
        }
        "remove" => {
            arity(name, &args, 1, 1)?;
            let mut items = items.borrow_mut();
            match items.iter().position(|item| item.py_eq(&args[0])) {
                Some(position) => {
                    items.remove(position);
                    Ok(Value::None)
                }
                None => Err(value_error("list.remove(x): x not in list")),
            }
        }
        "reverse" => {
            arity(name, &args, 0, 0)?;
            items.borrow_mut().reverse();
            Ok(Value::None)
        }
        "clear" => {
            arity(name, &args, 0, 0)?;
            items.borrow_mut().clear();
            Ok(Value::None)
        }
        "copy" => {
            arity(name, &args, 0, 0)?;
            Ok(Value::list(items.borrow().clone()))
        }
        _ => {
            let snapshot = items.borrow().clone();
            sequence_search(&snapshot, "list", name, &args)
        }
    }
}

fn dict_method(dict: &Rc<RefCell<Dict>>, name: &str, args: Vec<Value>) -> Result<Value, Exception> {
    match name {
        "get" => {
            arity(name, &args, 1, 2)?;
            let found = dict.borrow().get(&args[0])?;
            Ok(found.unwrap_or_else(|| args.get(1).cloned().unwrap_or_default()))
        }
        "keys" => {
            arity(name, &args, 0, 0)?;
            Ok(Value::list(dict.borrow().keys()))
        }
        "values" => {
            arity(name, &args, 0, 0)?;
            Ok(Value::list(dict.borrow().values()))
        }
        "items" => {
            arity(name, &args, 0, 0)?;
            let items = dict.borrow().items();
            Ok(Value::list(
                items.into_iter().map(|(key, value)| Value::tuple(vec![key, value])).collect(),
            ))
        }
        "pop" => {
            arity(name, &args, 1, 2)?;
            let removed = dict.borrow_mut().remove(&args[0])?;
            match (removed, args.get(1)) {
                (Some(value), _) => Ok(value),
                (None, Some(default)) => Ok(default.clone()),
                (None, None) => Err(Exception::with_args(ExceptionKind::KeyError, vec![args[0].clone()])),
            }
        }
        "popitem" => {
            arity(name, &args, 0, 0)?;
            match dict.borrow_mut().pop_last() {
                Some((key, value)) => Ok(Value::tuple(vec![key, value])),
                None => Err(Exception::new(
                    ExceptionKind::KeyError,
                    "popitem(): dictionary is empty",
                )),
            }
        }
        "setdefault" => {
            arity(name, &args, 1, 2)?;
            let mut dict = dict.borrow_mut();
            if let Some(existing) = dict.get(&args[0])? {
                return Ok(existing);
            }
            let default = args.get(1).cloned().unwrap_or_default();
            dict.insert(args[0].clone(), default.clone())?;
            Ok(default)
        }
        "clear" => {
            arity(name, &args, 0, 0)?;
            dict.borrow_mut().clear();
            Ok(Value::None)
        }
        "copy" => {
            arity(name, &args, 0, 0)?;
            Ok(Value::dict(dict.borrow().clone()))
        }
        _ => Err(missing_method(&Value::Dict(Rc::clone(dict)), name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deadline::CancelToken;

    fn call(receiver: &Value, name: &str, args: Vec<Value>) -> Result<Value, Interrupt> {
        let mut interpreter = Interpreter::new(CancelToken::new());
        interpreter.call_method(receiver, name, args, Vec::new())
    }

    fn call_repr(receiver: &Value, name: &str, args: Vec<Value>) -> String {
        repr(&call(receiver, name, args).unwrap())
    }

    #[test]
    fn test_has_method() {
        assert!(has_method(&Value::from("x"), "upper"));
        assert!(has_method(&Value::list(Vec::new()), "append"));
        assert!(!has_method(&Value::list(Vec::new()), "upper"));
        assert!(!has_method(&Value::None, "anything"));
    }

    #[test]
    fn test_string_methods() {
        let text = Value::from("  Hello World  ");
        assert_eq!(call_repr(&text, "strip", vec![]), "'Hello World'");
        assert_eq!(call_repr(&text, "split", vec![]), "['Hello', 'World']");
        assert_eq!(call_repr(&Value::from("a,b,,c"), "split", vec![Value::from(",")]), "['a', 'b', '', 'c']");
        assert_eq!(
            call_repr(&Value::from("a b c"), "rsplit", vec![Value::None, Value::Int(1)]),
            "['a b', 'c']"
        );
        assert_eq!(
            call_repr(&Value::from("-"), "join", vec![Value::list(vec![Value::from("a"), Value::from("b")])]),
            "'a-b'"
        );
        assert_eq!(call_repr(&Value::from("hello"), "find", vec![Value::from("l")]), "2");
        assert_eq!(call_repr(&Value::from("hello"), "rfind", vec![Value::from("l")]), "3");
        assert_eq!(call_repr(&Value::from("42"), "zfill", vec![Value::Int(5)]), "'00042'");
        assert_eq!(call_repr(&Value::from("hello world"), "title", vec![]), "'Hello World'");
    }

    #[test]
    fn test_join_rejects_non_strings() {
        let err = call(&Value::from(","), "join", vec![Value::list(vec![Value::Int(1)])]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "TypeError: sequence item 0: expected str instance, int found"
        );
    }

    #[test]
    fn test_list_methods_mutate_in_place() {
        let list = Value::list(vec![Value::Int(3), Value::Int(1)]);
        call(&list, "append", vec![Value::Int(2)]).unwrap();
        call(&list, "sort", vec![]).unwrap();
        assert_eq!(repr(&list), "[1, 2, 3]");
        assert_eq!(call_repr(&list, "pop", vec![]), "3");
        call(&list, "insert", vec![Value::Int(0), Value::Int(9)]).unwrap();
        assert_eq!(repr(&list), "[9, 1, 2]");

        let err = call(&Value::list(Vec::new()), "pop", vec![]).unwrap_err();
        assert_eq!(err.to_string(), "IndexError: pop from empty list");
    }

    #[test]
    fn test_dict_methods() {
        let mut dict = Dict::new();
        dict.insert(Value::from("a"), Value::Int(1)).unwrap();
        let dict = Value::dict(dict);
        assert_eq!(call_repr(&dict, "get", vec![Value::from("b"), Value::Int(0)]), "0");
        assert_eq!(call_repr(&dict, "setdefault", vec![Value::from("b"), Value::Int(2)]), "2");
        assert_eq!(call_repr(&dict, "items", vec![]), "[('a', 1), ('b', 2)]");
        let err = call(&dict, "pop", vec![Value::from("z")]).unwrap_err();
        assert_eq!(err.to_string(), "KeyError: 'z'");
    }

    #[test]
    fn test_numeric_methods() {
        assert_eq!(call_repr(&Value::Int(255), "bit_length", vec![]), "8");
        assert_eq!(call_repr(&Value::Float(2.0), "is_integer", vec![]), "True");
    }
}
