//! Built-in function implementations
//!
//! This module provides the functions and types every snippet can name
//! without importing anything. They are resolved after globals, so a snippet
//! may shadow them freely.
//!
//! # Supported Built-ins
//!
//! - Output: `print(*values, sep=' ', end='\n', flush=False)`
//! - Introspection: `len`, `repr`, `type`, `isinstance`, `callable`, `format`
//! - Numbers: `abs`, `round`, `divmod`, `pow`, `min`, `max`, `sum`, `hex`, `bin`, `oct`
//! - Text: `chr`, `ord`
//! - Iteration: `sorted`, `reversed`, `enumerate`, `zip`, `map`, `filter`, `any`, `all`
//! - Types: `bool`, `int`, `float`, `str`, `list`, `tuple`, `dict`, `range`
//! - Every built-in exception class
//!
//! # Implementation Notes
//!
//! - `print` writes through [`crate::output::write`], so its text lands in
//!   the invocation's output buffer
//! - `reversed`, `enumerate`, `zip`, `map` and `filter` produce lists
//! - Sorting is a stable merge sort driven by the snippet-level `<`, so an
//!   inconsistent ordering raises `TypeError` instead of misbehaving
//! - All built-ins are implemented as methods on the [`Interpreter`] struct

use crate::interpreter::constants::MAX_STRING_LEN;
use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::{Exception, ExceptionKind, Interrupt};
use crate::interpreter::loops::{iterate, ValueIter};
use crate::interpreter::ops::{binary, compare};
use crate::parser::ast::BinOp;
use crate::runtime::format::{format_value, repr, to_str};
use crate::runtime::value::{Builtin, Dict, Range, TypeName, Value};

/// Names of built-in functions
const FUNCTIONS: &[&str] = &[
    "abs", "all", "any", "bin", "callable", "chr", "divmod", "enumerate", "filter", "format",
    "hex", "isinstance", "len", "map", "max", "min", "oct", "ord", "pow", "print", "repr",
    "reversed", "round", "sorted", "sum", "zip",
];

/// Resolve a built-in name
pub(crate) fn lookup(name: &str) -> Option<Value> {
    if let Some(function) = FUNCTIONS.iter().copied().find(|function| *function == name) {
        return Some(Value::Builtin(Builtin::global(function)));
    }
    if let Some(type_name) = type_by_name(name) {
        return Some(Value::Type(type_name));
    }
    ExceptionKind::from_name(name).map(Value::ExceptionClass)
}

fn type_by_name(name: &str) -> Option<TypeName> {
    let type_name = match name {
        "bool" => TypeName::Bool,
        "int" => TypeName::Int,
        "float" => TypeName::Float,
        "str" => TypeName::Str,
        "list" => TypeName::List,
        "tuple" => TypeName::Tuple,
        "dict" => TypeName::Dict,
        "range" => TypeName::Range,
        "type" => TypeName::Type,
        _ => return None,
    };
    Some(type_name)
}

pub(crate) fn type_error(message: impl Into<String>) -> Exception {
    Exception::new(ExceptionKind::TypeError, message)
}

pub(crate) fn value_error(message: impl Into<String>) -> Exception {
    Exception::new(ExceptionKind::ValueError, message)
}

/// Check a positional argument count
pub(crate) fn arity(name: &str, args: &[Value], min: usize, max: usize) -> Result<(), Exception> {
    let given = args.len();
    if (min..=max).contains(&given) {
        return Ok(());
    }
    let message = if min == 1 && max == 1 {
        format!("{}() takes exactly one argument ({} given)", name, given)
    } else if min == max {
        format!("{}() takes exactly {} arguments ({} given)", name, min, given)
    } else if given < min {
        format!(
            "{} expected at least {} argument{}, got {}",
            name,
            min,
            if min == 1 { "" } else { "s" },
            given
        )
    } else {
        format!(
            "{} expected at most {} argument{}, got {}",
            name,
            max,
            if max == 1 { "" } else { "s" },
            given
        )
    };
    Err(type_error(message))
}

/// Remove a keyword argument by name
pub(crate) fn take_kwarg(kwargs: &mut Vec<(String, Value)>, name: &str) -> Option<Value> {
    let position = kwargs.iter().position(|(key, _)| key == name)?;
    Some(kwargs.remove(position).1)
}

/// Fail on any keyword argument left over
pub(crate) fn no_kwargs(name: &str, kwargs: &[(String, Value)]) -> Result<(), Exception> {
    match kwargs.first() {
        None => Ok(()),
        Some((key, _)) => Err(type_error(format!(
            "'{}' is an invalid keyword argument for {}()",
            key, name
        ))),
    }
}

/// An integer argument, accepting bools
pub(crate) fn int_arg(value: &Value) -> Result<i64, Exception> {
    value.as_int().ok_or_else(|| {
        type_error(format!(
            "'{}' object cannot be interpreted as an integer",
            value.type_name()
        ))
    })
}

/// A text argument
pub(crate) fn str_arg<'a>(name: &str, value: &'a Value) -> Result<&'a str, Exception> {
    value.as_str().ok_or_else(|| {
        type_error(format!(
            "{}() argument must be str, not {}",
            name,
            value.type_name()
        ))
    })
}

/// Parse an integer literal the way `int(text, base)` does
fn parse_int(text: &str, base: u32) -> Option<i64> {
    let trimmed = text.trim();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let (base, digits) = match base {
        0 | 16 if digits.len() > 2 && digits[..2].eq_ignore_ascii_case("0x") => (16, &digits[2..]),
        0 | 8 if digits.len() > 2 && digits[..2].eq_ignore_ascii_case("0o") => (8, &digits[2..]),
        0 | 2 if digits.len() > 2 && digits[..2].eq_ignore_ascii_case("0b") => (2, &digits[2..]),
        0 => (10, digits),
        other => (other, digits),
    };

    if digits.is_empty() || digits.starts_with('_') || digits.ends_with('_') || digits.contains("__") {
        return None;
    }
    let cleaned: String = digits.chars().filter(|&c| c != '_').collect();
    let magnitude = i128::from_str_radix(&cleaned, base).ok()?;
    let value = if negative { -magnitude } else { magnitude };
    i64::try_from(value).ok()
}

/// Parse a float literal the way `float(text)` does
fn parse_float(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    let lowered = trimmed.to_ascii_lowercase();
    let unsigned = lowered.trim_start_matches(['+', '-']);
    if matches!(unsigned, "inf" | "infinity" | "nan") {
        let magnitude = if unsigned == "nan" { f64::NAN } else { f64::INFINITY };
        return Some(if lowered.starts_with('-') { -magnitude } else { magnitude });
    }
    if trimmed.is_empty() || trimmed.contains("__") || trimmed.starts_with('_') || trimmed.ends_with('_') {
        return None;
    }
    let cleaned: String = trimmed.chars().filter(|&c| c != '_').collect();
    cleaned.parse::<f64>().ok()
}

/// `int(f)` for a float
pub(crate) fn float_to_int(f: f64) -> Result<i64, Exception> {
    if f.is_nan() {
        return Err(value_error("cannot convert float NaN to integer"));
    }
    if f.is_infinite() {
        return Err(Exception::new(
            ExceptionKind::OverflowError,
            "cannot convert float infinity to integer",
        ));
    }
    let truncated = f.trunc();
    if truncated < i64::MIN as f64 || truncated >= i64::MAX as f64 {
        return Err(Exception::new(ExceptionKind::OverflowError, "integer overflow"));
    }
    Ok(truncated as i64)
}

/// Round an int to a multiple of `10^-ndigits` (ndigits < 0), ties to even
fn round_int(n: i64, ndigits: i64) -> Result<i64, Exception> {
    if ndigits >= 0 {
        return Ok(n);
    }
    let Some(unit) = u32::try_from(-ndigits).ok().and_then(|exp| 10_i128.checked_pow(exp)) else {
        return Ok(0);
    };
    let n = i128::from(n);
    let quotient = n.div_euclid(unit);
    let remainder = n.rem_euclid(unit);
    let rounded = match (remainder * 2).cmp(&unit) {
        std::cmp::Ordering::Less => quotient,
        std::cmp::Ordering::Greater => quotient + 1,
        std::cmp::Ordering::Equal if quotient % 2 == 0 => quotient,
        std::cmp::Ordering::Equal => quotient + 1,
    };
    i64::try_from(rounded * unit)
        .map_err(|_| Exception::new(ExceptionKind::OverflowError, "integer overflow"))
}

/// Round a float to `ndigits` decimal places
fn round_float(f: f64, ndigits: i64) -> f64 {
    if !f.is_finite() {
        return f;
    }
    if ndigits >= 0 {
        if ndigits > 300 {
            return f;
        }
        // Decimal formatting rounds the exact binary value correctly
        return format!("{:.*}", ndigits as usize, f).parse().unwrap_or(f);
    }
    let scale = 10_f64.powi((-ndigits).min(400) as i32);
    if !scale.is_finite() {
        return 0.0_f64.copysign(f);
    }
    (f / scale).round_ties_even() * scale
}

/// `hex`/`oct`/`bin` text with its prefix
fn radix_text(n: i64, prefix: &str, radix: u32) -> String {
    let magnitude = n.unsigned_abs();
    let digits = match radix {
        16 => format!("{:x}", magnitude),
        8 => format!("{:o}", magnitude),
        _ => format!("{:b}", magnitude),
    };
    let sign = if n < 0 { "-" } else { "" };
    format!("{}{}{}", sign, prefix, digits)
}

impl Interpreter {
    /// Call a native function
    pub(crate) fn call_builtin(
        &mut self,
        builtin: Builtin,
        args: Vec<Value>,
        mut kwargs: Vec<(String, Value)>,
    ) -> Result<Value, Interrupt> {
        if let Some(module) = builtin.module {
            return self.call_module_function(module, builtin.name, args, kwargs);
        }

        let name = builtin.name;
        match name {
            "print" => {
                let sep = take_kwarg(&mut kwargs, "sep");
                let end = take_kwarg(&mut kwargs, "end");
                take_kwarg(&mut kwargs, "flush");
                no_kwargs(name, &kwargs)?;
                self.builtin_print(&args, sep, end)
            }
            "min" | "max" => {
                let key = take_kwarg(&mut kwargs, "key");
                let default = take_kwarg(&mut kwargs, "default");
                no_kwargs(name, &kwargs)?;
                self.builtin_min_max(name, args, key, default)
            }
            "sorted" => {
                let key = take_kwarg(&mut kwargs, "key");
                let reverse = take_kwarg(&mut kwargs, "reverse").is_some_and(|r| r.is_truthy());
                no_kwargs(name, &kwargs)?;
                arity(name, &args, 1, 1)?;
                let items = self.collect_values(&args[0])?;
                Ok(Value::list(self.sort_values(items, key.as_ref(), reverse)?))
            }
            "sum" => {
                let start = take_kwarg(&mut kwargs, "start");
                no_kwargs(name, &kwargs)?;
                arity(name, &args, 1, 2)?;
                let start = args.get(1).cloned().or(start).unwrap_or(Value::Int(0));
                self.builtin_sum(&args[0], start)
            }
            "enumerate" => {
                let start = take_kwarg(&mut kwargs, "start");
                no_kwargs(name, &kwargs)?;
                arity(name, &args, 1, 2)?;
                let start = match args.get(1).or(start.as_ref()) {
                    Some(start) => int_arg(start)?,
                    None => 0,
                };
                let items = self.collect_values(&args[0])?;
                let mut pairs = Vec::with_capacity(items.len());
                for (offset, item) in items.into_iter().enumerate() {
                    let index = start.checked_add(offset as i64).ok_or_else(|| {
                        Exception::new(ExceptionKind::OverflowError, "integer overflow")
                    })?;
                    pairs.push(Value::tuple(vec![Value::Int(index), item]));
                }
                Ok(Value::list(pairs))
            }
            "round" => {
                let ndigits = take_kwarg(&mut kwargs, "ndigits");
                no_kwargs(name, &kwargs)?;
                arity(name, &args, 1, 2)?;
                let ndigits = args.get(1).cloned().or(ndigits).filter(|n| !n.is_none());
                Ok(builtin_round(&args[0], ndigits.as_ref())?)
            }
            "format" => {
                no_kwargs(name, &kwargs)?;
                arity(name, &args, 1, 2)?;
                let spec = match args.get(1) {
                    Some(spec) => str_arg(name, spec)?,
                    None => "",
                };
                Ok(Value::from(format_value(&args[0], spec)?))
            }
            "map" => {
                no_kwargs(name, &kwargs)?;
                self.builtin_map(args)
            }
            "filter" => {
                no_kwargs(name, &kwargs)?;
                arity(name, &args, 2, 2)?;
                self.builtin_filter(&args[0], &args[1])
            }
            "zip" => {
                take_kwarg(&mut kwargs, "strict");
                no_kwargs(name, &kwargs)?;
                self.builtin_zip(&args)
            }
            "any" | "all" => {
                no_kwargs(name, &kwargs)?;
                arity(name, &args, 1, 1)?;
                let want = name == "any";
                for (count, item) in iterate(&args[0])?.enumerate() {
                    if count % 65_536 == 0 {
                        self.checkpoint()?;
                    }
                    if item.is_truthy() == want {
                        return Ok(Value::Bool(want));
                    }
                }
                Ok(Value::Bool(!want))
            }
            _ => {
                no_kwargs(name, &kwargs)?;
                Ok(self.call_simple_builtin(name, &args)?)
            }
        }
    }

    /// Built-ins that take positional arguments only and never call back into snippets
    fn call_simple_builtin(&mut self, name: &str, args: &[Value]) -> Result<Value, Interrupt> {
        match name {
            "len" => {
                arity(name, args, 1, 1)?;
                let len = match &args[0] {
                    Value::Str(s) => s.chars().count(),
                    Value::List(items) => items.borrow().len(),
                    Value::Tuple(items) => items.len(),
                    Value::Dict(dict) => dict.borrow().len(),
                    Value::Range(range) => range.len(),
                    other => {
                        return Err(type_error(format!(
                            "object of type '{}' has no len()",
                            other.type_name()
                        ))
                        .into());
                    }
                };
                Ok(Value::Int(i64::try_from(len).unwrap_or(i64::MAX)))
            }
            "repr" => {
                arity(name, args, 1, 1)?;
                Ok(Value::from(repr(&args[0])))
            }
            "abs" => {
                arity(name, args, 1, 1)?;
                match &args[0] {
                    Value::Float(f) => Ok(Value::Float(f.abs())),
                    value => {
                        let n = value.as_int().ok_or_else(|| {
                            type_error(format!(
                                "bad operand type for abs(): '{}'",
                                value.type_name()
                            ))
                        })?;
                        n.checked_abs().map(Value::Int).ok_or_else(|| {
                            Exception::new(ExceptionKind::OverflowError, "integer overflow").into()
                        })
                    }
                }
            }
            "callable" => {
                arity(name, args, 1, 1)?;
                Ok(Value::Bool(matches!(
                    args[0],
                    Value::Function(_)
                        | Value::Builtin(_)
                        | Value::BoundMethod(_)
                        | Value::Type(_)
                        | Value::ExceptionClass(_)
                )))
            }
            "isinstance" => {
                arity(name, args, 2, 2)?;
                Ok(Value::Bool(is_instance(&args[0], &args[1])?))
            }
            "divmod" => {
                arity(name, args, 2, 2)?;
                let quotient = binary::binary_op(BinOp::FloorDiv, &args[0], &args[1])?;
                let remainder = binary::binary_op(BinOp::Mod, &args[0], &args[1])?;
                Ok(Value::tuple(vec![quotient, remainder]))
            }
            "pow" => {
                arity(name, args, 2, 3)?;
                match args.get(2) {
                    None | Some(Value::None) => Ok(binary::binary_op(BinOp::Pow, &args[0], &args[1])?),
                    Some(modulus) => Ok(modular_pow(&args[0], &args[1], modulus)?),
                }
            }
            "chr" => {
                arity(name, args, 1, 1)?;
                let code = int_arg(&args[0])?;
                u32::try_from(code)
                    .ok()
                    .and_then(char::from_u32)
                    .map(|ch| Value::from(ch.to_string()))
                    .ok_or_else(|| value_error("chr() arg not in range(0x110000)").into())
            }
            "ord" => {
                arity(name, args, 1, 1)?;
                let text = args[0].as_str().ok_or_else(|| {
                    type_error(format!(
                        "ord() expected string of length 1, but {} found",
                        args[0].type_name()
                    ))
                })?;
                let mut chars = text.chars();
                match (chars.next(), chars.next()) {
                    (Some(ch), None) => Ok(Value::Int(i64::from(u32::from(ch)))),
                    _ => Err(type_error(format!(
                        "ord() expected a character, but string of length {} found",
                        text.chars().count()
                    ))
                    .into()),
                }
            }
            "hex" | "oct" | "bin" => {
                arity(name, args, 1, 1)?;
                let n = int_arg(&args[0])?;
                let text = match name {
                    "hex" => radix_text(n, "0x", 16),
                    "oct" => radix_text(n, "0o", 8),
                    _ => radix_text(n, "0b", 2),
                };
                Ok(Value::from(text))
            }
            "reversed" => {
                arity(name, args, 1, 1)?;
                let mut items = match &args[0] {
                    Value::List(_) | Value::Tuple(_) | Value::Str(_) | Value::Range(_) | Value::Dict(_) => {
                        self.collect_values(&args[0])?
                    }
                    other => {
                        return Err(type_error(format!(
                            "'{}' object is not reversible",
                            other.type_name()
                        ))
                        .into());
                    }
                };
                items.reverse();
                Ok(Value::list(items))
            }
            other => Err(Exception::new(
                ExceptionKind::NameError,
                format!("name '{}' is not defined", other),
            )
            .into()),
        }
    }

    fn builtin_print(&mut self, args: &[Value], sep: Option<Value>, end: Option<Value>) -> Result<Value, Interrupt> {
        let separator = |value: Option<Value>, default: &str, which: &str| -> Result<String, Exception> {
            match value {
                None | Some(Value::None) => Ok(default.to_string()),
                Some(Value::Str(s)) => Ok(s.to_string()),
                Some(other) => Err(type_error(format!(
                    "{} must be None or a string, not {}",
                    which,
                    other.type_name()
                ))),
            }
        };
        let sep = separator(sep, " ", "sep")?;
        let end = separator(end, "\n", "end")?;

        let mut line = String::new();
        for (index, value) in args.iter().enumerate() {
            if index > 0 {
                line.push_str(&sep);
            }
            line.push_str(&to_str(value));
            if line.len() > MAX_STRING_LEN {
                return Err(Exception::with_args(ExceptionKind::MemoryError, Vec::new()).into());
            }
        }
        line.push_str(&end);
        crate::output::write(&line);
        Ok(Value::None)
    }

    fn builtin_min_max(
        &mut self,
        name: &str,
        args: Vec<Value>,
        key: Option<Value>,
        default: Option<Value>,
    ) -> Result<Value, Interrupt> {
        let items = match args.len() {
            0 => {
                return Err(type_error(format!("{} expected at least 1 argument, got 0", name)).into());
            }
            1 => iterate(&args[0])?,
            _ => {
                if default.is_some() {
                    return Err(type_error(format!(
                        "Cannot specify a default for {}() with multiple positional arguments",
                        name
                    ))
                    .into());
                }
                ValueIter::Items(args.into_iter())
            }
        };

        let key = key.filter(|key| !key.is_none());
        let mut best: Option<(Value, Value)> = None;
        for (count, item) in items.enumerate() {
            if count % 65_536 == 0 {
                self.checkpoint()?;
            }
            let item_key = match &key {
                Some(key) => self.call_value(key, vec![item.clone()], Vec::new())?,
                None => item.clone(),
            };
            let replace = match &best {
                None => true,
                Some((best_key, _)) if name == "min" => compare::less_than(&item_key, best_key)?,
                Some((best_key, _)) => compare::less_than(best_key, &item_key)?,
            };
            if replace {
                best = Some((item_key, item));
            }
        }

        match (best, default) {
            (Some((_, item)), _) => Ok(item),
            (None, Some(default)) => Ok(default),
            (None, None) => Err(value_error(format!("{}() iterable argument is empty", name)).into()),
        }
    }

    fn builtin_sum(&mut self, iterable: &Value, start: Value) -> Result<Value, Interrupt> {
        if matches!(start, Value::Str(_)) {
            return Err(type_error("sum() can't sum strings [use ''.join(seq) instead]").into());
        }
        let mut total = start;
        for (count, item) in iterate(iterable)?.enumerate() {
            if count % 65_536 == 0 {
                self.checkpoint()?;
            }
            total = binary::binary_op(BinOp::Add, &total, &item)?;
        }
        Ok(total)
    }

    fn builtin_map(&mut self, args: Vec<Value>) -> Result<Value, Interrupt> {
        if args.len() < 2 {
            return Err(type_error("map() must have at least two arguments.").into());
        }
        let function = &args[0];
        let columns = self.zip_columns(&args[1..])?;
        let mut results = Vec::with_capacity(columns.len());
        for row in columns {
            results.push(self.call_value(function, row, Vec::new())?);
        }
        Ok(Value::list(results))
    }

    fn builtin_filter(&mut self, function: &Value, iterable: &Value) -> Result<Value, Interrupt> {
        let items = self.collect_values(iterable)?;
        let mut kept = Vec::new();
        for item in items {
            let keep = match function {
                Value::None => item.is_truthy(),
                function => self.call_value(function, vec![item.clone()], Vec::new())?.is_truthy(),
            };
            if keep {
                kept.push(item);
            }
        }
        Ok(Value::list(kept))
    }

    fn builtin_zip(&mut self, args: &[Value]) -> Result<Value, Interrupt> {
        let rows = self.zip_columns(args)?;
        Ok(Value::list(rows.into_iter().map(Value::tuple).collect()))
    }

    /// Rows of the shortest-length zip of several iterables
    fn zip_columns(&mut self, iterables: &[Value]) -> Result<Vec<Vec<Value>>, Interrupt> {
        let mut columns = Vec::with_capacity(iterables.len());
        for iterable in iterables {
            columns.push(self.collect_values(iterable)?.into_iter());
        }
        let len = columns.iter().map(|column| column.len()).min().unwrap_or(0);
        let mut rows = Vec::with_capacity(len);
        for _ in 0..len {
            rows.push(columns.iter_mut().filter_map(Iterator::next).collect());
        }
        Ok(rows)
    }

    /// Stable sort by the snippet-level `<`, with an optional key function
    pub(crate) fn sort_values(
        &mut self,
        items: Vec<Value>,
        key: Option<&Value>,
        reverse: bool,
    ) -> Result<Vec<Value>, Interrupt> {
        let mut entries = Vec::with_capacity(items.len());
        for item in items {
            let sort_key = match key {
                Some(key) if !key.is_none() => self.call_value(key, vec![item.clone()], Vec::new())?,
                _ => item.clone(),
            };
            entries.push((sort_key, item));
        }
        let sorted = self.merge_sort(entries, reverse)?;
        Ok(sorted.into_iter().map(|(_, item)| item).collect())
    }

    fn merge_sort(&self, mut entries: Vec<(Value, Value)>, reverse: bool) -> Result<Vec<(Value, Value)>, Interrupt> {
        if entries.len() <= 1 {
            return Ok(entries);
        }
        let right = entries.split_off(entries.len() / 2);
        let mut left = self.merge_sort(entries, reverse)?;
        let mut right = self.merge_sort(right, reverse)?;
        self.checkpoint()?;

        let mut merged = Vec::with_capacity(left.len() + right.len());
        let (mut i, mut j) = (0, 0);
        while i < left.len() && j < right.len() {
            // Equal keys keep their original order in both directions
            let take_right = if reverse {
                compare::less_than(&left[i].0, &right[j].0)?
            } else {
                compare::less_than(&right[j].0, &left[i].0)?
            };
            if take_right {
                merged.push(std::mem::take(&mut right[j]));
                j += 1;
            } else {
                merged.push(std::mem::take(&mut left[i]));
                i += 1;
            }
        }
        merged.extend(left.drain(i..));
        merged.extend(right.drain(j..));
        Ok(merged)
    }

    /// Call a type object: `int("3")`, `list(range(3))`, `type(x)`
    pub(crate) fn construct(
        &mut self,
        type_name: TypeName,
        args: Vec<Value>,
        mut kwargs: Vec<(String, Value)>,
    ) -> Result<Value, Interrupt> {
        let name = type_name.name();
        match type_name {
            TypeName::Int => {
                let base = take_kwarg(&mut kwargs, "base");
                no_kwargs(name, &kwargs)?;
                arity(name, &args, 0, 2)?;
                let base = args.get(1).cloned().or(base);
                Ok(construct_int(args.first(), base.as_ref())?)
            }
            TypeName::Dict => {
                arity(name, &args, 0, 1)?;
                let mut dict = Dict::new();
                if let Some(source) = args.first() {
                    self.fill_dict(&mut dict, source)?;
                }
                for (key, value) in kwargs {
                    dict.insert(Value::from(key), value)?;
                }
                Ok(Value::dict(dict))
            }
            _ => {
                no_kwargs(name, &kwargs)?;
                self.construct_positional(type_name, &args)
            }
        }
    }

    fn construct_positional(&mut self, type_name: TypeName, args: &[Value]) -> Result<Value, Interrupt> {
        let name = type_name.name();
        match type_name {
            TypeName::Bool => {
                arity(name, args, 0, 1)?;
                Ok(Value::Bool(args.first().is_some_and(Value::is_truthy)))
            }
            TypeName::Float => {
                arity(name, args, 0, 1)?;
                let value = match args.first() {
                    None => 0.0,
                    Some(Value::Str(s)) => parse_float(s).ok_or_else(|| {
                        value_error(format!("could not convert string to float: {}", repr(&args[0])))
                    })?,
                    Some(other) => other.as_float().ok_or_else(|| {
                        type_error(format!(
                            "float() argument must be a string or a real number, not '{}'",
                            other.type_name()
                        ))
                    })?,
                };
                Ok(Value::Float(value))
            }
            TypeName::Str => {
                arity(name, args, 0, 1)?;
                Ok(Value::from(args.first().map(to_str).unwrap_or_default()))
            }
            TypeName::List => {
                arity(name, args, 0, 1)?;
                let items = match args.first() {
                    Some(iterable) => self.collect_values(iterable)?,
                    None => Vec::new(),
                };
                Ok(Value::list(items))
            }
            TypeName::Tuple => {
                arity(name, args, 0, 1)?;
                match args.first() {
                    Some(Value::Tuple(items)) => Ok(Value::Tuple(items.clone())),
                    Some(iterable) => Ok(Value::tuple(self.collect_values(iterable)?)),
                    None => Ok(Value::tuple(Vec::new())),
                }
            }
            TypeName::Range => {
                arity(name, args, 1, 3)?;
                let ints = args.iter().map(int_arg).collect::<Result<Vec<_>, _>>()?;
                let (start, stop, step) = match ints.as_slice() {
                    [stop] => (0, *stop, 1),
                    [start, stop] => (*start, *stop, 1),
                    [start, stop, step, ..] => (*start, *stop, *step),
                    [] => (0, 0, 1),
                };
                if step == 0 {
                    return Err(value_error("range() arg 3 must not be zero").into());
                }
                Ok(Value::Range(Range { start, stop, step }))
            }
            TypeName::Type => {
                if args.len() != 1 {
                    return Err(type_error("type() takes 1 argument").into());
                }
                Ok(match &args[0] {
                    Value::Exception(exception) => Value::ExceptionClass(exception.kind),
                    other => Value::Type(other.type_tag()),
                })
            }
            TypeName::NoneType => {
                arity(name, args, 0, 0)?;
                Ok(Value::None)
            }
            other => Err(type_error(format!("cannot create '{}' instances", other.name())).into()),
        }
    }

    /// `dict(mapping)` or `dict(iterable_of_pairs)`
    fn fill_dict(&mut self, dict: &mut Dict, source: &Value) -> Result<(), Interrupt> {
        if let Value::Dict(other) = source {
            let items = other.borrow().items();
            for (key, value) in items {
                dict.insert(key, value)?;
            }
            return Ok(());
        }

        for (index, pair) in self.collect_values(source)?.into_iter().enumerate() {
            let parts = iterate(&pair)
                .map_err(|_| {
                    type_error(format!(
                        "cannot convert dictionary update sequence element #{} to a sequence",
                        index
                    ))
                })?
                .collect::<Vec<_>>();
            let [key, value]: [Value; 2] = parts.try_into().map_err(|parts: Vec<Value>| {
                value_error(format!(
                    "dictionary update sequence element #{} has length {}; 2 is required",
                    index,
                    parts.len()
                ))
            })?;
            dict.insert(key, value)?;
        }
        Ok(())
    }
}

fn construct_int(value: Option<&Value>, base: Option<&Value>) -> Result<Value, Exception> {
    let Some(value) = value else {
        return Ok(Value::Int(0));
    };

    if let Some(base) = base {
        let base = int_arg(base)?;
        if base != 0 && !(2..=36).contains(&base) {
            return Err(value_error("int() base must be >= 2 and <= 36, or 0"));
        }
        let text = value
            .as_str()
            .ok_or_else(|| type_error("int() can't convert non-string with explicit base"))?;
        return parse_int(text, base as u32).map(Value::Int).ok_or_else(|| {
            value_error(format!(
                "invalid literal for int() with base {}: {}",
                base,
                repr(value)
            ))
        });
    }

    match value {
        Value::Int(n) => Ok(Value::Int(*n)),
        Value::Bool(b) => Ok(Value::Int(i64::from(*b))),
        Value::Float(f) => float_to_int(*f).map(Value::Int),
        Value::Str(s) => parse_int(s, 10).map(Value::Int).ok_or_else(|| {
            value_error(format!(
                "invalid literal for int() with base 10: {}",
                repr(value)
            ))
        }),
        other => Err(type_error(format!(
            "int() argument must be a string, a bytes-like object or a real number, not '{}'",
            other.type_name()
        ))),
    }
}

fn builtin_round(value: &Value, ndigits: Option<&Value>) -> Result<Value, Exception> {
    match (value, ndigits) {
        (Value::Float(f), None) => float_to_int(f.round_ties_even()).map(Value::Int),
        (Value::Float(f), Some(ndigits)) => Ok(Value::Float(round_float(*f, int_arg(ndigits)?))),
        (Value::Int(_) | Value::Bool(_), None) => Ok(Value::Int(int_arg(value)?)),
        (Value::Int(_) | Value::Bool(_), Some(ndigits)) => {
            round_int(int_arg(value)?, int_arg(ndigits)?).map(Value::Int)
        }
        (other, _) => Err(type_error(format!(
            "type {} doesn't define __round__ method",
            other.type_name()
        ))),
    }
}

/// `pow(base, exp, mod)` on integers
fn modular_pow(base: &Value, exponent: &Value, modulus: &Value) -> Result<Value, Exception> {
    let (Some(base), Some(exponent), Some(modulus)) = (base.as_int(), exponent.as_int(), modulus.as_int()) else {
        return Err(type_error(
            "pow() 3rd argument not allowed unless all arguments are integers",
        ));
    };
    if modulus == 0 {
        return Err(value_error("pow() 3rd argument cannot be 0"));
    }
    if exponent < 0 {
        return Err(value_error("base is not invertible for the given modulus"));
    }

    let modulus = i128::from(modulus);
    let mut result: i128 = 1;
    let mut base = i128::from(base).rem_euclid(modulus);
    let mut exponent = exponent;
    while exponent > 0 {
        if exponent & 1 == 1 {
            result = (result * base).rem_euclid(modulus);
        }
        base = (base * base).rem_euclid(modulus);
        exponent >>= 1;
    }
    // Result takes the sign of the modulus
    if modulus < 0 && result > 0 {
        result += modulus;
    }
    Ok(Value::Int(result as i64))
}

/// `isinstance(value, class_or_tuple)`
fn is_instance(value: &Value, class: &Value) -> Result<bool, Exception> {
    match class {
        Value::Type(TypeName::Int) => Ok(matches!(value, Value::Int(_) | Value::Bool(_))),
        Value::Type(TypeName::Type) => Ok(matches!(value, Value::Type(_) | Value::ExceptionClass(_))),
        Value::Type(type_name) => Ok(!matches!(value, Value::Exception(_)) && value.type_tag() == *type_name),
        Value::ExceptionClass(kind) => Ok(matches!(value, Value::Exception(e) if e.kind.is_subclass_of(*kind))),
        Value::Tuple(classes) => {
            for class in classes.iter() {
                if is_instance(value, class)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        _ => Err(type_error(
            "isinstance() arg 2 must be a type, a tuple of types, or a union",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deadline::CancelToken;

    fn call(name: &'static str, args: Vec<Value>) -> Result<Value, Interrupt> {
        let mut interpreter = Interpreter::new(CancelToken::new());
        interpreter.call_builtin(Builtin::global(name), args, Vec::new())
    }

    fn exception(result: Result<Value, Interrupt>) -> Exception {
        match result {
            Err(Interrupt::Raise(exception)) => *exception,
            other => panic!("expected an exception, got {:?}", other),
        }
    }

    #[test]
    fn test_lookup() {
        assert!(matches!(lookup("len"), Some(Value::Builtin(_))));
        assert!(matches!(lookup("int"), Some(Value::Type(TypeName::Int))));
        assert!(matches!(
            lookup("ValueError"),
            Some(Value::ExceptionClass(ExceptionKind::ValueError))
        ));
        assert!(lookup("open").is_none());
    }

    #[test]
    fn test_parse_int() {
        assert_eq!(parse_int(" 42 ", 10), Some(42));
        assert_eq!(parse_int("-1_000", 10), Some(-1000));
        assert_eq!(parse_int("ff", 16), Some(255));
        assert_eq!(parse_int("0x1f", 0), Some(31));
        assert_eq!(parse_int("1__0", 10), None);
        assert_eq!(parse_int("abc", 10), None);
        assert_eq!(parse_int("", 10), None);
    }

    #[test]
    fn test_parse_float() {
        assert_eq!(parse_float("2.5"), Some(2.5));
        assert_eq!(parse_float(" -1e3 "), Some(-1000.0));
        assert_eq!(parse_float("-inf"), Some(f64::NEG_INFINITY));
        assert!(parse_float("nan").is_some_and(f64::is_nan));
        assert_eq!(parse_float("abc"), None);
    }

    #[test]
    fn test_int_conversion_errors() {
        let err = construct_int(Some(&Value::from("abc")), None).unwrap_err();
        assert_eq!(err.summary(), "ValueError: invalid literal for int() with base 10: 'abc'");
        let err = construct_int(Some(&Value::Float(f64::INFINITY)), None).unwrap_err();
        assert_eq!(err.kind, ExceptionKind::OverflowError);
    }

    #[test]
    fn test_round_ties_to_even() {
        assert!(matches!(builtin_round(&Value::Float(2.5), None), Ok(Value::Int(2))));
        assert!(matches!(builtin_round(&Value::Float(3.5), None), Ok(Value::Int(4))));
        assert!(matches!(
            builtin_round(&Value::Int(1250), Some(&Value::Int(-2))),
            Ok(Value::Int(1200))
        ));
        match builtin_round(&Value::Float(3.14159), Some(&Value::Int(2))) {
            Ok(Value::Float(f)) => assert_eq!(f, 3.14),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_modular_pow() {
        assert!(matches!(
            modular_pow(&Value::Int(3), &Value::Int(4), &Value::Int(5)),
            Ok(Value::Int(1))
        ));
        assert!(modular_pow(&Value::Int(3), &Value::Int(4), &Value::Int(0)).is_err());
    }

    #[test]
    fn test_isinstance() {
        assert!(is_instance(&Value::Bool(true), &Value::Type(TypeName::Int)).unwrap());
        assert!(!is_instance(&Value::Int(1), &Value::Type(TypeName::Float)).unwrap());
        let types = Value::tuple(vec![Value::Type(TypeName::Float), Value::Type(TypeName::Str)]);
        assert!(is_instance(&Value::from("x"), &types).unwrap());
        assert!(is_instance(&Value::Int(1), &Value::Int(1)).is_err());
    }

    #[test]
    fn test_len_and_errors() {
        assert!(matches!(call("len", vec![Value::from("héllo")]), Ok(Value::Int(5))));
        let err = exception(call("len", vec![Value::Int(3)]));
        assert_eq!(err.summary(), "TypeError: object of type 'int' has no len()");
        let err = exception(call("len", vec![]));
        assert_eq!(err.summary(), "TypeError: len() takes exactly one argument (0 given)");
    }

    #[test]
    fn test_sorting_is_stable_and_checked() {
        let mut interpreter = Interpreter::new(CancelToken::new());
        let items = vec![
            Value::tuple(vec![Value::Int(1), Value::from("b")]),
            Value::tuple(vec![Value::Int(0), Value::from("a")]),
            Value::tuple(vec![Value::Int(1), Value::from("a")]),
        ];
        let sorted = interpreter.sort_values(items, None, false).unwrap();
        assert_eq!(repr(&Value::list(sorted)), "[(0, 'a'), (1, 'a'), (1, 'b')]");

        let mixed = vec![Value::Int(1), Value::from("a")];
        assert!(interpreter.sort_values(mixed, None, false).is_err());
    }

    #[test]
    fn test_min_max_and_sum() {
        let list = Value::list(vec![Value::Int(3), Value::Int(1), Value::Int(2)]);
        assert!(matches!(call("min", vec![list.clone()]), Ok(Value::Int(1))));
        assert!(matches!(call("max", vec![list.clone()]), Ok(Value::Int(3))));
        assert!(matches!(call("sum", vec![list]), Ok(Value::Int(6))));
        let err = exception(call("max", vec![Value::list(Vec::new())]));
        assert_eq!(err.summary(), "ValueError: max() iterable argument is empty");
    }

    #[test]
    fn test_reductions_over_huge_ranges_do_not_materialize() {
        let huge = |start| {
            Value::Range(Range {
                start,
                stop: 1_000_000_000_000,
                step: 1,
            })
        };
        assert!(matches!(call("any", vec![huge(0)]), Ok(Value::Bool(true))));
        assert!(matches!(call("all", vec![huge(0)]), Ok(Value::Bool(false))));
        let countdown = Value::Range(Range {
            start: 10,
            stop: 0,
            step: -1,
        });
        assert!(matches!(call("min", vec![countdown.clone()]), Ok(Value::Int(1))));
        assert!(matches!(call("max", vec![countdown]), Ok(Value::Int(10))));

        // A fired deadline stops the scan instead of a MemoryError up front
        let token = CancelToken::new();
        token.cancel();
        let mut interpreter = Interpreter::new(token);
        for name in ["max", "min", "sum", "all"] {
            let result = interpreter.call_builtin(Builtin::global(name), vec![huge(1)], Vec::new());
            assert!(
                matches!(result, Err(Interrupt::Timeout { .. })),
                "{} returned {:?}",
                name,
                result
            );
        }
    }

    #[test]
    fn test_radix_text() {
        assert_eq!(radix_text(255, "0x", 16), "0xff");
        assert_eq!(radix_text(-8, "0o", 8), "-0o10");
        assert_eq!(radix_text(5, "0b", 2), "0b101");
    }
}
