//! Text rendering of values
//!
//! - [`repr`] / [`to_str`]: the two canonical renderings (`repr(x)` / `str(x)`)
//! - [`float_repr`]: shortest round-trip float text with the usual exponent rules
//! - [`format_value`]: the format-spec mini-language used by f-strings,
//!   `format()` and `str.format`
//! - [`format_template`]: `str.format` templates
//! - [`percent_format`]: printf-style `%` formatting

use crate::interpreter::constants::MAX_REPR_DEPTH;
use crate::interpreter::errors::{Exception, ExceptionKind};
use crate::runtime::value::Value;
use std::fmt::Write;
use std::rc::Rc;

/// `repr(value)`
pub fn repr(value: &Value) -> String {
    let mut out = String::new();
    write_repr(value, &mut out, &mut Vec::new(), 0);
    out
}

/// `str(value)`
pub fn to_str(value: &Value) -> String {
    match value {
        Value::Str(s) => s.to_string(),
        Value::Exception(exception) => exception.message(),
        other => repr(other),
    }
}

fn write_repr(value: &Value, out: &mut String, seen: &mut Vec<usize>, depth: usize) {
    if depth >= MAX_REPR_DEPTH {
        let elided = match value {
            Value::List(_) => Some("[...]"),
            Value::Tuple(_) => Some("(...)"),
            Value::Dict(_) => Some("{...}"),
            _ => None,
        };
        if let Some(elided) = elided {
            out.push_str(elided);
            return;
        }
    }
    match value {
        Value::None => out.push_str("None"),
        Value::Bool(true) => out.push_str("True"),
        Value::Bool(false) => out.push_str("False"),
        Value::Int(n) => {
            let _ = write!(out, "{}", n);
        }
        Value::Float(f) => out.push_str(&float_repr(*f)),
        Value::Str(s) => out.push_str(&quote_str(s)),
        Value::List(items) => {
            let id = Rc::as_ptr(items) as *const () as usize;
            if seen.contains(&id) {
                out.push_str("[...]");
                return;
            }
            seen.push(id);
            out.push('[');
            write_items(&items.borrow(), out, seen, depth + 1);
            out.push(']');
            seen.pop();
        }
        Value::Tuple(items) => {
            out.push('(');
            write_items(items, out, seen, depth + 1);
            if items.len() == 1 {
                out.push(',');
            }
            out.push(')');
        }
        Value::Dict(dict) => {
            let id = Rc::as_ptr(dict) as *const () as usize;
            if seen.contains(&id) {
                out.push_str("{...}");
                return;
            }
            seen.push(id);
            out.push('{');
            for (i, (key, value)) in dict.borrow().iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_repr(key, out, seen, depth + 1);
                out.push_str(": ");
                write_repr(value, out, seen, depth + 1);
            }
            out.push('}');
            seen.pop();
        }
        Value::Range(range) => {
            if range.step == 1 {
                let _ = write!(out, "range({}, {})", range.start, range.stop);
            } else {
                let _ = write!(out, "range({}, {}, {})", range.start, range.stop, range.step);
            }
        }
        Value::Function(function) => {
            let _ = write!(out, "<function {}>", function.def.name);
        }
        Value::Builtin(builtin) => {
            let _ = write!(out, "<built-in function {}>", builtin.name);
        }
        Value::BoundMethod(method) => {
            let _ = write!(
                out,
                "<built-in method {} of {} object>",
                method.name,
                method.receiver.type_name()
            );
        }
        Value::Module(name) => {
            let _ = write!(out, "<module '{}' (built-in)>", name);
        }
        Value::Type(type_name) => {
            let _ = write!(out, "<class '{}'>", type_name.name());
        }
        Value::ExceptionClass(kind) => {
            let _ = write!(out, "<class '{}'>", kind.name());
        }
        Value::Exception(exception) => out.push_str(&exception.repr()),
    }
}

fn write_items(items: &[Value], out: &mut String, seen: &mut Vec<usize>, depth: usize) {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        write_repr(item, out, seen, depth);
    }
}

/// Quote a string the way `repr` does: single quotes unless the text
/// contains a single quote and no double quote.
pub fn quote_str(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };

    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if (c as u32) < 0x20 || c as u32 == 0x7f => {
                let _ = write!(out, "\\x{:02x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

/// Shortest text that round-trips, switching to exponent notation outside
/// `1e-4 <= |f| < 1e16`
pub fn float_repr(f: f64) -> String {
    if f.is_nan() {
        return "nan".to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if f == 0.0 {
        return if f.is_sign_negative() { "-0.0" } else { "0.0" }.to_string();
    }

    let scientific = format!("{:e}", f);
    let (mantissa, exponent) = split_exponent(&scientific);

    if (-4..16).contains(&exponent) {
        let plain = format!("{}", f);
        if plain.contains('.') {
            plain
        } else {
            format!("{}.0", plain)
        }
    } else {
        format!("{}{}", mantissa, exponent_suffix(exponent))
    }
}

/// Split Rust's `1.5e-7` style output into mantissa and exponent
fn split_exponent(text: &str) -> (&str, i32) {
    match text.split_once('e') {
        Some((mantissa, exponent)) => (mantissa, exponent.parse().unwrap_or(0)),
        None => (text, 0),
    }
}

fn exponent_suffix(exponent: i32) -> String {
    let sign = if exponent < 0 { '-' } else { '+' };
    format!("e{}{:02}", sign, exponent.abs())
}

/// Parsed `[[fill]align][sign][#][0][width][,|_][.precision][type]`
#[derive(Debug, Clone, PartialEq)]
struct FormatSpec {
    fill: char,
    align: Option<char>,
    sign: char,
    alternate: bool,
    zero: bool,
    width: usize,
    grouping: Option<char>,
    precision: Option<usize>,
    kind: Option<char>,
}

impl Default for FormatSpec {
    fn default() -> Self {
        Self {
            fill: ' ',
            align: None,
            sign: '-',
            alternate: false,
            zero: false,
            width: 0,
            grouping: None,
            precision: None,
            kind: None,
        }
    }
}

fn parse_spec(spec: &str) -> Result<FormatSpec, Exception> {
    let chars: Vec<char> = spec.chars().collect();
    let mut parsed = FormatSpec::default();
    let mut i = 0;
    let is_align = |c: char| matches!(c, '<' | '>' | '^' | '=');

    if chars.len() >= 2 && is_align(chars[1]) {
        parsed.fill = chars[0];
        parsed.align = Some(chars[1]);
        i = 2;
    } else if chars.first().copied().is_some_and(is_align) {
        parsed.align = Some(chars[0]);
        i = 1;
    }

    if let Some(&c @ ('+' | '-' | ' ')) = chars.get(i) {
        parsed.sign = c;
        i += 1;
    }
    if chars.get(i) == Some(&'#') {
        parsed.alternate = true;
        i += 1;
    }
    if chars.get(i) == Some(&'0') {
        parsed.zero = true;
        i += 1;
    }

    let width_start = i;
    while chars.get(i).is_some_and(|c| c.is_ascii_digit()) {
        i += 1;
    }
    if i > width_start {
        let digits: String = chars[width_start..i].iter().collect();
        parsed.width = digits.parse().map_err(|_| value_error("Too many decimal digits in format string"))?;
    }

    if let Some(&c @ (',' | '_')) = chars.get(i) {
        parsed.grouping = Some(c);
        i += 1;
    }

    if chars.get(i) == Some(&'.') {
        i += 1;
        let precision_start = i;
        while chars.get(i).is_some_and(|c| c.is_ascii_digit()) {
            i += 1;
        }
        if i == precision_start {
            return Err(value_error("Format specifier missing precision"));
        }
        let digits: String = chars[precision_start..i].iter().collect();
        parsed.precision = Some(
            digits
                .parse()
                .map_err(|_| value_error("Too many decimal digits in format string"))?,
        );
    }

    if let Some(&c) = chars.get(i) {
        parsed.kind = Some(c);
        i += 1;
    }

    if i < chars.len() {
        return Err(value_error("Invalid format specifier"));
    }

    Ok(parsed)
}

fn value_error(message: impl Into<String>) -> Exception {
    Exception::new(ExceptionKind::ValueError, message)
}

fn unknown_code(kind: char, value: &Value) -> Exception {
    value_error(format!(
        "Unknown format code '{}' for object of type '{}'",
        kind,
        value.type_name()
    ))
}

/// `format(value, spec)`
pub fn format_value(value: &Value, spec: &str) -> Result<String, Exception> {
    if spec.is_empty() {
        return Ok(to_str(value));
    }
    let parsed = parse_spec(spec)?;

    match value {
        Value::Str(s) => format_str(s, &parsed, value),
        Value::Int(_) | Value::Bool(_) => {
            let n = value.as_int().unwrap_or_default();
            format_int(n, &parsed, value)
        }
        Value::Float(f) => format_float(*f, &parsed, value),
        other => Err(Exception::new(
            ExceptionKind::TypeError,
            format!(
                "unsupported format string passed to {}.__format__",
                other.type_name()
            ),
        )),
    }
}

fn format_str(s: &str, spec: &FormatSpec, value: &Value) -> Result<String, Exception> {
    if let Some(kind) = spec.kind.filter(|&k| k != 's') {
        return Err(unknown_code(kind, value));
    }
    if spec.sign != '-' {
        return Err(value_error("Sign not allowed in string format specifier"));
    }
    if spec.align == Some('=') {
        return Err(value_error(
            "'=' alignment not allowed in string format specifier",
        ));
    }
    let text: String = match spec.precision {
        Some(p) => s.chars().take(p).collect(),
        None => s.to_string(),
    };
    Ok(pad(&text, "", spec, '<'))
}

fn format_int(n: i64, spec: &FormatSpec, value: &Value) -> Result<String, Exception> {
    let (body, prefix) = match spec.kind {
        None | Some('d') | Some('n') => {
            if spec.precision.is_some() {
                return Err(value_error("Precision not allowed in integer format specifier"));
            }
            (group(&n.unsigned_abs().to_string(), spec.grouping), "")
        }
        Some('x') => (format!("{:x}", n.unsigned_abs()), "0x"),
        Some('X') => (format!("{:X}", n.unsigned_abs()), "0X"),
        Some('o') => (format!("{:o}", n.unsigned_abs()), "0o"),
        Some('b') => (format!("{:b}", n.unsigned_abs()), "0b"),
        Some('c') => {
            let ch = u32::try_from(n)
                .ok()
                .and_then(char::from_u32)
                .ok_or_else(|| Exception::new(ExceptionKind::OverflowError, "%c arg not in range(0x110000)"))?;
            return Ok(pad(&ch.to_string(), "", spec, '<'));
        }
        Some('e' | 'E' | 'f' | 'F' | 'g' | 'G' | '%') => {
            return format_float(n as f64, spec, value);
        }
        Some(kind) => return Err(unknown_code(kind, value)),
    };

    let prefix = if spec.alternate { prefix } else { "" };
    let sign = sign_text(n < 0, spec.sign);
    Ok(pad(&body, &format!("{}{}", sign, prefix), spec, '>'))
}

fn format_float(f: f64, spec: &FormatSpec, value: &Value) -> Result<String, Exception> {
    let negative = f.is_sign_negative() && !f.is_nan();
    let magnitude = f.abs();

    let body = match spec.kind {
        None => {
            if let Some(p) = spec.precision {
                let text = general(magnitude, p.max(1), spec.alternate);
                if text.contains(|c: char| matches!(c, '.' | 'e' | 'n' | 'i')) {
                    text
                } else {
                    format!("{}.0", text)
                }
            } else {
                float_repr(magnitude)
            }
        }
        Some('f' | 'F') => fixed(magnitude, spec.precision.unwrap_or(6), spec.alternate),
        Some(k @ ('e' | 'E')) => {
            let text = scientific(magnitude, spec.precision.unwrap_or(6), spec.alternate);
            if k == 'E' {
                text.to_uppercase()
            } else {
                text
            }
        }
        Some(k @ ('g' | 'G')) => {
            let text = general(magnitude, spec.precision.unwrap_or(6).max(1), spec.alternate);
            if k == 'G' {
                text.to_uppercase()
            } else {
                text
            }
        }
        Some('%') => format!(
            "{}%",
            fixed(magnitude * 100.0, spec.precision.unwrap_or(6), spec.alternate)
        ),
        Some(kind) => return Err(unknown_code(kind, value)),
    };

    let body = match spec.grouping {
        Some(separator) if magnitude.is_finite() => {
            let split = body.find(|c: char| !c.is_ascii_digit()).unwrap_or(body.len());
            format!("{}{}", group(&body[..split], Some(separator)), &body[split..])
        }
        _ => body,
    };

    Ok(pad(&body, sign_text(negative, spec.sign), spec, '>'))
}

fn fixed(magnitude: f64, precision: usize, alternate: bool) -> String {
    if !magnitude.is_finite() {
        return non_finite(magnitude);
    }
    let text = format!("{:.*}", precision, magnitude);
    if alternate && precision == 0 {
        format!("{}.", text)
    } else {
        text
    }
}

fn scientific(magnitude: f64, precision: usize, alternate: bool) -> String {
    if !magnitude.is_finite() {
        return non_finite(magnitude);
    }
    let text = format!("{:.*e}", precision, magnitude);
    let (mantissa, exponent) = split_exponent(&text);
    let mantissa = if alternate && precision == 0 {
        format!("{}.", mantissa)
    } else {
        mantissa.to_string()
    };
    format!("{}{}", mantissa, exponent_suffix(exponent))
}

/// `g` formatting with `precision` significant digits
fn general(magnitude: f64, precision: usize, alternate: bool) -> String {
    if !magnitude.is_finite() {
        return non_finite(magnitude);
    }
    if magnitude == 0.0 {
        return if alternate {
            format!("{:.*}", precision.saturating_sub(1), 0.0)
        } else {
            "0".to_string()
        };
    }

    let probe = format!("{:.*e}", precision - 1, magnitude);
    let (_, exponent) = split_exponent(&probe);

    let text = if exponent >= -4 && (exponent as i64) < precision as i64 {
        let decimals = (precision as i64 - 1 - exponent as i64).max(0) as usize;
        format!("{:.*}", decimals, magnitude)
    } else {
        scientific(magnitude, precision - 1, alternate)
    };

    if alternate {
        return text;
    }
    strip_trailing_zeros(&text)
}

fn strip_trailing_zeros(text: &str) -> String {
    let (number, exponent) = match text.find('e') {
        Some(pos) => (&text[..pos], &text[pos..]),
        None => (text, ""),
    };
    if !number.contains('.') {
        return text.to_string();
    }
    let trimmed = number.trim_end_matches('0').trim_end_matches('.');
    format!("{}{}", trimmed, exponent)
}

fn non_finite(magnitude: f64) -> String {
    if magnitude.is_nan() {
        "nan".to_string()
    } else {
        "inf".to_string()
    }
}

fn sign_text(negative: bool, sign: char) -> &'static str {
    match (negative, sign) {
        (true, _) => "-",
        (false, '+') => "+",
        (false, ' ') => " ",
        _ => "",
    }
}

/// Insert a thousands separator into a run of digits
fn group(digits: &str, separator: Option<char>) -> String {
    let Some(separator) = separator else {
        return digits.to_string();
    };
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(separator);
        }
        out.push(ch);
    }
    out
}

/// Apply width, fill and alignment. `prefix` (sign, radix marker) stays in
/// front of `=`-style padding.
fn pad(body: &str, prefix: &str, spec: &FormatSpec, default_align: char) -> String {
    let (fill, align) = match spec.align {
        Some(align) => (spec.fill, align),
        None if spec.zero && default_align == '>' => ('0', '='),
        None => (spec.fill, default_align),
    };

    let len = prefix.chars().count() + body.chars().count();
    if len >= spec.width {
        return format!("{}{}", prefix, body);
    }
    let padding = spec.width - len;
    let fill_n = |n: usize| std::iter::repeat(fill).take(n).collect::<String>();

    match align {
        '<' => format!("{}{}{}", prefix, body, fill_n(padding)),
        '^' => {
            let left = padding / 2;
            format!("{}{}{}{}", fill_n(left), prefix, body, fill_n(padding - left))
        }
        '=' => format!("{}{}{}", prefix, fill_n(padding), body),
        _ => format!("{}{}{}", fill_n(padding), prefix, body),
    }
}

/// `template.format(*args, **kwargs)`
pub fn format_template(
    template: &str,
    args: &[Value],
    kwargs: &[(String, Value)],
) -> Result<String, Exception> {
    let chars: Vec<char> = template.chars().collect();
    let mut out = String::with_capacity(template.len());
    let mut auto_index = 0usize;
    let mut manual = false;
    let mut automatic = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c == '}' {
            if chars.get(i + 1) == Some(&'}') {
                out.push('}');
                i += 2;
                continue;
            }
            return Err(value_error("Single '}' encountered in format string"));
        }
        if c != '{' {
            out.push(c);
            i += 1;
            continue;
        }
        if chars.get(i + 1) == Some(&'{') {
            out.push('{');
            i += 2;
            continue;
        }

        let start = i + 1;
        let Some(offset) = chars[start..].iter().position(|&c| c == '}') else {
            return Err(value_error("expected '}' before end of string"));
        };
        let field: String = chars[start..start + offset].iter().collect();
        i = start + offset + 1;

        let (head, spec) = match field.split_once(':') {
            Some((head, spec)) => (head, spec),
            None => (field.as_str(), ""),
        };
        let (name, conversion) = match head.split_once('!') {
            Some((name, conversion)) => (name, conversion.chars().next()),
            None => (head, None),
        };

        let value = if name.is_empty() {
            if manual {
                return Err(value_error(
                    "cannot switch from manual field specification to automatic field numbering",
                ));
            }
            automatic = true;
            let value = positional(args, auto_index)?;
            auto_index += 1;
            value
        } else if let Ok(index) = name.parse::<usize>() {
            if automatic {
                return Err(value_error(
                    "cannot switch from automatic field numbering to manual field specification",
                ));
            }
            manual = true;
            positional(args, index)?
        } else {
            kwargs
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.clone())
                .ok_or_else(|| {
                    Exception::with_args(ExceptionKind::KeyError, vec![Value::from(name)])
                })?
        };

        out.push_str(&convert_and_format(&value, conversion, spec)?);
    }

    Ok(out)
}

fn positional(args: &[Value], index: usize) -> Result<Value, Exception> {
    args.get(index).cloned().ok_or_else(|| {
        Exception::new(
            ExceptionKind::IndexError,
            format!(
                "Replacement index {} out of range for positional args tuple",
                index
            ),
        )
    })
}

/// Apply an `!r`/`!s`/`!a` conversion, then a format spec
pub fn convert_and_format(
    value: &Value,
    conversion: Option<char>,
    spec: &str,
) -> Result<String, Exception> {
    match conversion {
        None => format_value(value, spec),
        Some('r' | 'a') => format_value(&Value::from(repr(value)), spec),
        Some('s') => format_value(&Value::from(to_str(value)), spec),
        Some(other) => Err(value_error(format!(
            "Unknown conversion specifier {}",
            other
        ))),
    }
}

/// `template % args`
pub fn percent_format(template: &str, args: &Value) -> Result<String, Exception> {
    let (positional, mapping): (Vec<Value>, Option<&Value>) = match args {
        Value::Tuple(items) => (items.to_vec(), None),
        Value::Dict(_) => (Vec::new(), Some(args)),
        other => (vec![other.clone()], None),
    };

    let chars: Vec<char> = template.chars().collect();
    let mut out = String::with_capacity(template.len());
    let mut next = 0usize;
    let mut i = 0;

    let not_enough = || Exception::new(ExceptionKind::TypeError, "not enough arguments for format string");

    while i < chars.len() {
        if chars[i] != '%' {
            out.push(chars[i]);
            i += 1;
            continue;
        }
        i += 1;

        let mut key = None;
        if chars.get(i) == Some(&'(') {
            let Some(offset) = chars[i..].iter().position(|&c| c == ')') else {
                return Err(value_error("incomplete format key"));
            };
            key = Some(chars[i + 1..i + offset].iter().collect::<String>());
            i += offset + 1;
        }

        let mut spec = FormatSpec::default();
        while let Some(&flag @ ('-' | '+' | ' ' | '0' | '#')) = chars.get(i) {
            match flag {
                '-' => spec.align = Some('<'),
                '+' => spec.sign = '+',
                ' ' => {
                    if spec.sign != '+' {
                        spec.sign = ' ';
                    }
                }
                '0' => spec.zero = true,
                _ => spec.alternate = true,
            }
            i += 1;
        }
        while let Some(d) = chars.get(i).and_then(|c| c.to_digit(10)) {
            spec.width = spec.width * 10 + d as usize;
            i += 1;
        }
        if chars.get(i) == Some(&'.') {
            i += 1;
            let mut precision = 0usize;
            while let Some(d) = chars.get(i).and_then(|c| c.to_digit(10)) {
                precision = precision * 10 + d as usize;
                i += 1;
            }
            spec.precision = Some(precision);
        }

        let Some(&conversion) = chars.get(i) else {
            return Err(value_error("incomplete format"));
        };
        i += 1;

        if conversion == '%' {
            out.push('%');
            continue;
        }

        let value = match (&key, mapping) {
            (Some(key), Some(Value::Dict(dict))) => dict
                .borrow()
                .get(&Value::from(key.as_str()))?
                .ok_or_else(|| {
                    Exception::with_args(ExceptionKind::KeyError, vec![Value::from(key.as_str())])
                })?,
            (Some(_), _) => {
                return Err(Exception::new(ExceptionKind::TypeError, "format requires a mapping"));
            }
            (None, Some(mapping)) => mapping.clone(),
            (None, None) => {
                let value = positional.get(next).cloned().ok_or_else(not_enough)?;
                next += 1;
                value
            }
        };

        if spec.align == Some('<') {
            spec.zero = false;
        }

        let text = match conversion {
            's' => format_str(&to_str(&value), &FormatSpec { kind: None, sign: '-', ..spec }, &value)?,
            'r' | 'a' => format_str(&repr(&value), &FormatSpec { kind: None, sign: '-', ..spec }, &value)?,
            'd' | 'i' | 'u' => {
                let n = match &value {
                    Value::Float(f) if f.is_finite() => f.trunc() as i64,
                    other => other.as_int().ok_or_else(|| {
                        Exception::new(
                            ExceptionKind::TypeError,
                            format!(
                                "%{} format: a real number is required, not {}",
                                conversion,
                                other.type_name()
                            ),
                        )
                    })?,
                };
                format_int(n, &FormatSpec { kind: Some('d'), precision: None, ..spec }, &value)?
            }
            'x' | 'X' | 'o' | 'c' => {
                let n = value.as_int().ok_or_else(|| {
                    Exception::new(
                        ExceptionKind::TypeError,
                        format!(
                            "%{} format: an integer is required, not {}",
                            conversion,
                            value.type_name()
                        ),
                    )
                })?;
                format_int(n, &FormatSpec { kind: Some(conversion), precision: None, ..spec }, &value)?
            }
            'f' | 'F' | 'e' | 'E' | 'g' | 'G' => {
                let f = value.as_float().ok_or_else(|| {
                    Exception::new(
                        ExceptionKind::TypeError,
                        format!("must be real number, not {}", value.type_name()),
                    )
                })?;
                format_float(f, &FormatSpec { kind: Some(conversion), ..spec }, &value)?
            }
            other => {
                return Err(value_error(format!(
                    "unsupported format character '{}' (0x{:x}) at index {}",
                    other,
                    other as u32,
                    i - 1
                )));
            }
        };
        out.push_str(&text);
    }

    if mapping.is_none() && next < positional.len() {
        return Err(Exception::new(
            ExceptionKind::TypeError,
            "not all arguments converted during string formatting",
        ));
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::value::Dict;

    #[test]
    fn test_float_repr() {
        assert_eq!(float_repr(0.1), "0.1");
        assert_eq!(float_repr(2.0), "2.0");
        assert_eq!(float_repr(-0.0), "-0.0");
        assert_eq!(float_repr(1e16), "1e+16");
        assert_eq!(float_repr(1.5e-5), "1.5e-05");
        assert_eq!(float_repr(123456789.125), "123456789.125");
        assert_eq!(float_repr(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(float_repr(f64::INFINITY), "inf");
    }

    #[test]
    fn test_repr_of_containers() {
        let list = Value::list(vec![Value::Int(1), Value::from("a"), Value::None]);
        assert_eq!(repr(&list), "[1, 'a', None]");
        assert_eq!(repr(&Value::tuple(vec![Value::Int(1)])), "(1,)");

        let mut dict = Dict::new();
        dict.insert(Value::from("k"), Value::Float(1.5)).unwrap();
        assert_eq!(repr(&Value::dict(dict)), "{'k': 1.5}");
    }

    #[test]
    fn test_repr_of_recursive_list() {
        let list = Value::list(vec![Value::Int(1)]);
        if let Value::List(items) = &list {
            items.borrow_mut().push(list.clone());
        }
        assert_eq!(repr(&list), "[1, [...]]");
    }

    #[test]
    fn test_repr_of_deeply_nested_list_is_elided() {
        let mut value = Value::list(Vec::new());
        for _ in 0..1_000 {
            value = Value::list(vec![value]);
        }
        let text = repr(&value);
        let expected = format!(
            "{}[...]{}",
            "[".repeat(MAX_REPR_DEPTH),
            "]".repeat(MAX_REPR_DEPTH)
        );
        assert_eq!(text, expected);
        crate::runtime::value::dismantle(vec![value]);
    }

    #[test]
    fn test_string_quoting() {
        assert_eq!(quote_str("hi"), "'hi'");
        assert_eq!(quote_str("it's"), "\"it's\"");
        assert_eq!(quote_str("a\nb"), "'a\\nb'");
        assert_eq!(to_str(&Value::from("plain")), "plain");
    }

    #[test]
    fn test_format_spec_numbers() {
        assert_eq!(format_value(&Value::Float(3.14159), ".2f").unwrap(), "3.14");
        assert_eq!(format_value(&Value::Int(42), ">5").unwrap(), "   42");
        assert_eq!(format_value(&Value::Int(42), "05d").unwrap(), "00042");
        assert_eq!(format_value(&Value::Int(-42), "06").unwrap(), "-00042");
        assert_eq!(format_value(&Value::Int(1234567), ",").unwrap(), "1,234,567");
        assert_eq!(format_value(&Value::Float(0.256), ".1%").unwrap(), "25.6%");
        assert_eq!(format_value(&Value::Int(255), "#x").unwrap(), "0xff");
        assert_eq!(format_value(&Value::Float(12345.678), ",.2f").unwrap(), "12,345.68");
        assert_eq!(format_value(&Value::Float(1234.5), "e").unwrap(), "1.234500e+03");
        assert_eq!(format_value(&Value::Float(0.00001234), "g").unwrap(), "1.234e-05");
        assert_eq!(format_value(&Value::Float(3.0), ".2").unwrap(), "3.0");
    }

    #[test]
    fn test_format_spec_strings() {
        assert_eq!(format_value(&Value::from("ab"), "<4").unwrap(), "ab  ");
        assert_eq!(format_value(&Value::from("ab"), "*^6").unwrap(), "**ab**");
        assert_eq!(format_value(&Value::from("abcdef"), ".3").unwrap(), "abc");
        let err = format_value(&Value::from("ab"), "d").unwrap_err();
        assert_eq!(err.kind, ExceptionKind::ValueError);
    }

    #[test]
    fn test_format_template() {
        let args = vec![Value::Int(1), Value::from("x")];
        let kwargs = vec![("name".to_string(), Value::from("bob"))];
        assert_eq!(
            format_template("{} and {} by {name!r}", &args, &kwargs).unwrap(),
            "1 and x by 'bob'"
        );
        assert_eq!(format_template("{1}{0}", &args, &[]).unwrap(), "x1");
        assert_eq!(format_template("{{literal}}", &[], &[]).unwrap(), "{literal}");
        assert_eq!(
            format_template("{:>4}", &args, &[]).unwrap(),
            "   1"
        );
        assert!(format_template("{5}", &args, &[]).is_err());
    }

    #[test]
    fn test_percent_format() {
        let args = Value::tuple(vec![Value::from("x"), Value::Int(3), Value::Float(2.5)]);
        assert_eq!(percent_format("%s=%d (%.2f)", &args).unwrap(), "x=3 (2.50)");
        assert_eq!(percent_format("%5.1f%%", &Value::Float(12.34)).unwrap(), " 12.3%");
        assert_eq!(percent_format("%-4s|", &Value::from("a")).unwrap(), "a   |");
        assert!(percent_format("%s %s", &Value::from("a")).is_err());
        assert!(percent_format("%s", &Value::tuple(vec![Value::Int(1), Value::Int(2)])).is_err());
    }
}
