//! Importable built-in modules: `math` and `time`
//!
//! There is no module search path. `import` succeeds only for the names
//! listed here; module attributes are either constants or native functions
//! represented as [`Builtin`] values tagged with their module.
//!
//! `time.sleep` waits on the invocation's cancel token, so a sleeping
//! snippet still times out promptly.

use crate::interpreter::builtins::{arity, float_to_int, int_arg, no_kwargs, type_error, value_error};
use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::{Exception, ExceptionKind, Interrupt};
use crate::runtime::value::{Builtin, Value};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

const MATH_FUNCTIONS: &[&str] = &[
    "acos", "asin", "atan", "atan2", "ceil", "cos", "degrees", "exp", "fabs", "factorial", "floor",
    "gcd", "hypot", "isclose", "isfinite", "isinf", "isnan", "log", "log10", "log2", "pow",
    "radians", "sin", "sqrt", "tan", "trunc",
];

const TIME_FUNCTIONS: &[&str] = &["monotonic", "perf_counter", "sleep", "time"];

/// Resolve `import name`
pub(crate) fn import(name: &str) -> Result<&'static str, Exception> {
    match name {
        "math" => Ok("math"),
        "time" => Ok("time"),
        other => Err(Exception::new(
            ExceptionKind::ModuleNotFoundError,
            format!("No module named '{}'", other),
        )),
    }
}

/// `module.name`
pub(crate) fn attribute(module: &'static str, name: &str) -> Option<Value> {
    let functions = match module {
        "math" => {
            let constant = match name {
                "pi" => Some(std::f64::consts::PI),
                "e" => Some(std::f64::consts::E),
                "tau" => Some(std::f64::consts::TAU),
                "inf" => Some(f64::INFINITY),
                "nan" => Some(f64::NAN),
                _ => None,
            };
            if let Some(constant) = constant {
                return Some(Value::Float(constant));
            }
            MATH_FUNCTIONS
        }
        "time" => TIME_FUNCTIONS,
        _ => return None,
    };
    functions
        .iter()
        .copied()
        .find(|function| *function == name)
        .map(|function| Value::Builtin(Builtin::in_module(module, function)))
}

fn domain_error() -> Exception {
    value_error("math domain error")
}

fn range_error() -> Exception {
    Exception::new(ExceptionKind::OverflowError, "math range error")
}

fn real_arg(value: &Value) -> Result<f64, Exception> {
    value
        .as_float()
        .ok_or_else(|| type_error(format!("must be real number, not {}", value.type_name())))
}

/// Result of a float function: NaN from a non-NaN input is a domain error,
/// infinity from a finite input is a range error
fn checked(input: f64, output: f64) -> Result<Value, Exception> {
    if output.is_nan() && !input.is_nan() {
        return Err(domain_error());
    }
    if output.is_infinite() && input.is_finite() {
        return Err(range_error());
    }
    Ok(Value::Float(output))
}

/// `floor`/`ceil`/`trunc` keep integers as they are
fn to_integral(value: &Value, round: fn(f64) -> f64) -> Result<Value, Exception> {
    match value {
        Value::Int(_) | Value::Bool(_) => Ok(Value::Int(int_arg(value)?)),
        other => float_to_int(round(real_arg(other)?)).map(Value::Int),
    }
}

fn gcd(a: i64, b: i64) -> i64 {
    let (mut a, mut b) = (a.unsigned_abs(), b.unsigned_abs());
    while b != 0 {
        (a, b) = (b, a % b);
    }
    i64::try_from(a).unwrap_or(i64::MAX)
}

fn math_function(name: &str, args: &[Value]) -> Result<Value, Exception> {
    let unary = |f: fn(f64) -> f64| -> Result<Value, Exception> {
        arity(name, args, 1, 1)?;
        let x = real_arg(&args[0])?;
        checked(x, f(x))
    };

    match name {
        "sqrt" => unary(f64::sqrt),
        "exp" => unary(f64::exp),
        "sin" => unary(f64::sin),
        "cos" => unary(f64::cos),
        "tan" => unary(f64::tan),
        "asin" => unary(f64::asin),
        "acos" => unary(f64::acos),
        "atan" => unary(f64::atan),
        "fabs" => unary(f64::abs),
        "degrees" => unary(f64::to_degrees),
        "radians" => unary(f64::to_radians),
        "log2" | "log10" => {
            arity(name, args, 1, 1)?;
            let x = real_arg(&args[0])?;
            if x <= 0.0 {
                return Err(domain_error());
            }
            Ok(Value::Float(if name == "log2" { x.log2() } else { x.log10() }))
        }
        "log" => {
            arity(name, args, 1, 2)?;
            let x = real_arg(&args[0])?;
            if x <= 0.0 {
                return Err(domain_error());
            }
            match args.get(1) {
                None => Ok(Value::Float(x.ln())),
                Some(base) => {
                    let base = real_arg(base)?;
                    if base <= 0.0 {
                        return Err(domain_error());
                    }
                    if base == 1.0 {
                        return Err(Exception::new(ExceptionKind::ZeroDivisionError, "float division by zero"));
                    }
                    Ok(Value::Float(x.ln() / base.ln()))
                }
            }
        }
        "floor" => {
            arity(name, args, 1, 1)?;
            to_integral(&args[0], f64::floor)
        }
        "ceil" => {
            arity(name, args, 1, 1)?;
            to_integral(&args[0], f64::ceil)
        }
        "trunc" => {
            arity(name, args, 1, 1)?;
            to_integral(&args[0], f64::trunc)
        }
        "pow" => {
            arity(name, args, 2, 2)?;
            let (x, y) = (real_arg(&args[0])?, real_arg(&args[1])?);
            if x == 0.0 && y < 0.0 {
                return Err(domain_error());
            }
            checked(x, x.powf(y))
        }
        "atan2" | "hypot" => {
            arity(name, args, 2, 2)?;
            let (y, x) = (real_arg(&args[0])?, real_arg(&args[1])?);
            Ok(Value::Float(if name == "atan2" { y.atan2(x) } else { y.hypot(x) }))
        }
        "isfinite" | "isinf" | "isnan" => {
            arity(name, args, 1, 1)?;
            let x = real_arg(&args[0])?;
            Ok(Value::Bool(match name {
                "isfinite" => x.is_finite(),
                "isinf" => x.is_infinite(),
                _ => x.is_nan(),
            }))
        }
        "isclose" => {
            arity(name, args, 2, 2)?;
            let (a, b) = (real_arg(&args[0])?, real_arg(&args[1])?);
            let close = a == b || (a - b).abs() <= 1e-9 * a.abs().max(b.abs());
            Ok(Value::Bool(close))
        }
        "factorial" => {
            arity(name, args, 1, 1)?;
            let n = match &args[0] {
                Value::Float(_) => {
                    return Err(type_error("'float' object cannot be interpreted as an integer"));
                }
                other => int_arg(other)?,
            };
            if n < 0 {
                return Err(value_error("factorial() not defined for negative values"));
            }
            (1..=n)
                .try_fold(1_i64, |acc, k| acc.checked_mul(k))
                .map(Value::Int)
                .ok_or_else(|| Exception::new(ExceptionKind::OverflowError, "integer overflow"))
        }
        "gcd" => {
            let mut result = 0;
            for arg in args {
                result = gcd(result, int_arg(arg)?);
            }
            Ok(Value::Int(result))
        }
        other => Err(Exception::new(
            ExceptionKind::AttributeError,
            format!("module 'math' has no attribute '{}'", other),
        )),
    }
}

impl Interpreter {
    /// Call a function of an imported module
    pub(crate) fn call_module_function(
        &mut self,
        module: &str,
        name: &str,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
    ) -> Result<Value, Interrupt> {
        no_kwargs(name, &kwargs)?;
        match module {
            "math" => Ok(math_function(name, &args)?),
            "time" => self.time_function(name, &args),
            other => Err(Exception::new(
                ExceptionKind::ModuleNotFoundError,
                format!("No module named '{}'", other),
            )
            .into()),
        }
    }

    fn time_function(&mut self, name: &str, args: &[Value]) -> Result<Value, Interrupt> {
        match name {
            "time" => {
                arity(name, args, 0, 0)?;
                let now = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .unwrap_or_default();
                Ok(Value::Float(now.as_secs_f64()))
            }
            "monotonic" | "perf_counter" => {
                arity(name, args, 0, 0)?;
                Ok(Value::Float(process_clock().as_secs_f64()))
            }
            "sleep" => {
                arity(name, args, 1, 1)?;
                let seconds = real_arg(&args[0])?;
                if seconds.is_nan() {
                    return Err(value_error("Invalid value NaN (not a number)").into());
                }
                if seconds < 0.0 {
                    return Err(value_error("sleep length must be non-negative").into());
                }
                let duration = Duration::try_from_secs_f64(seconds)
                    .map_err(|_| Exception::new(ExceptionKind::OverflowError, "sleep length is too large"))?;
                if !self.cancel_token().sleep(duration) {
                    return Err(self.timeout());
                }
                Ok(Value::None)
            }
            other => Err(Exception::new(
                ExceptionKind::AttributeError,
                format!("module 'time' has no attribute '{}'", other),
            )
            .into()),
        }
    }
}

/// Time since the first clock query in this process
fn process_clock() -> Duration {
    static START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();
    START.get_or_init(Instant::now).elapsed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deadline::CancelToken;

    #[test]
    fn test_import() {
        assert_eq!(import("math").unwrap(), "math");
        let err = import("os").unwrap_err();
        assert_eq!(err.summary(), "ModuleNotFoundError: No module named 'os'");
    }

    #[test]
    fn test_attributes() {
        assert!(matches!(attribute("math", "pi"), Some(Value::Float(f)) if f == std::f64::consts::PI));
        assert!(matches!(
            attribute("math", "sqrt"),
            Some(Value::Builtin(Builtin { module: Some("math"), name: "sqrt" }))
        ));
        assert!(attribute("math", "nope").is_none());
        assert!(attribute("time", "pi").is_none());
    }

    #[test]
    fn test_math_functions() {
        assert!(matches!(math_function("sqrt", &[Value::Int(16)]), Ok(Value::Float(f)) if f == 4.0));
        assert!(matches!(math_function("floor", &[Value::Float(-1.5)]), Ok(Value::Int(-2))));
        assert!(matches!(math_function("factorial", &[Value::Int(5)]), Ok(Value::Int(120))));
        assert!(matches!(math_function("gcd", &[Value::Int(12), Value::Int(18)]), Ok(Value::Int(6))));

        let err = math_function("sqrt", &[Value::Int(-1)]).unwrap_err();
        assert_eq!(err.summary(), "ValueError: math domain error");
        let err = math_function("exp", &[Value::Int(1000)]).unwrap_err();
        assert_eq!(err.kind, ExceptionKind::OverflowError);
    }

    #[test]
    fn test_sleep_observes_cancellation() {
        let token = CancelToken::new();
        token.cancel();
        let mut interpreter = Interpreter::new(token);
        let started = Instant::now();
        let result = interpreter.call_module_function("time", "sleep", vec![Value::Int(5)], Vec::new());
        assert!(matches!(result, Err(Interrupt::Timeout { .. })));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_negative_sleep() {
        let mut interpreter = Interpreter::new(CancelToken::new());
        let result = interpreter.call_module_function("time", "sleep", vec![Value::Int(-1)], Vec::new());
        match result {
            Err(Interrupt::Raise(exception)) => {
                assert_eq!(exception.summary(), "ValueError: sleep length must be non-negative");
            }
            other => panic!("expected ValueError, got {:?}", other),
        }
    }
}
