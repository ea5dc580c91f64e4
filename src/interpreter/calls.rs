//! Function definition and call machinery
//!
//! Adds `impl Interpreter` methods that build [`Function`] values from
//! `def`/`lambda`, evaluate call expressions and dispatch a call to whatever
//! kind of callable the callee turns out to be.
//!
//! Argument binding follows the usual positional-then-keyword rules and
//! reports mismatches with the familiar `TypeError` messages.

use crate::interpreter::compile::declared_globals;
use crate::interpreter::engine::{ControlFlow, Frame, Interpreter};
use crate::interpreter::errors::{Exception, ExceptionKind, Interrupt};
use crate::parser::ast::{Expr, FunctionDef, Keyword, SourceLocation};
use crate::runtime::namespace::{new_scope, Scope};
use crate::runtime::value::{Function, Value};
use std::rc::Rc;

impl Interpreter {
    pub(crate) fn execute_function_def(&mut self, def: &Rc<FunctionDef>) -> Result<(), Interrupt> {
        let function = self.make_function(def)?;
        self.store_name(&def.name, function);
        Ok(())
    }

    /// Build a function value, evaluating its defaults now
    pub(crate) fn make_function(&mut self, def: &Rc<FunctionDef>) -> Result<Value, Interrupt> {
        let mut defaults = Vec::new();
        for param in &def.params {
            if let Some(default) = &param.default {
                defaults.push(self.evaluate_expr(default)?);
            }
        }

        Ok(Value::Function(Rc::new(Function {
            def: Rc::clone(def),
            defaults,
            closure: self.closure_scopes(),
            global_names: Rc::new(declared_globals(&def.body)),
        })))
    }

    pub(crate) fn evaluate_call(
        &mut self,
        func: &Expr,
        args: &[Expr],
        keywords: &[Keyword],
        location: SourceLocation,
    ) -> Result<Value, Interrupt> {
        let callee = self.evaluate_expr(func)?;
        let args = self.evaluate_all(args)?;
        let mut kwargs = Vec::with_capacity(keywords.len());
        for keyword in keywords {
            kwargs.push((keyword.name.clone(), self.evaluate_expr(&keyword.value)?));
        }

        self.set_line(location.line);
        self.call_value(&callee, args, kwargs)
    }

    /// Call any callable value
    pub(crate) fn call_value(
        &mut self,
        callee: &Value,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
    ) -> Result<Value, Interrupt> {
        self.checkpoint()?;

        match callee {
            Value::Function(function) => self.call_function(function, args, kwargs),
            Value::Builtin(builtin) => self.call_builtin(*builtin, args, kwargs),
            Value::BoundMethod(method) => {
                self.call_method(&method.receiver, &method.name, args, kwargs)
            }
            Value::Type(type_name) => self.construct(*type_name, args, kwargs),
            Value::ExceptionClass(kind) => {
                if !kwargs.is_empty() {
                    return Err(Exception::new(
                        ExceptionKind::TypeError,
                        format!("{}() takes no keyword arguments", kind.name()),
                    )
                    .into());
                }
                Ok(Value::Exception(Rc::new(Exception::with_args(*kind, args))))
            }
            other => Err(Exception::new(
                ExceptionKind::TypeError,
                format!("'{}' object is not callable", other.type_name()),
            )
            .into()),
        }
    }

    /// Call a user-defined function in a new frame
    pub(crate) fn call_function(
        &mut self,
        function: &Rc<Function>,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
    ) -> Result<Value, Interrupt> {
        if self.call_depth() >= self.recursion_limit() {
            return Err(Exception::new(
                ExceptionKind::RecursionError,
                "maximum recursion depth exceeded",
            )
            .into());
        }

        let locals = bind_arguments(function, args, kwargs)?;
        self.push_frame(Frame {
            name: Rc::from(function.def.name.as_str()),
            locals,
            enclosing: function.closure.clone(),
            global_names: Rc::clone(&function.global_names),
            line: function.def.location.line,
            is_module: false,
        });

        let result = self.execute_block(&function.def.body);
        self.pop_frame();

        let control = std::mem::replace(&mut self.control_flow, ControlFlow::Normal);
        let value = std::mem::take(&mut self.return_value);
        result?;

        Ok(if control == ControlFlow::Return {
            value
        } else {
            Value::None
        })
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}

/// Quote and join names the way argument errors list them: 'a', 'b', and 'c'
fn join_names(names: &[&str]) -> String {
    let quoted: Vec<String> = names.iter().map(|name| format!("'{}'", name)).collect();
    match quoted.as_slice() {
        [] => String::new(),
        [single] => single.clone(),
        [first, second] => format!("{} and {}", first, second),
        [rest @ .., last] => format!("{}, and {}", rest.join(", "), last),
    }
}

/// Bind call arguments to parameters in a new local scope
fn bind_arguments(
    function: &Function,
    args: Vec<Value>,
    kwargs: Vec<(String, Value)>,
) -> Result<Scope, Exception> {
    let params = &function.def.params;
    let name = &function.def.name;
    let type_error = |message: String| Exception::new(ExceptionKind::TypeError, message);

    if args.len() > params.len() {
        let required = params.len() - function.defaults.len();
        let given = args.len();
        let verb = if given == 1 { "was" } else { "were" };
        let message = if required == params.len() {
            format!(
                "{}() takes {} positional argument{} but {} {} given",
                name,
                params.len(),
                plural(params.len()),
                given,
                verb
            )
        } else {
            format!(
                "{}() takes from {} to {} positional arguments but {} {} given",
                name,
                required,
                params.len(),
                given,
                verb
            )
        };
        return Err(type_error(message));
    }

    let mut slots: Vec<Option<Value>> = vec![None; params.len()];
    for (slot, value) in slots.iter_mut().zip(args) {
        *slot = Some(value);
    }

    for (key, value) in kwargs {
        match params.iter().position(|param| param.name == key) {
            None => {
                return Err(type_error(format!(
                    "{}() got an unexpected keyword argument '{}'",
                    name, key
                )));
            }
            Some(index) if slots[index].is_some() => {
                return Err(type_error(format!(
                    "{}() got multiple values for argument '{}'",
                    name, key
                )));
            }
            Some(index) => slots[index] = Some(value),
        }
    }

    let first_default = params.len() - function.defaults.len();
    let mut missing = Vec::new();
    let scope = new_scope();
    {
        let mut locals = scope.borrow_mut();
        for (index, (param, slot)) in params.iter().zip(slots).enumerate() {
            let value = match slot {
                Some(value) => value,
                None if index >= first_default => function.defaults[index - first_default].clone(),
                None => {
                    missing.push(param.name.as_str());
                    continue;
                }
            };
            locals.insert(param.name.clone(), value);
        }
    }

    if !missing.is_empty() {
        return Err(type_error(format!(
            "{}() missing {} required positional argument{}: {}",
            name,
            missing.len(),
            plural(missing.len()),
            join_names(&missing)
        )));
    }

    Ok(scope)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_names() {
        assert_eq!(join_names(&["a"]), "'a'");
        assert_eq!(join_names(&["a", "b"]), "'a' and 'b'");
        assert_eq!(join_names(&["a", "b", "c"]), "'a', 'b', and 'c'");
    }
}
