//! Non-local exits: `return`, `raise` and `try`
//!
//! Exceptions travel as `Err(Interrupt::Raise)` through the Rust call stack
//! and are matched against handlers here. A timeout travels the same way as
//! `Interrupt::Timeout` but never matches a handler and skips `finally`.

use crate::interpreter::engine::{ControlFlow, Interpreter};
use crate::interpreter::errors::{Exception, ExceptionKind, Interrupt};
use crate::parser::ast::{ExceptHandler, Expr, Stmt};
use crate::runtime::value::Value;
use std::rc::Rc;

impl Interpreter {
    pub(crate) fn execute_return(&mut self, value: Option<&Expr>) -> Result<(), Interrupt> {
        self.return_value = match value {
            Some(expr) => self.evaluate_expr(expr)?,
            None => Value::None,
        };
        self.control_flow = ControlFlow::Return;
        Ok(())
    }

    pub(crate) fn execute_raise(&mut self, value: Option<&Expr>) -> Result<(), Interrupt> {
        let Some(expr) = value else {
            // Bare `raise` re-raises the exception being handled, traceback intact
            return match self.handling.last() {
                Some(active) => Err(Interrupt::Raise(Box::new((**active).clone()))),
                None => Err(Exception::new(
                    ExceptionKind::RuntimeError,
                    "No active exception to reraise",
                )
                .into()),
            };
        };

        let exception = match self.evaluate_expr(expr)? {
            Value::ExceptionClass(kind) => Exception::with_args(kind, Vec::new()),
            Value::Exception(exception) => Exception {
                traceback: Vec::new(),
                ..(*exception).clone()
            },
            _ => Exception::new(
                ExceptionKind::TypeError,
                "exceptions must derive from BaseException",
            ),
        };
        Err(exception.into())
    }

    pub(crate) fn execute_try(
        &mut self,
        body: &[Stmt],
        handlers: &[ExceptHandler],
        orelse: &[Stmt],
        finalbody: &[Stmt],
    ) -> Result<(), Interrupt> {
        let outcome = match self.execute_block(body) {
            Ok(()) if self.control_flow == ControlFlow::Normal => self.execute_block(orelse),
            Ok(()) => Ok(()),
            Err(Interrupt::Raise(exception)) if !handlers.is_empty() => {
                self.handle_exception(*exception, handlers)
            }
            Err(interrupt) => Err(interrupt),
        };

        if finalbody.is_empty() || matches!(outcome, Err(Interrupt::Timeout { .. })) {
            return outcome;
        }

        let pending_flow = std::mem::replace(&mut self.control_flow, ControlFlow::Normal);
        let pending_return = std::mem::take(&mut self.return_value);
        self.execute_block(finalbody)?;

        if self.control_flow == ControlFlow::Normal {
            self.control_flow = pending_flow;
            self.return_value = pending_return;
            outcome
        } else {
            // break/continue/return inside `finally` discards the pending exception
            Ok(())
        }
    }

    /// Run the first handler that matches, or re-raise
    fn handle_exception(&mut self, exception: Exception, handlers: &[ExceptHandler]) -> Result<(), Interrupt> {
        let exception = Rc::new(exception);

        for handler in handlers {
            if let Some(expr) = &handler.exception_type {
                self.set_line(handler.location.line);
                let class = self.evaluate_expr(expr)?;
                if !exception_matches(&exception, &class)? {
                    continue;
                }
            }

            self.set_line(handler.location.line);
            if let Some(name) = &handler.name {
                self.store_name(name, Value::Exception(Rc::clone(&exception)));
            }

            self.handling.push(Rc::clone(&exception));
            let result = self.execute_block(&handler.body);
            self.handling.pop();

            if let Some(name) = &handler.name {
                // The handler may already have deleted or rebound it
                let _ = self.delete_name(name);
            }
            return result;
        }

        let exception = Rc::try_unwrap(exception).unwrap_or_else(|shared| (*shared).clone());
        Err(Interrupt::Raise(Box::new(exception)))
    }
}

/// Does `class` (an exception class or a tuple of them) catch `exception`?
fn exception_matches(exception: &Exception, class: &Value) -> Result<bool, Exception> {
    match class {
        Value::ExceptionClass(kind) => Ok(exception.kind.is_subclass_of(*kind)),
        Value::Tuple(classes) => {
            for class in classes.iter() {
                if exception_matches(exception, class)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        _ => Err(Exception::new(
            ExceptionKind::TypeError,
            "catching classes that do not inherit from BaseException is not allowed",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exception_matching() {
        let exception = Exception::new(ExceptionKind::KeyError, "k");
        assert!(exception_matches(&exception, &Value::ExceptionClass(ExceptionKind::LookupError)).unwrap());
        assert!(!exception_matches(&exception, &Value::ExceptionClass(ExceptionKind::ValueError)).unwrap());

        let classes = Value::tuple(vec![
            Value::ExceptionClass(ExceptionKind::ValueError),
            Value::ExceptionClass(ExceptionKind::KeyError),
        ]);
        assert!(exception_matches(&exception, &classes).unwrap());
        assert!(exception_matches(&exception, &Value::Int(1)).is_err());
    }
}
