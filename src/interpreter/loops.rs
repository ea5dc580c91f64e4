//! Loop statement execution (`while`, `for`) and iteration.
//!
//! Adds `impl Interpreter` methods for the two loop forms. `break` and
//! `continue` are propagated via `LoopBodyResult` so the loop driver can
//! react without inspecting `control_flow` directly. A `return` inside a
//! loop body yields `LoopBodyResult::Exit`, which unwinds the loop and lets
//! the enclosing call pick up the return value.
//!
//! Every iteration passes a deadline checkpoint, so `while True: pass` is
//! interruptible.

use crate::interpreter::constants::MAX_SEQUENCE_LEN;
use crate::interpreter::engine::{ControlFlow, Interpreter};
use crate::interpreter::errors::{Exception, ExceptionKind, Interrupt};
use crate::parser::ast::{Expr, Stmt};
use crate::runtime::value::Value;

/// Result returned by [`Interpreter::execute_loop_body`] to signal how the body ended.
pub(crate) enum LoopBodyResult {
    /// Body completed normally or via `continue`; the loop should iterate again.
    Continue,
    /// `break` was encountered; the loop should exit without running `else`.
    Break,
    /// `return` was executed; the loop unwinds and the caller sees `control_flow`.
    Exit,
}

/// Iterator over the items of an iterable value
pub(crate) enum ValueIter {
    Items(std::vec::IntoIter<Value>),
    Range { next: i64, remaining: usize, step: i64 },
}

impl Iterator for ValueIter {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        match self {
            ValueIter::Items(items) => items.next(),
            ValueIter::Range {
                next,
                remaining,
                step,
            } => {
                if *remaining == 0 {
                    return None;
                }
                let current = *next;
                *remaining -= 1;
                *next = next.wrapping_add(*step);
                Some(Value::Int(current))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self {
            ValueIter::Items(items) => items.size_hint(),
            ValueIter::Range { remaining, .. } => (*remaining, Some(*remaining)),
        }
    }
}

/// Start iterating over `value`. Lists are iterated over a snapshot of their items.
pub(crate) fn iterate(value: &Value) -> Result<ValueIter, Exception> {
    let items = match value {
        Value::List(items) => items.borrow().clone(),
        Value::Tuple(items) => items.to_vec(),
        Value::Str(s) => s.chars().map(|ch| Value::from(ch.to_string())).collect(),
        Value::Dict(dict) => dict.borrow().keys(),
        Value::Range(range) => {
            return Ok(ValueIter::Range {
                next: range.start,
                remaining: range.len(),
                step: range.step,
            });
        }
        other => {
            return Err(Exception::new(
                ExceptionKind::TypeError,
                format!("'{}' object is not iterable", other.type_name()),
            ));
        }
    };
    Ok(ValueIter::Items(items.into_iter()))
}

impl Interpreter {
    /// Executes all statements in `body` once.
    ///
    /// Returns [`LoopBodyResult::Continue`] if the body ran to completion or hit
    /// `continue`, [`LoopBodyResult::Break`] on `break`, and
    /// [`LoopBodyResult::Exit`] on `return`.
    pub(crate) fn execute_loop_body(&mut self, body: &[Stmt]) -> Result<LoopBodyResult, Interrupt> {
        self.execute_block(body)?;
        Ok(match self.control_flow {
            ControlFlow::Normal => LoopBodyResult::Continue,
            ControlFlow::Continue => {
                self.control_flow = ControlFlow::Normal;
                LoopBodyResult::Continue
            }
            ControlFlow::Break => {
                self.control_flow = ControlFlow::Normal;
                LoopBodyResult::Break
            }
            ControlFlow::Return => LoopBodyResult::Exit,
        })
    }

    /// Executes `while condition: body [else: orelse]`.
    ///
    /// The `else` block runs when the condition turns false, not after `break`.
    pub(crate) fn execute_while(
        &mut self,
        condition: &Expr,
        body: &[Stmt],
        orelse: &[Stmt],
    ) -> Result<(), Interrupt> {
        loop {
            self.checkpoint()?;
            if !self.evaluate_expr(condition)?.is_truthy() {
                return self.execute_block(orelse);
            }

            match self.execute_loop_body(body)? {
                LoopBodyResult::Continue => continue,
                LoopBodyResult::Break | LoopBodyResult::Exit => return Ok(()),
            }
        }
    }

    /// Executes `for target in iter: body [else: orelse]`.
    pub(crate) fn execute_for(
        &mut self,
        target: &Expr,
        iter: &Expr,
        body: &[Stmt],
        orelse: &[Stmt],
    ) -> Result<(), Interrupt> {
        let iterable = self.evaluate_expr(iter)?;
        for item in iterate(&iterable)? {
            self.checkpoint()?;
            self.assign_target(target, item)?;

            match self.execute_loop_body(body)? {
                LoopBodyResult::Continue => continue,
                LoopBodyResult::Break | LoopBodyResult::Exit => return Ok(()),
            }
        }
        self.execute_block(orelse)
    }

    /// Materialize every item of an iterable
    pub(crate) fn collect_values(&self, value: &Value) -> Result<Vec<Value>, Interrupt> {
        let items = iterate(value)?;
        let expected = items.size_hint().0;
        if expected > MAX_SEQUENCE_LEN {
            return Err(Exception::with_args(ExceptionKind::MemoryError, Vec::new()).into());
        }

        let mut values = Vec::with_capacity(expected);
        for (count, item) in items.enumerate() {
            if count % 65_536 == 0 {
                self.checkpoint()?;
            }
            values.push(item);
        }
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::value::Range;

    #[test]
    fn test_range_iteration_is_lazy() {
        let range = Value::Range(Range {
            start: 0,
            stop: i64::MAX,
            step: 1,
        });
        let mut items = iterate(&range).unwrap();
        assert!(matches!(items.next(), Some(Value::Int(0))));
        assert!(matches!(items.next(), Some(Value::Int(1))));
    }

    #[test]
    fn test_negative_step_range() {
        let range = Value::Range(Range {
            start: 5,
            stop: 0,
            step: -2,
        });
        let values: Vec<i64> = iterate(&range)
            .unwrap()
            .filter_map(|value| value.as_int())
            .collect();
        assert_eq!(values, vec![5, 3, 1]);
    }

    #[test]
    fn test_string_and_dict_iteration() {
        let chars: Vec<String> = iterate(&Value::from("ab"))
            .unwrap()
            .map(|value| value.as_str().unwrap_or_default().to_string())
            .collect();
        assert_eq!(chars, vec!["a", "b"]);
        assert!(iterate(&Value::Int(3)).is_err());
    }
}
