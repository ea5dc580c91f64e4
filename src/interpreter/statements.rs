//! Statement execution implementation
//!
//! This module handles the simple and branching statements:
//!
//! - Assignment (chained, unpacking, subscript and slice targets)
//! - Augmented assignment, with in-place `+=` on lists
//! - `if`/`elif`/`else`
//! - `assert` and `del`
//! - `import m [as a]` and `from m import n [as a]`
//!
//! Loops live in `loops`; `return`, `raise` and `try` in `jumps`.

use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::{Exception, ExceptionKind, Interrupt};
use crate::interpreter::modules;
use crate::interpreter::ops::{access, binary};
use crate::parser::ast::*;
use crate::runtime::value::Value;

impl Interpreter {
    pub(crate) fn execute_assignment(&mut self, targets: &[Expr], value: &Expr) -> Result<(), Interrupt> {
        let value = self.evaluate_expr(value)?;
        for target in targets {
            self.assign_target(target, value.clone())?;
        }
        Ok(())
    }

    /// Bind `value` to an assignment target
    pub(crate) fn assign_target(&mut self, target: &Expr, value: Value) -> Result<(), Interrupt> {
        match &target.kind {
            ExprKind::Name(name) => {
                self.store_name(name, value);
                Ok(())
            }
            ExprKind::ResultSlot => {
                self.store_result(value);
                Ok(())
            }
            ExprKind::Tuple(items) | ExprKind::List(items) => self.unpack_into(items, &value),
            ExprKind::Subscript { object, index } => {
                let object = self.evaluate_expr(object)?;
                if let ExprKind::Slice { lower, upper, step } = &index.kind {
                    let bounds = self.evaluate_slice_bounds(lower, upper, step)?;
                    let values = self.collect_values(&value)?;
                    return Ok(access::set_slice(&object, bounds, values)?);
                }
                let index = self.evaluate_expr(index)?;
                Ok(access::set_item(&object, index, value)?)
            }
            ExprKind::Attribute { object, name } => {
                let object = self.evaluate_expr(object)?;
                Err(read_only_attribute(&object, name).into())
            }
            other => Err(Exception::new(
                ExceptionKind::TypeError,
                format!("cannot assign to {}", other.describe()),
            )
            .into()),
        }
    }

    fn unpack_into(&mut self, targets: &[Expr], value: &Value) -> Result<(), Interrupt> {
        let values = self.collect_values(value)?;
        if values.len() < targets.len() {
            return Err(Exception::new(
                ExceptionKind::ValueError,
                format!(
                    "not enough values to unpack (expected {}, got {})",
                    targets.len(),
                    values.len()
                ),
            )
            .into());
        }
        if values.len() > targets.len() {
            return Err(Exception::new(
                ExceptionKind::ValueError,
                format!("too many values to unpack (expected {})", targets.len()),
            )
            .into());
        }
        for (target, value) in targets.iter().zip(values) {
            self.assign_target(target, value)?;
        }
        Ok(())
    }

    pub(crate) fn execute_aug_assignment(
        &mut self,
        target: &Expr,
        op: BinOp,
        value: &Expr,
    ) -> Result<(), Interrupt> {
        match &target.kind {
            ExprKind::Name(name) => {
                let current = self.lookup_name(name)?;
                let operand = self.evaluate_expr(value)?;
                let result = self.inplace_op(op, current, &operand)?;
                self.store_name(name, result);
                Ok(())
            }
            ExprKind::Subscript { object, index } if !matches!(index.kind, ExprKind::Slice { .. }) => {
                let object = self.evaluate_expr(object)?;
                let index = self.evaluate_expr(index)?;
                let current = access::get_item(&object, &index)?;
                let operand = self.evaluate_expr(value)?;
                let result = self.inplace_op(op, current, &operand)?;
                Ok(access::set_item(&object, index, result)?)
            }
            ExprKind::Attribute { object, name } => {
                let object = self.evaluate_expr(object)?;
                access::get_attribute(&object, name)?;
                Err(read_only_attribute(&object, name).into())
            }
            other => Err(Exception::new(
                ExceptionKind::TypeError,
                format!(
                    "'{}' is an illegal expression for augmented assignment",
                    other.describe()
                ),
            )
            .into()),
        }
    }

    /// `current op= operand`; lists are updated in place
    fn inplace_op(&mut self, op: BinOp, current: Value, operand: &Value) -> Result<Value, Interrupt> {
        if let Value::List(items) = &current {
            match op {
                BinOp::Add => {
                    let extra = self.collect_values(operand)?;
                    items.borrow_mut().extend(extra);
                    return Ok(current);
                }
                BinOp::Mul if operand.as_int().is_some() => {
                    let repeated = binary::binary_op(op, &current, operand)?;
                    if let Value::List(new_items) = repeated {
                        let new_items = new_items.borrow().clone();
                        *items.borrow_mut() = new_items;
                    }
                    return Ok(current);
                }
                _ => {}
            }
        }
        Ok(binary::binary_op(op, &current, operand)?)
    }

    /// Runs an `if` and its `elif` chain in one frame
    pub(crate) fn execute_if<'a>(
        &mut self,
        mut condition: &'a Expr,
        mut body: &'a [Stmt],
        mut orelse: &'a [Stmt],
    ) -> Result<(), Interrupt> {
        loop {
            if self.evaluate_expr(condition)?.is_truthy() {
                return self.execute_block(body);
            }
            match orelse {
                [Stmt {
                    kind:
                        StmtKind::If {
                            condition: next_condition,
                            body: next_body,
                            orelse: next_orelse,
                        },
                    location,
                }] => {
                    self.set_line(location.line);
                    self.checkpoint()?;
                    condition = next_condition;
                    body = next_body;
                    orelse = next_orelse;
                }
                _ => return self.execute_block(orelse),
            }
        }
    }

    pub(crate) fn execute_assert(&mut self, test: &Expr, message: Option<&Expr>) -> Result<(), Interrupt> {
        if self.evaluate_expr(test)?.is_truthy() {
            return Ok(());
        }
        let args = match message {
            Some(message) => vec![self.evaluate_expr(message)?],
            None => Vec::new(),
        };
        Err(Exception::with_args(ExceptionKind::AssertionError, args).into())
    }

    pub(crate) fn delete_target(&mut self, target: &Expr) -> Result<(), Interrupt> {
        match &target.kind {
            ExprKind::Name(name) => Ok(self.delete_name(name)?),
            ExprKind::Tuple(items) | ExprKind::List(items) => {
                items.iter().try_for_each(|item| self.delete_target(item))
            }
            ExprKind::Subscript { object, index } => {
                let object = self.evaluate_expr(object)?;
                if let ExprKind::Slice { lower, upper, step } = &index.kind {
                    let bounds = self.evaluate_slice_bounds(lower, upper, step)?;
                    return Ok(access::delete_slice(&object, bounds)?);
                }
                let index = self.evaluate_expr(index)?;
                Ok(access::delete_item(&object, &index)?)
            }
            ExprKind::Attribute { object, name } => {
                let object = self.evaluate_expr(object)?;
                Err(read_only_attribute(&object, name).into())
            }
            other => Err(Exception::new(
                ExceptionKind::TypeError,
                format!("cannot delete {}", other.describe()),
            )
            .into()),
        }
    }

    pub(crate) fn execute_import(&mut self, aliases: &[Alias]) -> Result<(), Interrupt> {
        for alias in aliases {
            let module = modules::import(&alias.name)?;
            let bound = alias.alias.as_deref().unwrap_or(module);
            self.store_name(bound, Value::Module(module));
        }
        Ok(())
    }

    pub(crate) fn execute_import_from(&mut self, module: &str, names: &[Alias]) -> Result<(), Interrupt> {
        let module = modules::import(module)?;
        for alias in names {
            let value = modules::attribute(module, &alias.name).ok_or_else(|| {
                Exception::new(
                    ExceptionKind::ImportError,
                    format!(
                        "cannot import name '{}' from '{}' (unknown location)",
                        alias.name, module
                    ),
                )
            })?;
            self.store_name(alias.alias.as_deref().unwrap_or(&alias.name), value);
        }
        Ok(())
    }
}

fn read_only_attribute(object: &Value, name: &str) -> Exception {
    let message = match access::get_attribute(object, name) {
        Ok(_) => format!(
            "'{}' object attribute '{}' is read-only",
            object.type_name(),
            name
        ),
        Err(_) => format!("'{}' object has no attribute '{}'", object.type_name(), name),
    };
    Exception::new(ExceptionKind::AttributeError, message)
}
