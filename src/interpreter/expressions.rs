//! Expression evaluation helpers
//!
//! The dispatcher in `engine` handles literals and simple operators inline
//! and delegates everything with more structure to the methods here:
//! f-strings, dict displays, short-circuit boolean operators, comparison
//! chains, subscripts and slices, and comprehensions.
//!
//! Comprehensions run in their own frame so their loop variables never leak
//! into the enclosing scope. The first iterable is evaluated before that
//! frame is entered.

use crate::interpreter::constants::MAX_SEQUENCE_LEN;
use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::{Exception, ExceptionKind, Interrupt};
use crate::interpreter::loops::iterate;
use crate::interpreter::ops::access::{self, SliceBounds};
use crate::interpreter::ops::compare;
use crate::parser::ast::*;
use crate::runtime::format::convert_and_format;
use crate::runtime::value::{Dict, Value};

impl Interpreter {
    pub(crate) fn evaluate_fstring(&mut self, parts: &[FStringPart]) -> Result<Value, Interrupt> {
        let mut text = String::new();
        for part in parts {
            match part {
                FStringPart::Literal(literal) => text.push_str(literal),
                FStringPart::Field {
                    expr,
                    conversion,
                    spec,
                } => {
                    let value = self.evaluate_expr(expr)?;
                    let formatted =
                        convert_and_format(&value, *conversion, spec.as_deref().unwrap_or(""))?;
                    text.push_str(&formatted);
                }
            }
        }
        Ok(Value::from(text))
    }

    pub(crate) fn evaluate_dict(&mut self, pairs: &[(Expr, Expr)]) -> Result<Value, Interrupt> {
        let mut dict = Dict::new();
        for (key, value) in pairs {
            let key = self.evaluate_expr(key)?;
            let value = self.evaluate_expr(value)?;
            dict.insert(key, value)?;
        }
        Ok(Value::dict(dict))
    }

    /// `and` / `or`: yields the deciding operand itself
    pub(crate) fn evaluate_bool_op(&mut self, op: BoolOp, left: &Expr, right: &Expr) -> Result<Value, Interrupt> {
        let left = self.evaluate_expr(left)?;
        let decided = match op {
            BoolOp::And => !left.is_truthy(),
            BoolOp::Or => left.is_truthy(),
        };
        if decided {
            Ok(left)
        } else {
            self.evaluate_expr(right)
        }
    }

    /// `a < b <= c` evaluates each operand at most once and stops at the first false link
    pub(crate) fn evaluate_compare(
        &mut self,
        left: &Expr,
        ops: &[CmpOp],
        comparators: &[Expr],
    ) -> Result<Value, Interrupt> {
        let mut left = self.evaluate_expr(left)?;
        for (op, comparator) in ops.iter().zip(comparators) {
            let right = self.evaluate_expr(comparator)?;
            if !compare::compare(*op, &left, &right)? {
                return Ok(Value::Bool(false));
            }
            left = right;
        }
        Ok(Value::Bool(true))
    }

    pub(crate) fn evaluate_subscript(&mut self, object: &Expr, index: &Expr) -> Result<Value, Interrupt> {
        let object = self.evaluate_expr(object)?;
        if let ExprKind::Slice { lower, upper, step } = &index.kind {
            let bounds = self.evaluate_slice_bounds(lower, upper, step)?;
            return Ok(access::get_slice(&object, bounds)?);
        }
        let index = self.evaluate_expr(index)?;
        Ok(access::get_item(&object, &index)?)
    }

    pub(crate) fn evaluate_slice_bounds(
        &mut self,
        lower: &Option<Box<Expr>>,
        upper: &Option<Box<Expr>>,
        step: &Option<Box<Expr>>,
    ) -> Result<SliceBounds, Interrupt> {
        Ok(SliceBounds {
            lower: self.evaluate_slice_bound(lower)?,
            upper: self.evaluate_slice_bound(upper)?,
            step: self.evaluate_slice_bound(step)?,
        })
    }

    fn evaluate_slice_bound(&mut self, bound: &Option<Box<Expr>>) -> Result<Option<i64>, Interrupt> {
        let Some(expr) = bound else {
            return Ok(None);
        };
        match self.evaluate_expr(expr)? {
            Value::None => Ok(None),
            value => match value.as_int() {
                Some(n) => Ok(Some(n)),
                None => Err(Exception::new(
                    ExceptionKind::TypeError,
                    "slice indices must be integers or None or have an __index__ method",
                )
                .into()),
            },
        }
    }

    pub(crate) fn evaluate_list_comp(
        &mut self,
        element: &Expr,
        generators: &[Comprehension],
    ) -> Result<Value, Interrupt> {
        let mut items = Vec::new();
        self.run_comprehension("<listcomp>", generators, &mut |interp| {
            if items.len() >= MAX_SEQUENCE_LEN {
                return Err(Exception::with_args(ExceptionKind::MemoryError, Vec::new()).into());
            }
            items.push(interp.evaluate_expr(element)?);
            Ok(())
        })?;
        Ok(Value::list(items))
    }

    pub(crate) fn evaluate_dict_comp(
        &mut self,
        key: &Expr,
        value: &Expr,
        generators: &[Comprehension],
    ) -> Result<Value, Interrupt> {
        let mut dict = Dict::new();
        self.run_comprehension("<dictcomp>", generators, &mut |interp| {
            let key = interp.evaluate_expr(key)?;
            let value = interp.evaluate_expr(value)?;
            dict.insert(key, value)?;
            Ok(())
        })?;
        Ok(Value::dict(dict))
    }

    fn run_comprehension(
        &mut self,
        name: &str,
        generators: &[Comprehension],
        emit: &mut dyn FnMut(&mut Interpreter) -> Result<(), Interrupt>,
    ) -> Result<(), Interrupt> {
        let Some(first) = generators.first() else {
            return emit(self);
        };
        let iterable = self.evaluate_expr(&first.iter)?;

        let frame = self.nested_frame(name);
        self.push_frame(frame);
        let result = self.comprehension_level(generators, 0, iterable, emit);
        self.pop_frame();
        result
    }

    fn comprehension_level(
        &mut self,
        generators: &[Comprehension],
        depth: usize,
        iterable: Value,
        emit: &mut dyn FnMut(&mut Interpreter) -> Result<(), Interrupt>,
    ) -> Result<(), Interrupt> {
        let generator = &generators[depth];

        'items: for item in iterate(&iterable)? {
            self.checkpoint()?;
            self.assign_target(&generator.target, item)?;

            for condition in &generator.conditions {
                if !self.evaluate_expr(condition)?.is_truthy() {
                    continue 'items;
                }
            }

            match generators.get(depth + 1) {
                Some(next) => {
                    let inner = self.evaluate_expr(&next.iter)?;
                    self.comprehension_level(generators, depth + 1, inner, emit)?;
                }
                None => emit(self)?,
            }
        }
        Ok(())
    }
}
