//! Structural validation of a parsed snippet
//!
//! [`compile`] walks the whole tree once before execution and rejects
//! programs that parse but can never run: `break`/`continue` outside a loop,
//! `return` outside a function, assignments and deletions of things that are
//! not targets, malformed parameter lists, repeated keyword arguments and
//! `global` declarations that come after the name was already used.
//! Every failure is a [`SyntaxError`] pointing at the offending node.

use crate::parser::ast::*;
use crate::parser::SyntaxError;
use rustc_hash::FxHashSet;

/// A validated program, ready to execute
#[derive(Debug, Clone)]
pub struct CompiledUnit {
    pub program: Program,
    pub filename: String,
}

/// Validate `program`
pub fn compile(program: Program, filename: &str) -> Result<CompiledUnit, SyntaxError> {
    let mut checker = Checker::new(false);
    checker.check_block(&program.body)?;
    tracing::trace!(statements = program.body.len(), "snippet compiled");
    Ok(CompiledUnit {
        program,
        filename: filename.to_string(),
    })
}

/// Names a function body declares `global`, ignoring nested functions
pub(crate) fn declared_globals(body: &[Stmt]) -> FxHashSet<String> {
    fn collect(body: &[Stmt], names: &mut FxHashSet<String>) {
        for stmt in body {
            match &stmt.kind {
                StmtKind::Global(declared) => names.extend(declared.iter().cloned()),
                StmtKind::If { body, orelse, .. }
                | StmtKind::While { body, orelse, .. }
                | StmtKind::For { body, orelse, .. } => {
                    collect(body, names);
                    collect(orelse, names);
                }
                StmtKind::Try {
                    body,
                    handlers,
                    orelse,
                    finalbody,
                } => {
                    collect(body, names);
                    for handler in handlers {
                        collect(&handler.body, names);
                    }
                    collect(orelse, names);
                    collect(finalbody, names);
                }
                _ => {}
            }
        }
    }

    let mut names = FxHashSet::default();
    collect(body, &mut names);
    names
}

struct Checker {
    loop_depth: usize,
    in_function: bool,
    used: FxHashSet<String>,
    assigned: FxHashSet<String>,
}

impl Checker {
    fn new(in_function: bool) -> Self {
        Self {
            loop_depth: 0,
            in_function,
            used: FxHashSet::default(),
            assigned: FxHashSet::default(),
        }
    }

    fn check_block(&mut self, body: &[Stmt]) -> Result<(), SyntaxError> {
        body.iter().try_for_each(|stmt| self.check_statement(stmt))
    }

    fn check_statement(&mut self, stmt: &Stmt) -> Result<(), SyntaxError> {
        let location = stmt.location;
        match &stmt.kind {
            StmtKind::Expr(expr) => self.check_expr(expr),
            StmtKind::Assign { targets, value } => {
                self.check_expr(value)?;
                targets
                    .iter()
                    .try_for_each(|target| self.check_target(target))
            }
            StmtKind::AugAssign { target, value, .. } => {
                match &target.kind {
                    ExprKind::Name(name) => {
                        self.used.insert(name.clone());
                        self.assigned.insert(name.clone());
                    }
                    ExprKind::Attribute { .. } | ExprKind::Subscript { .. } => {
                        self.check_expr(target)?;
                    }
                    other => {
                        return Err(SyntaxError::new(
                            format!(
                                "'{}' is an illegal expression for augmented assignment",
                                other.describe()
                            ),
                            target.location,
                        ));
                    }
                }
                self.check_expr(value)
            }
            StmtKind::If {
                condition,
                body,
                orelse,
            } => {
                self.check_expr(condition)?;
                self.check_block(body)?;
                self.check_block(orelse)
            }
            StmtKind::While {
                condition,
                body,
                orelse,
            } => {
                self.check_expr(condition)?;
                self.check_loop_body(body)?;
                self.check_block(orelse)
            }
            StmtKind::For {
                target,
                iter,
                body,
                orelse,
            } => {
                self.check_expr(iter)?;
                self.check_target(target)?;
                self.check_loop_body(body)?;
                self.check_block(orelse)
            }
            StmtKind::FunctionDef(def) => {
                self.check_function(def)?;
                self.assigned.insert(def.name.clone());
                Ok(())
            }
            StmtKind::Return(value) => {
                if !self.in_function {
                    return Err(SyntaxError::new("'return' outside function", location));
                }
                value.iter().try_for_each(|expr| self.check_expr(expr))
            }
            StmtKind::Break => {
                if self.loop_depth == 0 {
                    return Err(SyntaxError::new("'break' outside loop", location));
                }
                Ok(())
            }
            StmtKind::Continue => {
                if self.loop_depth == 0 {
                    return Err(SyntaxError::new(
                        "'continue' not properly in loop",
                        location,
                    ));
                }
                Ok(())
            }
            StmtKind::Pass => Ok(()),
            StmtKind::Raise(value) => value.iter().try_for_each(|expr| self.check_expr(expr)),
            StmtKind::Try {
                body,
                handlers,
                orelse,
                finalbody,
            } => {
                self.check_block(body)?;
                for handler in handlers {
                    if let Some(exception_type) = &handler.exception_type {
                        self.check_expr(exception_type)?;
                    }
                    if let Some(name) = &handler.name {
                        self.assigned.insert(name.clone());
                    }
                    self.check_block(&handler.body)?;
                }
                self.check_block(orelse)?;
                self.check_block(finalbody)
            }
            StmtKind::Assert { test, message } => {
                self.check_expr(test)?;
                message.iter().try_for_each(|expr| self.check_expr(expr))
            }
            StmtKind::Global(names) => {
                for name in names {
                    if self.assigned.contains(name) {
                        return Err(SyntaxError::new(
                            format!("name '{}' is assigned to before global declaration", name),
                            location,
                        ));
                    }
                    if self.used.contains(name) {
                        return Err(SyntaxError::new(
                            format!("name '{}' is used prior to global declaration", name),
                            location,
                        ));
                    }
                }
                Ok(())
            }
            StmtKind::Delete(targets) => targets
                .iter()
                .try_for_each(|target| self.check_delete_target(target)),
            StmtKind::Import(aliases) => {
                for alias in aliases {
                    let bound = alias
                        .alias
                        .clone()
                        .unwrap_or_else(|| alias.name.split('.').next().unwrap_or_default().to_string());
                    self.assigned.insert(bound);
                }
                Ok(())
            }
            StmtKind::ImportFrom { names, .. } => {
                for alias in names {
                    self.assigned
                        .insert(alias.alias.clone().unwrap_or_else(|| alias.name.clone()));
                }
                Ok(())
            }
        }
    }

    fn check_loop_body(&mut self, body: &[Stmt]) -> Result<(), SyntaxError> {
        self.loop_depth += 1;
        let result = self.check_block(body);
        self.loop_depth -= 1;
        result
    }

    fn check_function(&mut self, def: &FunctionDef) -> Result<(), SyntaxError> {
        let mut seen = FxHashSet::default();
        let mut saw_default = false;
        for param in &def.params {
            if !seen.insert(param.name.as_str()) {
                return Err(SyntaxError::new(
                    format!(
                        "duplicate argument '{}' in function definition",
                        param.name
                    ),
                    param.location,
                ));
            }
            match &param.default {
                Some(default) => {
                    self.check_expr(default)?;
                    saw_default = true;
                }
                None if saw_default => {
                    return Err(SyntaxError::new(
                        "non-default argument follows default argument",
                        param.location,
                    ));
                }
                None => {}
            }
        }

        let mut inner = Checker::new(true);
        for param in &def.params {
            inner.assigned.insert(param.name.clone());
        }
        inner.check_block(&def.body)
    }

    fn check_target(&mut self, target: &Expr) -> Result<(), SyntaxError> {
        match &target.kind {
            ExprKind::Name(name) => {
                self.assigned.insert(name.clone());
                Ok(())
            }
            ExprKind::ResultSlot => Ok(()),
            ExprKind::Tuple(items) | ExprKind::List(items) => {
                items.iter().try_for_each(|item| self.check_target(item))
            }
            ExprKind::Subscript { object, index } => {
                self.check_expr(object)?;
                self.check_expr(index)
            }
            ExprKind::Attribute { object, .. } => self.check_expr(object),
            other => Err(SyntaxError::new(
                format!("cannot assign to {}", other.describe()),
                target.location,
            )),
        }
    }

    fn check_delete_target(&mut self, target: &Expr) -> Result<(), SyntaxError> {
        match &target.kind {
            ExprKind::Name(name) => {
                self.used.insert(name.clone());
                Ok(())
            }
            ExprKind::Tuple(items) | ExprKind::List(items) => items
                .iter()
                .try_for_each(|item| self.check_delete_target(item)),
            ExprKind::Subscript { .. } | ExprKind::Attribute { .. } => self.check_expr(target),
            other => Err(SyntaxError::new(
                format!("cannot delete {}", other.describe()),
                target.location,
            )),
        }
    }

    fn check_expr(&mut self, expr: &Expr) -> Result<(), SyntaxError> {
        match &expr.kind {
            ExprKind::Int(_)
            | ExprKind::Float(_)
            | ExprKind::Str(_)
            | ExprKind::Bool(_)
            | ExprKind::NoneLiteral
            | ExprKind::ResultSlot => Ok(()),
            ExprKind::Name(name) => {
                self.used.insert(name.clone());
                Ok(())
            }
            ExprKind::FString(parts) => {
                for part in parts {
                    if let FStringPart::Field { expr, .. } = part {
                        self.check_expr(expr)?;
                    }
                }
                Ok(())
            }
            ExprKind::List(items) | ExprKind::Tuple(items) => {
                items.iter().try_for_each(|item| self.check_expr(item))
            }
            ExprKind::Dict(pairs) => pairs.iter().try_for_each(|(key, value)| {
                self.check_expr(key)?;
                self.check_expr(value)
            }),
            ExprKind::BinaryOp { left, right, .. } | ExprKind::BoolOp { left, right, .. } => {
                self.check_expr(left)?;
                self.check_expr(right)
            }
            ExprKind::UnaryOp { operand, .. } => self.check_expr(operand),
            ExprKind::Compare {
                left, comparators, ..
            } => {
                self.check_expr(left)?;
                comparators.iter().try_for_each(|item| self.check_expr(item))
            }
            ExprKind::IfExp {
                condition,
                then_expr,
                else_expr,
            } => {
                self.check_expr(condition)?;
                self.check_expr(then_expr)?;
                self.check_expr(else_expr)
            }
            ExprKind::Call {
                func,
                args,
                keywords,
            } => {
                self.check_expr(func)?;
                args.iter().try_for_each(|arg| self.check_expr(arg))?;
                let mut seen = FxHashSet::default();
                for keyword in keywords {
                    if !seen.insert(keyword.name.as_str()) {
                        return Err(SyntaxError::new(
                            format!("keyword argument repeated: {}", keyword.name),
                            keyword.value.location,
                        ));
                    }
                    self.check_expr(&keyword.value)?;
                }
                Ok(())
            }
            ExprKind::Attribute { object, .. } => self.check_expr(object),
            ExprKind::Subscript { object, index } => {
                self.check_expr(object)?;
                self.check_expr(index)
            }
            ExprKind::Slice { lower, upper, step } => [lower, upper, step]
                .into_iter()
                .flatten()
                .try_for_each(|bound| self.check_expr(bound)),
            ExprKind::Lambda(def) => self.check_function(def),
            ExprKind::ListComp {
                element,
                generators,
            } => {
                self.check_generators(generators)?;
                self.check_expr(element)
            }
            ExprKind::DictComp {
                key,
                value,
                generators,
            } => {
                self.check_generators(generators)?;
                self.check_expr(key)?;
                self.check_expr(value)
            }
        }
    }

    fn check_generators(&mut self, generators: &[Comprehension]) -> Result<(), SyntaxError> {
        for generator in generators {
            self.check_expr(&generator.iter)?;
            self.check_comprehension_target(&generator.target)?;
            generator
                .conditions
                .iter()
                .try_for_each(|condition| self.check_expr(condition))?;
        }
        Ok(())
    }

    /// Comprehension variables live in their own scope
    fn check_comprehension_target(&mut self, target: &Expr) -> Result<(), SyntaxError> {
        match &target.kind {
            ExprKind::Name(_) => Ok(()),
            ExprKind::Tuple(items) | ExprKind::List(items) => items
                .iter()
                .try_for_each(|item| self.check_comprehension_target(item)),
            _ => self.check_target(target),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_snippet;

    fn compile_source(source: &str) -> Result<CompiledUnit, SyntaxError> {
        compile(parse_snippet(source)?, "<snippet>")
    }

    fn compile_error(source: &str) -> SyntaxError {
        match compile_source(source) {
            Err(err) => err,
            Ok(_) => panic!("expected a compile error for {:?}", source),
        }
    }

    #[test]
    fn test_valid_program_compiles() {
        let unit = compile_source("def f(a, b=1):\n    for i in range(a):\n        if i:\n            break\n    return b\nf(3)\n").unwrap();
        assert_eq!(unit.filename, "<snippet>");
        assert_eq!(unit.program.body.len(), 2);
    }

    #[test]
    fn test_break_outside_loop() {
        let err = compile_error("x = 1\nbreak\n");
        assert_eq!(err.message, "'break' outside loop");
        assert_eq!(err.location.line, 2);
    }

    #[test]
    fn test_continue_in_function_inside_loop_is_rejected() {
        let err = compile_error("while True:\n    def f():\n        continue\n");
        assert_eq!(err.message, "'continue' not properly in loop");
    }

    #[test]
    fn test_return_outside_function() {
        let err = compile_error("return 5\n");
        assert_eq!(err.message, "'return' outside function");
    }

    #[test]
    fn test_invalid_assignment_target() {
        let err = compile_error("f() = 3\n");
        assert_eq!(err.message, "cannot assign to function call");
        let err = compile_error("1 += 2\n");
        assert!(err.message.contains("illegal expression for augmented assignment"));
        let err = compile_error("del 5\n");
        assert_eq!(err.message, "cannot delete literal");
    }

    #[test]
    fn test_parameter_checks() {
        let err = compile_error("def f(a, a):\n    pass\n");
        assert_eq!(err.message, "duplicate argument 'a' in function definition");
        let err = compile_error("def f(a=1, b):\n    pass\n");
        assert_eq!(err.message, "non-default argument follows default argument");
    }

    #[test]
    fn test_repeated_keyword() {
        let err = compile_error("f(a=1, a=2)\n");
        assert_eq!(err.message, "keyword argument repeated: a");
    }

    #[test]
    fn test_global_after_use() {
        let err = compile_error("def f():\n    print(x)\n    global x\n");
        assert_eq!(err.message, "name 'x' is used prior to global declaration");
        assert!(compile_source("def f():\n    global x\n    x = 1\n").is_ok());
    }

    #[test]
    fn test_declared_globals_skips_nested_functions() {
        let program = parse_snippet(
            "global a\nif True:\n    global b\ndef g():\n    global c\n",
        )
        .unwrap();
        let names = declared_globals(&program.body);
        assert!(names.contains("a"));
        assert!(names.contains("b"));
        assert!(!names.contains("c"));
    }
}
