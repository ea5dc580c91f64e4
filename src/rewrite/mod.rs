//! Tail-expression capture
//!
//! A snippet whose last top-level statement is a bare expression evaluates to
//! that expression's value. [`capture_tail_expression`] rewrites such a program
//! so the final statement assigns the expression into the result slot; the
//! executor reads the slot once the run completes.
//!
//! Nodes introduced or relocated by the rewrite carry the location of the
//! statement they replace, so diagnostics raised while evaluating the captured
//! expression still point at the line the user wrote.

use crate::parser::ast::*;
use std::rc::Rc;

/// Replace a trailing expression statement with an assignment to the result slot.
///
/// Programs that are empty or end in any other statement are returned unchanged.
pub fn capture_tail_expression(mut program: Program) -> Program {
    let Some(last) = program.body.last_mut() else {
        return program;
    };

    let location = last.location;
    let kind = std::mem::replace(&mut last.kind, StmtKind::Pass);
    last.kind = match kind {
        StmtKind::Expr(mut value) => {
            stamp_location(&mut value, location);
            StmtKind::Assign {
                targets: vec![Expr::new(ExprKind::ResultSlot, location)],
                value,
            }
        }
        other => other,
    };

    program
}

/// Set `location` on `expr` and every node below it.
pub fn stamp_location(expr: &mut Expr, location: SourceLocation) {
    expr.location = location;

    match &mut expr.kind {
        ExprKind::Int(_)
        | ExprKind::Float(_)
        | ExprKind::Str(_)
        | ExprKind::Bool(_)
        | ExprKind::NoneLiteral
        | ExprKind::Name(_)
        | ExprKind::ResultSlot => {}

        ExprKind::FString(parts) => {
            for part in parts {
                if let FStringPart::Field { expr, .. } = part {
                    stamp_location(expr, location);
                }
            }
        }
        ExprKind::List(items) | ExprKind::Tuple(items) => {
            stamp_all(items, location);
        }
        ExprKind::Dict(entries) => {
            for (key, value) in entries {
                stamp_location(key, location);
                stamp_location(value, location);
            }
        }
        ExprKind::BinaryOp { left, right, .. } | ExprKind::BoolOp { left, right, .. } => {
            stamp_location(left, location);
            stamp_location(right, location);
        }
        ExprKind::UnaryOp { operand, .. } => stamp_location(operand, location),
        ExprKind::Compare {
            left, comparators, ..
        } => {
            stamp_location(left, location);
            stamp_all(comparators, location);
        }
        ExprKind::IfExp {
            condition,
            then_expr,
            else_expr,
        } => {
            stamp_location(condition, location);
            stamp_location(then_expr, location);
            stamp_location(else_expr, location);
        }
        ExprKind::Call {
            func,
            args,
            keywords,
        } => {
            stamp_location(func, location);
            stamp_all(args, location);
            for keyword in keywords {
                stamp_location(&mut keyword.value, location);
            }
        }
        ExprKind::Attribute { object, .. } => stamp_location(object, location),
        ExprKind::Subscript { object, index } => {
            stamp_location(object, location);
            stamp_location(index, location);
        }
        ExprKind::Slice { lower, upper, step } => {
            for bound in [lower, upper, step].into_iter().flatten() {
                stamp_location(bound, location);
            }
        }
        ExprKind::Lambda(def) => stamp_function(def, location),
        ExprKind::ListComp {
            element,
            generators,
        } => {
            stamp_location(element, location);
            stamp_generators(generators, location);
        }
        ExprKind::DictComp {
            key,
            value,
            generators,
        } => {
            stamp_location(key, location);
            stamp_location(value, location);
            stamp_generators(generators, location);
        }
    }
}

/// Set `location` on a statement and everything nested inside it.
pub fn stamp_statement(stmt: &mut Stmt, location: SourceLocation) {
    stmt.location = location;

    match &mut stmt.kind {
        StmtKind::Expr(expr) | StmtKind::Return(Some(expr)) | StmtKind::Raise(Some(expr)) => {
            stamp_location(expr, location);
        }
        StmtKind::Assign { targets, value } => {
            stamp_all(targets, location);
            stamp_location(value, location);
        }
        StmtKind::AugAssign { target, value, .. } => {
            stamp_location(target, location);
            stamp_location(value, location);
        }
        StmtKind::If {
            condition,
            body,
            orelse,
        }
        | StmtKind::While {
            condition,
            body,
            orelse,
        } => {
            stamp_location(condition, location);
            stamp_block(body, location);
            stamp_block(orelse, location);
        }
        StmtKind::For {
            target,
            iter,
            body,
            orelse,
        } => {
            stamp_location(target, location);
            stamp_location(iter, location);
            stamp_block(body, location);
            stamp_block(orelse, location);
        }
        StmtKind::FunctionDef(def) => stamp_function(def, location),
        StmtKind::Try {
            body,
            handlers,
            orelse,
            finalbody,
        } => {
            stamp_block(body, location);
            for handler in handlers {
                handler.location = location;
                if let Some(exception_type) = &mut handler.exception_type {
                    stamp_location(exception_type, location);
                }
                stamp_block(&mut handler.body, location);
            }
            stamp_block(orelse, location);
            stamp_block(finalbody, location);
        }
        StmtKind::Assert { test, message } => {
            stamp_location(test, location);
            if let Some(message) = message {
                stamp_location(message, location);
            }
        }
        StmtKind::Delete(targets) => stamp_all(targets, location),
        StmtKind::Return(None)
        | StmtKind::Raise(None)
        | StmtKind::Break
        | StmtKind::Continue
        | StmtKind::Pass
        | StmtKind::Global(_)
        | StmtKind::Import(_)
        | StmtKind::ImportFrom { .. } => {}
    }
}

fn stamp_all(exprs: &mut [Expr], location: SourceLocation) {
    for expr in exprs {
        stamp_location(expr, location);
    }
}

fn stamp_block(body: &mut [Stmt], location: SourceLocation) {
    for stmt in body {
        stamp_statement(stmt, location);
    }
}

fn stamp_generators(generators: &mut [Comprehension], location: SourceLocation) {
    for generator in generators {
        stamp_location(&mut generator.target, location);
        stamp_location(&mut generator.iter, location);
        stamp_all(&mut generator.conditions, location);
    }
}

fn stamp_function(def: &mut Rc<FunctionDef>, location: SourceLocation) {
    let def = Rc::make_mut(def);
    def.location = location;
    for param in &mut def.params {
        param.location = location;
        if let Some(default) = &mut param.default {
            stamp_location(default, location);
        }
    }
    stamp_block(&mut def.body, location);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_snippet;

    fn rewrite(source: &str) -> Program {
        capture_tail_expression(parse_snippet(source).unwrap())
    }

    fn assert_all_at(expr: &Expr, line: usize) {
        assert_eq!(expr.location.line, line, "node {:?}", expr.kind);
        match &expr.kind {
            ExprKind::BinaryOp { left, right, .. } => {
                assert_all_at(left, line);
                assert_all_at(right, line);
            }
            ExprKind::Call { func, args, .. } => {
                assert_all_at(func, line);
                for arg in args {
                    assert_all_at(arg, line);
                }
            }
            ExprKind::List(items) => {
                for item in items {
                    assert_all_at(item, line);
                }
            }
            _ => {}
        }
    }

    #[test]
    fn test_tail_expression_is_captured() {
        let program = rewrite("x = 5\nx * 2");
        assert_eq!(program.body.len(), 2);
        match &program.body[1].kind {
            StmtKind::Assign { targets, value } => {
                assert_eq!(targets.len(), 1);
                assert!(matches!(targets[0].kind, ExprKind::ResultSlot));
                assert!(matches!(value.kind, ExprKind::BinaryOp { op: BinOp::Mul, .. }));
            }
            other => panic!("Expected result slot assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_other_statements_untouched() {
        let program = rewrite("x = 1\nprint(x)\ny = 2");
        assert!(matches!(program.body[1].kind, StmtKind::Expr(_)));
        match &program.body[2].kind {
            StmtKind::Assign { targets, .. } => {
                assert!(matches!(&targets[0].kind, ExprKind::Name(n) if n == "y"));
            }
            other => panic!("Expected assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_program_unchanged() {
        let program = rewrite("");
        assert!(program.body.is_empty());
        let program = rewrite("# only a comment\n");
        assert!(program.body.is_empty());
    }

    #[test]
    fn test_compound_tail_not_captured() {
        let program = rewrite("for i in range(3):\n    i\n");
        match &program.body[0].kind {
            StmtKind::For { body, .. } => assert!(matches!(body[0].kind, StmtKind::Expr(_))),
            other => panic!("Expected for loop, got {:?}", other),
        }
    }

    #[test]
    fn test_locations_stamped_recursively() {
        let program = rewrite("a = 1\n\nmax([a,\n     2],\n    3)");
        let stmt = &program.body[1];
        assert_eq!(stmt.location.line, 3);
        match &stmt.kind {
            StmtKind::Assign { targets, value } => {
                assert_eq!(targets[0].location, stmt.location);
                assert_all_at(value, 3);
                assert_eq!(value.location, stmt.location);
            }
            other => panic!("Expected assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_lambda_body_is_stamped() {
        let mut expr = Expr::new(
            ExprKind::Lambda(Rc::new(FunctionDef {
                name: "<lambda>".to_string(),
                params: Vec::new(),
                body: vec![Stmt::new(
                    StmtKind::Return(Some(Expr::new(
                        ExprKind::Int(1),
                        SourceLocation::new(9, 9),
                    ))),
                    SourceLocation::new(9, 9),
                )],
                location: SourceLocation::new(9, 1),
            })),
            SourceLocation::new(9, 1),
        );
        stamp_location(&mut expr, SourceLocation::new(2, 1));
        match &expr.kind {
            ExprKind::Lambda(def) => {
                assert_eq!(def.location.line, 2);
                assert_eq!(def.body[0].location.line, 2);
            }
            other => panic!("Expected lambda, got {:?}", other),
        }
    }
}
