//! Statement parsing implementation
//!
//! This module handles parsing of logical lines and compound statements:
//!
//! - Simple statements: expressions, assignments, `pass`, `return`, `raise`,
//!   `global`, `del`, `assert`, `import`, separated by `;` on one line
//! - Compound statements: `if`/`elif`/`else`, `while`, `for`, `def`,
//!   `try`/`except`/`else`/`finally`, each owning an indented block
//!
//! # Grammar
//!
//! ```text
//! statement   ::= compound_stmt | simple_stmt (';' simple_stmt)* [';'] NEWLINE
//! block       ::= ':' (simple_line | NEWLINE INDENT statement+ DEDENT)
//! ```
//!
//! All parsing methods are implemented as `pub(crate)` methods on the [`Parser`] struct.

use crate::interpreter::constants::MAX_ELIF_BRANCHES;
use crate::parser::ast::*;
use crate::parser::lexer::TokenKind;
use crate::parser::parse::{Parser, SyntaxError};
use std::rc::Rc;

impl Parser {
    /// Parse one compound statement or one logical line of simple statements
    pub(crate) fn parse_statement(&mut self) -> Result<Vec<Stmt>, SyntaxError> {
        let loc = self.current_location();

        let stmt = match self.peek_kind() {
            TokenKind::If => {
                self.advance();
                return self.parse_if_statement(loc);
            }
            TokenKind::While => {
                self.advance();
                self.parse_while_statement(loc)?
            }
            TokenKind::For => {
                self.advance();
                self.parse_for_statement(loc)?
            }
            TokenKind::Def => {
                self.advance();
                self.parse_function_definition(loc)?
            }
            TokenKind::Try => {
                self.advance();
                self.parse_try_statement(loc)?
            }
            TokenKind::Reserved(word) => {
                return Err(SyntaxError::new(
                    format!("'{}' is not supported in snippets", word),
                    loc,
                ));
            }
            _ => return self.parse_simple_line(),
        };

        Ok(vec![stmt])
    }

    /// Parse the body of a compound statement, starting at its ':'
    pub(crate) fn parse_block(
        &mut self,
        context: &str,
        header: SourceLocation,
    ) -> Result<Vec<Stmt>, SyntaxError> {
        self.expect_colon()?;
        self.enter_block(header)?;
        let body = self.parse_block_body(context, header);
        self.leave_block();
        body
    }

    fn parse_block_body(
        &mut self,
        context: &str,
        header: SourceLocation,
    ) -> Result<Vec<Stmt>, SyntaxError> {
        if !self.match_token(&TokenKind::Newline) {
            return self.parse_simple_line();
        }

        if !self.match_token(&TokenKind::Indent) {
            return Err(SyntaxError::indentation(
                format!(
                    "expected an indented block after {} on line {}",
                    context, header.line
                ),
                self.current_location(),
            ));
        }

        let mut body = Vec::new();
        while !self.check(&TokenKind::Dedent) && !self.is_at_end() {
            if self.match_token(&TokenKind::Newline) {
                continue;
            }
            body.extend(self.parse_statement()?);
        }
        self.match_token(&TokenKind::Dedent);

        Ok(body)
    }

    fn parse_simple_line(&mut self) -> Result<Vec<Stmt>, SyntaxError> {
        let mut statements = vec![self.parse_simple_statement()?];

        while self.match_token(&TokenKind::Semicolon) {
            if self.check(&TokenKind::Newline) || self.is_at_end() {
                break;
            }
            statements.push(self.parse_simple_statement()?);
        }

        if self.match_token(&TokenKind::Newline) || self.is_at_end() {
            Ok(statements)
        } else {
            Err(self.unexpected())
        }
    }

    /// `if` with its `elif` branches, which nest as single-statement `else` blocks
    fn parse_if_statement(&mut self, loc: SourceLocation) -> Result<Vec<Stmt>, SyntaxError> {
        let condition = self.parse_expression()?;
        let body = self.parse_block("'if' statement", loc)?;
        let mut branches = vec![(loc, condition, body)];

        let mut orelse = Vec::new();
        loop {
            let else_loc = self.current_location();
            if self.match_token(&TokenKind::Elif) {
                if branches.len() > MAX_ELIF_BRANCHES {
                    return Err(SyntaxError::new("too many 'elif' branches", else_loc));
                }
                let condition = self.parse_expression()?;
                let body = self.parse_block("'elif' statement", else_loc)?;
                branches.push((else_loc, condition, body));
            } else {
                if self.match_token(&TokenKind::Else) {
                    orelse = self.parse_block("'else' statement", else_loc)?;
                }
                break;
            }
        }

        Ok(branches
            .into_iter()
            .rev()
            .fold(orelse, |orelse, (loc, condition, body)| {
                vec![Stmt::new(
                    StmtKind::If {
                        condition,
                        body,
                        orelse,
                    },
                    loc,
                )]
            }))
    }

    fn parse_while_statement(&mut self, loc: SourceLocation) -> Result<Stmt, SyntaxError> {
        let condition = self.parse_expression()?;
        let body = self.parse_block("'while' statement", loc)?;
        let orelse = self.parse_loop_else()?;

        Ok(Stmt::new(
            StmtKind::While {
                condition,
                body,
                orelse,
            },
            loc,
        ))
    }

    fn parse_for_statement(&mut self, loc: SourceLocation) -> Result<Stmt, SyntaxError> {
        let target = self.parse_target_list()?;
        self.expect_token(&TokenKind::In, "expected 'in'")?;
        let iter = self.parse_testlist()?;
        let body = self.parse_block("'for' statement", loc)?;
        let orelse = self.parse_loop_else()?;

        Ok(Stmt::new(
            StmtKind::For {
                target,
                iter,
                body,
                orelse,
            },
            loc,
        ))
    }

    fn parse_loop_else(&mut self) -> Result<Vec<Stmt>, SyntaxError> {
        let loc = self.current_location();
        if self.match_token(&TokenKind::Else) {
            self.parse_block("'else' statement", loc)
        } else {
            Ok(Vec::new())
        }
    }

    fn parse_function_definition(&mut self, loc: SourceLocation) -> Result<Stmt, SyntaxError> {
        let name = self.expect_name()?;
        self.expect_token(&TokenKind::LParen, "expected '('")?;
        let params = self.parse_parameters(&TokenKind::RParen, true)?;
        self.expect_token(&TokenKind::RParen, "expected ')'")?;

        // Return annotations are parsed and dropped
        if self.match_token(&TokenKind::Arrow) {
            self.parse_expression()?;
        }

        let body = self.parse_block("function definition", loc)?;

        Ok(Stmt::new(
            StmtKind::FunctionDef(Rc::new(FunctionDef {
                name,
                params,
                body,
                location: loc,
            })),
            loc,
        ))
    }

    fn parse_try_statement(&mut self, loc: SourceLocation) -> Result<Stmt, SyntaxError> {
        let body = self.parse_block("'try' statement", loc)?;

        let mut handlers = Vec::new();
        while self.check(&TokenKind::Except) {
            let handler_loc = self.current_location();
            self.advance();

            let (exception_type, name) = if self.check(&TokenKind::Colon) {
                (None, None)
            } else {
                let exception_type = self.parse_expression()?;
                let name = if self.match_token(&TokenKind::As) {
                    Some(self.expect_name()?)
                } else {
                    None
                };
                (Some(exception_type), name)
            };

            let body = self.parse_block("'except' statement", handler_loc)?;
            handlers.push(ExceptHandler {
                exception_type,
                name,
                body,
                location: handler_loc,
            });
        }

        let mut orelse = Vec::new();
        if !handlers.is_empty() && self.check(&TokenKind::Else) {
            let else_loc = self.current_location();
            self.advance();
            orelse = self.parse_block("'else' statement", else_loc)?;
        }

        let mut finalbody = Vec::new();
        let finally_loc = self.current_location();
        if self.match_token(&TokenKind::Finally) {
            finalbody = self.parse_block("'finally' statement", finally_loc)?;
        }

        if handlers.is_empty() && finalbody.is_empty() {
            return Err(SyntaxError::new(
                "expected 'except' or 'finally' block",
                self.current_location(),
            ));
        }

        Ok(Stmt::new(
            StmtKind::Try {
                body,
                handlers,
                orelse,
                finalbody,
            },
            loc,
        ))
    }

    fn parse_simple_statement(&mut self) -> Result<Stmt, SyntaxError> {
        let loc = self.current_location();

        let kind = match self.peek_kind() {
            TokenKind::Pass => {
                self.advance();
                StmtKind::Pass
            }
            TokenKind::Break => {
                self.advance();
                StmtKind::Break
            }
            TokenKind::Continue => {
                self.advance();
                StmtKind::Continue
            }
            TokenKind::Return => {
                self.advance();
                let value = if self.at_statement_end() {
                    None
                } else {
                    Some(self.parse_testlist()?)
                };
                StmtKind::Return(value)
            }
            TokenKind::Raise => {
                self.advance();
                let exception = if self.at_statement_end() {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                // `raise X from Y`: the cause is evaluated nowhere
                if exception.is_some() && self.match_token(&TokenKind::From) {
                    self.parse_expression()?;
                }
                StmtKind::Raise(exception)
            }
            TokenKind::Global => {
                self.advance();
                let mut names = vec![self.expect_name()?];
                while self.match_token(&TokenKind::Comma) {
                    names.push(self.expect_name()?);
                }
                StmtKind::Global(names)
            }
            TokenKind::Del => {
                self.advance();
                let mut targets = vec![self.parse_bitwise_or()?];
                while self.match_token(&TokenKind::Comma) {
                    if self.at_statement_end() {
                        break;
                    }
                    targets.push(self.parse_bitwise_or()?);
                }
                StmtKind::Delete(targets)
            }
            TokenKind::Assert => {
                self.advance();
                let test = self.parse_expression()?;
                let message = if self.match_token(&TokenKind::Comma) {
                    Some(self.parse_expression()?)
                } else {
                    None
                };
                StmtKind::Assert { test, message }
            }
            TokenKind::Import => {
                self.advance();
                let mut names = vec![self.parse_import_alias(true)?];
                while self.match_token(&TokenKind::Comma) {
                    names.push(self.parse_import_alias(true)?);
                }
                StmtKind::Import(names)
            }
            TokenKind::From => {
                self.advance();
                let module = self.parse_dotted_name()?;
                self.expect_token(&TokenKind::Import, "expected 'import'")?;
                if self.check(&TokenKind::Star) {
                    return Err(SyntaxError::new(
                        "wildcard imports are not supported in snippets",
                        self.current_location(),
                    ));
                }
                let parenthesized = self.match_token(&TokenKind::LParen);
                let mut names = vec![self.parse_import_alias(false)?];
                while self.match_token(&TokenKind::Comma) {
                    if parenthesized && self.check(&TokenKind::RParen) {
                        break;
                    }
                    names.push(self.parse_import_alias(false)?);
                }
                if parenthesized {
                    self.expect_token(&TokenKind::RParen, "expected ')'")?;
                }
                StmtKind::ImportFrom { module, names }
            }
            _ => return self.parse_expression_statement(loc),
        };

        Ok(Stmt::new(kind, loc))
    }

    /// Expression statement, plain/chained/augmented/annotated assignment
    fn parse_expression_statement(&mut self, loc: SourceLocation) -> Result<Stmt, SyntaxError> {
        let first = self.parse_testlist()?;

        if self.match_token(&TokenKind::Eq) {
            let mut targets = vec![first];
            let mut value = self.parse_testlist()?;
            while self.match_token(&TokenKind::Eq) {
                targets.push(value);
                value = self.parse_testlist()?;
            }
            return Ok(Stmt::new(StmtKind::Assign { targets, value }, loc));
        }

        if let Some(op) = augmented_operator(self.peek_kind()) {
            self.advance();
            let value = self.parse_testlist()?;
            return Ok(Stmt::new(
                StmtKind::AugAssign {
                    target: first,
                    op,
                    value,
                },
                loc,
            ));
        }

        if self.match_token(&TokenKind::Colon) {
            // Annotations are parsed and dropped
            self.parse_expression()?;
            if self.match_token(&TokenKind::Eq) {
                let value = self.parse_testlist()?;
                return Ok(Stmt::new(
                    StmtKind::Assign {
                        targets: vec![first],
                        value,
                    },
                    loc,
                ));
            }
            return Ok(Stmt::new(StmtKind::Pass, loc));
        }

        Ok(Stmt::new(StmtKind::Expr(first), loc))
    }

    fn parse_import_alias(&mut self, dotted: bool) -> Result<Alias, SyntaxError> {
        let name = if dotted {
            self.parse_dotted_name()?
        } else {
            self.expect_name()?
        };
        let alias = if self.match_token(&TokenKind::As) {
            Some(self.expect_name()?)
        } else {
            None
        };
        Ok(Alias { name, alias })
    }

    fn parse_dotted_name(&mut self) -> Result<String, SyntaxError> {
        let mut name = self.expect_name()?;
        while self.match_token(&TokenKind::Dot) {
            name.push('.');
            name.push_str(&self.expect_name()?);
        }
        Ok(name)
    }

    pub(crate) fn at_statement_end(&self) -> bool {
        matches!(
            self.peek_kind(),
            TokenKind::Newline | TokenKind::Semicolon | TokenKind::Eof
        )
    }
}

fn augmented_operator(kind: &TokenKind) -> Option<BinOp> {
    let op = match kind {
        TokenKind::PlusEq => BinOp::Add,
        TokenKind::MinusEq => BinOp::Sub,
        TokenKind::StarEq => BinOp::Mul,
        TokenKind::SlashEq => BinOp::Div,
        TokenKind::DoubleSlashEq => BinOp::FloorDiv,
        TokenKind::PercentEq => BinOp::Mod,
        TokenKind::DoubleStarEq => BinOp::Pow,
        TokenKind::AmpEq => BinOp::BitAnd,
        TokenKind::PipeEq => BinOp::BitOr,
        TokenKind::CaretEq => BinOp::BitXor,
        TokenKind::LtLtEq => BinOp::Shl,
        TokenKind::GtGtEq => BinOp::Shr,
        _ => return None,
    };
    Some(op)
}

#[cfg(test)]
mod tests {
    use crate::interpreter::constants::{MAX_BLOCK_DEPTH, MAX_ELIF_BRANCHES};
    use crate::parser::ast::*;
    use crate::parser::parse::{Parser, SyntaxError};

    fn parse(source: &str) -> Vec<Stmt> {
        Parser::new(source)
            .and_then(|mut p| p.parse_program())
            .unwrap_or_else(|e| panic!("Parse failed: {}", e))
            .body
    }

    #[test]
    fn test_if_elif_else_chain() {
        let body = parse("if a:\n    x = 1\nelif b:\n    x = 2\nelse:\n    x = 3\n");
        assert_eq!(body.len(), 1);
        match &body[0].kind {
            StmtKind::If { orelse, .. } => {
                assert_eq!(orelse.len(), 1);
                match &orelse[0].kind {
                    StmtKind::If { orelse, .. } => assert_eq!(orelse.len(), 1),
                    other => panic!("Expected elif, got {:?}", other),
                }
                assert_eq!(orelse[0].location.line, 3);
            }
            other => panic!("Expected if statement, got {:?}", other),
        }
    }

    #[test]
    fn test_single_line_loop_body() {
        let body = parse("while True: pass");
        match &body[0].kind {
            StmtKind::While { body, .. } => {
                assert!(matches!(body[0].kind, StmtKind::Pass));
            }
            other => panic!("Expected while loop, got {:?}", other),
        }
    }

    #[test]
    fn test_for_with_tuple_target() {
        let body = parse("for i, x in enumerate(xs):\n    print(i, x)\n");
        match &body[0].kind {
            StmtKind::For { target, .. } => {
                assert!(matches!(&target.kind, ExprKind::Tuple(items) if items.len() == 2));
            }
            other => panic!("Expected for loop, got {:?}", other),
        }
    }

    #[test]
    fn test_chained_and_tuple_assignment() {
        let body = parse("a = b = 1\nx, y = 1, 2\n");
        match &body[0].kind {
            StmtKind::Assign { targets, .. } => assert_eq!(targets.len(), 2),
            other => panic!("Expected assignment, got {:?}", other),
        }
        match &body[1].kind {
            StmtKind::Assign { targets, value } => {
                assert!(matches!(targets[0].kind, ExprKind::Tuple(_)));
                assert!(matches!(value.kind, ExprKind::Tuple(_)));
            }
            other => panic!("Expected assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_augmented_assignment() {
        let body = parse("total += 3");
        assert!(matches!(
            body[0].kind,
            StmtKind::AugAssign { op: BinOp::Add, .. }
        ));
    }

    #[test]
    fn test_annotated_assignment() {
        let body = parse("x: int = 5");
        assert!(matches!(body[0].kind, StmtKind::Assign { .. }));
    }

    #[test]
    fn test_try_statement() {
        let source = "try:\n    1/0\nexcept ZeroDivisionError as e:\n    pass\nelse:\n    pass\nfinally:\n    pass\n";
        let body = parse(source);
        match &body[0].kind {
            StmtKind::Try {
                handlers,
                orelse,
                finalbody,
                ..
            } => {
                assert_eq!(handlers.len(), 1);
                assert_eq!(handlers[0].name.as_deref(), Some("e"));
                assert_eq!(orelse.len(), 1);
                assert_eq!(finalbody.len(), 1);
            }
            other => panic!("Expected try statement, got {:?}", other),
        }
    }

    #[test]
    fn test_try_without_handlers_is_error() {
        let result = Parser::new("try:\n    pass\nx = 1\n").and_then(|mut p| p.parse_program());
        assert!(result.is_err());
    }

    #[test]
    fn test_imports() {
        let body = parse("import math as m\nfrom time import sleep, monotonic\n");
        match &body[0].kind {
            StmtKind::Import(names) => {
                assert_eq!(names[0].name, "math");
                assert_eq!(names[0].alias.as_deref(), Some("m"));
            }
            other => panic!("Expected import, got {:?}", other),
        }
        match &body[1].kind {
            StmtKind::ImportFrom { module, names } => {
                assert_eq!(module, "time");
                assert_eq!(names.len(), 2);
            }
            other => panic!("Expected from-import, got {:?}", other),
        }
    }

    #[test]
    fn test_nested_blocks_dedent_to_top_level() {
        let source = "def f(n):\n    for i in range(n):\n        if i:\n            return i\n    return 0\nf(3)\n";
        let body = parse(source);
        assert_eq!(body.len(), 2);
        assert_eq!(body[1].location.line, 6);
    }

    fn parse_err(source: &str) -> SyntaxError {
        match Parser::new(source).and_then(|mut p| p.parse_program()) {
            Ok(program) => panic!("Expected syntax error, got {:?}", program.body.len()),
            Err(err) => err,
        }
    }

    fn nested_ifs(levels: usize) -> String {
        let mut source = String::new();
        for level in 0..levels {
            source.push_str(&format!("{}if True:\n", "    ".repeat(level)));
        }
        source.push_str(&format!("{}pass\n", "    ".repeat(levels)));
        source
    }

    #[test]
    fn test_block_nesting_limit() {
        assert_eq!(parse(&nested_ifs(MAX_BLOCK_DEPTH)).len(), 1);
        let err = parse_err(&nested_ifs(MAX_BLOCK_DEPTH + 1));
        assert_eq!(err.message, "too many statically nested blocks");
        assert_eq!(err.location.line, MAX_BLOCK_DEPTH + 1);
    }

    #[test]
    fn test_elif_chain_limit() {
        let chain = |branches: usize| {
            let mut source = String::from("if x == 0:\n    pass\n");
            for i in 1..=branches {
                source.push_str(&format!("elif x == {}:\n    pass\n", i));
            }
            source + "else:\n    y = 1\n"
        };

        let body = parse(&chain(MAX_ELIF_BRANCHES));
        assert_eq!(body.len(), 1);
        let mut stmt = &body[0];
        let mut depth = 0;
        while let StmtKind::If { orelse, .. } = &stmt.kind {
            depth += 1;
            stmt = &orelse[0];
        }
        assert_eq!(depth, MAX_ELIF_BRANCHES + 1);
        assert!(matches!(stmt.kind, StmtKind::Assign { .. }));

        let err = parse_err(&chain(MAX_ELIF_BRANCHES + 1));
        assert_eq!(err.message, "too many 'elif' branches");
    }
}
