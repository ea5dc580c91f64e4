//! Main parser coordinator
//!
//! This module provides the [`Parser`] struct and core parsing infrastructure,
//! including the [`SyntaxError`] type, token helpers, and the program entry point.
//!
//! # Parser Architecture
//!
//! The Parser uses a recursive descent approach with the following organization:
//! - This module: Parser struct, helper methods, and coordination
//! - `statements`: simple statements and indented compound blocks
//! - `expressions`: expressions from lambdas down to atoms, with precedence levels
//!
//! Parser methods are split across files using `impl Parser` blocks, so each
//! module extends the Parser while sharing the token cursor.

use crate::interpreter::constants::{MAX_BLOCK_DEPTH, MAX_EXPR_HEIGHT, MAX_NESTING_DEPTH};
use crate::parser::ast::*;
use crate::parser::lexer::{LexError, Lexer, Token, TokenKind};

/// Which structural error a snippet raised
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntaxErrorKind {
    Syntax,
    Indentation,
}

impl SyntaxErrorKind {
    /// Exception class name shown in diagnostics
    pub fn name(self) -> &'static str {
        match self {
            SyntaxErrorKind::Syntax => "SyntaxError",
            SyntaxErrorKind::Indentation => "IndentationError",
        }
    }
}

/// Structural error raised while tokenizing, parsing or compiling a snippet
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}: {} (line {})", .kind.name(), .message, .location.line)]
pub struct SyntaxError {
    pub kind: SyntaxErrorKind,
    pub message: String,
    pub location: SourceLocation,
    /// The offending source line, when known, for caret rendering
    pub text: Option<String>,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            kind: SyntaxErrorKind::Syntax,
            message: message.into(),
            location,
            text: None,
        }
    }

    pub fn indentation(message: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            kind: SyntaxErrorKind::Indentation,
            ..Self::new(message, location)
        }
    }

    /// Attach the source line the error points at
    pub fn with_source(mut self, source: &str) -> Self {
        if self.text.is_none() && self.location.line > 0 {
            self.text = source
                .lines()
                .nth(self.location.line - 1)
                .map(str::to_string);
        }
        self
    }
}

impl From<LexError> for SyntaxError {
    fn from(err: LexError) -> Self {
        SyntaxError {
            kind: err.kind,
            message: err.message,
            location: err.location,
            text: None,
        }
    }
}

/// Recursive descent parser for the snippet language
pub struct Parser {
    pub(crate) tokens: Vec<Token>,
    pub(crate) position: usize,
    /// Open brackets, unary operators and lambdas around the cursor
    pub(crate) depth: usize,
    /// Compound statements around the cursor
    pub(crate) block_depth: usize,
}

impl Parser {
    pub fn new(source: &str) -> Result<Self, SyntaxError> {
        let mut lexer = Lexer::new(source);
        let tokens = lexer.tokenize()?;
        Ok(Self {
            tokens,
            position: 0,
            depth: 0,
            block_depth: 0,
        })
    }

    /// Parse the entire snippet into top-level statements
    pub fn parse_program(&mut self) -> Result<Program, SyntaxError> {
        let mut program = Program::new();

        loop {
            while self.match_token(&TokenKind::Newline) {}
            if self.is_at_end() {
                break;
            }
            if self.check(&TokenKind::Indent) {
                return Err(SyntaxError::indentation(
                    "unexpected indent",
                    self.current_location(),
                ));
            }
            let statements = self.parse_statement()?;
            program.body.extend(statements);
        }

        Ok(program)
    }

    // ===== Helper methods =====

    pub(crate) fn match_token(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(self.peek_kind()) == std::mem::discriminant(kind)
    }

    pub(crate) fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.position += 1;
        }
        self.previous()
    }

    pub(crate) fn is_at_end(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Eof)
    }

    pub(crate) fn peek(&self) -> &Token {
        &self.tokens[self.position]
    }

    pub(crate) fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    pub(crate) fn peek_ahead(&self, n: usize) -> Option<&TokenKind> {
        self.tokens.get(self.position + n).map(|t| &t.kind)
    }

    pub(crate) fn previous(&self) -> &Token {
        &self.tokens[self.position.saturating_sub(1)]
    }

    pub(crate) fn current_location(&self) -> SourceLocation {
        self.peek().location
    }

    /// Consume `kind` or fail with `expected '<tok>'`
    pub(crate) fn expect_token(
        &mut self,
        kind: &TokenKind,
        message: &str,
    ) -> Result<SourceLocation, SyntaxError> {
        let loc = self.current_location();
        if self.check(kind) {
            self.advance();
            Ok(loc)
        } else {
            Err(SyntaxError::new(message, loc))
        }
    }

    pub(crate) fn expect_colon(&mut self) -> Result<SourceLocation, SyntaxError> {
        self.expect_token(&TokenKind::Colon, "expected ':'")
    }

    pub(crate) fn expect_name(&mut self) -> Result<String, SyntaxError> {
        if let TokenKind::Name(name) = self.peek_kind() {
            let name = name.clone();
            self.advance();
            Ok(name)
        } else {
            Err(self.unexpected())
        }
    }

    /// Descend one nesting level; pair every successful call with [`Parser::leave`]
    pub(crate) fn enter(&mut self) -> Result<(), SyntaxError> {
        if self.depth >= MAX_NESTING_DEPTH {
            let message = match self.previous().kind {
                TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace => {
                    "too many nested parentheses"
                }
                _ => "expression is nested too deeply",
            };
            return Err(SyntaxError::new(message, self.previous().location));
        }
        self.depth += 1;
        Ok(())
    }

    pub(crate) fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    pub(crate) fn enter_block(&mut self, header: SourceLocation) -> Result<(), SyntaxError> {
        if self.block_depth >= MAX_BLOCK_DEPTH {
            return Err(SyntaxError::new("too many statically nested blocks", header));
        }
        self.block_depth += 1;
        Ok(())
    }

    pub(crate) fn leave_block(&mut self) {
        self.block_depth = self.block_depth.saturating_sub(1);
    }

    /// Reject expression trees too tall to evaluate safely
    pub(crate) fn bounded(&self, expr: Expr) -> Result<Expr, SyntaxError> {
        if expr.height > MAX_EXPR_HEIGHT {
            return Err(SyntaxError::new(
                "expression is too long or nested too deeply",
                expr.location,
            ));
        }
        Ok(expr)
    }

    /// Error for the current token being out of place
    pub(crate) fn unexpected(&self) -> SyntaxError {
        let loc = self.current_location();
        match self.peek_kind() {
            TokenKind::Eof => SyntaxError::new("unexpected EOF while parsing", loc),
            TokenKind::Indent => SyntaxError::indentation("unexpected indent", loc),
            TokenKind::Reserved(word) => {
                SyntaxError::new(format!("'{}' is not supported in snippets", word), loc)
            }
            _ => SyntaxError::new("invalid syntax", loc),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Program {
        Parser::new(source)
            .and_then(|mut p| p.parse_program())
            .unwrap_or_else(|e| panic!("Parse failed: {}", e))
    }

    fn parse_err(source: &str) -> SyntaxError {
        match Parser::new(source).and_then(|mut p| p.parse_program()) {
            Ok(program) => panic!("Expected syntax error, got {:?}", program),
            Err(err) => err,
        }
    }

    #[test]
    fn test_parse_simple_expression() {
        let program = parse("1 + 1");
        assert_eq!(program.body.len(), 1);
        match &program.body[0].kind {
            StmtKind::Expr(expr) => {
                assert!(matches!(
                    expr.kind,
                    ExprKind::BinaryOp { op: BinOp::Add, .. }
                ));
            }
            other => panic!("Expected expression statement, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_function_definition() {
        let program = parse("def add(a, b=2):\n    return a + b\n");
        assert_eq!(program.body.len(), 1);
        match &program.body[0].kind {
            StmtKind::FunctionDef(def) => {
                assert_eq!(def.name, "add");
                assert_eq!(def.params.len(), 2);
                assert!(def.params[0].default.is_none());
                assert!(def.params[1].default.is_some());
                assert_eq!(def.body.len(), 1);
            }
            other => panic!("Expected function definition, got {:?}", other),
        }
    }

    #[test]
    fn test_statement_locations() {
        let program = parse("x = 5\n\ny = x * 2\n");
        assert_eq!(program.body[0].location.line, 1);
        assert_eq!(program.body[1].location.line, 3);
    }

    #[test]
    fn test_semicolon_separated_statements() {
        let program = parse("a = 1; b = 2; a + b");
        assert_eq!(program.body.len(), 3);
        assert!(matches!(program.body[2].kind, StmtKind::Expr(_)));
    }

    #[test]
    fn test_missing_colon() {
        let err = parse_err("while True pass");
        assert_eq!(err.kind, SyntaxErrorKind::Syntax);
        assert_eq!(err.message, "expected ':'");
        assert_eq!(err.location, SourceLocation::new(1, 12));
    }

    #[test]
    fn test_unexpected_indent() {
        let err = parse_err("x = 1\n    y = 2\n");
        assert_eq!(err.kind, SyntaxErrorKind::Indentation);
        assert_eq!(err.message, "unexpected indent");
        assert_eq!(err.location.line, 2);
    }

    #[test]
    fn test_missing_indented_block() {
        let err = parse_err("if True:\nx = 1\n");
        assert_eq!(err.kind, SyntaxErrorKind::Indentation);
        assert!(err.message.starts_with("expected an indented block"));
    }

    #[test]
    fn test_reserved_keyword_rejected() {
        let err = parse_err("class A:\n    pass\n");
        assert!(err.message.contains("'class'"));
    }

    #[test]
    fn test_with_source_attaches_line() {
        let err = parse_err("x = 1\ny = (\n").with_source("x = 1\ny = (\n");
        assert_eq!(err.text.as_deref(), Some("y = ("));
    }
}
