//! Snippet source parser
//!
//! This module transforms snippet source text into an Abstract Syntax Tree (AST):
//! - [`lexer`]: Tokenization (source text → tokens, including INDENT/DEDENT)
//! - [`parse`]: Parser struct, helpers and [`SyntaxError`]
//! - `statements` / `expressions`: the recursive descent grammar
//! - [`ast`]: AST node definitions
//!
//! # Supported language
//!
//! An indentation-based scripting subset: literals, lists, tuples, dicts,
//! f-strings, comprehensions, lambdas, `def`, `if`/`while`/`for`,
//! `try`/`except`/`finally`, `raise`, `assert`, `global`, `del` and imports of
//! built-in modules. Class definitions, generators, `with` and async code are
//! rejected with a [`SyntaxError`].
//!
//! # Parser Implementation
//!
//! Hand-written recursive descent parser, one method per precedence level.
//! No external parser generator dependencies.

pub mod ast;
mod expressions;
pub mod lexer;
pub mod parse;
mod statements;

pub use parse::{Parser, SyntaxError, SyntaxErrorKind};

/// Parse a complete snippet. Errors carry the offending source line.
pub fn parse_snippet(source: &str) -> Result<ast::Program, SyntaxError> {
    Parser::new(source)
        .and_then(|mut parser| parser.parse_program())
        .map_err(|err| err.with_source(source))
}
