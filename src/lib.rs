//! # Introduction
//!
//! snipbox runs short snippets of a small Python-like language under a
//! wall-clock deadline and always hands back exactly one outcome: the value
//! of the trailing expression, the output the snippet printed, or a
//! traceback-shaped diagnostic. It never panics or returns `Err` to the
//! caller.
//!
//! ## Execution pipeline
//!
//! ```text
//! Source → Parser → Tail-Expression Rewriter → Deadline-Bounded Executor → Result Resolver
//! ```
//!
//! 1. [`parser`] tokenises the snippet (with indentation tracking) and
//!    builds an AST whose nodes carry line and column.
//! 2. [`rewrite`] turns a trailing expression statement into an assignment
//!    to the result slot, stamping the original location onto every new node.
//! 3. [`executor`] compiles the program, arms a per-invocation watchdog,
//!    redirects printed output into a private buffer and runs the
//!    [`interpreter`] on the caller's thread.
//! 4. [`executor::resolve`] picks the outcome: value, output or diagnostic.
//!
//! [`runtime`] holds the value model and its formatting, [`deadline`] the
//! cancel token and watchdog, [`output`] the capture buffer. [`ui`] is the
//! ratatui viewer used by `snipbox --tui`; it is not part of the stable API.
//!
//! ## Example
//!
//! ```
//! use snipbox::{Engine, EngineConfig, ExecutionOutcome};
//!
//! let engine = Engine::new(EngineConfig::default());
//! assert_eq!(engine.run("x = 5\nx * 2").text(), "10");
//! assert!(matches!(engine.run("print('hi')"), ExecutionOutcome::Output(ref s) if s == "hi"));
//! ```

pub mod deadline;
pub mod executor;
pub mod interpreter;
pub mod output;
pub mod parser;
pub mod rewrite;
pub mod runtime;
pub mod ui;

pub use executor::{
    Diagnostic, DiagnosticKind, Engine, EngineConfig, EngineConfigBuilder, ExecutionOutcome,
    OutcomeKind,
};
pub use runtime::value::Value;

/// Run `code` with a deadline of `timeout_secs` seconds and default settings.
///
/// A zero or negative deadline runs without a time limit.
pub fn run(code: &str, timeout_secs: f64) -> ExecutionOutcome {
    Engine::new(EngineConfig::builder().timeout_secs(timeout_secs).build()).run(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_entry_point() {
        assert_eq!(run("1 + 1", 5.0).text(), "2");
        assert_eq!(run("x = 5", 5.0).text(), "");
    }
}
