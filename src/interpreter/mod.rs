//! Snippet interpreter
//!
//! This module provides the core execution logic:
//! - [`compile`]: Static checks that turn a parsed program into a [`CompiledUnit`]
//! - [`engine`]: Main interpreter with AST execution
//! - [`errors`]: Exceptions, their class hierarchy and the [`Interrupt`] signal
//!
//! # Execution Model
//!
//! The interpreter walks the AST and executes statements one at a time in a
//! fresh namespace. Before each statement, at every loop iteration and on
//! every call it passes a deadline checkpoint; once the invocation's cancel
//! token fires, execution unwinds with [`Interrupt::Timeout`].
//!
//! # Built-in Functions
//!
//! Built-in functions, methods of built-in types and the importable `math`
//! and `time` modules are native code attached to the interpreter
//! (`builtins`, `methods`, `modules`).

mod builtins;
mod calls;
pub mod compile;
pub mod constants;
pub mod engine;
pub mod errors;
mod expressions;
mod jumps;
mod loops;
mod methods;
mod modules;
mod ops;
mod statements;

pub use compile::{compile, CompiledUnit};
pub use engine::Interpreter;
pub use errors::{Exception, ExceptionKind, Interrupt, TraceFrame};
