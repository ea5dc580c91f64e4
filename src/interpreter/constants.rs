// Limits for the snippet interpreter

/// Default maximum call depth before `RecursionError`
pub const DEFAULT_RECURSION_LIMIT: usize = 100;

/// Largest recursion limit an engine accepts; larger requests are clamped
pub const MAX_RECURSION_LIMIT: usize = 1_000;

/// Native stack (in bytes) one invocation may consume below its entry point
/// before `RecursionError` is raised. Engines must run on threads with at
/// least 2 MiB of stack.
pub const MAX_STACK_USAGE: usize = 1536 * 1024;

/// Deepest bracket, unary operator or lambda nesting the parser accepts
pub const MAX_NESTING_DEPTH: usize = 50;

/// Deepest statically nested compound statements
pub const MAX_BLOCK_DEPTH: usize = 20;

/// Tallest expression tree the parser accepts, counting operator chains
pub const MAX_EXPR_HEIGHT: u32 = 250;

/// Most `elif` branches a single `if` statement may carry
pub const MAX_ELIF_BRANCHES: usize = 250;

/// Containers nested deeper than this render as `[...]` in reprs
pub const MAX_REPR_DEPTH: usize = 200;

/// Largest list, tuple or range materialization a snippet may request
/// before `MemoryError` is raised
pub const MAX_SEQUENCE_LEN: usize = 10_000_000;

/// Largest string (in bytes) a snippet may build
pub const MAX_STRING_LEN: usize = 50_000_000;

/// Frame name of top-level snippet code in tracebacks
pub const MODULE_FRAME: &str = "<module>";
