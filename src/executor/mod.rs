//! Deadline-bounded snippet execution
//!
//! [`Engine`] drives one invocation through the whole pipeline:
//!
//! ```text
//! source → parse → capture tail expression → compile → run under deadline → resolve
//! ```
//!
//! Every invocation gets its own namespace, cancel token, watchdog and output
//! buffer. The run happens on the caller's thread; the watchdog is the only
//! helper thread. Nothing escapes as an `Err` or a panic: parse errors,
//! exceptions, timeouts and interpreter panics all become an
//! [`ExecutionOutcome::Error`].

mod config;
mod outcome;
pub mod resolve;

pub use config::{EngineConfig, EngineConfigBuilder, DEFAULT_FILENAME, DEFAULT_TIMEOUT};
pub use outcome::{Diagnostic, DiagnosticKind, ExecutionOutcome, OutcomeKind, OutcomeReport};

use crate::deadline::{CancelToken, Deadline};
use crate::interpreter::{compile, Interpreter, Interrupt};
use crate::output::{self, OutputBuffer};
use crate::parser::parse_snippet;
use crate::rewrite::capture_tail_expression;
use std::any::Any;
use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Once;
use std::time::{Duration, Instant};

thread_local! {
    /// Set while this thread is inside [`guarded`]
    static GUARDED: Cell<bool> = const { Cell::new(false) };
}

static QUIET_PANIC_HOOK: Once = Once::new();

/// Runs snippets. Cheap to clone and safe to share between threads.
#[derive(Debug, Clone, Default)]
pub struct Engine {
    config: EngineConfig,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run `code` under the configured deadline
    pub fn run(&self, code: &str) -> ExecutionOutcome {
        self.run_with_timeout(code, self.config.timeout)
    }

    /// Run `code` under `timeout` instead of the configured deadline. Zero means no deadline.
    pub fn run_with_timeout(&self, code: &str, timeout: Duration) -> ExecutionOutcome {
        let started = Instant::now();
        tracing::debug!(
            code_len = code.len(),
            timeout_ms = timeout.as_millis() as u64,
            "snippet invocation started"
        );

        let outcome = self.execute(code, timeout);

        tracing::debug!(
            kind = %outcome.kind(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "snippet invocation finished"
        );
        outcome
    }

    fn execute(&self, code: &str, timeout: Duration) -> ExecutionOutcome {
        let filename = self.config.filename.as_str();

        let program = match parse_snippet(code) {
            Ok(program) => program,
            Err(err) => {
                tracing::debug!(error = %err, "snippet rejected by parser");
                return ExecutionOutcome::Error(resolve::syntax_error(&err, filename));
            }
        };
        let program = capture_tail_expression(program);
        let unit = match compile(program, filename) {
            Ok(unit) => unit,
            Err(err) => {
                tracing::debug!(error = %err, "snippet rejected by compile checks");
                let err = err.with_source(code);
                return ExecutionOutcome::Error(resolve::syntax_error(&err, filename));
            }
        };

        self.run_unit(timeout, |interpreter| interpreter.run(&unit))
    }

    /// Run `body` in a fresh interpreter under the deadline, then resolve
    /// what it produced
    fn run_unit(
        &self,
        timeout: Duration,
        body: impl FnOnce(&mut Interpreter) -> Result<(), Interrupt>,
    ) -> ExecutionOutcome {
        let filename = self.config.filename.as_str();
        let token = CancelToken::new();
        let armed = match Deadline::new(timeout).arm(token.clone()) {
            Ok(armed) => armed,
            Err(err) => {
                tracing::error!(error = %err, "failed to start deadline watchdog");
                return ExecutionOutcome::Error(resolve::internal(format!(
                    "failed to start deadline watchdog: {}",
                    err
                )));
            }
        };

        let buffer = OutputBuffer::new();
        let recursion_limit = self.config.recursion_limit;
        let run = guarded(&buffer, || {
            let mut interpreter =
                Interpreter::new(token.clone()).with_recursion_limit(recursion_limit);
            let result = body(&mut interpreter);
            (result, interpreter.take_result())
        });
        armed.disarm();

        let output = buffer.contents();
        let diagnostic = match run {
            Ok((Ok(()), result)) => return resolve::completed(result, &output),
            Ok((Err(Interrupt::Raise(exception)), _)) => {
                tracing::debug!(error = %exception, line = ?exception.line(), "snippet raised");
                resolve::exception(&exception, filename)
            }
            Ok((Err(Interrupt::Timeout { traceback }), _)) => {
                tracing::warn!(
                    timeout_ms = timeout.as_millis() as u64,
                    line = ?traceback.last().map(|frame| frame.line),
                    "snippet timed out"
                );
                resolve::timeout(&traceback, timeout, filename)
            }
            Err(message) => {
                tracing::error!(panic = %message, "interpreter panicked");
                resolve::internal(message)
            }
        };

        ExecutionOutcome::Error(Diagnostic {
            partial_output: Some(output).filter(|text| self.config.keep_partial_output && !text.is_empty()),
            ..diagnostic
        })
    }
}

/// Run `run` with stdout captured into `buffer`, turning a panic into its
/// message. The default panic hook stays silent for panics raised inside;
/// they are logged when resolved instead.
fn guarded<T>(buffer: &OutputBuffer, run: impl FnOnce() -> T) -> Result<T, String> {
    QUIET_PANIC_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if GUARDED.with(Cell::get) {
                tracing::debug!(location = ?info.location(), "panic inside snippet run");
            } else {
                previous(info);
            }
        }));
    });

    let _redirect = output::redirect(buffer.clone());
    let outer = GUARDED.with(|flag| flag.replace(true));
    let result = panic::catch_unwind(AssertUnwindSafe(run));
    GUARDED.with(|flag| flag.set(outer));
    result.map_err(|payload| panic_message(payload.as_ref()))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| message.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "interpreter panicked".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::value::Value;

    fn engine() -> Engine {
        Engine::new(EngineConfig::builder().timeout(Duration::from_secs(2)).build())
    }

    #[test]
    fn test_engine_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Engine>();
    }

    #[test]
    fn test_value_outcome() {
        let outcome = engine().run("1 + 1");
        assert!(matches!(outcome, ExecutionOutcome::Value(Value::Int(2))));
    }

    #[test]
    fn test_output_outcome() {
        let outcome = engine().run("print('hi')");
        assert!(matches!(outcome, ExecutionOutcome::Output(ref text) if text == "hi"));
    }

    #[test]
    fn test_syntax_error_outcome() {
        let outcome = engine().run("while True pass");
        let diagnostic = outcome.diagnostic().unwrap();
        assert_eq!(diagnostic.kind, DiagnosticKind::Syntax);
        assert_eq!(diagnostic.exception, "SyntaxError");
        assert_eq!(diagnostic.line, Some(1));
        assert!(output::is_process_stdout());
    }

    #[test]
    fn test_compile_error_outcome() {
        let outcome = engine().run("x = 1\nbreak");
        let diagnostic = outcome.diagnostic().unwrap();
        assert_eq!(diagnostic.kind, DiagnosticKind::Syntax);
        assert_eq!(diagnostic.line, Some(2));
        assert!(diagnostic.report.contains("    break\n"));
    }

    #[test]
    fn test_partial_output_is_discarded_by_default() {
        let outcome = engine().run("print('before')\n1/0");
        let diagnostic = outcome.diagnostic().unwrap();
        assert!(diagnostic.partial_output.is_none());
        assert!(!outcome.text().contains("before"));
    }

    #[test]
    fn test_partial_output_can_be_kept() {
        let engine = Engine::new(EngineConfig::builder().keep_partial_output(true).build());
        let outcome = engine.run("print('before')\n1/0");
        let diagnostic = outcome.diagnostic().unwrap();
        assert_eq!(diagnostic.partial_output.as_deref(), Some("before\n"));
        assert!(outcome.text().ends_with("before"));
    }

    #[test]
    fn test_timeout_outcome() {
        let started = Instant::now();
        let outcome = engine().run_with_timeout("while True:\n    pass", Duration::from_millis(200));
        let diagnostic = outcome.diagnostic().unwrap();
        assert_eq!(diagnostic.kind, DiagnosticKind::Timeout);
        assert!(started.elapsed() < Duration::from_secs(2));
        assert!(output::is_process_stdout());
    }

    #[test]
    fn test_panic_becomes_internal_diagnostic() {
        let engine = Engine::new(EngineConfig::builder().keep_partial_output(true).build());
        let outcome = engine.run_unit(Duration::from_secs(2), |_| {
            output::write("before the panic\n");
            panic!("frame stack out of sync: {}", 3);
        });

        assert!(output::is_process_stdout());
        let diagnostic = outcome.diagnostic().unwrap();
        assert_eq!(diagnostic.kind, DiagnosticKind::Internal);
        assert_eq!(diagnostic.exception, "InternalError");
        assert_eq!(diagnostic.message, "frame stack out of sync: 3");
        assert_eq!(diagnostic.report, "InternalError: frame stack out of sync: 3");
        assert_eq!(diagnostic.line, None);
        assert_eq!(diagnostic.partial_output.as_deref(), Some("before the panic\n"));

        // The engine stays usable on this thread afterwards
        assert_eq!(engine.run("print('after')").text(), "after");
    }

    #[test]
    fn test_guarded_restores_stdout_after_panic() {
        let buffer = OutputBuffer::new();
        let result: Result<(), String> = guarded(&buffer, || panic!("static message"));
        assert_eq!(result, Err("static message".to_string()));
        assert!(output::is_process_stdout());
        assert!(!GUARDED.with(Cell::get));

        assert_eq!(guarded(&buffer, || 7), Ok(7));
    }
}
