//! Result resolution and diagnostic rendering
//!
//! A completed run resolves to the captured value when there is one and it
//! is not `None`, and otherwise to the printed output trimmed of surrounding
//! whitespace. Failures at any stage become a [`Diagnostic`] whose report is
//! shaped like a traceback.

use crate::executor::outcome::{Diagnostic, DiagnosticKind, ExecutionOutcome};
use crate::interpreter::errors::{Exception, TraceFrame};
use crate::parser::SyntaxError;
use crate::runtime::value::Value;
use std::fmt::Write;
use std::time::Duration;

/// Outcome of a run that finished without an escaping error
pub fn completed(result: Option<Value>, output: &str) -> ExecutionOutcome {
    match result {
        Some(value) if !value.is_none() => ExecutionOutcome::Value(value),
        _ => ExecutionOutcome::Output(output.trim().to_string()),
    }
}

fn traceback(frames: &[TraceFrame], filename: &str) -> String {
    let mut report = String::from("Traceback (most recent call last):\n");
    for frame in frames {
        let _ = writeln!(
            report,
            "  File \"{}\", line {}, in {}",
            filename, frame.line, frame.name
        );
    }
    report
}

/// A parse or compile failure, with a caret under the offending column
pub fn syntax_error(err: &SyntaxError, filename: &str) -> Diagnostic {
    let line = err.location.line;
    let mut report = format!("  File \"{}\", line {}\n", filename, line);
    if let Some(text) = &err.text {
        let trimmed = text.trim_start();
        let indent = text.chars().count() - trimmed.chars().count();
        let column = err.location.column.saturating_sub(1).saturating_sub(indent);
        let _ = writeln!(report, "    {}", trimmed.trim_end());
        let _ = writeln!(report, "    {}^", " ".repeat(column));
    }
    let _ = write!(report, "{}: {}", err.kind.name(), err.message);

    Diagnostic {
        kind: DiagnosticKind::Syntax,
        exception: err.kind.name().to_string(),
        message: err.message.clone(),
        line: Some(line).filter(|line| *line > 0),
        report,
        partial_output: None,
    }
}

/// An exception that escaped the snippet
pub fn exception(exception: &Exception, filename: &str) -> Diagnostic {
    let mut report = traceback(&exception.traceback, filename);
    report.push_str(&exception.summary());

    Diagnostic {
        kind: DiagnosticKind::Runtime,
        exception: exception.kind.name().to_string(),
        message: exception.message(),
        line: exception.line(),
        report,
        partial_output: None,
    }
}

fn seconds(duration: Duration) -> String {
    format!("{}s", duration.as_secs_f64())
}

/// The deadline fired while `frames` were executing
pub fn timeout(frames: &[TraceFrame], deadline: Duration, filename: &str) -> Diagnostic {
    let message = format!("execution exceeded the {} deadline", seconds(deadline));
    let mut report = traceback(frames, filename);
    let _ = write!(report, "TimeoutError: {}", message);

    Diagnostic {
        kind: DiagnosticKind::Timeout,
        exception: "TimeoutError".to_string(),
        message,
        line: frames.last().map(|frame| frame.line),
        report,
        partial_output: None,
    }
}

/// A failure of the engine itself rather than of the snippet
pub fn internal(message: impl Into<String>) -> Diagnostic {
    let message = message.into();
    Diagnostic {
        kind: DiagnosticKind::Internal,
        exception: "InternalError".to_string(),
        report: format!("InternalError: {}", message),
        message,
        line: None,
        partial_output: None,
    }
}
