//! What an invocation hands back to its caller

use crate::runtime::format::repr;
use crate::runtime::value::Value;
use serde::Serialize;
use std::fmt;

/// Which of the three outcomes an invocation produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeKind {
    Value,
    Output,
    Error,
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutcomeKind::Value => "value",
            OutcomeKind::Output => "output",
            OutcomeKind::Error => "error",
        })
    }
}

/// Stage at which an invocation failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticKind {
    /// Rejected by the parser or the compile checks
    Syntax,
    /// An exception escaped the snippet
    Runtime,
    /// The deadline fired
    Timeout,
    /// The interpreter itself failed
    Internal,
}

/// Structured description of a failed invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// Exception class name, e.g. `ZeroDivisionError`
    pub exception: String,
    pub message: String,
    /// Line the error is attributed to, when known
    pub line: Option<usize>,
    /// Traceback-shaped report
    pub report: String,
    /// Output printed before the failure, when the engine keeps it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partial_output: Option<String>,
}

impl Diagnostic {
    /// The report, followed by any partial output
    pub fn text(&self) -> String {
        match &self.partial_output {
            Some(output) => format!("{}\n\nOutput before the error:\n{}", self.report, output.trim_end()),
            None => self.report.clone(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

/// The single result of running a snippet
#[derive(Debug, Clone)]
pub enum ExecutionOutcome {
    /// Value of the trailing expression
    Value(Value),
    /// Everything the snippet printed, trimmed
    Output(String),
    Error(Diagnostic),
}

impl ExecutionOutcome {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            ExecutionOutcome::Value(_) => OutcomeKind::Value,
            ExecutionOutcome::Output(_) => OutcomeKind::Output,
            ExecutionOutcome::Error(_) => OutcomeKind::Error,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ExecutionOutcome::Error(_))
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            ExecutionOutcome::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            ExecutionOutcome::Error(diagnostic) => Some(diagnostic),
            _ => None,
        }
    }

    /// Text rendering: values as their `repr`, output and reports verbatim
    pub fn text(&self) -> String {
        match self {
            ExecutionOutcome::Value(value) => repr(value),
            ExecutionOutcome::Output(text) => text.clone(),
            ExecutionOutcome::Error(diagnostic) => diagnostic.text(),
        }
    }

    /// Serializable summary, as printed by `--json`
    pub fn report(&self) -> OutcomeReport<'_> {
        OutcomeReport {
            kind: self.kind(),
            text: self.text(),
            diagnostic: self.diagnostic(),
        }
    }
}

impl fmt::Display for ExecutionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

/// JSON shape of an outcome
#[derive(Debug, Serialize)]
pub struct OutcomeReport<'a> {
    pub kind: OutcomeKind,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<&'a Diagnostic>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diagnostic(partial_output: Option<&str>) -> Diagnostic {
        Diagnostic {
            kind: DiagnosticKind::Runtime,
            exception: "ValueError".to_string(),
            message: "bad".to_string(),
            line: Some(2),
            report: "Traceback (most recent call last):\n  File \"<snippet>\", line 2, in <module>\nValueError: bad"
                .to_string(),
            partial_output: partial_output.map(str::to_string),
        }
    }

    #[test]
    fn test_text_rendering() {
        assert_eq!(ExecutionOutcome::Value(Value::Int(2)).text(), "2");
        assert_eq!(ExecutionOutcome::Value(Value::from("hi")).text(), "'hi'");
        assert_eq!(ExecutionOutcome::Output("hi".to_string()).to_string(), "hi");
        assert!(ExecutionOutcome::Error(diagnostic(None)).text().ends_with("ValueError: bad"));
    }

    #[test]
    fn test_partial_output_follows_report() {
        let text = diagnostic(Some("step 1\n")).text();
        assert!(text.starts_with("Traceback"));
        assert!(text.ends_with("Output before the error:\nstep 1"));
    }

    #[test]
    fn test_json_report() {
        let outcome = ExecutionOutcome::Value(Value::Int(10));
        let json = serde_json::to_value(outcome.report()).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "value", "text": "10"}));

        let outcome = ExecutionOutcome::Error(diagnostic(None));
        let json = serde_json::to_value(outcome.report()).unwrap();
        assert_eq!(json["kind"], "error");
        assert_eq!(json["diagnostic"]["exception"], "ValueError");
        assert_eq!(json["diagnostic"]["line"], 2);
        assert!(json["diagnostic"].get("partial_output").is_none());
    }
}
