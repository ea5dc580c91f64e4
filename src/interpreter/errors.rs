//! Runtime error types for the snippet interpreter
//!
//! This module defines the snippet-visible [`Exception`] and its class
//! hierarchy ([`ExceptionKind`]), plus [`Interrupt`], the signal that unwinds
//! the interpreter when an exception escapes or the deadline fires.
//!
//! Exceptions are catchable by snippet `try`/`except`. A timeout is not: it
//! unwinds straight through handlers and `finally` blocks to the executor.

use crate::runtime::format::repr;
use crate::runtime::value::Value;
use std::fmt;

/// Built-in exception classes, arranged in the usual hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExceptionKind {
    BaseException,
    Exception,
    ArithmeticError,
    ZeroDivisionError,
    OverflowError,
    AssertionError,
    AttributeError,
    ImportError,
    ModuleNotFoundError,
    LookupError,
    IndexError,
    KeyError,
    NameError,
    UnboundLocalError,
    RuntimeError,
    RecursionError,
    NotImplementedError,
    StopIteration,
    TypeError,
    ValueError,
    MemoryError,
    OSError,
    TimeoutError,
}

impl ExceptionKind {
    pub const ALL: [ExceptionKind; 23] = [
        ExceptionKind::BaseException,
        ExceptionKind::Exception,
        ExceptionKind::ArithmeticError,
        ExceptionKind::ZeroDivisionError,
        ExceptionKind::OverflowError,
        ExceptionKind::AssertionError,
        ExceptionKind::AttributeError,
        ExceptionKind::ImportError,
        ExceptionKind::ModuleNotFoundError,
        ExceptionKind::LookupError,
        ExceptionKind::IndexError,
        ExceptionKind::KeyError,
        ExceptionKind::NameError,
        ExceptionKind::UnboundLocalError,
        ExceptionKind::RuntimeError,
        ExceptionKind::RecursionError,
        ExceptionKind::NotImplementedError,
        ExceptionKind::StopIteration,
        ExceptionKind::TypeError,
        ExceptionKind::ValueError,
        ExceptionKind::MemoryError,
        ExceptionKind::OSError,
        ExceptionKind::TimeoutError,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ExceptionKind::BaseException => "BaseException",
            ExceptionKind::Exception => "Exception",
            ExceptionKind::ArithmeticError => "ArithmeticError",
            ExceptionKind::ZeroDivisionError => "ZeroDivisionError",
            ExceptionKind::OverflowError => "OverflowError",
            ExceptionKind::AssertionError => "AssertionError",
            ExceptionKind::AttributeError => "AttributeError",
            ExceptionKind::ImportError => "ImportError",
            ExceptionKind::ModuleNotFoundError => "ModuleNotFoundError",
            ExceptionKind::LookupError => "LookupError",
            ExceptionKind::IndexError => "IndexError",
            ExceptionKind::KeyError => "KeyError",
            ExceptionKind::NameError => "NameError",
            ExceptionKind::UnboundLocalError => "UnboundLocalError",
            ExceptionKind::RuntimeError => "RuntimeError",
            ExceptionKind::RecursionError => "RecursionError",
            ExceptionKind::NotImplementedError => "NotImplementedError",
            ExceptionKind::StopIteration => "StopIteration",
            ExceptionKind::TypeError => "TypeError",
            ExceptionKind::ValueError => "ValueError",
            ExceptionKind::MemoryError => "MemoryError",
            ExceptionKind::OSError => "OSError",
            ExceptionKind::TimeoutError => "TimeoutError",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Direct base class
    pub fn parent(self) -> Option<Self> {
        use ExceptionKind::*;
        let parent = match self {
            BaseException => return None,
            Exception => BaseException,
            ArithmeticError | AssertionError | AttributeError | ImportError | LookupError
            | NameError | RuntimeError | StopIteration | TypeError | ValueError | MemoryError
            | OSError => Exception,
            ZeroDivisionError | OverflowError => ArithmeticError,
            ModuleNotFoundError => ImportError,
            IndexError | KeyError => LookupError,
            UnboundLocalError => NameError,
            RecursionError | NotImplementedError => RuntimeError,
            TimeoutError => OSError,
        };
        Some(parent)
    }

    /// `issubclass(self, other)`
    pub fn is_subclass_of(self, other: Self) -> bool {
        let mut current = Some(self);
        while let Some(kind) = current {
            if kind == other {
                return true;
            }
            current = kind.parent();
        }
        false
    }
}

impl fmt::Display for ExceptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One line of a traceback: the function and the line it was executing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceFrame {
    pub name: String,
    pub line: usize,
}

/// A raised (or raisable) exception instance
#[derive(Debug, Clone)]
pub struct Exception {
    pub kind: ExceptionKind,
    pub args: Vec<Value>,
    /// Frames from outermost to innermost, filled in when raised
    pub traceback: Vec<TraceFrame>,
}

impl Exception {
    /// Exception with a single string argument
    pub fn new(kind: ExceptionKind, message: impl Into<String>) -> Self {
        Self::with_args(kind, vec![Value::from(message.into())])
    }

    pub fn with_args(kind: ExceptionKind, args: Vec<Value>) -> Self {
        Self {
            kind,
            args,
            traceback: Vec::new(),
        }
    }

    /// `str(exc)`: the message shown after the class name
    pub fn message(&self) -> String {
        match self.args.as_slice() {
            [] => String::new(),
            [Value::Str(s)] if self.kind != ExceptionKind::KeyError => s.to_string(),
            [single] if self.kind == ExceptionKind::KeyError => repr(single),
            [single] => crate::runtime::format::to_str(single),
            many => repr(&Value::tuple(many.to_vec())),
        }
    }

    /// `repr(exc)`, e.g. `ValueError('bad')`
    pub fn repr(&self) -> String {
        let args: Vec<String> = self.args.iter().map(repr).collect();
        format!("{}({})", self.kind.name(), args.join(", "))
    }

    /// Last line of a traceback: `Kind: message` or just `Kind`
    pub fn summary(&self) -> String {
        let message = self.message();
        if message.is_empty() {
            self.kind.name().to_string()
        } else {
            format!("{}: {}", self.kind.name(), message)
        }
    }

    /// Line of the innermost traceback frame
    pub fn line(&self) -> Option<usize> {
        self.traceback.last().map(|frame| frame.line)
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

/// Why the interpreter stopped early
#[derive(Debug, Clone)]
pub enum Interrupt {
    /// An exception is propagating
    Raise(Box<Exception>),
    /// The deadline fired; not catchable by snippets
    Timeout { traceback: Vec<TraceFrame> },
}

impl Interrupt {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Interrupt::Timeout { .. })
    }
}

impl From<Exception> for Interrupt {
    fn from(exception: Exception) -> Self {
        Interrupt::Raise(Box::new(exception))
    }
}

impl fmt::Display for Interrupt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Interrupt::Raise(exception) => match exception.line() {
                Some(line) => write!(f, "{} at line {}", exception, line),
                None => write!(f, "{}", exception),
            },
            Interrupt::Timeout { traceback } => match traceback.last() {
                Some(frame) => write!(f, "Timeout at line {}", frame.line),
                None => write!(f, "Timeout"),
            },
        }
    }
}

impl std::error::Error for Interrupt {}
