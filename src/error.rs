//! Error types for every phase of a filter's life: compiling, populating a
//! context, and executing.

use std::fmt;

use thiserror::Error;

use crate::{lexer::Position, value::Type};

/// Phase that produced a [`Diagnostic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// Invalid character or literal
    Lex,
    /// Unexpected token, unterminated group or set, trailing input
    Parse,
    /// Unknown field or function, type mismatch, malformed pattern
    Validation,
}

/// A single compile-time problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    pub position: Option<Position>,
}

impl Diagnostic {
    pub fn lex(message: impl Into<String>, position: Position) -> Self {
        Diagnostic {
            kind: DiagnosticKind::Lex,
            message: message.into(),
            position: Some(position),
        }
    }

    pub fn parse(message: impl Into<String>, position: Position) -> Self {
        Diagnostic {
            kind: DiagnosticKind::Parse,
            message: message.into(),
            position: Some(position),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Diagnostic {
            kind: DiagnosticKind::Validation,
            message: message.into(),
            position: None,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = match self.kind {
            DiagnosticKind::Lex => "lex error",
            DiagnosticKind::Parse => "parse error",
            DiagnosticKind::Validation => "validation error",
        };
        match self.position {
            Some(pos) => write!(f, "{} at {}: {}", phase, pos, self.message),
            None => write!(f, "{}: {}", phase, self.message),
        }
    }
}

fn join(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Lexing or parsing failed. Carries every diagnostic collected.
#[derive(Debug, Clone, Error)]
#[error("{}", join(.diagnostics))]
pub struct ParseError {
    diagnostics: Vec<Diagnostic>,
}

impl ParseError {
    pub fn new(diagnostics: Vec<Diagnostic>) -> Self {
        ParseError { diagnostics }
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

/// Compilation failed. Lex, parse and validation diagnostics are merged
/// here; no filter is produced.
#[derive(Debug, Clone, Error)]
#[error("{}", join(.diagnostics))]
pub struct CompileError {
    diagnostics: Vec<Diagnostic>,
}

impl CompileError {
    pub fn new(diagnostics: Vec<Diagnostic>) -> Self {
        CompileError { diagnostics }
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}

impl From<ParseError> for CompileError {
    fn from(e: ParseError) -> Self {
        CompileError::new(e.into_diagnostics())
    }
}

/// Rejected write to an [`ExecutionContext`](crate::ExecutionContext).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContextError {
    /// The schema does not declare this field
    #[error("unknown field '{0}'")]
    UnknownField(String),

    /// The value does not match the declared type
    #[error("field '{field}' has type {expected}, got {found}")]
    TypeMismatch {
        field: String,
        expected: Type,
        found: &'static str,
    },

    /// An IP field was given text that is not an address
    #[error("field '{field}': invalid IP address '{text}'")]
    InvalidIp { field: String, text: String },
}

/// Failure reported by a registered function.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct FunctionError(pub String);

impl FunctionError {
    pub fn new(message: impl Into<String>) -> Self {
        FunctionError(message.into())
    }
}

impl From<String> for FunctionError {
    fn from(message: String) -> Self {
        FunctionError(message)
    }
}

/// Errors that abort a single [`Filter::execute`](crate::Filter::execute).
///
/// These are distinct from an `Ok(false)` result and usually indicate that
/// the context does not fit the filter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecError {
    /// A referenced field was not set on the context
    #[error("missing field '{0}'")]
    MissingField(String),

    /// Operator applied to operands of the wrong kind
    #[error("type error: {0}")]
    TypeMismatch(String),

    /// The filter produced a non-boolean value
    #[error("filter evaluated to {0}, expected Bool")]
    NotBoolean(&'static str),

    /// Integer index past either end of the array
    #[error("index {index} out of range for array of length {len}")]
    IndexOutOfRange { index: i64, len: usize },

    /// No `[key, value]` pair with this key
    #[error("key \"{0}\" not found")]
    KeyNotFound(String),

    /// Index applied to a non-array, or string key on a non-pair array
    #[error("invalid index: {0}")]
    InvalidIndex(String),

    /// Pattern computed at runtime failed to compile
    #[error("invalid regex: {0}")]
    InvalidRegex(String),

    /// Network computed at runtime failed to parse
    #[error("invalid CIDR '{0}'")]
    InvalidCidr(String),

    /// No function registered under this name
    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    /// A registered function failed
    #[error("function '{name}' failed: {source}")]
    Function {
        name: String,
        #[source]
        source: FunctionError,
    },

    /// Context has no list provider, or the provider has no such list
    #[error("unknown list '${0}'")]
    UnknownList(String),

    /// Context populated against a different schema than the filter
    #[error("execution context was built for a different schema")]
    SchemaMismatch,
}
