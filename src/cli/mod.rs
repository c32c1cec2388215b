//! CLI support for sift
//!
//! Provides programmatic access to the `sift` command so other tools can
//! check filters the same way the binary does.

mod check;
mod convert;

pub use check::{CheckOptions, CheckResult, execute_check};
pub use convert::{json_to_value, load_context, load_schema};

use std::io;

use thiserror::Error;

/// Errors that can occur during CLI operations
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Compile(#[from] crate::CompileError),

    #[error("invalid context: {0}")]
    Context(#[from] crate::ContextError),

    #[error("execution error: {0}")]
    Exec(#[from] crate::ExecError),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// A context value that has no filter equivalent
    #[error("field '{field}': {message}")]
    InvalidValue { field: String, message: String },

    #[error("no context provided. Use --context or pipe JSON to stdin.")]
    NoInput,
}
