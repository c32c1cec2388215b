//! Compile a filter and run it against a JSON context

use std::sync::Arc;

use super::{CliError, load_context, load_schema};
use crate::{CompileError, CompileOptions, Lexer, Parser, compile_with_options};

/// Options for the check command
#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    /// The filter expression
    pub expression: String,
    /// Schema JSON; without one, fields are not type-checked
    pub schema: Option<String>,
    /// Context JSON
    pub context: Option<String>,
    /// Only validate syntax, don't execute
    pub syntax_only: bool,
    pub compile: CompileOptions,
}

/// Result of a check operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckResult {
    /// Syntax validation passed; holds the canonical form of the expression
    SyntaxValid(String),
    /// Filter executed
    Matched(bool),
}

/// Execute a sift check operation
pub fn execute_check(options: &CheckOptions) -> Result<CheckResult, CliError> {
    if options.syntax_only {
        let expr = Parser::with_max_depth(Lexer::new(&options.expression), options.compile.max_depth)
            .parse()
            .map_err(CompileError::from)?;
        return Ok(CheckResult::SyntaxValid(expr.to_string()));
    }

    let schema = options
        .schema
        .as_deref()
        .map(load_schema)
        .transpose()?
        .map(Arc::new);
    let filter = compile_with_options(&options.expression, schema.as_ref(), &options.compile)?;

    let context = options.context.as_deref().ok_or(CliError::NoInput)?;
    let ctx = load_context(context, schema.as_ref())?;
    Ok(CheckResult::Matched(filter.execute(&ctx)?))
}
