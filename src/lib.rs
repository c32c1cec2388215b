//! Sift: a typed filter-expression language.
//!
//! Filters are boolean expressions over named, typed fields, such as
//! `http.host == "example.com" and ip.src in "10.0.0.0/8"`. A filter is
//! compiled once against a [`Schema`] and then executed many times, each time
//! against a fresh [`ExecutionContext`] holding the field values.
//!
//! ```
//! use std::sync::Arc;
//! use sift_lang::{ExecutionContext, Schema, Type, compile};
//!
//! let schema = Arc::new(
//!     Schema::builder()
//!         .field("ip.src", Type::Ip)
//!         .field("port", Type::Int)
//!         .build(),
//! );
//! let filter = compile(
//!     r#"ip.src in "192.168.0.0/16" and port in {80..100, 443}"#,
//!     Some(&schema),
//! )?;
//!
//! let mut ctx = ExecutionContext::with_schema(&schema);
//! ctx.set_ip_str("ip.src", "192.168.1.100")?.set_int("port", 443)?;
//! assert!(filter.execute(&ctx)?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod ast;
#[cfg(feature = "cli")]
pub mod cli;
pub mod compiler;
pub mod context;
pub mod error;
mod evaluator;
pub mod functions;
pub mod lexer;
pub mod lists;
pub mod parser;
pub mod schema;
pub mod value;

pub use ast::{BinOp, Expr, IndexKey, Precedence, Token, UnaryOp};
pub use compiler::{CompileOptions, Filter, compile, compile_with_options};
pub use context::ExecutionContext;
pub use error::{CompileError, ContextError, Diagnostic, DiagnosticKind, ExecError, FunctionError, ParseError};
pub use functions::{Function, FunctionRegistry};
pub use lexer::{Lexer, Position};
pub use lists::{ListProvider, MemoryLists};
pub use parser::Parser;
pub use schema::{Schema, SchemaBuilder};
pub use value::{Type, Value};
