//! # Sift Filter Language - Abstract Syntax Tree
//!
//! This module defines the Abstract Syntax Tree (AST) for Sift filters: boolean
//! predicates over the typed fields of a request.
//!
//! ## Architecture Overview
//!
//! - **[tokens]** - Lexical tokens produced by the lexer, and operator precedence
//! - **[expressions]** - Expression nodes (literals, fields, operations, sets, indices)
//! - **[operators]** - Unary and binary operators
//!
//! ## Quick Start
//!
//! ```text
//! http.host == "example.com" and http.status >= 400
//! ```
//!
//! ## Core Concepts
//!
//! ### Precedence
//!
//! From loosest to tightest binding:
//!
//! ```text
//! or  <  xor  <  and  <  == != === !==  <  < > <= >=  <  contains matches in wildcard
//! ```
//!
//! `not` applies to everything tighter than `and`, so `not a and b` negates
//! only `a`, while `not port == 80` negates the comparison.
//!
//! ### Sets and Ranges
//!
//! The right side of `in` or `contains` may be a set literal mixing values
//! and inclusive ranges:
//!
//! ```text
//! tcp.dstport in {80..100, 443, 8000..9000}
//! ```
//!
//! ### Networks
//!
//! An address on the left of `in` tests subnet containment:
//!
//! ```text
//! ip.src in 10.0.0.0/8
//! ip.src in "192.168.0.0/16"
//! ```
//!
//! ### Indices
//!
//! Arrays are indexed with literal keys only. Integer keys pick a position
//! (negative counts from the end); string keys pick the value of a
//! `[key, value]` pair; `[*]` exposes every element:
//!
//! ```text
//! http.headers["user-agent"] contains "curl"
//! http.headers.names[*] == "x-debug"
//! ```
pub mod expressions;
pub mod operators;
pub mod tokens;

pub use expressions::{Expr, IndexKey};
pub use operators::{BinOp, UnaryOp};
pub use tokens::{Precedence, Token};
