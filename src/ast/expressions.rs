use std::fmt;

use crate::{
    ast::{BinOp, UnaryOp},
    value::Value,
};

/// Abstract Syntax Tree node representing a parsed filter expression.
///
/// Every node owns its children, so the tree is acyclic and has no shared
/// subtrees. Nothing mutates a tree once the parser returns it.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Literal value
    ///
    /// # Examples
    /// ```text
    /// "example.com"
    /// 443
    /// true
    /// 10.0.0.0/8
    /// ```
    Literal(Value),

    /// Field reference, resolved against the execution context
    ///
    /// # Example
    /// ```text
    /// http.host
    /// ```
    Field(String),

    /// Unary operation
    ///
    /// # Example
    /// ```text
    /// not ssl
    /// ```
    Unary { op: UnaryOp, operand: Box<Expr> },

    /// Binary operation (logical, equality, comparison, membership)
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// Set literal on the right of `in` or `contains`. Elements may be
    /// [`Expr::Range`] nodes.
    ///
    /// # Example
    /// ```text
    /// {80..100, 443, 8000..9000}
    /// ```
    Array(Vec<Expr>),

    /// Inclusive range, only valid as a set literal element
    ///
    /// # Example
    /// ```text
    /// 8000..9000
    /// ```
    Range { start: Box<Expr>, end: Box<Expr> },

    /// Call into the schema's function registry
    ///
    /// # Example
    /// ```text
    /// lower(http.host)
    /// ```
    FunctionCall { name: String, args: Vec<Expr> },

    /// Array element lookup with a literal key
    ///
    /// # Examples
    /// ```text
    /// http.headers["host"]
    /// tags[0]
    /// http.cookies["session"]["id"]
    /// ```
    Index { target: Box<Expr>, key: IndexKey },

    /// Wildcard index (`[*]`) exposing every element of an array
    ///
    /// # Example
    /// ```text
    /// http.headers.names[*] == "x-debug"
    /// ```
    Unpack(Box<Expr>),

    /// Named list reference, resolved through the context's list provider
    ///
    /// # Example
    /// ```text
    /// $blocked_ips
    /// ```
    ListRef(String),
}

/// Literal key inside `[...]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndexKey {
    /// Position in the array; negative values count from the end
    Int(i64),
    /// Key of a `[key, value]` pair inside the array
    Str(String),
}

impl Expr {
    pub fn binary(op: BinOp, left: Expr, right: Expr) -> Expr {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn not(operand: Expr) -> Expr {
        Expr::Unary {
            op: UnaryOp::Not,
            operand: Box::new(operand),
        }
    }

    /// Visit every field name referenced by this expression, depth-first.
    pub fn for_each_field<'a>(&'a self, f: &mut impl FnMut(&'a str)) {
        match self {
            Expr::Field(name) => f(name),
            Expr::Literal(_) | Expr::ListRef(_) => {}
            Expr::Unary { operand, .. } => operand.for_each_field(f),
            Expr::Binary { left, right, .. } => {
                left.for_each_field(f);
                right.for_each_field(f);
            }
            Expr::Array(items) => items.iter().for_each(|item| item.for_each_field(f)),
            Expr::Range { start, end } => {
                start.for_each_field(f);
                end.for_each_field(f);
            }
            Expr::FunctionCall { args, .. } => args.iter().for_each(|arg| arg.for_each_field(f)),
            Expr::Index { target, .. } | Expr::Unpack(target) => target.for_each_field(f),
        }
    }
}

fn write_string_literal(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    f.write_str("\"")?;
    for ch in s.chars() {
        match ch {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            '\r' => f.write_str("\\r")?,
            '\0' => f.write_str("\\0")?,
            c if (c as u32) < 0x20 => write!(f, "\\x{:02x}", c as u32)?,
            c => write!(f, "{}", c)?,
        }
    }
    f.write_str("\"")
}

fn write_operand(f: &mut fmt::Formatter<'_>, expr: &Expr) -> fmt::Result {
    match expr {
        Expr::Binary { .. } | Expr::Unary { .. } => write!(f, "({})", expr),
        _ => write!(f, "{}", expr),
    }
}

/// Prints canonical source. Nested operations are fully parenthesized, so
/// the output parses back to the same tree.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(Value::String(s)) => write_string_literal(f, s),
            Expr::Literal(value) => write!(f, "{}", value),
            Expr::Field(name) => f.write_str(name),
            Expr::Unary { op, operand } => {
                write!(f, "{} ", op)?;
                write_operand(f, operand)
            }
            Expr::Binary { op, left, right } => {
                write_operand(f, left)?;
                write!(f, " {} ", op)?;
                write_operand(f, right)
            }
            Expr::Array(items) => {
                f.write_str("{")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("}")
            }
            Expr::Range { start, end } => write!(f, "{}..{}", start, end),
            Expr::FunctionCall { name, args } => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                f.write_str(")")
            }
            Expr::Index { target, key } => {
                write!(f, "{}[", target)?;
                match key {
                    IndexKey::Int(n) => write!(f, "{}", n)?,
                    IndexKey::Str(s) => write_string_literal(f, s)?,
                }
                f.write_str("]")
            }
            Expr::Unpack(target) => write!(f, "{}[*]", target),
            Expr::ListRef(name) => write!(f, "${}", name),
        }
    }
}
