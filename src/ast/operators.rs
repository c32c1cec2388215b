use std::fmt;

use crate::ast::Token;

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    // Logical
    /// Logical OR (`or`), short-circuits
    Or,
    /// Logical exclusive OR (`xor`), always evaluates both sides
    Xor,
    /// Logical AND (`and`), short-circuits
    And,

    // Equality
    /// Equal (`==`)
    Equal,
    /// Not equal (`!=`)
    NotEqual,
    /// Every element equal (`===`)
    AllEqual,
    /// Any element different (`!==`)
    AnyNotEqual,

    // Comparison
    /// Less than (`<`)
    LessThan,
    /// Greater than (`>`)
    GreaterThan,
    /// Less than or equal (`<=`)
    LessEqual,
    /// Greater than or equal (`>=`)
    GreaterEqual,

    // Membership
    /// Substring or element containment (`contains`)
    Contains,
    /// Regular expression match (`matches`)
    Matches,
    /// Set, array or CIDR membership (`in`)
    In,
    /// Case-insensitive glob (`wildcard`)
    Wildcard,
    /// Case-sensitive glob (`strict wildcard`)
    StrictWildcard,
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// Logical negation (`not`)
    Not,
}

impl BinOp {
    pub fn from_token(token: &Token) -> Option<BinOp> {
        let op = match token {
            Token::Or => BinOp::Or,
            Token::Xor => BinOp::Xor,
            Token::And => BinOp::And,
            Token::EqEq => BinOp::Equal,
            Token::NotEq => BinOp::NotEqual,
            Token::AllEq => BinOp::AllEqual,
            Token::AnyNotEq => BinOp::AnyNotEqual,
            Token::Lt => BinOp::LessThan,
            Token::Gt => BinOp::GreaterThan,
            Token::LtEq => BinOp::LessEqual,
            Token::GtEq => BinOp::GreaterEqual,
            Token::Contains => BinOp::Contains,
            Token::Matches => BinOp::Matches,
            Token::In => BinOp::In,
            Token::Wildcard => BinOp::Wildcard,
            Token::StrictWildcard => BinOp::StrictWildcard,
            _ => return None,
        };
        Some(op)
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinOp::And | BinOp::Or | BinOp::Xor)
    }

    pub fn is_ordering(self) -> bool {
        matches!(
            self,
            BinOp::LessThan | BinOp::GreaterThan | BinOp::LessEqual | BinOp::GreaterEqual
        )
    }

    /// Operators that, given an unpacked (`[*]`) left operand, apply to each
    /// element and hold if any element satisfies them.
    pub fn distributes_over_unpack(self) -> bool {
        !self.is_logical() && !matches!(self, BinOp::AllEqual | BinOp::AnyNotEqual)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Or => "or",
            BinOp::Xor => "xor",
            BinOp::And => "and",
            BinOp::Equal => "==",
            BinOp::NotEqual => "!=",
            BinOp::AllEqual => "===",
            BinOp::AnyNotEqual => "!==",
            BinOp::LessThan => "<",
            BinOp::GreaterThan => ">",
            BinOp::LessEqual => "<=",
            BinOp::GreaterEqual => ">=",
            BinOp::Contains => "contains",
            BinOp::Matches => "matches",
            BinOp::In => "in",
            BinOp::Wildcard => "wildcard",
            BinOp::StrictWildcard => "strict wildcard",
        }
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnaryOp::Not => f.write_str("not"),
        }
    }
}
