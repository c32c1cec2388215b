use std::net::IpAddr;

use ipnet::IpNet;

/// Lexical tokens of the filter language.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    /// Decimal integer, optionally negative
    ///
    /// # Examples
    /// ```text
    /// 443
    /// -1
    /// ```
    Integer(i64),

    /// Quoted or raw string, already unescaped
    ///
    /// # Examples
    /// ```text
    /// "example.com"
    /// 'single quoted'
    /// r"^/api/v\d+"
    /// r#"contains "quotes""#
    /// ```
    String(String),

    /// Boolean values
    Boolean(bool),

    /// IPv4 or IPv6 address
    ///
    /// # Examples
    /// ```text
    /// 192.168.0.1
    /// 2001:db8::1
    /// ```
    Ip(IpAddr),

    /// Address with prefix length
    ///
    /// # Examples
    /// ```text
    /// 10.0.0.0/8
    /// fe80::/10
    /// ```
    Cidr(IpNet),

    /// Named list reference (`$name`)
    ///
    /// # Examples
    /// ```text
    /// $blocked_ips
    /// $known_bots
    /// ```
    ListRef(String),

    // Identifiers
    /// Field or function name. Dots are part of the name.
    ///
    /// # Examples
    /// ```text
    /// http.host
    /// ip.src
    /// lower
    /// ```
    Identifier(String),

    // Equality
    /// `==` or `eq`
    EqEq,

    /// `!=` or `ne`
    NotEq,

    /// `===`: every element of an array equals the right operand
    AllEq,

    /// `!==`: some element of an array differs from the right operand
    AnyNotEq,

    // Comparison
    /// `<` or `lt`
    Lt,

    /// `>` or `gt`
    Gt,

    /// `<=` or `le`
    LtEq,

    /// `>=` or `ge`
    GtEq,

    // Membership and matching
    /// `contains`
    Contains,

    /// `matches` or `~`
    Matches,

    /// `in`
    In,

    /// `wildcard`
    Wildcard,

    /// `strict wildcard`
    StrictWildcard,

    // Logical
    /// `and` or `&&`
    And,

    /// `or` or `||`
    Or,

    /// `xor` or `^^`
    Xor,

    /// `not` or `!`
    Not,

    // Delimiters
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,

    /// Inclusive range separator (`..`)
    DotDot,

    /// Unpack marker inside an index (`[*]`)
    Star,

    /// Invalid input. Carries a description of what went wrong.
    Illegal(String),

    /// End of input
    Eof,
}

/// Binding power of binary operators, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    Lowest,
    Or,
    Xor,
    And,
    Equality,
    Comparison,
    Membership,
}

impl Token {
    /// Precedence of this token when it appears in infix position, or
    /// `None` if it does not start a binary operator.
    pub fn precedence(&self) -> Option<Precedence> {
        use Token::*;
        match self {
            Or => Some(Precedence::Or),
            Xor => Some(Precedence::Xor),
            And => Some(Precedence::And),
            EqEq | NotEq | AllEq | AnyNotEq => Some(Precedence::Equality),
            Lt | Gt | LtEq | GtEq => Some(Precedence::Comparison),
            Contains | Matches | In | Wildcard | StrictWildcard => Some(Precedence::Membership),
            _ => None,
        }
    }

    /// Short description for diagnostics
    pub fn describe(&self) -> String {
        use Token::*;
        match self {
            Integer(n) => format!("integer {}", n),
            String(s) => format!("string {:?}", s),
            Boolean(b) => format!("`{}`", b),
            Ip(addr) => format!("address {}", addr),
            Cidr(net) => format!("network {}", net),
            ListRef(name) => format!("list `${}`", name),
            Identifier(name) => format!("identifier `{}`", name),
            EqEq => "`==`".to_string(),
            NotEq => "`!=`".to_string(),
            AllEq => "`===`".to_string(),
            AnyNotEq => "`!==`".to_string(),
            Lt => "`<`".to_string(),
            Gt => "`>`".to_string(),
            LtEq => "`<=`".to_string(),
            GtEq => "`>=`".to_string(),
            Contains => "`contains`".to_string(),
            Matches => "`matches`".to_string(),
            In => "`in`".to_string(),
            Wildcard => "`wildcard`".to_string(),
            StrictWildcard => "`strict wildcard`".to_string(),
            And => "`and`".to_string(),
            Or => "`or`".to_string(),
            Xor => "`xor`".to_string(),
            Not => "`not`".to_string(),
            LParen => "`(`".to_string(),
            RParen => "`)`".to_string(),
            LBrace => "`{`".to_string(),
            RBrace => "`}`".to_string(),
            LBracket => "`[`".to_string(),
            RBracket => "`]`".to_string(),
            Comma => "`,`".to_string(),
            DotDot => "`..`".to_string(),
            Star => "`*`".to_string(),
            Illegal(msg) => msg.clone(),
            Eof => "end of input".to_string(),
        }
    }
}
