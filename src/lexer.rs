use std::{
    fmt,
    net::{IpAddr, Ipv6Addr},
};

use ipnet::IpNet;

use crate::ast::Token;

/// Location of a token in the source text. Lines and columns start at 1;
/// `offset` counts characters from the start of the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl Default for Position {
    fn default() -> Self {
        Position {
            offset: 0,
            line: 1,
            column: 1,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

pub struct Lexer {
    input: Vec<char>,
    cursor: Position,
    token_start: Position,
}

fn is_ident_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_'
}

fn is_ident_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            cursor: Position::default(),
            token_start: Position::default(),
        }
    }

    /// Where the most recently returned token started
    pub fn position(&self) -> Position {
        self.token_start
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.cursor.offset).copied()
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.input.get(self.cursor.offset + offset).copied()
    }

    fn advance(&mut self) {
        if let Some(ch) = self.current_char() {
            if ch == '\n' {
                self.cursor.line += 1;
                self.cursor.column = 1;
            } else {
                self.cursor.column += 1;
            }
            self.cursor.offset += 1;
        }
    }

    fn advance_by(&mut self, n: usize) {
        for _ in 0..n {
            self.advance();
        }
    }

    fn rewind(&mut self, to: Position) {
        self.cursor = to;
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Reads a (possibly dotted) identifier. A dot only continues the name
    /// when another identifier character follows it, so `a..b` stays three
    /// tokens.
    fn read_identifier(&mut self) -> String {
        let mut result = String::new();
        while let Some(ch) = self.current_char() {
            if is_ident_char(ch) {
                result.push(ch);
                self.advance();
            } else if ch == '.' && self.peek_char(1).is_some_and(is_ident_char) && !result.is_empty() {
                result.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        result
    }

    fn read_string(&mut self, quote: char) -> Token {
        let mut result = String::new();
        let mut error: Option<String> = None;
        self.advance(); // opening quote

        while let Some(ch) = self.current_char() {
            match ch {
                c if c == quote => {
                    self.advance();
                    return match error {
                        Some(msg) => Token::Illegal(msg),
                        None => Token::String(result),
                    };
                }
                '\\' => {
                    self.advance();
                    match self.current_char() {
                        Some('n') => result.push('\n'),
                        Some('t') => result.push('\t'),
                        Some('r') => result.push('\r'),
                        Some('0') => result.push('\0'),
                        Some('"') => result.push('"'),
                        Some('\'') => result.push('\''),
                        Some('\\') => result.push('\\'),
                        Some('x') => {
                            let hex: String = (1..=2).filter_map(|i| self.peek_char(i)).collect();
                            match u8::from_str_radix(&hex, 16) {
                                Ok(byte) if hex.len() == 2 => {
                                    result.push(char::from(byte));
                                    self.advance_by(2);
                                }
                                _ => {
                                    error.get_or_insert_with(|| {
                                        format!("Invalid escape sequence: \\x{}", hex)
                                    });
                                }
                            }
                        }
                        Some(other) => {
                            error.get_or_insert_with(|| {
                                format!("Invalid escape sequence: \\{}", other)
                            });
                        }
                        None => {
                            return Token::Illegal(
                                "Unterminated string: unexpected end of input after backslash"
                                    .to_string(),
                            );
                        }
                    }
                    self.advance();
                }
                _ => {
                    result.push(ch);
                    self.advance();
                }
            }
        }

        Token::Illegal("Unterminated string: missing closing quote".to_string())
    }

    /// `r"..."` or `r#"..."#`: no escapes, terminated by a quote followed by
    /// as many `#` as opened the literal.
    fn read_raw_string(&mut self) -> Token {
        self.advance(); // r
        let mut hashes = 0;
        while self.current_char() == Some('#') {
            hashes += 1;
            self.advance();
        }
        if self.current_char() != Some('"') {
            return Token::Illegal("Expected '\"' to open raw string".to_string());
        }
        self.advance();

        let mut result = String::new();
        while let Some(ch) = self.current_char() {
            if ch == '"' && (1..=hashes).all(|i| self.peek_char(i) == Some('#')) {
                self.advance_by(hashes + 1);
                return Token::String(result);
            }
            result.push(ch);
            self.advance();
        }

        Token::Illegal("Unterminated raw string".to_string())
    }

    fn read_digits(&mut self) -> String {
        let mut digits = String::new();
        while let Some(ch) = self.current_char() {
            if ch.is_ascii_digit() {
                digits.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        digits
    }

    /// Collects characters that may form an address: hex digits, colons and
    /// single dots. Stops before `..`.
    fn read_address_run(&mut self) -> String {
        let mut run = String::new();
        while let Some(ch) = self.current_char() {
            if ch.is_ascii_hexdigit() || ch == ':' {
                run.push(ch);
                self.advance();
            } else if ch == '.' && self.peek_char(1) != Some('.') {
                run.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        run
    }

    fn finish_address(&mut self, addr: IpAddr) -> Token {
        if self.current_char() != Some('/') {
            return Token::Ip(addr);
        }
        self.advance();
        let digits = self.read_digits();
        match digits.parse::<u8>().ok().and_then(|prefix| IpNet::new(addr, prefix).ok()) {
            Some(net) => Token::Cidr(net),
            None => Token::Illegal(format!("Invalid prefix length '/{}' for {}", digits, addr)),
        }
    }

    fn read_number_or_address(&mut self) -> Token {
        let run = self.read_address_run();

        if run.contains('.') || run.contains(':') {
            return match run.parse::<IpAddr>() {
                Ok(addr) => self.finish_address(addr),
                Err(_) => Token::Illegal(format!("Invalid IP address '{}'", run)),
            };
        }

        if self.current_char().is_some_and(is_ident_char) || !run.bytes().all(|b| b.is_ascii_digit()) {
            let rest = self.read_identifier();
            return Token::Illegal(format!("Invalid number '{}{}'", run, rest));
        }

        match run.parse::<i64>() {
            Ok(n) => Token::Integer(n),
            Err(_) => Token::Illegal(format!("Integer literal out of range: {}", run)),
        }
    }

    fn read_negative_number(&mut self) -> Token {
        self.advance(); // -
        let digits = self.read_digits();
        match format!("-{}", digits).parse::<i64>() {
            Ok(n) => Token::Integer(n),
            Err(_) => Token::Illegal(format!("Integer literal out of range: -{}", digits)),
        }
    }

    /// IPv6 literals may start with a hex letter (`fe80::1`). Tries to read
    /// one and rewinds if the text is not an address.
    fn try_ipv6(&mut self) -> Option<Token> {
        let start = self.cursor;
        let run = self.read_address_run();
        if run.contains(':')
            && !self.current_char().is_some_and(is_ident_char)
            && let Ok(addr) = run.parse::<Ipv6Addr>()
        {
            return Some(self.finish_address(IpAddr::V6(addr)));
        }
        self.rewind(start);
        None
    }

    fn read_list_ref(&mut self) -> Token {
        self.advance(); // $
        if !self.current_char().is_some_and(is_ident_start) {
            return Token::Illegal("Expected list name after '$'".to_string());
        }
        Token::ListRef(self.read_identifier())
    }

    fn read_word(&mut self) -> Token {
        let ident = self.read_identifier();

        match ident.as_str() {
            "and" => Token::And,
            "or" => Token::Or,
            "xor" => Token::Xor,
            "not" => Token::Not,
            "contains" => Token::Contains,
            "matches" => Token::Matches,
            "in" => Token::In,
            "wildcard" => Token::Wildcard,
            "eq" => Token::EqEq,
            "ne" => Token::NotEq,
            "lt" => Token::Lt,
            "le" => Token::LtEq,
            "gt" => Token::Gt,
            "ge" => Token::GtEq,
            "true" => Token::Boolean(true),
            "false" => Token::Boolean(false),
            "strict" => {
                let after = self.cursor;
                self.skip_whitespace();
                if self.current_char().is_some_and(is_ident_start) && self.read_identifier() == "wildcard" {
                    Token::StrictWildcard
                } else {
                    self.rewind(after);
                    Token::Identifier(ident)
                }
            }
            _ => Token::Identifier(ident),
        }
    }

    fn single(&mut self, token: Token) -> Token {
        self.advance();
        token
    }

    /// Either the two-character operator `second` follows, or the single
    /// character stands alone.
    fn one_or_two(&mut self, second: char, double: Token, single: Token) -> Token {
        if self.peek_char(1) == Some(second) {
            self.advance_by(2);
            double
        } else {
            self.advance();
            single
        }
    }

    fn doubled(&mut self, ch: char, token: Token) -> Token {
        if self.peek_char(1) == Some(ch) {
            self.advance_by(2);
            token
        } else {
            self.advance();
            Token::Illegal(format!("Unexpected '{}' (did you mean '{}{}'?)", ch, ch, ch))
        }
    }

    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();
        self.token_start = self.cursor;

        let Some(ch) = self.current_char() else {
            return Token::Eof;
        };

        match ch {
            '(' => self.single(Token::LParen),
            ')' => self.single(Token::RParen),
            '{' => self.single(Token::LBrace),
            '}' => self.single(Token::RBrace),
            '[' => self.single(Token::LBracket),
            ']' => self.single(Token::RBracket),
            ',' => self.single(Token::Comma),
            '*' => self.single(Token::Star),
            '~' => self.single(Token::Matches),
            '<' => self.one_or_two('=', Token::LtEq, Token::Lt),
            '>' => self.one_or_two('=', Token::GtEq, Token::Gt),
            '&' => self.doubled('&', Token::And),
            '|' => self.doubled('|', Token::Or),
            '^' => self.doubled('^', Token::Xor),
            '.' => {
                if self.peek_char(1) == Some('.') {
                    self.advance_by(2);
                    Token::DotDot
                } else {
                    self.advance();
                    Token::Illegal("Unexpected '.' (did you mean '..'?)".to_string())
                }
            }
            '=' => match (self.peek_char(1), self.peek_char(2)) {
                (Some('='), Some('=')) => {
                    self.advance_by(3);
                    Token::AllEq
                }
                (Some('='), _) => {
                    self.advance_by(2);
                    Token::EqEq
                }
                _ => {
                    self.advance();
                    Token::Illegal("Unexpected '=' (did you mean '=='?)".to_string())
                }
            },
            '!' => match (self.peek_char(1), self.peek_char(2)) {
                (Some('='), Some('=')) => {
                    self.advance_by(3);
                    Token::AnyNotEq
                }
                (Some('='), _) => {
                    self.advance_by(2);
                    Token::NotEq
                }
                _ => {
                    self.advance();
                    Token::Not
                }
            },
            '"' | '\'' => self.read_string(ch),
            '$' => self.read_list_ref(),
            '-' if self.peek_char(1).is_some_and(|c| c.is_ascii_digit()) => self.read_negative_number(),
            'r' if matches!(self.peek_char(1), Some('"') | Some('#')) => self.read_raw_string(),
            ':' => {
                let run = self.read_address_run();
                match run.parse::<Ipv6Addr>() {
                    Ok(addr) => self.finish_address(IpAddr::V6(addr)),
                    Err(_) => Token::Illegal(format!("Invalid IP address '{}'", run)),
                }
            }
            c if c.is_ascii_digit() => self.read_number_or_address(),
            c if is_ident_start(c) => {
                if c.is_ascii_hexdigit()
                    && let Some(token) = self.try_ipv6()
                {
                    return token;
                }
                self.read_word()
            }
            c => {
                self.advance();
                Token::Illegal(format!("Unexpected character '{}'", c))
            }
        }
    }
}

impl Iterator for Lexer {
    type Item = Token;

    /// Yields tokens up to, but not including, `Eof`.
    fn next(&mut self) -> Option<Token> {
        match self.next_token() {
            Token::Eof => None,
            token => Some(token),
        }
    }
}

#[test]
fn test_keywords() {
    let mut lexer = Lexer::new("and or xor not true false");
    assert_eq!(lexer.next_token(), Token::And);
    assert_eq!(lexer.next_token(), Token::Or);
    assert_eq!(lexer.next_token(), Token::Xor);
    assert_eq!(lexer.next_token(), Token::Not);
    assert_eq!(lexer.next_token(), Token::Boolean(true));
    assert_eq!(lexer.next_token(), Token::Boolean(false));
    assert_eq!(lexer.next_token(), Token::Eof);
}

#[test]
fn test_filter() {
    let mut lexer = Lexer::new("http.status >= 400 and port in {80..90}");
    assert_eq!(lexer.next_token(), Token::Identifier("http.status".to_string()));
    assert_eq!(lexer.next_token(), Token::GtEq);
    assert_eq!(lexer.next_token(), Token::Integer(400));
    assert_eq!(lexer.next_token(), Token::And);
    assert_eq!(lexer.next_token(), Token::Identifier("port".to_string()));
    assert_eq!(lexer.next_token(), Token::In);
    assert_eq!(lexer.next_token(), Token::LBrace);
    assert_eq!(lexer.next_token(), Token::Integer(80));
    assert_eq!(lexer.next_token(), Token::DotDot);
    assert_eq!(lexer.next_token(), Token::Integer(90));
    assert_eq!(lexer.next_token(), Token::RBrace);
    assert_eq!(lexer.next_token(), Token::Eof);
}
