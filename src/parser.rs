use std::mem;

use crate::{
    ast::{BinOp, Expr, IndexKey, Precedence, Token},
    error::{Diagnostic, ParseError},
    lexer::{Lexer, Position},
    value::Value,
};

/// Nesting limit used by [`Parser::new`].
pub const DEFAULT_MAX_DEPTH: usize = 128;

type PResult<T> = Result<T, Vec<Diagnostic>>;

/// An expression and the height of its tree
type Node = (Expr, usize);

/// Precedence-climbing parser over a two-token window of the lexer output.
///
/// No tree taller than `max_depth` is ever built, whether the nesting comes
/// from groups, operator chains or index chains.
///
/// Parse failures come back as a [`ParseError`] listing every diagnostic
/// found. Inside set literals and argument lists a bad element is reported
/// and parsing resumes at the next `,`, so one pass can surface several
/// problems.
///
/// # Examples
///
/// ```
/// use sift_lang::{BinOp, Expr, Lexer, Parser};
///
/// let expr = Parser::new(Lexer::new("a == 1 or b == 2")).parse().unwrap();
/// assert!(matches!(expr, Expr::Binary { op: BinOp::Or, .. }));
///
/// let err = Parser::new(Lexer::new("a ==")).parse().unwrap_err();
/// assert_eq!(err.diagnostics().len(), 1);
/// ```
pub struct Parser {
    lexer: Lexer,
    current: Token,
    current_pos: Position,
    peek: Token,
    peek_pos: Position,
    depth: usize,
    max_depth: usize,
}

impl Parser {
    pub fn new(lexer: Lexer) -> Self {
        Self::with_max_depth(lexer, DEFAULT_MAX_DEPTH)
    }

    /// Parser that rejects expressions nested deeper than `max_depth`.
    pub fn with_max_depth(mut lexer: Lexer, max_depth: usize) -> Self {
        let current = lexer.next_token();
        let current_pos = lexer.position();
        let peek = lexer.next_token();
        let peek_pos = lexer.position();
        Parser {
            lexer,
            current,
            current_pos,
            peek,
            peek_pos,
            depth: 0,
            max_depth,
        }
    }

    fn advance(&mut self) {
        let next = self.lexer.next_token();
        let next_pos = self.lexer.position();
        self.current = mem::replace(&mut self.peek, next);
        self.current_pos = mem::replace(&mut self.peek_pos, next_pos);
    }

    fn check(&self, token: &Token) -> bool {
        mem::discriminant(&self.current) == mem::discriminant(token)
    }

    /// Diagnostic for the current token. Illegal tokens surface the lexer's
    /// own message.
    fn unexpected(&self, expected: &str) -> Diagnostic {
        match &self.current {
            Token::Illegal(msg) => Diagnostic::lex(msg.clone(), self.current_pos),
            token => Diagnostic::parse(
                format!("expected {}, found {}", expected, token.describe()),
                self.current_pos,
            ),
        }
    }

    fn too_deep(&self) -> Vec<Diagnostic> {
        vec![Diagnostic::parse(
            format!("expression nested deeper than {} levels", self.max_depth),
            self.current_pos,
        )]
    }

    /// Height of a new node over children of height `below`.
    fn grow(&self, below: usize) -> PResult<usize> {
        let height = below + 1;
        if height > self.max_depth {
            return Err(self.too_deep());
        }
        Ok(height)
    }

    fn expect_closing(&mut self, close: Token, open: Position) -> PResult<()> {
        if self.check(&close) {
            self.advance();
            Ok(())
        } else {
            let mut diagnostic = self.unexpected(&close.describe());
            if !matches!(self.current, Token::Illegal(_)) {
                diagnostic.message = format!("{} to close the one opened at {}", diagnostic.message, open);
            }
            Err(vec![diagnostic])
        }
    }

    /// Parse a complete filter. Input left over after a full expression is
    /// an error.
    pub fn parse(mut self) -> Result<Expr, ParseError> {
        let (expr, _) = self
            .expression(Precedence::Lowest)
            .map_err(ParseError::new)?;

        if !self.check(&Token::Eof) {
            let diagnostic = match &self.current {
                Token::Illegal(msg) => Diagnostic::lex(msg.clone(), self.current_pos),
                token => Diagnostic::parse(
                    format!("unexpected trailing input starting at {}", token.describe()),
                    self.current_pos,
                ),
            };
            return Err(ParseError::new(vec![diagnostic]));
        }
        Ok(expr)
    }

    /// Parse an expression whose operators all bind tighter than `min`.
    pub fn parse_expression(&mut self, min: Precedence) -> PResult<Expr> {
        self.expression(min).map(|(expr, _)| expr)
    }

    fn expression(&mut self, min: Precedence) -> PResult<Node> {
        if self.depth >= self.max_depth {
            return Err(self.too_deep());
        }
        self.depth += 1;
        let result = self.parse_binary(min);
        self.depth -= 1;
        result
    }

    fn parse_binary(&mut self, min: Precedence) -> PResult<Node> {
        let (mut left, mut height) = self.parse_prefix()?;

        while let Some(precedence) = self.current.precedence() {
            if precedence <= min {
                break;
            }
            let Some(op) = BinOp::from_token(&self.current) else {
                break;
            };
            self.advance();

            let (right, right_height) = if matches!(op, BinOp::In | BinOp::Contains) && self.check(&Token::LBrace) {
                self.parse_set()?
            } else {
                self.expression(precedence)?
            };

            height = self.grow(height.max(right_height))?;
            left = Expr::binary(op, left, right);
        }
        Ok((left, height))
    }

    /// Primary expressions: `not`, groups, fields, calls, literals, lists
    fn parse_prefix(&mut self) -> PResult<Node> {
        if let Some(value) = self.take_literal() {
            return Ok((Expr::Literal(value), 1));
        }

        match &self.current {
            Token::Not => {
                self.advance();
                // Binds tighter than `and`, looser than comparisons
                let (operand, height) = self.expression(Precedence::And)?;
                Ok((Expr::not(operand), self.grow(height)?))
            }
            Token::LParen => {
                let open = self.current_pos;
                self.advance();
                let node = self.expression(Precedence::Lowest)?;
                self.expect_closing(Token::RParen, open)?;
                Ok(node)
            }
            Token::Identifier(name) => {
                let name = name.clone();
                self.parse_field_or_call(name)
            }
            Token::ListRef(name) => {
                let name = name.clone();
                self.advance();
                Ok((Expr::ListRef(name), 1))
            }
            Token::LBrace => Err(vec![Diagnostic::parse(
                "set literals are only allowed after `in` or `contains`",
                self.current_pos,
            )]),
            _ => Err(vec![self.unexpected("an expression")]),
        }
    }

    fn take_literal(&mut self) -> Option<Value> {
        let value = match &self.current {
            Token::Integer(n) => Value::Int(*n),
            Token::String(s) => Value::String(s.clone()),
            Token::Boolean(b) => Value::Bool(*b),
            Token::Ip(addr) => Value::Ip(*addr),
            Token::Cidr(net) => Value::Cidr(*net),
            _ => return None,
        };
        self.advance();
        Some(value)
    }

    /// An identifier directly followed by `(` is a call; either may be
    /// followed by an index chain.
    fn parse_field_or_call(&mut self, name: String) -> PResult<Node> {
        let adjacent = self.peek_pos.offset == self.current_pos.offset + name.chars().count();
        let node = if self.peek == Token::LParen && adjacent {
            self.advance(); // name
            let open = self.current_pos;
            self.advance(); // (
            let (args, height) = self.parse_list(Token::RParen, open, "argument list", |p| {
                p.expression(Precedence::Lowest)
            })?;
            (Expr::FunctionCall { name, args }, self.grow(height)?)
        } else {
            self.advance();
            (Expr::Field(name), 1)
        };

        self.parse_index_chain(node)
    }

    /// `[ "key" ]`, `[ 0 ]` repeated; `[*]` ends the chain.
    fn parse_index_chain(&mut self, (mut expr, mut height): Node) -> PResult<Node> {
        while self.check(&Token::LBracket) {
            let open = self.current_pos;
            self.advance();
            height = self.grow(height)?;

            let key = match &self.current {
                Token::Star => {
                    self.advance();
                    self.expect_closing(Token::RBracket, open)?;
                    return Ok((Expr::Unpack(Box::new(expr)), height));
                }
                Token::Integer(n) => IndexKey::Int(*n),
                Token::String(s) => IndexKey::Str(s.clone()),
                _ => return Err(vec![self.unexpected("a string or integer index key, or `*`")]),
            };
            self.advance();
            self.expect_closing(Token::RBracket, open)?;

            expr = Expr::Index {
                target: Box::new(expr),
                key,
            };
        }
        Ok((expr, height))
    }

    fn parse_set(&mut self) -> PResult<Node> {
        let open = self.current_pos;
        self.advance(); // {
        let (items, height) = self.parse_list(Token::RBrace, open, "set literal", Self::parse_set_element)?;
        Ok((Expr::Array(items), self.grow(height)?))
    }

    fn parse_set_element(&mut self) -> PResult<Node> {
        let (start, start_height) = self.expression(Precedence::Lowest)?;
        if self.check(&Token::DotDot) {
            self.advance();
            let (end, end_height) = self.expression(Precedence::Lowest)?;
            let range = Expr::Range {
                start: Box::new(start),
                end: Box::new(end),
            };
            return Ok((range, self.grow(start_height.max(end_height))?));
        }
        Ok((start, start_height))
    }

    /// Comma-separated elements up to `close` (already past the opener),
    /// with the tallest element's height. Element errors are collected and
    /// parsing resumes after them.
    fn parse_list(
        &mut self,
        close: Token,
        open: Position,
        what: &str,
        mut element: impl FnMut(&mut Self) -> PResult<Node>,
    ) -> PResult<(Vec<Expr>, usize)> {
        let mut items = vec![];
        let mut height = 0;
        let mut errors = vec![];

        loop {
            if self.check(&close) {
                self.advance();
                break;
            }
            if self.check(&Token::Eof) {
                errors.push(Diagnostic::parse(
                    format!("unterminated {}: expected {} to close the one opened at {}", what, close.describe(), open),
                    self.current_pos,
                ));
                break;
            }

            match element(self) {
                Ok((item, item_height)) => {
                    items.push(item);
                    height = height.max(item_height);
                }
                Err(diagnostics) => {
                    errors.extend(diagnostics);
                    self.recover(&close);
                }
            }

            if self.check(&Token::Comma) {
                self.advance();
            } else if !self.check(&close) && !self.check(&Token::Eof) {
                errors.push(self.unexpected(&format!("`,` or {}", close.describe())));
                self.recover(&close);
                if self.check(&Token::Comma) {
                    self.advance();
                }
            }
        }

        if errors.is_empty() {
            Ok((items, height))
        } else {
            Err(errors)
        }
    }

    /// Skip to the next `,` or `close` at the current nesting level.
    fn recover(&mut self, close: &Token) {
        let mut nesting = 0usize;
        loop {
            match &self.current {
                Token::Eof => return,
                Token::Comma if nesting == 0 => return,
                token if nesting == 0 && token == close => return,
                Token::LParen | Token::LBrace | Token::LBracket => nesting += 1,
                Token::RParen | Token::RBrace | Token::RBracket if nesting > 0 => nesting -= 1,
                _ => {}
            }
            self.advance();
        }
    }
}
