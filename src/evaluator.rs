use std::borrow::Cow;

use crate::{
    ast::{BinOp, Expr, IndexKey, UnaryOp},
    compiler::{PatternKind, Patterns, build_pattern},
    context::ExecutionContext,
    error::ExecError,
    functions::FunctionRegistry,
    value::{Value, parse_network},
};

/// Right operand of `in` / `contains`, kept unevaluated where possible so
/// ranges are tested as intervals and named lists are not copied.
enum Rhs<'a> {
    Value(Cow<'a, Value>),
    Set(Vec<SetItem<'a>>),
    List(&'a [Value]),
}

enum SetItem<'a> {
    Value(Cow<'a, Value>),
    Range(i64, i64),
}

/// Tree-walking evaluator for one execution of a compiled filter.
///
/// Values borrowed from the expression tree or the context are passed
/// around as `Cow` and only cloned when an operation produces a new value.
pub(crate) struct Evaluator<'a> {
    ctx: &'a ExecutionContext,
    functions: Option<&'a FunctionRegistry>,
    patterns: &'a Patterns,
    regex_size_limit: usize,
}

impl<'a> Evaluator<'a> {
    pub(crate) fn new(
        ctx: &'a ExecutionContext,
        functions: Option<&'a FunctionRegistry>,
        patterns: &'a Patterns,
        regex_size_limit: usize,
    ) -> Self {
        Evaluator {
            ctx,
            functions,
            patterns,
            regex_size_limit,
        }
    }

    /// Evaluate a whole filter, which must produce a Bool.
    pub(crate) fn eval_filter(&self, expr: &'a Expr) -> Result<bool, ExecError> {
        match self.eval(expr)?.as_ref() {
            Value::Bool(b) => Ok(*b),
            other => Err(ExecError::NotBoolean(other.kind())),
        }
    }

    fn eval(&self, expr: &'a Expr) -> Result<Cow<'a, Value>, ExecError> {
        match expr {
            Expr::Literal(value) => Ok(Cow::Borrowed(value)),
            Expr::Field(name) => self
                .ctx
                .get(name)
                .map(Cow::Borrowed)
                .ok_or_else(|| ExecError::MissingField(name.clone())),
            Expr::ListRef(name) => Ok(Cow::Owned(Value::Array(self.list(name)?.to_vec()))),
            Expr::Unary {
                op: UnaryOp::Not,
                operand,
            } => {
                let b = self.eval_bool(operand, "operand of `not`")?;
                Ok(Cow::Owned(Value::Bool(!b)))
            }
            Expr::Binary { op, left, right } => {
                let b = self.eval_binary(*op, left, right)?;
                Ok(Cow::Owned(Value::Bool(b)))
            }
            Expr::Array(items) => {
                let items = items
                    .iter()
                    .map(|item| self.eval(item).map(Cow::into_owned))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Cow::Owned(Value::Array(items)))
            }
            Expr::Range { .. } => Err(ExecError::TypeMismatch(format!(
                "range {} outside a set literal",
                expr
            ))),
            Expr::FunctionCall { name, args } => {
                let function = self
                    .functions
                    .and_then(|functions| functions.get(name))
                    .ok_or_else(|| ExecError::UnknownFunction(name.clone()))?;
                let args = args
                    .iter()
                    .map(|arg| self.eval(arg).map(Cow::into_owned))
                    .collect::<Result<Vec<_>, _>>()?;
                function
                    .call(&args)
                    .map(Cow::Owned)
                    .map_err(|source| ExecError::Function {
                        name: name.clone(),
                        source,
                    })
            }
            Expr::Index { target, key } => match self.eval(target)? {
                Cow::Borrowed(value) => index(value, key).map(Cow::Borrowed),
                Cow::Owned(value) => index(&value, key).map(|v| Cow::Owned(v.clone())),
            },
            Expr::Unpack(target) => {
                let value = self.eval(target)?;
                if value.as_array().is_some() {
                    Ok(value)
                } else {
                    Err(ExecError::InvalidIndex(format!("cannot unpack {}", value.kind())))
                }
            }
        }
    }

    fn eval_bool(&self, expr: &'a Expr, what: &str) -> Result<bool, ExecError> {
        match self.eval(expr)?.as_ref() {
            Value::Bool(b) => Ok(*b),
            other => Err(ExecError::TypeMismatch(format!(
                "{} must be Bool, found {}",
                what,
                other.kind()
            ))),
        }
    }

    fn eval_int(&self, expr: &'a Expr) -> Result<i64, ExecError> {
        match self.eval(expr)?.as_ref() {
            Value::Int(n) => Ok(*n),
            other => Err(ExecError::TypeMismatch(format!(
                "range bound must be Int, found {}",
                other.kind()
            ))),
        }
    }

    fn list(&self, name: &str) -> Result<&'a [Value], ExecError> {
        self.ctx
            .lists()
            .and_then(|lists| lists.list(name))
            .ok_or_else(|| ExecError::UnknownList(name.to_string()))
    }

    fn eval_binary(&self, op: BinOp, left: &'a Expr, right: &'a Expr) -> Result<bool, ExecError> {
        match op {
            // `&&` / `||` skip the right operand, errors included
            BinOp::And => Ok(self.eval_bool(left, "left operand of `and`")?
                && self.eval_bool(right, "right operand of `and`")?),
            BinOp::Or => Ok(self.eval_bool(left, "left operand of `or`")?
                || self.eval_bool(right, "right operand of `or`")?),
            BinOp::Xor => {
                let l = self.eval_bool(left, "left operand of `xor`")?;
                let r = self.eval_bool(right, "right operand of `xor`")?;
                Ok(l ^ r)
            }
            BinOp::AllEqual | BinOp::AnyNotEqual => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                self.all_equal(op, &left, &right)
            }
            _ => {
                if op.distributes_over_unpack()
                    && let Expr::Unpack(target) = left
                {
                    let array = self.eval(target)?;
                    let items = array.as_array().ok_or_else(|| {
                        ExecError::InvalidIndex(format!("cannot unpack {}", array.kind()))
                    })?;
                    let rhs = self.eval_rhs(op, right)?;
                    for item in items {
                        if self.apply(op, item, &rhs)? {
                            return Ok(true);
                        }
                    }
                    return Ok(false);
                }

                let left = self.eval(left)?;
                let rhs = self.eval_rhs(op, right)?;
                self.apply(op, &left, &rhs)
            }
        }
    }

    fn eval_rhs(&self, op: BinOp, right: &'a Expr) -> Result<Rhs<'a>, ExecError> {
        let membership = matches!(op, BinOp::In | BinOp::Contains);
        match right {
            Expr::Array(items) if membership => items
                .iter()
                .map(|item| self.set_item(item))
                .collect::<Result<Vec<_>, _>>()
                .map(Rhs::Set),
            Expr::ListRef(name) if membership => self.list(name).map(Rhs::List),
            _ => self.eval(right).map(Rhs::Value),
        }
    }

    fn set_item(&self, item: &'a Expr) -> Result<SetItem<'a>, ExecError> {
        match item {
            Expr::Range { start, end } => Ok(SetItem::Range(self.eval_int(start)?, self.eval_int(end)?)),
            _ => self.eval(item).map(SetItem::Value),
        }
    }

    /// `===` holds when every element equals the scalar; `!==` when any
    /// element differs.
    fn all_equal(&self, op: BinOp, left: &Value, right: &Value) -> Result<bool, ExecError> {
        let items = left.as_array().ok_or_else(|| {
            ExecError::TypeMismatch(format!(
                "left operand of `{}` must be an Array, found {}",
                op,
                left.kind()
            ))
        })?;
        if let Value::Array(_) = right {
            return Err(ExecError::TypeMismatch(format!(
                "right operand of `{}` must be a scalar, found Array",
                op
            )));
        }

        let mut differs = false;
        for item in items {
            if !self.equal(item, right)? {
                differs = true;
                break;
            }
        }
        Ok(if op == BinOp::AllEqual { !differs } else { differs })
    }

    fn apply(&self, op: BinOp, left: &Value, rhs: &Rhs<'_>) -> Result<bool, ExecError> {
        match (op, rhs) {
            (BinOp::In, _) => self.member(left, rhs),
            (BinOp::Contains, _) => self.contains(left, rhs),
            (_, Rhs::Value(right)) => self.compare(op, left, right),
            _ => Err(ExecError::TypeMismatch(format!("`{}` cannot take a set", op))),
        }
    }

    fn compare(&self, op: BinOp, left: &Value, right: &Value) -> Result<bool, ExecError> {
        match op {
            BinOp::Equal => self.equal(left, right),
            BinOp::NotEqual => self.equal(left, right).map(|eq| !eq),
            BinOp::LessThan | BinOp::GreaterThan | BinOp::LessEqual | BinOp::GreaterEqual => {
                let (Value::Int(a), Value::Int(b)) = (left, right) else {
                    return Err(ExecError::TypeMismatch(format!(
                        "`{}` is only defined for Int, found {} and {}",
                        op,
                        left.kind(),
                        right.kind()
                    )));
                };
                Ok(match op {
                    BinOp::LessThan => a < b,
                    BinOp::GreaterThan => a > b,
                    BinOp::LessEqual => a <= b,
                    _ => a >= b,
                })
            }
            _ => match PatternKind::for_op(op) {
                Some(kind) => self.pattern_match(op, kind, left, right),
                None => Err(ExecError::TypeMismatch(format!(
                    "`{}` cannot be applied to {} and {}",
                    op,
                    left.kind(),
                    right.kind()
                ))),
            },
        }
    }

    fn equal(&self, left: &Value, right: &Value) -> Result<bool, ExecError> {
        left.strict_eq(right).map_err(|(l, r)| {
            ExecError::TypeMismatch(format!("cannot compare {} with {}", l, r))
        })
    }

    fn pattern_match(&self, op: BinOp, kind: PatternKind, subject: &Value, pattern: &Value) -> Result<bool, ExecError> {
        let (Value::String(subject), Value::String(pattern)) = (subject, pattern) else {
            return Err(ExecError::TypeMismatch(format!(
                "`{}` needs String operands, found {} and {}",
                op,
                subject.kind(),
                pattern.kind()
            )));
        };

        if let Some(regex) = self.patterns.get(kind, pattern) {
            return Ok(regex.is_match(subject));
        }
        let regex = build_pattern(kind, pattern, self.regex_size_limit)
            .map_err(|e| ExecError::InvalidRegex(e.to_string()))?;
        Ok(regex.is_match(subject))
    }

    /// `left in rhs`
    fn member(&self, left: &Value, rhs: &Rhs<'_>) -> Result<bool, ExecError> {
        match rhs {
            Rhs::Value(right) => self.member_of(left, right),
            Rhs::List(items) => self.any_member(left, items.iter()),
            Rhs::Set(items) => {
                for item in items {
                    let hit = match item {
                        SetItem::Value(member) => self.matches_member(left, member)?,
                        SetItem::Range(lo, hi) => match left {
                            Value::Int(n) => (*lo..=*hi).contains(n),
                            other => {
                                return Err(ExecError::TypeMismatch(format!(
                                    "range membership needs Int, found {}",
                                    other.kind()
                                )));
                            }
                        },
                    };
                    if hit {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }

    fn member_of(&self, left: &Value, right: &Value) -> Result<bool, ExecError> {
        match (left, right) {
            (Value::Ip(_) | Value::Cidr(_), Value::String(text)) => {
                let net = match self.patterns.network(text) {
                    Some(net) => *net,
                    None => parse_network(text).ok_or_else(|| ExecError::InvalidCidr(text.clone()))?,
                };
                self.matches_member(left, &Value::Cidr(net))
            }
            (_, Value::Array(items)) => self.any_member(left, items.iter()),
            _ => self.matches_member(left, right),
        }
    }

    fn any_member<'v>(&self, left: &Value, items: impl Iterator<Item = &'v Value>) -> Result<bool, ExecError> {
        for member in items {
            if self.matches_member(left, member)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// A single member: networks contain addresses and subnets, anything
    /// else must be equal.
    fn matches_member(&self, left: &Value, member: &Value) -> Result<bool, ExecError> {
        match (left, member) {
            (Value::Ip(addr), Value::Cidr(net)) => Ok(net.contains(addr)),
            (Value::Cidr(inner), Value::Cidr(net)) => Ok(net.contains(inner)),
            _ => self.equal(left, member),
        }
    }

    /// `left contains rhs`; a set or list means "contains any of"
    fn contains(&self, left: &Value, rhs: &Rhs<'_>) -> Result<bool, ExecError> {
        match rhs {
            Rhs::Value(needle) => self.contains_one(left, needle),
            Rhs::List(items) => {
                for needle in *items {
                    if self.contains_one(left, needle)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Rhs::Set(items) => {
                for item in items {
                    let hit = match item {
                        SetItem::Value(needle) => self.contains_one(left, needle)?,
                        SetItem::Range(lo, hi) => match left {
                            Value::Array(elements) => elements
                                .iter()
                                .any(|e| e.as_int().is_some_and(|n| (*lo..=*hi).contains(&n))),
                            other => {
                                return Err(ExecError::TypeMismatch(format!(
                                    "cannot test whether {} contains a range",
                                    other.kind()
                                )));
                            }
                        },
                    };
                    if hit {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }

    fn contains_one(&self, left: &Value, needle: &Value) -> Result<bool, ExecError> {
        match (left, needle) {
            (Value::String(haystack), Value::String(needle)) => Ok(haystack.contains(needle.as_str())),
            (Value::Array(items), needle) => {
                for item in items {
                    if self.equal(item, needle)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            (l, r) => Err(ExecError::TypeMismatch(format!(
                "cannot test whether {} contains {}",
                l.kind(),
                r.kind()
            ))),
        }
    }
}

/// Look up `key` in an array. Negative integers count from the end; string
/// keys search `[key, value]` pairs and return the first match.
fn index<'v>(value: &'v Value, key: &IndexKey) -> Result<&'v Value, ExecError> {
    let items = value
        .as_array()
        .ok_or_else(|| ExecError::InvalidIndex(format!("cannot index {}", value.kind())))?;

    match key {
        IndexKey::Int(i) => {
            let len = items.len();
            let position = if *i < 0 {
                usize::try_from(i.unsigned_abs())
                    .ok()
                    .and_then(|back| len.checked_sub(back))
            } else {
                usize::try_from(*i).ok()
            };
            position
                .and_then(|p| items.get(p))
                .ok_or(ExecError::IndexOutOfRange { index: *i, len })
        }
        IndexKey::Str(wanted) => {
            for pair in items {
                match pair.as_array() {
                    Some([Value::String(name), value]) if name == wanted => return Ok(value),
                    Some([_, _]) => {}
                    _ => {
                        return Err(ExecError::InvalidIndex(format!(
                            "key \"{}\" needs an array of [key, value] pairs, found {}",
                            wanted, pair
                        )));
                    }
                }
            }
            Err(ExecError::KeyNotFound(wanted.clone()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_index() {
        let array = Value::from(vec![1i64, 2, 3]);
        assert_eq!(index(&array, &IndexKey::Int(-1)), Ok(&Value::Int(3)));
        assert_eq!(index(&array, &IndexKey::Int(-3)), Ok(&Value::Int(1)));
        assert_eq!(
            index(&array, &IndexKey::Int(-4)),
            Err(ExecError::IndexOutOfRange { index: -4, len: 3 })
        );
        assert_eq!(
            index(&array, &IndexKey::Int(i64::MIN)),
            Err(ExecError::IndexOutOfRange { index: i64::MIN, len: 3 })
        );
    }

    #[test]
    fn test_string_key_first_match() {
        let headers = Value::Array(vec![
            Value::from(vec!["accept", "text/html"]),
            Value::from(vec!["cookie", "a=1"]),
            Value::from(vec!["cookie", "b=2"]),
        ]);
        assert_eq!(index(&headers, &IndexKey::Str("cookie".into())), Ok(&Value::from("a=1")));
        assert_eq!(
            index(&headers, &IndexKey::Str("host".into())),
            Err(ExecError::KeyNotFound("host".into()))
        );
        assert!(matches!(
            index(&Value::from(vec![1i64]), &IndexKey::Str("x".into())),
            Err(ExecError::InvalidIndex(_))
        ));
    }
}
