//! Compiling filter source into reusable [`Filter`]s.
//!
//! Compilation lexes and parses the source, validates it against an optional
//! [`Schema`], and precompiles every literal pattern. All problems found on
//! the way are reported together in one [`CompileError`].

use std::{collections::HashMap, sync::Arc};

use ipnet::IpNet;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::{
    ast::{BinOp, Expr, IndexKey, UnaryOp},
    context::ExecutionContext,
    error::{CompileError, Diagnostic, ExecError},
    evaluator::Evaluator,
    lexer::Lexer,
    parser::{DEFAULT_MAX_DEPTH, Parser},
    schema::Schema,
    value::{Type, Value, parse_network},
};

/// Limits applied while compiling and executing a filter.
///
/// Deserializes with per-field defaults, so a configuration file only needs
/// the limits it changes:
///
/// ```
/// use sift_lang::CompileOptions;
///
/// let options: CompileOptions = serde_json::from_str(r#"{"max_depth": 16}"#).unwrap();
/// assert_eq!(options.max_depth, 16);
/// assert_eq!(options.regex_size_limit, CompileOptions::default().regex_size_limit);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    /// Deepest allowed nesting of sub-expressions
    pub max_depth: usize,
    /// Size limit, in bytes, for each compiled regular expression
    pub regex_size_limit: usize,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            max_depth: DEFAULT_MAX_DEPTH,
            regex_size_limit: 1 << 20,
        }
    }
}

/// How a string pattern is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PatternKind {
    Regex,
    Wildcard,
    StrictWildcard,
}

impl PatternKind {
    pub(crate) fn for_op(op: BinOp) -> Option<PatternKind> {
        match op {
            BinOp::Matches => Some(PatternKind::Regex),
            BinOp::Wildcard => Some(PatternKind::Wildcard),
            BinOp::StrictWildcard => Some(PatternKind::StrictWildcard),
            _ => None,
        }
    }
}

/// Translate a glob into an anchored regex. `*` matches any run of
/// characters; `\` makes the next character literal.
fn wildcard_to_regex(pattern: &str) -> String {
    let mut regex = String::from(r"\A");
    let mut literal = String::new();
    let mut chars = pattern.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '*' => {
                regex.push_str(&regex::escape(&literal));
                literal.clear();
                regex.push_str("(?s:.*)");
            }
            '\\' => literal.push(chars.next().unwrap_or('\\')),
            c => literal.push(c),
        }
    }
    regex.push_str(&regex::escape(&literal));
    regex.push_str(r"\z");
    regex
}

pub(crate) fn build_pattern(kind: PatternKind, pattern: &str, size_limit: usize) -> Result<Regex, regex::Error> {
    match kind {
        PatternKind::Regex => RegexBuilder::new(pattern).size_limit(size_limit).build(),
        PatternKind::Wildcard | PatternKind::StrictWildcard => {
            RegexBuilder::new(&wildcard_to_regex(pattern))
                .case_insensitive(kind == PatternKind::Wildcard)
                .size_limit(size_limit)
                .build()
        }
    }
}

/// Patterns and network strings compiled ahead of time, keyed by source
/// text.
#[derive(Debug, Clone, Default)]
pub(crate) struct Patterns {
    regex: HashMap<String, Regex>,
    wildcard: HashMap<String, Regex>,
    strict_wildcard: HashMap<String, Regex>,
    networks: HashMap<String, IpNet>,
}

impl Patterns {
    fn table(&self, kind: PatternKind) -> &HashMap<String, Regex> {
        match kind {
            PatternKind::Regex => &self.regex,
            PatternKind::Wildcard => &self.wildcard,
            PatternKind::StrictWildcard => &self.strict_wildcard,
        }
    }

    pub(crate) fn get(&self, kind: PatternKind, pattern: &str) -> Option<&Regex> {
        self.table(kind).get(pattern)
    }

    fn insert(&mut self, kind: PatternKind, pattern: String, regex: Regex) {
        let table = match kind {
            PatternKind::Regex => &mut self.regex,
            PatternKind::Wildcard => &mut self.wildcard,
            PatternKind::StrictWildcard => &mut self.strict_wildcard,
        };
        table.insert(pattern, regex);
    }

    pub(crate) fn network(&self, text: &str) -> Option<&IpNet> {
        self.networks.get(text)
    }

    fn len(&self) -> usize {
        self.regex.len() + self.wildcard.len() + self.strict_wildcard.len()
    }
}

/// A compiled, validated filter.
///
/// Filters are immutable: compile once, then call [`execute`](Self::execute)
/// any number of times, from any number of threads, each with its own
/// [`ExecutionContext`].
#[derive(Debug, Clone)]
pub struct Filter {
    expr: Expr,
    schema: Option<Arc<Schema>>,
    patterns: Patterns,
    options: CompileOptions,
}

impl Filter {
    /// The validated expression tree
    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    pub fn schema(&self) -> Option<&Arc<Schema>> {
        self.schema.as_ref()
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Evaluate the filter against one context.
    ///
    /// Runtime problems (a field the context does not set, an index past the
    /// end of an array, an unknown list) are returned as errors, never folded
    /// into `Ok(false)`.
    pub fn execute(&self, ctx: &ExecutionContext) -> Result<bool, ExecError> {
        if let (Some(ours), Some(theirs)) = (&self.schema, ctx.schema())
            && !Arc::ptr_eq(ours, theirs)
            && **ours != **theirs
        {
            return Err(ExecError::SchemaMismatch);
        }

        let evaluator = Evaluator::new(
            ctx,
            self.schema.as_deref().map(Schema::functions),
            &self.patterns,
            self.options.regex_size_limit,
        );
        let result = evaluator.eval_filter(&self.expr);
        if let Err(e) = &result {
            trace!(error = %e, filter = %self.expr, "filter execution failed");
        }
        result
    }
}

/// Compile `source` with default [`CompileOptions`].
///
/// Without a schema, field references are not checked and every field is
/// looked up at execution time.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use sift_lang::{ExecutionContext, Schema, Type, compile};
///
/// let schema = Arc::new(
///     Schema::builder()
///         .field("http.host", Type::String)
///         .field("http.status", Type::Int)
///         .build(),
/// );
/// let filter = compile(r#"http.host == "example.com" and http.status >= 400"#, Some(&schema))?;
///
/// let mut ctx = ExecutionContext::with_schema(&schema);
/// ctx.set_string("http.host", "example.com")?.set_int("http.status", 500)?;
/// assert!(filter.execute(&ctx)?);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn compile(source: &str, schema: Option<&Arc<Schema>>) -> Result<Filter, CompileError> {
    compile_with_options(source, schema, &CompileOptions::default())
}

#[tracing::instrument(level = "debug", skip_all, fields(len = source.len()))]
pub fn compile_with_options(
    source: &str,
    schema: Option<&Arc<Schema>>,
    options: &CompileOptions,
) -> Result<Filter, CompileError> {
    let expr = Parser::with_max_depth(Lexer::new(source), options.max_depth)
        .parse()
        .map_err(|e| {
            debug!(diagnostics = e.diagnostics().len(), "filter failed to parse");
            CompileError::from(e)
        })?;

    let mut validator = Validator {
        schema: schema.map(Arc::as_ref),
        options,
        diagnostics: vec![],
        patterns: Patterns::default(),
    };
    if let Some(ty) = validator.infer(&expr)
        && ty != Type::Bool
    {
        validator.report(format!("filter must evaluate to Bool, found {}", ty));
    }

    if !validator.diagnostics.is_empty() {
        debug!(diagnostics = validator.diagnostics.len(), "filter failed validation");
        return Err(CompileError::new(validator.diagnostics));
    }

    debug!(patterns = validator.patterns.len(), "filter compiled");
    Ok(Filter {
        expr,
        schema: schema.cloned(),
        patterns: validator.patterns,
        options: options.clone(),
    })
}

/// Static checks over a parsed tree. Types are inferred bottom-up; `None`
/// means "not known until execution" and never triggers a diagnostic.
struct Validator<'a> {
    schema: Option<&'a Schema>,
    options: &'a CompileOptions,
    diagnostics: Vec<Diagnostic>,
    patterns: Patterns,
}

impl Validator<'_> {
    fn report(&mut self, message: String) {
        self.diagnostics.push(Diagnostic::validation(message));
    }

    fn expect_bool(&mut self, ty: Option<Type>, what: &str) {
        if let Some(ty) = ty
            && ty != Type::Bool
        {
            self.report(format!("{} must be Bool, found {}", what, ty));
        }
    }

    fn infer(&mut self, expr: &Expr) -> Option<Type> {
        match expr {
            Expr::Literal(value) => value.scalar_type(),
            Expr::Field(name) => {
                let schema = self.schema?;
                match schema.get(name) {
                    Some(ty) => Some(ty.clone()),
                    None => {
                        self.report(format!("unknown field '{}'", name));
                        None
                    }
                }
            }
            Expr::ListRef(_) => None,
            Expr::Unary {
                op: UnaryOp::Not,
                operand,
            } => {
                let ty = self.infer(operand);
                self.expect_bool(ty, "operand of `not`");
                Some(Type::Bool)
            }
            Expr::Binary { op, left, right } => {
                self.check_binary(*op, left, right);
                Some(Type::Bool)
            }
            Expr::Array(items) => {
                self.report("set literals are only allowed after `in` or `contains`".to_string());
                items.iter().for_each(|item| {
                    self.infer(item);
                });
                None
            }
            Expr::Range { start, end } => {
                self.report(format!("range {} is only allowed inside a set literal", expr));
                self.infer(start);
                self.infer(end);
                None
            }
            Expr::FunctionCall { name, args } => {
                args.iter().for_each(|arg| {
                    self.infer(arg);
                });
                let schema = self.schema?;
                match schema.functions().get(name) {
                    Some(function) if function.accepts(args.len()) => function.return_type().cloned(),
                    Some(function) => {
                        self.report(format!(
                            "function '{}' takes {} argument(s), got {}",
                            name,
                            function.arity(),
                            args.len()
                        ));
                        None
                    }
                    None => {
                        self.report(format!("unknown function '{}'", name));
                        None
                    }
                }
            }
            Expr::Index { target, key } => match self.infer(target)? {
                Type::Array(inner) => match (key, *inner) {
                    (IndexKey::Int(_), element) => Some(element),
                    (IndexKey::Str(_), Type::Array(value)) => Some(*value),
                    (IndexKey::Str(_), element) => {
                        self.report(format!(
                            "string key in {} needs an array of [key, value] pairs, found Array<{}>",
                            expr, element
                        ));
                        None
                    }
                },
                other => {
                    self.report(format!("cannot index {} of type {}", target, other));
                    None
                }
            },
            Expr::Unpack(target) => match self.infer(target)? {
                ty @ Type::Array(_) => Some(ty),
                other => {
                    self.report(format!("cannot unpack {} of type {}", target, other));
                    None
                }
            },
        }
    }

    fn check_binary(&mut self, op: BinOp, left: &Expr, right: &Expr) {
        let left_ty = self.infer(left);
        // An unpacked left operand is tested element by element
        let left_ty = if op.distributes_over_unpack() && matches!(left, Expr::Unpack(_)) {
            left_ty.and_then(|ty| ty.element().cloned())
        } else {
            left_ty
        };

        match op {
            BinOp::And | BinOp::Or | BinOp::Xor => {
                let right_ty = self.infer(right);
                self.expect_bool(left_ty, &format!("left operand of `{}`", op));
                self.expect_bool(right_ty, &format!("right operand of `{}`", op));
            }
            BinOp::Equal | BinOp::NotEqual => {
                let right_ty = self.infer(right);
                if let (Some(l), Some(r)) = (&left_ty, &right_ty)
                    && l != r
                {
                    self.report(format!("cannot compare {} with {} using `{}`", l, r, op));
                }
            }
            BinOp::AllEqual | BinOp::AnyNotEqual => {
                let right_ty = self.infer(right);
                match (&left_ty, &right_ty) {
                    (_, Some(r @ Type::Array(_))) => {
                        self.report(format!("right operand of `{}` must be a scalar, found {}", op, r));
                    }
                    (Some(Type::Array(inner)), Some(r)) if **inner != *r => {
                        self.report(format!("cannot compare Array<{}> elements with {} using `{}`", inner, r, op));
                    }
                    (Some(l), _) if !matches!(l, Type::Array(_)) => {
                        self.report(format!("left operand of `{}` must be an Array, found {}", op, l));
                    }
                    _ => {}
                }
            }
            BinOp::LessThan | BinOp::GreaterThan | BinOp::LessEqual | BinOp::GreaterEqual => {
                let right_ty = self.infer(right);
                for ty in [&left_ty, &right_ty].into_iter().flatten() {
                    if !ty.is_ordered() {
                        self.report(format!("`{}` is only defined for Int, found {}", op, ty));
                    }
                }
                if let (Some(l), Some(r)) = (&left_ty, &right_ty)
                    && l.is_ordered()
                    && r.is_ordered()
                    && l != r
                {
                    self.report(format!("cannot compare {} with {} using `{}`", l, r, op));
                }
            }
            BinOp::Contains => {
                if let Expr::Array(items) = right {
                    let element = match left_ty {
                        Some(Type::String) => Some(Type::String),
                        Some(Type::Array(inner)) => Some(*inner),
                        Some(other) => {
                            self.report(format!("`contains` needs a String or Array on the left, found {}", other));
                            None
                        }
                        None => None,
                    };
                    self.check_set(element, items);
                    return;
                }
                let right_ty = self.infer(right);
                match (&left_ty, &right_ty) {
                    (Some(Type::String), Some(Type::String)) => {}
                    (Some(Type::Array(inner)), Some(r)) if **inner == *r => {}
                    (Some(l @ (Type::String | Type::Array(_))), Some(r)) => {
                        self.report(format!("cannot test whether {} contains {}", l, r));
                    }
                    (Some(l), _) if !matches!(l, Type::String | Type::Array(_)) => {
                        self.report(format!("`contains` needs a String or Array on the left, found {}", l));
                    }
                    _ => {}
                }
            }
            BinOp::Matches | BinOp::Wildcard | BinOp::StrictWildcard => {
                let right_ty = self.infer(right);
                if let Some(l) = &left_ty
                    && *l != Type::String
                {
                    self.report(format!("`{}` needs a String on the left, found {}", op, l));
                }
                if let Some(r) = &right_ty
                    && *r != Type::String
                {
                    self.report(format!("`{}` needs a String pattern, found {}", op, r));
                }
                if let (Some(kind), Expr::Literal(Value::String(pattern))) = (PatternKind::for_op(op), right) {
                    self.precompile(kind, pattern);
                }
            }
            BinOp::In => {
                if let Expr::Array(items) = right {
                    self.check_set(left_ty, items);
                    return;
                }
                if let Expr::Literal(Value::String(text)) = right
                    && matches!(left_ty, Some(Type::Ip) | None)
                {
                    match parse_network(text) {
                        Some(net) => {
                            self.patterns.networks.insert(text.clone(), net);
                        }
                        None => self.report(format!("invalid CIDR '{}'", text)),
                    }
                    return;
                }
                let right_ty = self.infer(right);
                match (&left_ty, &right_ty) {
                    (Some(l), Some(Type::Array(inner))) if **inner != *l => {
                        self.report(format!("cannot test whether {} is in Array<{}>", l, inner));
                    }
                    // A String network is parsed when the filter runs
                    (Some(Type::Ip), Some(Type::Ip | Type::String)) | (_, Some(Type::Array(_))) => {}
                    (Some(l), Some(r)) => {
                        self.report(format!("`in` needs a set, array or network on the right, cannot test {} in {}", l, r));
                    }
                    _ => {}
                }
            }
        }
    }

    /// Elements of a set literal must match `element`; ranges need Int.
    fn check_set(&mut self, element: Option<Type>, items: &[Expr]) {
        for item in items {
            match item {
                Expr::Range { start, end } => {
                    let start_ty = self.infer(start);
                    let end_ty = self.infer(end);
                    for ty in [start_ty, end_ty].into_iter().flatten() {
                        if ty != Type::Int {
                            self.report(format!("range bounds must be Int, found {} in {}", ty, item));
                        }
                    }
                    if let Some(ty) = &element
                        && *ty != Type::Int
                    {
                        self.report(format!("range {} cannot match a {}", item, ty));
                    }
                    if let (Expr::Literal(Value::Int(lo)), Expr::Literal(Value::Int(hi))) = (&**start, &**end)
                        && lo > hi
                    {
                        self.report(format!("empty range {}: start is greater than end", item));
                    }
                }
                _ => {
                    let item_ty = self.infer(item);
                    if let (Some(expected), Some(found)) = (&element, &item_ty)
                        && expected != found
                    {
                        self.report(format!("set element {} is {}, expected {}", item, found, expected));
                    }
                }
            }
        }
    }

    fn precompile(&mut self, kind: PatternKind, pattern: &str) {
        if self.patterns.get(kind, pattern).is_some() {
            return;
        }
        match build_pattern(kind, pattern, self.options.regex_size_limit) {
            Ok(regex) => self.patterns.insert(kind, pattern.to_string(), regex),
            Err(e) => self.report(format!("invalid pattern {:?}: {}", pattern, e)),
        }
    }
}
