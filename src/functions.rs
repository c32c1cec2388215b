//! Functions callable from filters.
//!
//! Filters call functions by name (`lower(http.host) == "example.com"`). The
//! names resolve through the [`FunctionRegistry`] attached to the schema a
//! filter is compiled against, so unknown names and wrong argument counts are
//! caught at compile time.

use std::{collections::HashMap, fmt, sync::Arc};

use crate::{error::FunctionError, value::{Type, Value}};

type NativeFn = dyn Fn(&[Value]) -> Result<Value, FunctionError> + Send + Sync;

/// A native function plus the metadata the validator needs.
#[derive(Clone)]
pub struct Function {
    min_args: usize,
    max_args: Option<usize>,
    return_type: Option<Type>,
    body: Arc<NativeFn>,
}

impl Function {
    /// A function taking exactly `arity` arguments.
    pub fn new<F>(arity: usize, return_type: Type, body: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, FunctionError> + Send + Sync + 'static,
    {
        Function {
            min_args: arity,
            max_args: Some(arity),
            return_type: Some(return_type),
            body: Arc::new(body),
        }
    }

    /// A function taking `min_args` or more arguments.
    pub fn variadic<F>(min_args: usize, return_type: Type, body: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, FunctionError> + Send + Sync + 'static,
    {
        Function {
            min_args,
            max_args: None,
            return_type: Some(return_type),
            body: Arc::new(body),
        }
    }

    /// Declared return type, if the function has a fixed one
    pub fn return_type(&self) -> Option<&Type> {
        self.return_type.as_ref()
    }

    pub fn accepts(&self, arg_count: usize) -> bool {
        arg_count >= self.min_args && self.max_args.is_none_or(|max| arg_count <= max)
    }

    /// Human-readable arity, e.g. `1`, `2..`
    pub fn arity(&self) -> String {
        match self.max_args {
            Some(max) if max == self.min_args => max.to_string(),
            Some(max) => format!("{}..{}", self.min_args, max),
            None => format!("{}..", self.min_args),
        }
    }

    pub fn call(&self, args: &[Value]) -> Result<Value, FunctionError> {
        if !self.accepts(args.len()) {
            return Err(FunctionError(format!(
                "expected {} argument(s), got {}",
                self.arity(),
                args.len()
            )));
        }
        (self.body)(args)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("arity", &self.arity())
            .field("return_type", &self.return_type)
            .finish_non_exhaustive()
    }
}

/// Name-keyed table of [`Function`]s.
///
/// # Examples
///
/// ```
/// use sift_lang::{Function, FunctionRegistry, Type, Value};
///
/// let mut registry = FunctionRegistry::with_builtins();
/// registry.register("double", Function::new(1, Type::Int, |args| {
///     match &args[0] {
///         Value::Int(n) => Ok(Value::Int(n * 2)),
///         other => Err(format!("double() expects Int, got {}", other.kind()).into()),
///     }
/// }));
/// assert!(registry.get("double").is_some());
/// assert!(registry.get("lower").is_some());
/// ```
#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, Function>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with `lower`, `upper`, `len`, `starts_with`,
    /// `ends_with`, `concat`, `any` and `all`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("lower", Function::new(1, Type::String, builtin_lower));
        registry.register("upper", Function::new(1, Type::String, builtin_upper));
        registry.register("len", Function::new(1, Type::Int, builtin_len));
        registry.register("starts_with", Function::new(2, Type::Bool, builtin_starts_with));
        registry.register("ends_with", Function::new(2, Type::Bool, builtin_ends_with));
        registry.register("concat", Function::variadic(1, Type::String, builtin_concat));
        registry.register("any", Function::new(1, Type::Bool, builtin_any));
        registry.register("all", Function::new(1, Type::Bool, builtin_all));
        registry
    }

    /// Add or replace a function.
    pub fn register(&mut self, name: impl Into<String>, function: Function) -> &mut Self {
        self.functions.insert(name.into(), function);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Function> {
        self.functions.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

fn string_arg<'a>(name: &str, args: &'a [Value], index: usize) -> Result<&'a str, FunctionError> {
    args[index].as_str().ok_or_else(|| {
        FunctionError(format!(
            "{}() argument {} must be String, got {}",
            name,
            index + 1,
            args[index].kind()
        ))
    })
}

fn bool_array(name: &str, value: &Value) -> Result<Vec<bool>, FunctionError> {
    let items = value
        .as_array()
        .ok_or_else(|| FunctionError(format!("{}() expects Array, got {}", name, value.kind())))?;
    items
        .iter()
        .map(|item| {
            item.as_bool().ok_or_else(|| {
                FunctionError(format!("{}() expects Array<Bool>, found {}", name, item.kind()))
            })
        })
        .collect()
}

fn builtin_lower(args: &[Value]) -> Result<Value, FunctionError> {
    Ok(Value::String(string_arg("lower", args, 0)?.to_lowercase()))
}

fn builtin_upper(args: &[Value]) -> Result<Value, FunctionError> {
    Ok(Value::String(string_arg("upper", args, 0)?.to_uppercase()))
}

fn builtin_len(args: &[Value]) -> Result<Value, FunctionError> {
    let len = match &args[0] {
        Value::String(s) => s.chars().count(),
        Value::Array(items) => items.len(),
        other => {
            return Err(FunctionError(format!(
                "len() expects String or Array, got {}",
                other.kind()
            )));
        }
    };
    i64::try_from(len)
        .map(Value::Int)
        .map_err(|_| FunctionError("len() result does not fit in Int".to_string()))
}

fn builtin_starts_with(args: &[Value]) -> Result<Value, FunctionError> {
    let s = string_arg("starts_with", args, 0)?;
    let prefix = string_arg("starts_with", args, 1)?;
    Ok(Value::Bool(s.starts_with(prefix)))
}

fn builtin_ends_with(args: &[Value]) -> Result<Value, FunctionError> {
    let s = string_arg("ends_with", args, 0)?;
    let suffix = string_arg("ends_with", args, 1)?;
    Ok(Value::Bool(s.ends_with(suffix)))
}

fn builtin_concat(args: &[Value]) -> Result<Value, FunctionError> {
    let mut result = String::new();
    for index in 0..args.len() {
        result.push_str(string_arg("concat", args, index)?);
    }
    Ok(Value::String(result))
}

fn builtin_any(args: &[Value]) -> Result<Value, FunctionError> {
    Ok(Value::Bool(bool_array("any", &args[0])?.into_iter().any(|b| b)))
}

fn builtin_all(args: &[Value]) -> Result<Value, FunctionError> {
    Ok(Value::Bool(bool_array("all", &args[0])?.into_iter().all(|b| b)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_string_functions() {
        let registry = FunctionRegistry::with_builtins();
        let lower = registry.get("lower").unwrap();
        assert_eq!(lower.call(&[Value::from("ExAmple")]), Ok(Value::from("example")));

        let concat = registry.get("concat").unwrap();
        assert_eq!(
            concat.call(&[Value::from("a"), Value::from("b"), Value::from("c")]),
            Ok(Value::from("abc"))
        );
        assert!(concat.accepts(5));
        assert!(!concat.accepts(0));
    }

    #[test]
    fn test_builtin_argument_errors() {
        let registry = FunctionRegistry::with_builtins();
        let err = registry.get("upper").unwrap().call(&[Value::Int(1)]).unwrap_err();
        assert!(err.to_string().contains("must be String"));

        let err = registry
            .get("any")
            .unwrap()
            .call(&[Value::from(vec![Value::Int(1)])])
            .unwrap_err();
        assert!(err.to_string().contains("Array<Bool>"));
    }

    #[test]
    fn test_len() {
        let len = FunctionRegistry::with_builtins().get("len").cloned().unwrap();
        assert_eq!(len.call(&[Value::from("héllo")]), Ok(Value::Int(5)));
        assert_eq!(len.call(&[Value::from(vec![1i64, 2, 3])]), Ok(Value::Int(3)));
        assert_eq!(len.arity(), "1");
        assert!(len.call(&[]).is_err());
    }
}
