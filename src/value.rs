use std::{fmt, net::IpAddr};

use ipnet::IpNet;
use serde::{Deserialize, Serialize};

/// A typed value flowing through a filter.
///
/// Values come from three places: literals in the filter source, fields set
/// on an [`ExecutionContext`](crate::ExecutionContext), and the results of
/// function calls or named lists.
///
/// # Kinds
///
/// - `String`, `Int` and `Bool` are plain scalars
/// - `Ip` is a single address, `Cidr` a subnet; both have type [`Type::Ip`]
/// - `Array` is an ordered sequence; comparison operators expect it to be
///   homogeneous
///
/// There is no implicit conversion between kinds. Comparing an `Int` with a
/// `String` is an error, not `false`.
///
/// # Examples
///
/// ```
/// use sift_lang::{Type, Value};
///
/// let port = Value::Int(443);
/// assert!(port.conforms_to(&Type::Int));
///
/// let names = Value::Array(vec![Value::from("a"), Value::from("b")]);
/// assert!(names.conforms_to(&Type::Array(Box::new(Type::String))));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// UTF-8 string
    String(String),

    /// 64-bit signed integer
    Int(i64),

    /// Boolean
    Bool(bool),

    /// IPv4 or IPv6 address
    Ip(IpAddr),

    /// IPv4 or IPv6 subnet (address plus prefix length)
    Cidr(IpNet),

    /// Ordered sequence of values
    Array(Vec<Value>),
}

/// The type of a field, mirroring the kinds of [`Value`].
///
/// Types never carry data. They appear in a [`Schema`](crate::Schema) and in
/// compile-time validation.
///
/// Types deserialize from lowercase names, with arrays written as a single-key
/// object:
///
/// ```
/// use sift_lang::Type;
///
/// let ty: Type = serde_json::from_str(r#"{"array": "int"}"#).unwrap();
/// assert_eq!(ty, Type::Array(Box::new(Type::Int)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Type {
    String,
    Int,
    Bool,
    Ip,
    Array(Box<Type>),
}

impl Type {
    /// Element type if this is an array type.
    pub fn element(&self) -> Option<&Type> {
        match self {
            Type::Array(inner) => Some(inner),
            _ => None,
        }
    }

    /// Whether `<`, `>`, `<=`, `>=` are defined for this type.
    pub fn is_ordered(&self) -> bool {
        matches!(self, Type::Int)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::String => write!(f, "String"),
            Type::Int => write!(f, "Int"),
            Type::Bool => write!(f, "Bool"),
            Type::Ip => write!(f, "Ip"),
            Type::Array(inner) => write!(f, "Array<{}>", inner),
        }
    }
}

impl Value {
    /// Human-readable kind name used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Value::String(_) => "String",
            Value::Int(_) => "Int",
            Value::Bool(_) => "Bool",
            Value::Ip(_) => "Ip",
            Value::Cidr(_) => "Cidr",
            Value::Array(_) => "Array",
        }
    }

    /// Check whether this value may be stored in a field of type `ty`.
    ///
    /// Empty arrays conform to every array type. `Cidr` values conform to
    /// [`Type::Ip`].
    pub fn conforms_to(&self, ty: &Type) -> bool {
        match (self, ty) {
            (Value::String(_), Type::String) => true,
            (Value::Int(_), Type::Int) => true,
            (Value::Bool(_), Type::Bool) => true,
            (Value::Ip(_) | Value::Cidr(_), Type::Ip) => true,
            (Value::Array(items), Type::Array(inner)) => {
                items.iter().all(|item| item.conforms_to(inner))
            }
            _ => false,
        }
    }

    /// Static type of a scalar value. Arrays have no single static type
    /// (they may be empty), so they yield `None`.
    pub fn scalar_type(&self) -> Option<Type> {
        match self {
            Value::String(_) => Some(Type::String),
            Value::Int(_) => Some(Type::Int),
            Value::Bool(_) => Some(Type::Bool),
            Value::Ip(_) | Value::Cidr(_) => Some(Type::Ip),
            Value::Array(_) => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Equality that refuses to compare values of different kinds.
    ///
    /// Arrays compare element-wise; a kind mismatch anywhere inside is still
    /// an error. Returns the pair of offending kinds on mismatch.
    ///
    /// An address and a network share [`Type::Ip`], so comparing them is
    /// allowed and always `false`.
    pub fn strict_eq(&self, other: &Value) -> Result<bool, (&'static str, &'static str)> {
        match (self, other) {
            (Value::String(a), Value::String(b)) => Ok(a == b),
            (Value::Int(a), Value::Int(b)) => Ok(a == b),
            (Value::Bool(a), Value::Bool(b)) => Ok(a == b),
            (Value::Ip(a), Value::Ip(b)) => Ok(a == b),
            (Value::Cidr(a), Value::Cidr(b)) => Ok(a == b),
            (Value::Ip(_), Value::Cidr(_)) | (Value::Cidr(_), Value::Ip(_)) => Ok(false),
            (Value::Array(a), Value::Array(b)) => {
                if a.len() != b.len() {
                    return Ok(false);
                }
                for (x, y) in a.iter().zip(b) {
                    if !x.strict_eq(y)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            (a, b) => Err((a.kind(), b.kind())),
        }
    }
}

/// Parse a network for CIDR containment. A bare address is its own
/// single-host network.
pub(crate) fn parse_network(text: &str) -> Option<IpNet> {
    let text = text.trim();
    text.parse::<IpNet>().ok().or_else(|| {
        let addr = text.parse::<IpAddr>().ok()?;
        let host_prefix = if addr.is_ipv4() { 32 } else { 128 };
        IpNet::new(addr, host_prefix).ok()
    })
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{:?}", s),
            Value::Int(n) => write!(f, "{}", n),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Ip(addr) => write!(f, "{}", addr),
            Value::Cidr(net) => write!(f, "{}", net),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<IpAddr> for Value {
    fn from(addr: IpAddr) -> Self {
        Value::Ip(addr)
    }
}

impl From<IpNet> for Value {
    fn from(net: IpNet) -> Self {
        Value::Cidr(net)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}
