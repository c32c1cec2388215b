use std::{collections::HashMap, fmt, net::IpAddr, sync::Arc};

use crate::{
    error::ContextError,
    lists::ListProvider,
    schema::Schema,
    value::{Type, Value},
};

/// Field values for one evaluation of a filter.
///
/// Build a fresh context per request, fill it with the typed setters, then
/// pass it to [`Filter::execute`](crate::Filter::execute). When the context
/// is created with a schema, every write is checked against it.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use sift_lang::{ExecutionContext, Schema, Type};
///
/// let schema = Arc::new(
///     Schema::builder()
///         .field("http.host", Type::String)
///         .field("http.status", Type::Int)
///         .build(),
/// );
///
/// let mut ctx = ExecutionContext::with_schema(&schema);
/// ctx.set_string("http.host", "example.com")?
///     .set_int("http.status", 500)?;
///
/// assert!(ctx.set_int("http.host", 1).is_err());
/// # Ok::<(), sift_lang::ContextError>(())
/// ```
#[derive(Clone, Default)]
pub struct ExecutionContext {
    schema: Option<Arc<Schema>>,
    values: HashMap<String, Value>,
    lists: Option<Arc<dyn ListProvider>>,
}

impl ExecutionContext {
    /// A context that accepts any field.
    pub fn new() -> Self {
        Self::default()
    }

    /// A context that only accepts the schema's fields, with matching types.
    pub fn with_schema(schema: &Arc<Schema>) -> Self {
        ExecutionContext {
            schema: Some(Arc::clone(schema)),
            ..Self::default()
        }
    }

    /// Attach the provider used to resolve `$name` list references.
    pub fn with_lists(mut self, lists: Arc<dyn ListProvider>) -> Self {
        self.lists = Some(lists);
        self
    }

    pub fn schema(&self) -> Option<&Arc<Schema>> {
        self.schema.as_ref()
    }

    pub fn lists(&self) -> Option<&dyn ListProvider> {
        self.lists.as_deref()
    }

    pub fn set_string(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<&mut Self, ContextError> {
        self.set_field(name, Value::String(value.into()))
    }

    pub fn set_int(&mut self, name: impl Into<String>, value: i64) -> Result<&mut Self, ContextError> {
        self.set_field(name, Value::Int(value))
    }

    pub fn set_bool(&mut self, name: impl Into<String>, value: bool) -> Result<&mut Self, ContextError> {
        self.set_field(name, Value::Bool(value))
    }

    pub fn set_ip(
        &mut self,
        name: impl Into<String>,
        value: impl Into<IpAddr>,
    ) -> Result<&mut Self, ContextError> {
        self.set_field(name, Value::Ip(value.into()))
    }

    /// Parse `text` as an address and store it.
    pub fn set_ip_str(&mut self, name: impl Into<String>, text: &str) -> Result<&mut Self, ContextError> {
        let name = name.into();
        let addr = text.trim().parse::<IpAddr>().map_err(|_| ContextError::InvalidIp {
            field: name.clone(),
            text: text.to_string(),
        })?;
        self.set_field(name, Value::Ip(addr))
    }

    /// Store any value, including arrays. Checked against the schema like
    /// the typed setters.
    pub fn set_field(&mut self, name: impl Into<String>, value: Value) -> Result<&mut Self, ContextError> {
        let name = name.into();
        if let Some(schema) = &self.schema {
            let ty = schema
                .get(&name)
                .ok_or_else(|| ContextError::UnknownField(name.clone()))?;
            if !value.conforms_to(ty) {
                return Err(ContextError::TypeMismatch {
                    field: name,
                    expected: ty.clone(),
                    found: value.kind(),
                });
            }
        }
        self.values.insert(name, value);
        Ok(self)
    }

    /// Declared type of a field, when a schema is in force
    pub fn field_type(&self, name: &str) -> Option<&Type> {
        self.schema.as_ref().and_then(|schema| schema.get(name))
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("schema", &self.schema)
            .field("values", &self.values)
            .field("lists", &self.lists.is_some())
            .finish()
    }
}
