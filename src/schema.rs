//! Field schemas.
//!
//! A [`Schema`] is the typed contract between a compiled filter and the
//! contexts it runs against. It maps field names to [`Type`]s and carries the
//! [`FunctionRegistry`] filters may call into.

use std::collections::BTreeMap;

use tracing::debug;

use crate::{functions::FunctionRegistry, value::Type};

/// Immutable mapping from field name to [`Type`].
///
/// # Examples
///
/// ```
/// use sift_lang::{Schema, Type};
///
/// let schema = Schema::builder()
///     .field("http.host", Type::String)
///     .field("http.status", Type::Int)
///     .build();
///
/// assert_eq!(schema.get("http.status"), Some(&Type::Int));
/// assert_eq!(schema.get("http.method"), None);
/// ```
///
/// Several field tables can be merged; when two tables declare the same
/// field, the table merged last wins:
///
/// ```
/// use sift_lang::{Schema, Type};
///
/// let base = vec![("port", Type::String)];
/// let overrides = vec![("port", Type::Int)];
/// let schema = Schema::from_tables([base, overrides]);
/// assert_eq!(schema.get("port"), Some(&Type::Int));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Schema {
    fields: BTreeMap<String, Type>,
    functions: FunctionRegistry,
}

impl Schema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// Merge several field tables, later tables overriding earlier ones.
    pub fn from_tables<T, K>(tables: impl IntoIterator<Item = T>) -> Schema
    where
        T: IntoIterator<Item = (K, Type)>,
        K: Into<String>,
    {
        tables
            .into_iter()
            .fold(Schema::builder(), |builder, table| builder.table(table))
            .build()
    }

    pub fn get(&self, name: &str) -> Option<&Type> {
        self.fields.get(name)
    }

    /// Fields in name order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Type)> {
        self.fields.iter().map(|(name, ty)| (name.as_str(), ty))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }
}

/// Two schemas are equal when they declare the same fields with the same
/// types. Function registries are not compared.
impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.fields == other.fields
    }
}

/// Incremental [`Schema`] construction.
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    fields: BTreeMap<String, Type>,
    functions: FunctionRegistry,
}

impl SchemaBuilder {
    /// Declare a field. Redeclaring a field replaces its type.
    pub fn field(mut self, name: impl Into<String>, ty: Type) -> Self {
        let name = name.into();
        if let Some(previous) = self.fields.get(&name)
            && *previous != ty
        {
            debug!(field = %name, from = %previous, to = %ty, "schema field redeclared");
        }
        self.fields.insert(name, ty);
        self
    }

    /// Declare every field of a table.
    pub fn table<K: Into<String>>(self, table: impl IntoIterator<Item = (K, Type)>) -> Self {
        table
            .into_iter()
            .fold(self, |builder, (name, ty)| builder.field(name, ty))
    }

    /// Alias of [`table`](Self::table) for ad hoc field lists.
    pub fn fields<K: Into<String>>(self, fields: impl IntoIterator<Item = (K, Type)>) -> Self {
        self.table(fields)
    }

    /// Functions filters compiled against this schema may call.
    pub fn functions(mut self, functions: FunctionRegistry) -> Self {
        self.functions = functions;
        self
    }

    pub fn build(self) -> Schema {
        debug!(fields = self.fields.len(), "schema built");
        Schema {
            fields: self.fields,
            functions: self.functions,
        }
    }
}
