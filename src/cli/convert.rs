//! JSON -> schema and context conversion

use std::{collections::BTreeMap, net::IpAddr, sync::Arc};

use tracing::debug;

use super::CliError;
use crate::{ExecutionContext, FunctionRegistry, Schema, Type, Value};

/// Parse a schema from a JSON object of field name to type, e.g.
/// `{"http.host": "string", "ports": {"array": "int"}}`.
///
/// The schema is given the builtin functions.
pub fn load_schema(json: &str) -> Result<Schema, CliError> {
    let table: BTreeMap<String, Type> = serde_json::from_str(json)?;
    Ok(Schema::builder()
        .table(table)
        .functions(FunctionRegistry::with_builtins())
        .build())
}

/// Convert a JSON value to a filter value.
///
/// With a declared type, strings become addresses where the type says `Ip`.
/// Without one, strings that parse as an address become `Ip` and everything
/// else keeps its JSON shape. Floats, nulls and objects have no equivalent.
pub fn json_to_value(json: serde_json::Value, ty: Option<&Type>) -> Result<Value, String> {
    match json {
        serde_json::Value::Bool(b) => Ok(Value::Bool(b)),
        serde_json::Value::Number(n) => n
            .as_i64()
            .map(Value::Int)
            .ok_or_else(|| format!("{} is not a 64-bit integer", n)),
        serde_json::Value::String(s) => match ty {
            Some(Type::Ip) => s
                .parse::<IpAddr>()
                .map(Value::Ip)
                .map_err(|_| format!("'{}' is not an IP address", s)),
            Some(_) => Ok(Value::String(s)),
            None => Ok(s.parse::<IpAddr>().map(Value::Ip).unwrap_or(Value::String(s))),
        },
        serde_json::Value::Array(items) => {
            let element = ty.and_then(Type::element);
            items
                .into_iter()
                .map(|item| json_to_value(item, element))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array)
        }
        serde_json::Value::Null => Err("null has no value equivalent".to_string()),
        serde_json::Value::Object(_) => Err("objects are only allowed at the top level".to_string()),
    }
}

/// Build a context from a JSON object. Nested objects are flattened into
/// dotted field names, so `{"http": {"host": "a"}}` sets `http.host`.
pub fn load_context(json: &str, schema: Option<&Arc<Schema>>) -> Result<ExecutionContext, CliError> {
    let root: serde_json::Map<String, serde_json::Value> = serde_json::from_str(json)?;
    let mut ctx = match schema {
        Some(schema) => ExecutionContext::with_schema(schema),
        None => ExecutionContext::new(),
    };

    let mut pending: Vec<(String, serde_json::Value)> = root.into_iter().collect();
    while let Some((name, json)) = pending.pop() {
        if let serde_json::Value::Object(fields) = json {
            pending.extend(fields.into_iter().map(|(key, value)| (format!("{}.{}", name, key), value)));
            continue;
        }
        let value = json_to_value(json, ctx.field_type(&name)).map_err(|message| CliError::InvalidValue {
            field: name.clone(),
            message,
        })?;
        ctx.set_field(name, value)?;
    }

    debug!(fields = ctx.len(), "context loaded");
    Ok(ctx)
}
