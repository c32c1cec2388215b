use std::{net::Ipv4Addr, sync::Arc};

use sift_lang::{CompileOptions, ContextError, ExecutionContext, Schema, Type, Value};

fn schema() -> Arc<Schema> {
    Arc::new(
        Schema::builder()
            .field("host", Type::String)
            .field("status", Type::Int)
            .field("ip", Type::Ip)
            .field("ports", Type::Array(Box::new(Type::Int)))
            .build(),
    )
}

// ============================================================================
// Schema
// ============================================================================

#[test]
fn test_schema_lookup() {
    let schema = schema();
    assert_eq!(schema.get("status"), Some(&Type::Int));
    assert_eq!(schema.get("missing"), None);
    assert_eq!(schema.len(), 4);
    assert!(!schema.is_empty());
    assert!(Schema::default().is_empty());
}

#[test]
fn test_schema_tables_merge() {
    let http = vec![("http.host", Type::String), ("http.port", Type::String)];
    let overrides = vec![("http.port", Type::Int)];
    let schema = Schema::from_tables([http, overrides]);

    assert_eq!(schema.get("http.port"), Some(&Type::Int));
    let names: Vec<&str> = schema.fields().map(|(name, _)| name).collect();
    assert_eq!(names, vec!["http.host", "http.port"]);
}

#[test]
fn test_type_from_json() {
    let table: std::collections::BTreeMap<String, Type> =
        serde_json::from_str(r#"{"a": "string", "b": "ip", "c": {"array": {"array": "string"}}}"#).unwrap();
    assert_eq!(table["a"], Type::String);
    assert_eq!(table["b"], Type::Ip);
    assert_eq!(
        table["c"],
        Type::Array(Box::new(Type::Array(Box::new(Type::String))))
    );
    assert_eq!(table["c"].to_string(), "Array<Array<String>>");
}

#[test]
fn test_compile_options_from_json() {
    let options: CompileOptions = serde_json::from_str("{}").unwrap();
    assert_eq!(options, CompileOptions::default());
    assert_eq!(options.max_depth, 128);
    assert_eq!(options.regex_size_limit, 1 << 20);

    let options: CompileOptions = serde_json::from_str(r#"{"regex_size_limit": 4096}"#).unwrap();
    assert_eq!(options.regex_size_limit, 4096);
    assert_eq!(options.max_depth, 128);
}

// ============================================================================
// Execution Context
// ============================================================================

#[test]
fn test_typed_setters() {
    let schema = schema();
    let mut ctx = ExecutionContext::with_schema(&schema);
    ctx.set_string("host", "example.com")
        .unwrap()
        .set_int("status", 200)
        .unwrap()
        .set_ip("ip", Ipv4Addr::new(10, 0, 0, 1))
        .unwrap();

    assert_eq!(ctx.get("host"), Some(&Value::from("example.com")));
    assert_eq!(ctx.get("status"), Some(&Value::Int(200)));
    assert_eq!(ctx.get("ip"), Some(&Value::Ip("10.0.0.1".parse().unwrap())));
    assert_eq!(ctx.len(), 3);
    assert_eq!(ctx.field_type("status"), Some(&Type::Int));
}

#[test]
fn test_setter_rejects_wrong_type() {
    let schema = schema();
    let mut ctx = ExecutionContext::with_schema(&schema);

    let err = ctx.set_string("status", "200").unwrap_err();
    assert_eq!(
        err,
        ContextError::TypeMismatch {
            field: "status".to_string(),
            expected: Type::Int,
            found: "String",
        }
    );
    assert!(ctx.is_empty());
}

#[test]
fn test_setter_rejects_unknown_field() {
    let schema = schema();
    let mut ctx = ExecutionContext::with_schema(&schema);
    assert_eq!(
        ctx.set_int("nope", 1).unwrap_err(),
        ContextError::UnknownField("nope".to_string())
    );
}

#[test]
fn test_array_fields_are_checked_per_element() {
    let schema = schema();
    let mut ctx = ExecutionContext::with_schema(&schema);

    assert!(ctx.set_field("ports", Value::from(vec![80i64, 443])).is_ok());
    assert!(ctx.set_field("ports", Value::Array(vec![])).is_ok());
    assert!(matches!(
        ctx.set_field("ports", Value::Array(vec![Value::Int(1), Value::from("x")])),
        Err(ContextError::TypeMismatch { .. })
    ));
}

#[test]
fn test_ip_from_text() {
    let schema = schema();
    let mut ctx = ExecutionContext::with_schema(&schema);

    ctx.set_ip_str("ip", " ::1 ").unwrap();
    assert_eq!(ctx.get("ip"), Some(&Value::Ip("::1".parse().unwrap())));

    assert_eq!(
        ctx.set_ip_str("ip", "localhost").unwrap_err(),
        ContextError::InvalidIp {
            field: "ip".to_string(),
            text: "localhost".to_string(),
        }
    );
}

#[test]
fn test_networks_conform_to_ip() {
    let schema = schema();
    let mut ctx = ExecutionContext::with_schema(&schema);
    assert!(ctx.set_field("ip", Value::Cidr("10.0.0.0/8".parse().unwrap())).is_ok());
}

#[test]
fn test_untyped_context_accepts_anything() {
    let mut ctx = ExecutionContext::new();
    ctx.set_int("a", 1).unwrap().set_string("a", "now a string").unwrap();
    assert_eq!(ctx.get("a"), Some(&Value::from("now a string")));
    assert!(ctx.schema().is_none());
    assert_eq!(ctx.field_type("a"), None);
}
