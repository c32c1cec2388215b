#![cfg(feature = "cli")]

use sift_lang::CompileOptions;
use sift_lang::cli::{CheckOptions, CheckResult, CliError, execute_check};

const SCHEMA: &str = r#"{
    "http.host": "string",
    "http.status": "int",
    "ip.src": "ip",
    "tags": {"array": "string"}
}"#;

fn check(expression: &str, context: &str) -> Result<CheckResult, CliError> {
    execute_check(&CheckOptions {
        expression: expression.to_string(),
        schema: Some(SCHEMA.to_string()),
        context: Some(context.to_string()),
        ..CheckOptions::default()
    })
}

#[test]
fn test_check_matches() {
    let context = r#"{"http": {"host": "example.com", "status": 503}, "ip.src": "10.1.1.1"}"#;
    assert_eq!(
        check(r#"http.host == "example.com" and http.status >= 500"#, context).unwrap(),
        CheckResult::Matched(true)
    );
    assert_eq!(
        check("ip.src in 192.168.0.0/16", context).unwrap(),
        CheckResult::Matched(false)
    );
}

#[test]
fn test_check_uses_builtin_functions() {
    let context = r#"{"http.host": "EXAMPLE.com", "tags": ["a", "b"]}"#;
    assert_eq!(
        check(r#"lower(http.host) == "example.com" and len(tags) == 2"#, context).unwrap(),
        CheckResult::Matched(true)
    );
}

#[test]
fn test_syntax_only_prints_canonical_form() {
    let result = execute_check(&CheckOptions {
        expression: "a or b and not c".to_string(),
        syntax_only: true,
        ..CheckOptions::default()
    })
    .unwrap();
    assert_eq!(result, CheckResult::SyntaxValid("a or (b and (not c))".to_string()));
}

#[test]
fn test_syntax_only_reports_errors() {
    let err = execute_check(&CheckOptions {
        expression: "a ==".to_string(),
        syntax_only: true,
        ..CheckOptions::default()
    })
    .unwrap_err();
    assert!(matches!(err, CliError::Compile(_)));
}

#[test]
fn test_check_errors() {
    assert!(matches!(
        check("http.status == \"x\"", "{}"),
        Err(CliError::Compile(_))
    ));
    assert!(matches!(
        check("http.status == 1", r#"{"http.status": "one"}"#),
        Err(CliError::Context(_))
    ));
    assert!(matches!(
        check("http.status == 1", r#"{"http.host": "a"}"#),
        Err(CliError::Exec(_))
    ));
    assert!(matches!(
        check("http.status == 1", r#"{"ip.src": "nowhere"}"#),
        Err(CliError::InvalidValue { .. })
    ));
    assert!(matches!(check("http.status == 1", "not json"), Err(CliError::Json(_))));
}

#[test]
fn test_check_requires_context() {
    let err = execute_check(&CheckOptions {
        expression: "true".to_string(),
        ..CheckOptions::default()
    })
    .unwrap_err();
    assert!(matches!(err, CliError::NoInput));
}

#[test]
fn test_check_honors_depth_limit() {
    let err = execute_check(&CheckOptions {
        expression: "((((true))))".to_string(),
        context: Some("{}".to_string()),
        compile: CompileOptions {
            max_depth: 2,
            ..CompileOptions::default()
        },
        ..CheckOptions::default()
    })
    .unwrap_err();
    assert!(err.to_string().contains("nested deeper than 2"));
}
