// tests/parser_tests.rs

use sift_lang::ast::{BinOp, Expr, IndexKey, UnaryOp};
use sift_lang::error::DiagnosticKind;
use sift_lang::lexer::Lexer;
use sift_lang::parser::Parser;
use sift_lang::value::Value;

fn parse(input: &str) -> Expr {
    Parser::new(Lexer::new(input))
        .parse()
        .unwrap_or_else(|e| panic!("failed to parse {:?}: {}", input, e))
}

fn field(name: &str) -> Expr {
    Expr::Field(name.to_string())
}

fn int(n: i64) -> Expr {
    Expr::Literal(Value::Int(n))
}

fn string(s: &str) -> Expr {
    Expr::Literal(Value::from(s))
}

// ============================================================================
// Precedence and Associativity
// ============================================================================

#[test]
fn test_and_binds_tighter_than_or() {
    assert_eq!(
        parse("a or b and c"),
        Expr::binary(BinOp::Or, field("a"), Expr::binary(BinOp::And, field("b"), field("c")))
    );
}

#[test]
fn test_xor_between_or_and_and() {
    assert_eq!(
        parse("a and b xor c or d"),
        Expr::binary(
            BinOp::Or,
            Expr::binary(BinOp::Xor, Expr::binary(BinOp::And, field("a"), field("b")), field("c")),
            field("d"),
        )
    );
}

#[test]
fn test_comparison_binds_tighter_than_logic() {
    assert_eq!(
        parse(r#"http.host == "example.com" and http.status >= 400"#),
        Expr::binary(
            BinOp::And,
            Expr::binary(BinOp::Equal, field("http.host"), string("example.com")),
            Expr::binary(BinOp::GreaterEqual, field("http.status"), int(400)),
        )
    );
}

#[test]
fn test_ordering_binds_tighter_than_equality() {
    assert_eq!(
        parse("x < 5 == true"),
        Expr::binary(
            BinOp::Equal,
            Expr::binary(BinOp::LessThan, field("x"), int(5)),
            Expr::Literal(Value::Bool(true)),
        )
    );
}

#[test]
fn test_left_associative() {
    assert_eq!(
        parse("a or b or c"),
        Expr::binary(BinOp::Or, Expr::binary(BinOp::Or, field("a"), field("b")), field("c"))
    );
}

#[test]
fn test_not_scope() {
    // `not` takes the whole comparison but stops at `and`
    assert_eq!(
        parse("not port == 80 and ssl"),
        Expr::binary(
            BinOp::And,
            Expr::not(Expr::binary(BinOp::Equal, field("port"), int(80))),
            field("ssl"),
        )
    );
    assert_eq!(parse("!!a"), Expr::not(Expr::not(field("a"))));
}

#[test]
fn test_parentheses_override() {
    assert_eq!(
        parse("(a or b) and c"),
        Expr::binary(BinOp::And, Expr::binary(BinOp::Or, field("a"), field("b")), field("c"))
    );
}

#[test]
fn test_operator_aliases() {
    assert_eq!(parse("a && b || c"), parse("a and b or c"));
    assert_eq!(parse("x eq 1"), parse("x == 1"));
    assert_eq!(parse("x ge 1"), parse("x >= 1"));
    assert_eq!(parse(r#"s ~ "a""#), parse(r#"s matches "a""#));
}

// ============================================================================
// Sets, Indices, Calls, Lists
// ============================================================================

#[test]
fn test_set_with_ranges() {
    assert_eq!(
        parse("port in {80..100, 443, 8000..9000}"),
        Expr::binary(
            BinOp::In,
            field("port"),
            Expr::Array(vec![
                Expr::Range {
                    start: Box::new(int(80)),
                    end: Box::new(int(100)),
                },
                int(443),
                Expr::Range {
                    start: Box::new(int(8000)),
                    end: Box::new(int(9000)),
                },
            ]),
        )
    );
}

#[test]
fn test_set_trailing_comma_and_empty() {
    assert_eq!(
        parse(r#"name in {"a", "b",}"#),
        Expr::binary(BinOp::In, field("name"), Expr::Array(vec![string("a"), string("b")]))
    );
    assert_eq!(parse("x in {}"), Expr::binary(BinOp::In, field("x"), Expr::Array(vec![])));
}

#[test]
fn test_contains_set() {
    assert!(matches!(
        parse(r#"ua contains {"curl", "wget"}"#),
        Expr::Binary { op: BinOp::Contains, right, .. } if matches!(*right, Expr::Array(ref items) if items.len() == 2)
    ));
}

#[test]
fn test_index_chain() {
    assert_eq!(
        parse(r#"headers["cookie"][-1] == "x""#),
        Expr::binary(
            BinOp::Equal,
            Expr::Index {
                target: Box::new(Expr::Index {
                    target: Box::new(field("headers")),
                    key: IndexKey::Str("cookie".to_string()),
                }),
                key: IndexKey::Int(-1),
            },
            string("x"),
        )
    );
}

#[test]
fn test_unpack() {
    assert_eq!(
        parse(r#"names[*] == "x-debug""#),
        Expr::binary(BinOp::Equal, Expr::Unpack(Box::new(field("names"))), string("x-debug"))
    );
}

#[test]
fn test_function_calls() {
    assert_eq!(
        parse(r#"lower(http.host) == "a""#),
        Expr::binary(
            BinOp::Equal,
            Expr::FunctionCall {
                name: "lower".to_string(),
                args: vec![field("http.host")],
            },
            string("a"),
        )
    );
    assert!(matches!(
        parse("f()"),
        Expr::FunctionCall { ref args, .. } if args.is_empty()
    ));
    assert!(matches!(
        parse(r#"concat(a, "-", b)[0]"#),
        Expr::Index { ref target, key: IndexKey::Int(0) } if matches!(**target, Expr::FunctionCall { ref args, .. } if args.len() == 3)
    ));
}

#[test]
fn test_call_needs_adjacent_paren() {
    let err = Parser::new(Lexer::new("lower (http.host)")).parse().unwrap_err();
    assert!(err.to_string().contains("trailing"));
    assert!(matches!(parse("lower(http.host)"), Expr::FunctionCall { .. }));
    assert!(matches!(parse("lower( http.host )"), Expr::FunctionCall { .. }));
}

#[test]
fn test_list_ref() {
    assert_eq!(
        parse("ip.src in $blocked"),
        Expr::binary(BinOp::In, field("ip.src"), Expr::ListRef("blocked".to_string()))
    );
}

#[test]
fn test_network_literals() {
    assert_eq!(
        parse("ip.src in 10.0.0.0/8"),
        Expr::binary(
            BinOp::In,
            field("ip.src"),
            Expr::Literal(Value::Cidr("10.0.0.0/8".parse().unwrap())),
        )
    );
}

#[test]
fn test_strict_wildcard() {
    assert!(matches!(
        parse(r#"host strict wildcard "*.Example.com""#),
        Expr::Binary { op: BinOp::StrictWildcard, .. }
    ));
}

// ============================================================================
// Canonical Form
// ============================================================================

#[test]
fn test_display_round_trip() {
    let sources = [
        r#"http.host == "example.com" and http.status >= 400"#,
        "not (a or b) xor c",
        "port in {80..100, 443, -5..5}",
        r#"headers["a\"b"][0] contains "x\ty""#,
        "names[*] === \"a\"",
        "ip.src in 2001:db8::/32 or ip.src in $blocked",
        "lower(concat(a, b)) strict wildcard \"*\"",
    ];

    for source in sources {
        let expr = parse(source);
        let printed = expr.to_string();
        assert_eq!(parse(&printed), expr, "canonical form {:?} of {:?}", printed, source);
    }
}

#[test]
fn test_display_parenthesizes_nested_operations() {
    assert_eq!(parse("a or b and not c").to_string(), "a or (b and (not c))");
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_missing_operand() {
    let err = Parser::new(Lexer::new("http.status >=")).parse().unwrap_err();
    assert_eq!(err.diagnostics().len(), 1);
    assert_eq!(err.diagnostics()[0].kind, DiagnosticKind::Parse);
    assert!(err.to_string().contains("end of input"));
}

#[test]
fn test_unclosed_group_position() {
    let err = Parser::new(Lexer::new("(a == 1")).parse().unwrap_err();
    let diagnostic = &err.diagnostics()[0];
    assert!(diagnostic.message.contains("`)`"));
    assert!(diagnostic.message.contains("line 1, column 1"));
}

#[test]
fn test_trailing_input() {
    let err = Parser::new(Lexer::new("a == 1 b")).parse().unwrap_err();
    assert!(err.to_string().contains("trailing"));
}

#[test]
fn test_lex_errors_surface_as_lex_diagnostics() {
    let err = Parser::new(Lexer::new("a = 1")).parse().unwrap_err();
    assert_eq!(err.diagnostics()[0].kind, DiagnosticKind::Lex);
    assert!(err.to_string().contains("=="));
}

#[test]
fn test_set_errors_are_collected() {
    let err = Parser::new(Lexer::new("x in {1, ==, 3, )}")).parse().unwrap_err();
    assert_eq!(err.diagnostics().len(), 2);
}

#[test]
fn test_set_outside_membership() {
    let err = Parser::new(Lexer::new("x == {1, 2}")).parse().unwrap_err();
    assert!(err.to_string().contains("set literals"));
}

#[test]
fn test_bad_index_key() {
    assert!(Parser::new(Lexer::new("a[b]")).parse().is_err());
    assert!(Parser::new(Lexer::new("a[0")).parse().is_err());
}

#[test]
fn test_depth_limit() {
    let deep = format!("{}a{}", "(".repeat(20), ")".repeat(20));
    assert!(Parser::new(Lexer::new(&deep)).parse().is_ok());

    let err = Parser::with_max_depth(Lexer::new(&deep), 10).parse().unwrap_err();
    assert!(err.to_string().contains("nested deeper than 10"));

    let nots = format!("{}a", "not ".repeat(500));
    assert!(Parser::new(Lexer::new(&nots)).parse().is_err());
}

#[test]
fn test_long_operator_chain_is_bounded() {
    let chain = vec!["a"; 5_000].join(" or ");
    let err = Parser::new(Lexer::new(&chain)).parse().unwrap_err();
    assert!(err.to_string().contains("nested deeper than 128"));

    let within = vec!["a"; 100].join(" or ");
    assert!(Parser::new(Lexer::new(&within)).parse().is_ok());

    let err = Parser::with_max_depth(Lexer::new("a and b and c and d"), 3).parse().unwrap_err();
    assert!(err.to_string().contains("nested deeper than 3"));
}

#[test]
fn test_long_index_chain_is_bounded() {
    let chain = format!("a{} == 1", "[0]".repeat(200_000));
    let err = Parser::new(Lexer::new(&chain)).parse().unwrap_err();
    assert!(err.to_string().contains("nested deeper than 128"));

    let within = format!("a{}[*] == 1", "[0]".repeat(50));
    assert!(Parser::new(Lexer::new(&within)).parse().is_ok());
}

#[test]
fn test_nested_sets_count_toward_depth() {
    let nested = format!("x in {{{}}}", vec!["1"; 3].join(" or "));
    assert!(Parser::with_max_depth(Lexer::new(&nested), 4).parse().is_err());
    assert!(Parser::with_max_depth(Lexer::new(&nested), 5).parse().is_ok());
}
