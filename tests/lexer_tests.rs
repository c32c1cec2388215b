// tests/lexer_tests.rs

use std::net::IpAddr;

use sift_lang::ast::Token;
use sift_lang::lexer::Lexer;

fn single_token(input: &str) -> Token {
    let mut lexer = Lexer::new(input);
    let token = lexer.next_token();
    assert_eq!(lexer.next_token(), Token::Eof, "trailing tokens in {:?}", input);
    token
}

fn ip(text: &str) -> Token {
    Token::Ip(text.parse::<IpAddr>().unwrap())
}

fn cidr(text: &str) -> Token {
    Token::Cidr(text.parse().unwrap())
}

// ============================================================================
// Symbols and Operators
// ============================================================================

#[test]
fn test_punctuation() {
    let test_cases = vec![
        ("(", Token::LParen),
        (")", Token::RParen),
        ("{", Token::LBrace),
        ("}", Token::RBrace),
        ("[", Token::LBracket),
        ("]", Token::RBracket),
        (",", Token::Comma),
        ("*", Token::Star),
        ("..", Token::DotDot),
    ];

    for (input, expected) in test_cases {
        assert_eq!(single_token(input), expected, "input: {}", input);
    }
}

#[test]
fn test_symbolic_operators() {
    let test_cases = vec![
        ("==", Token::EqEq),
        ("!=", Token::NotEq),
        ("===", Token::AllEq),
        ("!==", Token::AnyNotEq),
        ("<", Token::Lt),
        ("<=", Token::LtEq),
        (">", Token::Gt),
        (">=", Token::GtEq),
        ("&&", Token::And),
        ("||", Token::Or),
        ("^^", Token::Xor),
        ("!", Token::Not),
        ("~", Token::Matches),
    ];

    for (input, expected) in test_cases {
        assert_eq!(single_token(input), expected, "input: {}", input);
    }
}

#[test]
fn test_word_operators() {
    let test_cases = vec![
        ("and", Token::And),
        ("or", Token::Or),
        ("xor", Token::Xor),
        ("not", Token::Not),
        ("eq", Token::EqEq),
        ("ne", Token::NotEq),
        ("lt", Token::Lt),
        ("le", Token::LtEq),
        ("gt", Token::Gt),
        ("ge", Token::GtEq),
        ("contains", Token::Contains),
        ("matches", Token::Matches),
        ("in", Token::In),
        ("wildcard", Token::Wildcard),
        ("strict wildcard", Token::StrictWildcard),
        ("strict   wildcard", Token::StrictWildcard),
    ];

    for (input, expected) in test_cases {
        assert_eq!(single_token(input), expected, "input: {}", input);
    }
}

#[test]
fn test_strict_without_wildcard_is_identifier() {
    let mut lexer = Lexer::new("strict == true");
    assert_eq!(lexer.next_token(), Token::Identifier("strict".to_string()));
    assert_eq!(lexer.next_token(), Token::EqEq);
    assert_eq!(lexer.next_token(), Token::Boolean(true));
}

#[test]
fn test_lone_symbols_are_illegal() {
    for input in ["&", "|", "^", "=", ".", "#", "@"] {
        assert!(
            matches!(single_token(input), Token::Illegal(_)),
            "expected Illegal for {:?}",
            input
        );
    }
}

// ============================================================================
// Identifiers and List References
// ============================================================================

#[test]
fn test_dotted_identifiers() {
    assert_eq!(
        single_token("http.request.uri.path"),
        Token::Identifier("http.request.uri.path".to_string())
    );
    assert_eq!(single_token("_private"), Token::Identifier("_private".to_string()));
}

#[test]
fn test_hex_looking_identifiers() {
    // Valid hex but not addresses
    assert_eq!(single_token("cafe"), Token::Identifier("cafe".to_string()));
    assert_eq!(single_token("dead.beef"), Token::Identifier("dead.beef".to_string()));
}

#[test]
fn test_identifier_before_range() {
    let tokens: Vec<Token> = Lexer::new("a..b").collect();
    assert_eq!(
        tokens,
        vec![
            Token::Identifier("a".to_string()),
            Token::DotDot,
            Token::Identifier("b".to_string()),
        ]
    );
}

#[test]
fn test_list_refs() {
    assert_eq!(single_token("$blocked_ips"), Token::ListRef("blocked_ips".to_string()));
    assert_eq!(single_token("$lists.admins"), Token::ListRef("lists.admins".to_string()));
    assert!(matches!(single_token("$"), Token::Illegal(_)));
}

// ============================================================================
// Literals
// ============================================================================

#[test]
fn test_integers() {
    assert_eq!(single_token("443"), Token::Integer(443));
    assert_eq!(single_token("0"), Token::Integer(0));
    assert_eq!(single_token("-12"), Token::Integer(-12));
    assert_eq!(single_token("-9223372036854775808"), Token::Integer(i64::MIN));
}

#[test]
fn test_invalid_integers() {
    assert!(matches!(single_token("9223372036854775808"), Token::Illegal(msg) if msg.contains("out of range")));
    assert!(matches!(single_token("12abc"), Token::Illegal(msg) if msg.contains("Invalid number")));
}

#[test]
fn test_strings() {
    assert_eq!(single_token(r#""example.com""#), Token::String("example.com".to_string()));
    assert_eq!(single_token("'single'"), Token::String("single".to_string()));
    assert_eq!(single_token(r#""a\tb\n""#), Token::String("a\tb\n".to_string()));
    assert_eq!(single_token(r#""say \"hi\"""#), Token::String("say \"hi\"".to_string()));
    assert_eq!(single_token(r#""\x41\x42""#), Token::String("AB".to_string()));
    assert_eq!(single_token(r#""""#), Token::String(String::new()));
}

#[test]
fn test_raw_strings() {
    assert_eq!(single_token(r#"r"^\d+$""#), Token::String(r"^\d+$".to_string()));
    assert_eq!(
        single_token(r##"r#"say "hi""#"##),
        Token::String(r#"say "hi""#.to_string())
    );
}

#[test]
fn test_string_errors() {
    assert!(matches!(single_token(r#""\q""#), Token::Illegal(msg) if msg.contains("\\q")));
    assert!(matches!(single_token(r#""\xZZ""#), Token::Illegal(_)));
    assert!(matches!(single_token(r#""open"#), Token::Illegal(msg) if msg.contains("Unterminated")));
    assert!(matches!(single_token(r#"r"open"#), Token::Illegal(msg) if msg.contains("Unterminated")));
}

#[test]
fn test_booleans() {
    assert_eq!(single_token("true"), Token::Boolean(true));
    assert_eq!(single_token("false"), Token::Boolean(false));
}

// ============================================================================
// Addresses and Networks
// ============================================================================

#[test]
fn test_ipv4() {
    assert_eq!(single_token("192.168.0.1"), ip("192.168.0.1"));
    assert_eq!(single_token("10.0.0.0/8"), cidr("10.0.0.0/8"));
}

#[test]
fn test_ipv6() {
    assert_eq!(single_token("::1"), ip("::1"));
    assert_eq!(single_token("fe80::1"), ip("fe80::1"));
    assert_eq!(single_token("2001:db8::1"), ip("2001:db8::1"));
    assert_eq!(single_token("2001:db8::/32"), cidr("2001:db8::/32"));
}

#[test]
fn test_invalid_addresses() {
    assert!(matches!(single_token("1.2.3"), Token::Illegal(_)));
    assert!(matches!(single_token("256.0.0.1"), Token::Illegal(_)));
    assert!(matches!(single_token("10.0.0.0/33"), Token::Illegal(msg) if msg.contains("prefix")));
}

// ============================================================================
// Positions and Iteration
// ============================================================================

#[test]
fn test_positions() {
    let mut lexer = Lexer::new("a ==\n  1");

    lexer.next_token();
    assert_eq!((lexer.position().line, lexer.position().column), (1, 1));

    lexer.next_token();
    assert_eq!((lexer.position().line, lexer.position().column), (1, 3));

    assert_eq!(lexer.next_token(), Token::Integer(1));
    assert_eq!((lexer.position().line, lexer.position().column), (2, 3));
    assert_eq!(lexer.position().offset, 7);
}

#[test]
fn test_full_filter() {
    let tokens: Vec<Token> =
        Lexer::new(r#"ip.src in 10.0.0.0/8 && http.host wildcard "*.example.com""#).collect();
    assert_eq!(
        tokens,
        vec![
            Token::Identifier("ip.src".to_string()),
            Token::In,
            cidr("10.0.0.0/8"),
            Token::And,
            Token::Identifier("http.host".to_string()),
            Token::Wildcard,
            Token::String("*.example.com".to_string()),
        ]
    );
}

#[test]
fn test_set_with_negative_range() {
    let tokens: Vec<Token> = Lexer::new("{-5..5, 10}").collect();
    assert_eq!(
        tokens,
        vec![
            Token::LBrace,
            Token::Integer(-5),
            Token::DotDot,
            Token::Integer(5),
            Token::Comma,
            Token::Integer(10),
            Token::RBrace,
        ]
    );
}
