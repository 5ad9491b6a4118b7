use crate::tokenizer::{tokenize, TokenKind, MAX_TOKENS};

fn kinds(input: &str) -> Vec<TokenKind> {
    tokenize(input).unwrap().iter().map(|t| t.kind).collect()
}

fn words(input: &str) -> Vec<String> {
    tokenize(input)
        .unwrap()
        .into_iter()
        .filter(|t| t.kind == TokenKind::Word)
        .map(|t| t.text)
        .collect()
}

#[test]
fn test_simple_words() {
    assert_eq!(words("echo hello world"), vec!["echo", "hello", "world"]);
    assert_eq!(
        kinds("echo hi"),
        vec![TokenKind::Word, TokenKind::Word, TokenKind::Eof]
    );
}

#[test]
fn test_operators_longest_match() {
    assert_eq!(
        kinds("a && b || c | d & e ; f"),
        vec![
            TokenKind::Word,
            TokenKind::And,
            TokenKind::Word,
            TokenKind::Or,
            TokenKind::Word,
            TokenKind::Pipe,
            TokenKind::Word,
            TokenKind::Ampersand,
            TokenKind::Word,
            TokenKind::Semicolon,
            TokenKind::Word,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn test_redirect_operators() {
    assert_eq!(
        kinds("a < in > out >> log << eof <<< word"),
        vec![
            TokenKind::Word,
            TokenKind::InputRedirect,
            TokenKind::Word,
            TokenKind::OutputRedirect,
            TokenKind::Word,
            TokenKind::OutputAppend,
            TokenKind::Word,
            TokenKind::Heredoc,
            TokenKind::Word,
            TokenKind::HereString,
            TokenKind::Word,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn test_operators_without_spaces() {
    assert_eq!(words("a|b"), vec!["a", "b"]);
    assert_eq!(
        kinds("a|b"),
        vec![TokenKind::Word, TokenKind::Pipe, TokenKind::Word, TokenKind::Eof]
    );
    assert_eq!(words("echo x>y"), vec!["echo", "x", "y"]);
}

#[test]
fn test_parens_in_command_position() {
    assert_eq!(
        kinds("(a)"),
        vec![
            TokenKind::LParen,
            TokenKind::Word,
            TokenKind::RParen,
            TokenKind::Eof
        ]
    );
    // The closing paren ends the word while a group is open.
    assert_eq!(
        kinds("(a; b)"),
        vec![
            TokenKind::LParen,
            TokenKind::Word,
            TokenKind::Semicolon,
            TokenKind::Word,
            TokenKind::RParen,
            TokenKind::Eof
        ]
    );
    assert_eq!(
        kinds("true && (a)"),
        vec![
            TokenKind::Word,
            TokenKind::And,
            TokenKind::LParen,
            TokenKind::Word,
            TokenKind::RParen,
            TokenKind::Eof
        ]
    );
}

#[test]
fn test_parens_in_argument_position_are_literal() {
    assert_eq!(words("echo (x)"), vec!["echo", "(x)"]);
    assert_eq!(
        words("echo (not supported but treated literal)"),
        vec!["echo", "(not", "supported", "but", "treated", "literal)"]
    );
    assert_eq!(words("echo a)b"), vec!["echo", "a)b"]);
}

#[test]
fn test_single_quotes_are_literal() {
    let tokens = tokenize("echo 'hello world'").unwrap();
    assert_eq!(tokens[1].text, "hello world");
    assert!(tokens[1].quoted);
    // No escape processing inside single quotes.
    assert_eq!(words(r"echo '\n'"), vec!["echo", r"\n"]);
}

#[test]
fn test_double_quote_escapes() {
    assert_eq!(words(r#"echo "a\tb""#), vec!["echo", "a\tb"]);
    assert_eq!(words(r#"echo "a\nb""#), vec!["echo", "a\nb"]);
    assert_eq!(words(r#"echo "\$HOME""#), vec!["echo", "$HOME"]);
    assert_eq!(words(r#"echo "say \"hi\"""#), vec!["echo", "say \"hi\""]);
    // Unrecognized escape keeps the backslash.
    assert_eq!(words(r#"echo "a\qb""#), vec!["echo", r"a\qb"]);
}

#[test]
fn test_adjacent_fragments_concatenate() {
    let tokens = tokenize(r#"echo hel"lo wor"ld"#).unwrap();
    assert_eq!(tokens[1].text, "hello world");
    assert!(tokens[1].quoted);

    let tokens = tokenize("echo a'b'c").unwrap();
    assert_eq!(tokens[1].text, "abc");
}

#[test]
fn test_backslash_quotes_next_character() {
    assert_eq!(words(r"echo a\|b"), vec!["echo", "a|b"]);
    assert_eq!(words(r"echo hello\ world"), vec!["echo", "hello world"]);
    // A trailing backslash stays literal.
    assert_eq!(words("echo a\\"), vec!["echo", "a\\"]);
}

#[test]
fn test_comment_consumes_rest_of_line() {
    assert_eq!(words("echo a # echo b"), vec!["echo", "a"]);
    assert_eq!(kinds("# whole line"), vec![TokenKind::Eof]);
}

#[test]
fn test_unterminated_quote_is_rejected() {
    assert!(tokenize("echo 'oops").is_err());
    assert!(tokenize("echo \"oops").is_err());
}

#[test]
fn test_token_count_limit() {
    let line = "a ".repeat(MAX_TOKENS + 10);
    assert!(tokenize(&line).is_err());
}

#[test]
fn test_token_length_limit() {
    let line = "x".repeat(5000);
    assert!(tokenize(&line).is_err());
}

#[test]
fn test_quoted_flag_suppression_marker() {
    let tokens = tokenize("echo '*'").unwrap();
    assert!(tokens[1].quoted);
    let tokens = tokenize("echo *").unwrap();
    assert!(!tokens[1].quoted);
}

#[test]
fn test_eof_always_terminates_stream() {
    assert_eq!(kinds(""), vec![TokenKind::Eof]);
    assert_eq!(kinds("   "), vec![TokenKind::Eof]);
}
