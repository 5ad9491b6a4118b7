use tempfile::tempdir;

use crate::ast::{Connector, SegmentKind};
use crate::parser::{build_list, validate};
use crate::tokenizer::tokenize;

fn accepts(input: &str) -> bool {
    validate(&tokenize(input).unwrap()).is_ok()
}

#[test]
fn test_valid_forms() {
    assert!(accepts("ls"));
    assert!(accepts("ls -l /tmp"));
    assert!(accepts("ls | wc -l"));
    assert!(accepts("a | b | c"));
    assert!(accepts("a && b || c"));
    assert!(accepts("a ; b ; c"));
    assert!(accepts("a &"));
    assert!(accepts("a ;"));
    assert!(accepts("a & b"));
    assert!(accepts("cat < x > y"));
    assert!(accepts("cat << tag"));
    assert!(accepts("cat <<< word"));
    assert!(accepts("(a ; b)"));
    assert!(accepts("(a && b) ; c"));
    assert!(accepts("(a) &"));
    assert!(accepts(""));
}

#[test]
fn test_rejected_forms() {
    // Leading operators.
    assert!(!accepts("| a"));
    assert!(!accepts("&& a"));
    assert!(!accepts("; a"));
    // Pipe with no right-hand command.
    assert!(!accepts("a |"));
    assert!(!accepts("a | | b"));
    // Two operators in a row.
    assert!(!accepts("a && && b"));
    assert!(!accepts("a ; ; b"));
    assert!(!accepts("a && || b"));
    // Trailing connective.
    assert!(!accepts("a &&"));
    assert!(!accepts("a ||"));
    // Redirection with no file word.
    assert!(!accepts("a >"));
    assert!(!accepts("a <"));
    assert!(!accepts("a > | b"));
    // Broken groups.
    assert!(!accepts("(a"));
    assert!(!accepts("a)"));
    assert!(!accepts("()"));
}

#[test]
fn test_pipeline_stages() {
    let tokens = tokenize("a one | b two | c").unwrap();
    let segments = build_list(&tokens).unwrap();
    assert_eq!(segments.len(), 1);
    let SegmentKind::AndOr(list) = &segments[0].kind else {
        panic!("expected and-or segment");
    };
    assert_eq!(list.first.stages.len(), 3);
    assert_eq!(list.first.stages[0].argv, vec!["a", "one"]);
    assert_eq!(list.first.stages[1].argv, vec!["b", "two"]);
    assert_eq!(list.first.stages[2].argv, vec!["c"]);
}

#[test]
fn test_andor_connectors() {
    let tokens = tokenize("a && b || c").unwrap();
    let segments = build_list(&tokens).unwrap();
    let SegmentKind::AndOr(list) = &segments[0].kind else {
        panic!("expected and-or segment");
    };
    assert_eq!(list.first.stages[0].argv, vec!["a"]);
    assert_eq!(list.rest.len(), 2);
    assert_eq!(list.rest[0].0, Connector::And);
    assert_eq!(list.rest[1].0, Connector::Or);
}

#[test]
fn test_background_flag_detaches_preceding_segment() {
    let tokens = tokenize("a & b").unwrap();
    let segments = build_list(&tokens).unwrap();
    assert_eq!(segments.len(), 2);
    assert!(segments[0].background);
    assert!(!segments[1].background);

    let tokens = tokenize("a ; b &").unwrap();
    let segments = build_list(&tokens).unwrap();
    assert!(!segments[0].background);
    assert!(segments[1].background);
}

#[test]
fn test_last_redirection_wins() {
    let dir = tempdir().unwrap();
    let first = dir.path().join("first");
    let second = dir.path().join("second");
    let line = format!(
        "echo x > {} > {}",
        first.display(),
        second.display()
    );
    let tokens = tokenize(&line).unwrap();
    let segments = build_list(&tokens).unwrap();
    let SegmentKind::AndOr(list) = &segments[0].kind else {
        panic!("expected and-or segment");
    };
    let cmd = &list.first.stages[0];
    assert_eq!(cmd.output_file.as_deref(), Some(second.to_str().unwrap()));
    assert!(!cmd.append);
    // Pre-validation already created both targets.
    assert!(first.exists());
    assert!(second.exists());
}

#[test]
fn test_append_kind_is_kept() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("log");
    let line = format!("echo x >> {}", out.display());
    let tokens = tokenize(&line).unwrap();
    let segments = build_list(&tokens).unwrap();
    let SegmentKind::AndOr(list) = &segments[0].kind else {
        panic!("expected and-or segment");
    };
    assert!(list.first.stages[0].append);
}

#[test]
fn test_missing_input_file_fails_the_line() {
    let tokens = tokenize("cat < /nonexistent/definitely/missing").unwrap();
    assert!(validate(&tokens).is_ok());
    assert!(build_list(&tokens).is_err());
}

#[test]
fn test_redirection_target_is_not_an_argument() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("out");
    let line = format!("echo a b > {}", out.display());
    let tokens = tokenize(&line).unwrap();
    let segments = build_list(&tokens).unwrap();
    let SegmentKind::AndOr(list) = &segments[0].kind else {
        panic!("expected and-or segment");
    };
    assert_eq!(list.first.stages[0].argv, vec!["echo", "a", "b"]);
}

#[test]
fn test_subshell_group() {
    // A group is a whole list segment; it cannot join an and-or chain.
    assert!(!accepts("(a ; b) && c"));

    let tokens = tokenize("(a ; b)").unwrap();
    let segments = build_list(&tokens).unwrap();
    let SegmentKind::Subshell(inner) = &segments[0].kind else {
        panic!("expected subshell segment");
    };
    assert_eq!(inner.len(), 2);
}

#[test]
fn test_heredoc_tokens_are_consumed_but_ignored() {
    let tokens = tokenize("cat << tag").unwrap();
    let segments = build_list(&tokens).unwrap();
    let SegmentKind::AndOr(list) = &segments[0].kind else {
        panic!("expected and-or segment");
    };
    let cmd = &list.first.stages[0];
    assert_eq!(cmd.argv, vec!["cat"]);
    assert!(cmd.input_file.is_none());
}
