use crate::alias::AliasStore;
use crate::expand::{expand_aliases, expand_variables};
use crate::variables::VarStore;

fn store() -> VarStore {
    VarStore::new("aish", Vec::new())
}

#[test]
fn test_alias_first_word_only() {
    let mut aliases = AliasStore::new();
    aliases.set("ll", "ls -la");
    assert_eq!(expand_aliases("ll /tmp", &aliases), "ls -la /tmp");
    // Not at command position.
    assert_eq!(expand_aliases("echo ll", &aliases), "echo ll");
}

#[test]
fn test_alias_rescans_replacement() {
    let mut aliases = AliasStore::new();
    aliases.set("l", "ll");
    aliases.set("ll", "ls -la");
    assert_eq!(expand_aliases("l", &aliases), "ls -la");
}

#[test]
fn test_self_referential_alias_expands_once() {
    let mut aliases = AliasStore::new();
    aliases.set("ls", "ls -a");
    assert_eq!(expand_aliases("ls /tmp", &aliases), "ls -a /tmp");
}

#[test]
fn test_mutually_recursive_aliases_terminate() {
    let mut aliases = AliasStore::new();
    aliases.set("a", "b");
    aliases.set("b", "a");
    // Each name substitutes once, then the pass stops.
    assert_eq!(expand_aliases("a", &aliases), "a");
}

#[test]
fn test_alias_preserves_leading_whitespace() {
    let mut aliases = AliasStore::new();
    aliases.set("ll", "ls -la");
    assert_eq!(expand_aliases("   ll x", &aliases), "   ls -la x");
}

#[test]
fn test_simple_variable_forms() {
    let mut vars = store();
    vars.set("FOO", "bar", false).unwrap();
    assert_eq!(expand_variables("echo $FOO", &mut vars), "echo bar");
    assert_eq!(expand_variables("echo ${FOO}", &mut vars), "echo bar");
    assert_eq!(expand_variables("echo ${FOO}baz", &mut vars), "echo barbaz");
    assert_eq!(expand_variables("echo $FOObaz", &mut vars), "echo ");
}

#[test]
fn test_undefined_variable_is_empty() {
    let mut vars = store();
    assert_eq!(
        expand_variables("echo [$NO_SUCH_VARIABLE_EVER]", &mut vars),
        "echo []"
    );
}

#[test]
fn test_default_value_modifier() {
    let mut vars = store();
    assert_eq!(expand_variables("${UNSET_X:-fallback}", &mut vars), "fallback");
    vars.set("SET_X", "value", false).unwrap();
    assert_eq!(expand_variables("${SET_X:-fallback}", &mut vars), "value");
    // Set-but-empty takes the default too.
    vars.set("EMPTY_X", "", false).unwrap();
    assert_eq!(expand_variables("${EMPTY_X:-fallback}", &mut vars), "fallback");
    // `:-` does not assign.
    assert_eq!(vars.get("UNSET_X"), None);
}

#[test]
fn test_assign_default_modifier() {
    let mut vars = store();
    assert_eq!(expand_variables("${ASSIGN_X:=filled}", &mut vars), "filled");
    assert_eq!(vars.get("ASSIGN_X").as_deref(), Some("filled"));
}

#[test]
fn test_length_modifier() {
    let mut vars = store();
    vars.set("WORD", "abcde", false).unwrap();
    assert_eq!(expand_variables("${#WORD}", &mut vars), "5");
    assert_eq!(expand_variables("${#NO_SUCH_VARIABLE_EVER}", &mut vars), "0");
}

#[test]
fn test_special_variables() {
    let mut vars = store();
    vars.last_status = 42;
    assert_eq!(expand_variables("$?", &mut vars), "42");
    assert_eq!(
        expand_variables("$$", &mut vars),
        std::process::id().to_string()
    );
    vars.last_background_pid = 777;
    assert_eq!(expand_variables("$!", &mut vars), "777");
}

#[test]
fn test_positional_parameters() {
    let mut vars = VarStore::new("aish", vec!["one".to_string(), "two".to_string()]);
    assert_eq!(expand_variables("$0", &mut vars), "aish");
    assert_eq!(expand_variables("$1", &mut vars), "one");
    assert_eq!(expand_variables("$2", &mut vars), "two");
    assert_eq!(expand_variables("$3", &mut vars), "");
    assert_eq!(expand_variables("$#", &mut vars), "2");
}

#[test]
fn test_backslash_suppresses_expansion() {
    let mut vars = store();
    vars.set("FOO", "bar", false).unwrap();
    // The pair passes through for the tokenizer to unquote.
    assert_eq!(expand_variables(r"echo \$FOO", &mut vars), r"echo \$FOO");
}

#[test]
fn test_dollar_paren_keeps_inner_text() {
    let mut vars = store();
    // Substitution forms are not supported; the construct degrades to its
    // inner text.
    assert_eq!(
        expand_variables("echo $((not supported but treated literal))", &mut vars),
        "echo (not supported but treated literal)"
    );
    assert_eq!(expand_variables("echo $(echo hi)", &mut vars), "echo echo hi");
    // Unbalanced parens stay literal.
    assert_eq!(expand_variables("echo $(oops", &mut vars), "echo $(oops");
}

#[test]
fn test_lone_dollar_stays_literal() {
    let mut vars = store();
    assert_eq!(expand_variables("echo $", &mut vars), "echo $");
    assert_eq!(expand_variables("echo $ x", &mut vars), "echo $ x");
    // Unterminated brace degrades to literal text.
    assert_eq!(expand_variables("echo ${FOO", &mut vars), "echo ${FOO");
}
