use std::collections::HashSet;

use crate::alias::AliasStore;
use crate::variables::VarStore;

/// Rescan bound for alias substitution on one line.
const ALIAS_RECURSION_LIMIT: usize = 16;

/// Replace the first whitespace-delimited word with its alias value,
/// rescanning the result until a fixed point. A name already substituted
/// on this line is not substituted again, so `alias ls='ls -a'` expands
/// exactly once.
pub fn expand_aliases(line: &str, aliases: &AliasStore) -> String {
    let mut current = line.to_string();
    let mut seen: HashSet<String> = HashSet::new();

    for _ in 0..ALIAS_RECURSION_LIMIT {
        let start = match current.find(|c: char| !c.is_whitespace()) {
            Some(i) => i,
            None => break,
        };
        let end = current[start..]
            .find(char::is_whitespace)
            .map(|i| start + i)
            .unwrap_or(current.len());
        let word = &current[start..end];

        if seen.contains(word) {
            break;
        }
        let value = match aliases.get(word) {
            Some(v) => v.to_string(),
            None => break,
        };
        seen.insert(word.to_string());
        current = format!("{}{}{}", &current[..start], value, &current[end..]);
    }

    current
}

/// Rewrite `$NAME`, `${NAME}`, `${NAME:-d}`, `${NAME:=d}`, `${#NAME}` and
/// the single-character specials across the raw line. `\$` suppresses
/// expansion; every other backslash pair passes through untouched.
pub fn expand_variables(line: &str, vars: &mut VarStore) -> String {
    let chars: Vec<char> = line.chars().collect();
    let mut out = String::with_capacity(line.len());
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '\\' if i + 1 < chars.len() => {
                out.push('\\');
                out.push(chars[i + 1]);
                i += 2;
            }
            '$' => {
                let (expanded, consumed) = expand_reference(&chars[i..], vars);
                out.push_str(&expanded);
                i += consumed;
            }
            c => {
                out.push(c);
                i += 1;
            }
        }
    }

    out
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// One `$...` reference starting at `chars[0]`. Returns the replacement
/// text and how many characters were consumed.
fn expand_reference(chars: &[char], vars: &mut VarStore) -> (String, usize) {
    debug_assert_eq!(chars[0], '$');

    let Some(&next) = chars.get(1) else {
        return ("$".to_string(), 1);
    };

    match next {
        '{' => expand_braced(chars, vars),
        '(' => expand_parenthesized(chars),
        '?' | '$' | '!' | '#' | '@' | '*' => {
            let value = vars.get(&next.to_string()).unwrap_or_default();
            (value, 2)
        }
        c if c.is_ascii_digit() => {
            let value = vars.get(&c.to_string()).unwrap_or_default();
            (value, 2)
        }
        c if is_name_char(c) => {
            let mut end = 1;
            while end < chars.len() && is_name_char(chars[end]) {
                end += 1;
            }
            let name: String = chars[1..end].iter().collect();
            (vars.get(&name).unwrap_or_default(), end)
        }
        _ => ("$".to_string(), 1),
    }
}

/// `$(...)` forms (command substitution, arithmetic) are not supported:
/// the construct is replaced by its inner text verbatim, so
/// `$((not supported))` degrades to `(not supported)`. An unbalanced
/// open paren yields a literal `$`.
fn expand_parenthesized(chars: &[char]) -> (String, usize) {
    let mut depth = 0usize;
    for (i, &c) in chars.iter().enumerate().skip(1) {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    let inner: String = chars[2..i].iter().collect();
                    return (inner, i + 1);
                }
            }
            _ => {}
        }
    }
    ("$".to_string(), 1)
}

/// `${NAME}`, `${NAME:-default}`, `${NAME:=default}`, `${#NAME}`. An
/// unterminated brace yields a literal `$`.
fn expand_braced(chars: &[char], vars: &mut VarStore) -> (String, usize) {
    let Some(close) = chars.iter().position(|&c| c == '}') else {
        return ("$".to_string(), 1);
    };
    let consumed = close + 1;
    let mut i = 2; // past "${"

    let want_length = chars.get(i) == Some(&'#');
    if want_length {
        i += 1;
    }

    let name_start = i;
    while i < close && is_name_char(chars[i]) {
        i += 1;
    }
    let name: String = chars[name_start..i].iter().collect();
    let value = vars.get(&name).filter(|v| !v.is_empty());

    if want_length {
        let len = value.map(|v| v.len()).unwrap_or(0);
        return (len.to_string(), consumed);
    }

    // ${NAME:-default} / ${NAME:=default}
    if chars.get(i) == Some(&':') && i + 1 < close {
        let assign = chars[i + 1] == '=';
        if assign || chars[i + 1] == '-' {
            let default: String = chars[i + 2..close].iter().collect();
            return match value {
                Some(v) => (v, consumed),
                None => {
                    if assign {
                        let _ = vars.set(&name, &default, false);
                    }
                    (default, consumed)
                }
            };
        }
    }

    (value.unwrap_or_default(), consumed)
}
