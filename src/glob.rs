use std::fs;
use std::path::Path;

use crate::tokenizer::{Token, TokenKind};

pub fn has_glob_chars(s: &str) -> bool {
    s.bytes().any(|b| b == b'*' || b == b'?' || b == b'[')
}

/// Pattern match over bytes: `*` (anything but handled per component),
/// `?` (one character), `[...]` classes with `a-z` ranges and a leading
/// `!` or `^` for negation.
pub fn glob_match(pattern: &str, name: &str) -> bool {
    match_bytes(pattern.as_bytes(), name.as_bytes())
}

fn match_bytes(mut pat: &[u8], s: &[u8]) -> bool {
    if pat.is_empty() {
        return s.is_empty();
    }

    match pat[0] {
        b'*' => {
            while pat.first() == Some(&b'*') {
                pat = &pat[1..];
            }
            if pat.is_empty() {
                return true;
            }
            for start in 0..=s.len() {
                if match_bytes(pat, &s[start..]) {
                    return true;
                }
            }
            false
        }
        b'?' => !s.is_empty() && match_bytes(&pat[1..], &s[1..]),
        b'[' => {
            if s.is_empty() {
                return false;
            }
            let (matched, rest) = match_class(&pat[1..], s[0]);
            if !matched {
                return false;
            }
            match_bytes(rest, &s[1..])
        }
        c => !s.is_empty() && s[0] == c && match_bytes(&pat[1..], &s[1..]),
    }
}

/// Character class body; `pat` starts just past the `[`. Returns whether
/// `c` is in the class and the pattern remainder past the closing `]`.
fn match_class(mut pat: &[u8], c: u8) -> (bool, &[u8]) {
    let mut negated = false;
    if pat.first() == Some(&b'!') || pat.first() == Some(&b'^') {
        negated = true;
        pat = &pat[1..];
    }

    let mut matched = false;
    while !pat.is_empty() && pat[0] != b']' {
        if pat.len() >= 3 && pat[1] == b'-' && pat[2] != b']' {
            if c >= pat[0] && c <= pat[2] {
                matched = true;
            }
            pat = &pat[3..];
        } else {
            if c == pat[0] {
                matched = true;
            }
            pat = &pat[1..];
        }
    }
    if pat.first() == Some(&b']') {
        pat = &pat[1..];
    }

    (matched != negated, pat)
}

/// Expand one pattern against the filesystem. Only the final path
/// component is matched; hidden entries require a literal leading `.` in
/// the pattern. Results come back sorted; an empty result means the
/// caller keeps the literal pattern.
pub fn expand(pattern: &str) -> Vec<String> {
    let (dir_path, file_pattern) = match pattern.rfind('/') {
        Some(i) => {
            let dir = if i == 0 { "/" } else { &pattern[..i] };
            (dir, &pattern[i + 1..])
        }
        None => (".", pattern),
    };

    if !has_glob_chars(file_pattern) {
        // Glob characters were in the directory part only; treat the whole
        // pattern as a literal existence check.
        return if Path::new(pattern).exists() {
            vec![pattern.to_string()]
        } else {
            Vec::new()
        };
    }

    let entries = match fs::read_dir(dir_path) {
        Ok(entries) => entries,
        Err(_) => return Vec::new(),
    };

    let mut matches = Vec::new();
    for entry in entries.filter_map(|e| e.ok()) {
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };

        if name.starts_with('.') && !file_pattern.starts_with('.') {
            continue;
        }
        if glob_match(file_pattern, name) {
            if dir_path == "." && !pattern.starts_with("./") {
                matches.push(name.to_string());
            } else if dir_path == "/" {
                matches.push(format!("/{}", name));
            } else {
                matches.push(format!("{}/{}", dir_path, name));
            }
        }
    }

    matches.sort();
    matches
}

/// Pathname-expand the unquoted Word tokens of a stream. Redirection
/// targets are left alone; a pattern with no matches stays literal.
pub fn expand_word_tokens(tokens: Vec<Token>) -> Vec<Token> {
    let mut out = Vec::with_capacity(tokens.len());
    let mut after_redirect = false;

    for token in tokens {
        let globbable = token.kind == TokenKind::Word
            && !token.quoted
            && !after_redirect
            && has_glob_chars(&token.text);
        after_redirect = token.is_redirect();

        if !globbable {
            out.push(token);
            continue;
        }

        let matches = expand(&token.text);
        if matches.is_empty() {
            out.push(token);
        } else {
            for m in matches {
                out.push(Token {
                    kind: TokenKind::Word,
                    text: m,
                    quoted: false,
                });
            }
        }
    }

    out
}
