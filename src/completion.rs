use std::env;
use std::fs;
use std::os::unix::fs::PermissionsExt;

use crate::builtins;
use crate::shell::Shell;

pub struct CompletionResult {
    pub candidates: Vec<String>,
    pub common_prefix: String,
}

/// Start of the word under the cursor. Words are delimited by whitespace
/// or any of `|`, `;`, `&`.
pub fn word_start(line: &str, cursor: usize) -> usize {
    let bytes = line.as_bytes();
    let mut start = cursor;
    while start > 0 {
        let c = bytes[start - 1];
        if c == b' ' || c == b'\t' || c == b'|' || c == b';' || c == b'&' {
            break;
        }
        start -= 1;
    }
    start
}

/// True when the word is in command position: preceded by nothing or by a
/// command separator.
fn is_first_word(line: &str, start: usize) -> bool {
    let bytes = line.as_bytes();
    let mut i = start;
    while i > 0 && (bytes[i - 1] == b' ' || bytes[i - 1] == b'\t') {
        i -= 1;
    }
    if i == 0 {
        return true;
    }
    matches!(bytes[i - 1], b'|' | b';' | b'&')
}

/// Candidates for the word under the cursor: command names in command
/// position, variable names after `$`, filesystem entries otherwise.
/// Sorted and deduplicated, with the longest common prefix attached.
pub fn complete(line: &str, cursor: usize, shell: &Shell) -> CompletionResult {
    let start = word_start(line, cursor);
    let word = &line[start..cursor];

    let mut candidates = if word.starts_with('$') {
        complete_variables(word, shell)
    } else if is_first_word(line, start) && !word.contains('/') {
        complete_commands(word)
    } else {
        complete_files(word)
    };

    candidates.sort();
    candidates.dedup();
    let common_prefix = common_prefix(&candidates);

    CompletionResult {
        candidates,
        common_prefix,
    }
}

fn common_prefix(candidates: &[String]) -> String {
    let Some(first) = candidates.first() else {
        return String::new();
    };
    let mut prefix_len = first.len();
    for candidate in &candidates[1..] {
        let matched = first
            .bytes()
            .zip(candidate.bytes())
            .take_while(|(a, b)| a == b)
            .count();
        prefix_len = prefix_len.min(matched);
    }
    first[..prefix_len].to_string()
}

/// Union of builtin names and executables on the search path.
fn complete_commands(prefix: &str) -> Vec<String> {
    let mut candidates: Vec<String> = builtins::names()
        .iter()
        .filter(|name| name.starts_with(prefix))
        .map(|name| name.to_string())
        .collect();

    if let Ok(path) = env::var("PATH") {
        for dir in path.split(':') {
            let Ok(entries) = fs::read_dir(dir) else { continue };
            for entry in entries.filter_map(|e| e.ok()) {
                let Some(name) = entry.file_name().to_str().map(String::from) else {
                    continue;
                };
                if !name.starts_with(prefix) {
                    continue;
                }
                let executable = entry
                    .metadata()
                    .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
                    .unwrap_or(false);
                if executable {
                    candidates.push(name);
                }
            }
        }
    }

    candidates
}

/// Variable names from the store, `$` preserved.
fn complete_variables(word: &str, shell: &Shell) -> Vec<String> {
    let prefix = &word[1..];
    shell
        .vars
        .names()
        .into_iter()
        .filter(|name| name.starts_with(prefix))
        .map(|name| format!("${}", name))
        .collect()
}

/// Directory prefix plus matching entries; directories get a trailing `/`
/// and hidden entries stay hidden unless the prefix asks for them.
fn complete_files(word: &str) -> Vec<String> {
    let (dir_part, prefix) = match word.rfind('/') {
        Some(i) => (&word[..i + 1], &word[i + 1..]),
        None => ("", word),
    };
    let dir_path = if dir_part.is_empty() {
        "."
    } else if dir_part == "/" {
        "/"
    } else {
        &dir_part[..dir_part.len() - 1]
    };

    let Ok(entries) = fs::read_dir(dir_path) else {
        return Vec::new();
    };

    let mut candidates = Vec::new();
    for entry in entries.filter_map(|e| e.ok()) {
        let Some(name) = entry.file_name().to_str().map(String::from) else {
            continue;
        };
        if name == "." || name == ".." {
            continue;
        }
        if name.starts_with('.') && !prefix.starts_with('.') {
            continue;
        }
        if !name.starts_with(prefix) {
            continue;
        }
        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        let mut candidate = format!("{}{}", dir_part, name);
        if is_dir {
            candidate.push('/');
        }
        candidates.push(candidate);
    }

    candidates
}
