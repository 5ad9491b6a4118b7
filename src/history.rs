use std::collections::VecDeque;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

use log::warn;

pub const HISTORY_CAPACITY: usize = 1000;

/// Fixed-capacity ring of past command lines. Immediately-consecutive
/// repeats are collapsed, the oldest entry is evicted when full, and the
/// ring is written back to its file on every mutation. One ring serves
/// both the editor's arrow-key navigation and the `history` builtin.
pub struct History {
    entries: VecDeque<String>,
    path: Option<PathBuf>,
}

impl History {
    pub fn new(path: Option<PathBuf>) -> History {
        let mut history = History {
            entries: VecDeque::new(),
            path,
        };
        history.load();
        history
    }

    fn load(&mut self) {
        let Some(path) = &self.path else { return };
        let Ok(contents) = fs::read_to_string(path) else {
            return;
        };
        for line in contents.lines() {
            if line.is_empty() {
                continue;
            }
            if self.entries.len() >= HISTORY_CAPACITY {
                self.entries.pop_front();
            }
            self.entries.push_back(line.to_string());
        }
    }

    fn save(&self) {
        let Some(path) = &self.path else { return };
        let result = fs::File::create(path).and_then(|mut file| {
            for entry in &self.entries {
                writeln!(file, "{}", entry)?;
            }
            Ok(())
        });
        if let Err(e) = result {
            warn!("could not write history file {}: {}", path.display(), e);
        }
    }

    pub fn add(&mut self, line: &str) {
        if line.is_empty() {
            return;
        }
        if self.entries.back().map(|s| s.as_str()) == Some(line) {
            return;
        }
        if self.entries.len() >= HISTORY_CAPACITY {
            self.entries.pop_front();
        }
        self.entries.push_back(line.to_string());
        self.save();
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.save();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Oldest-first index, 0-based.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(|s| s.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.entries.iter()
    }
}
