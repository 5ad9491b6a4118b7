use std::collections::HashMap;

/// First-word substitutions applied before tokenization.
#[derive(Default)]
pub struct AliasStore {
    aliases: HashMap<String, String>,
}

impl AliasStore {
    pub fn new() -> AliasStore {
        AliasStore::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.aliases.get(name).map(|s| s.as_str())
    }

    pub fn set(&mut self, name: &str, value: &str) {
        self.aliases.insert(name.to_string(), value.to_string());
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.aliases.remove(name).is_some()
    }

    pub fn clear(&mut self) {
        self.aliases.clear();
    }

    pub fn list(&self) -> Vec<(String, String)> {
        let mut entries: Vec<_> = self
            .aliases
            .iter()
            .map(|(n, v)| (n.clone(), v.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }
}
