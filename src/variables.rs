use std::collections::HashMap;
use std::env;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VarFlags {
    pub exported: bool,
    pub readonly: bool,
}

#[derive(Debug, Clone)]
struct Variable {
    value: String,
    flags: VarFlags,
}

/// Shell variables plus the computed specials (`$?`, `$$`, `$!`, `$#`,
/// `$0`..`$9`). Exported variables are mirrored into the process
/// environment at write time so children inherit them.
pub struct VarStore {
    vars: HashMap<String, Variable>,
    pub last_status: i32,
    pub last_background_pid: i32,
    shell_pid: i32,
    positional: Vec<String>,
}

impl VarStore {
    /// Import the whole environment with the exported flag set, the way the
    /// shell sees it at startup. `$0` defaults to the shell name.
    pub fn new(shell_name: &str, args: Vec<String>) -> VarStore {
        let mut vars = HashMap::new();
        for (name, value) in env::vars() {
            vars.insert(
                name,
                Variable {
                    value,
                    flags: VarFlags {
                        exported: true,
                        readonly: false,
                    },
                },
            );
        }

        let mut positional = vec![shell_name.to_string()];
        positional.extend(args);

        VarStore {
            vars,
            last_status: 0,
            last_background_pid: 0,
            shell_pid: std::process::id() as i32,
            positional,
        }
    }

    pub fn is_valid_name(name: &str) -> bool {
        let mut chars = name.chars();
        match chars.next() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
            _ => return false,
        }
        chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    }

    /// Look a name up: specials first, then the store, then the raw
    /// environment as a fallback.
    pub fn get(&self, name: &str) -> Option<String> {
        match name {
            "?" => return Some(self.last_status.to_string()),
            "$" => return Some(self.shell_pid.to_string()),
            "!" => return Some(self.last_background_pid.to_string()),
            "#" => return Some((self.positional.len() - 1).to_string()),
            "@" | "*" => return Some(self.positional[1..].join(" ")),
            _ => {}
        }

        if name.len() == 1 && name.as_bytes()[0].is_ascii_digit() {
            let index = (name.as_bytes()[0] - b'0') as usize;
            return Some(
                self.positional
                    .get(index)
                    .cloned()
                    .unwrap_or_default(),
            );
        }

        if let Some(var) = self.vars.get(name) {
            return Some(var.value.clone());
        }
        env::var(name).ok()
    }

    pub fn set(&mut self, name: &str, value: &str, export: bool) -> Result<(), String> {
        if let Some(existing) = self.vars.get_mut(name) {
            if existing.flags.readonly {
                return Err(format!("{}: readonly variable", name));
            }
            existing.value = value.to_string();
            existing.flags.exported |= export;
            if existing.flags.exported {
                env::set_var(name, value);
            }
        } else {
            self.vars.insert(
                name.to_string(),
                Variable {
                    value: value.to_string(),
                    flags: VarFlags {
                        exported: export,
                        readonly: false,
                    },
                },
            );
            if export {
                env::set_var(name, value);
            }
        }
        Ok(())
    }

    pub fn unset(&mut self, name: &str) -> Result<(), String> {
        if let Some(var) = self.vars.get(name) {
            if var.flags.readonly {
                return Err(format!("{}: readonly variable", name));
            }
        }
        self.vars.remove(name);
        env::remove_var(name);
        Ok(())
    }

    /// Flip the exported flag on, creating an empty variable if needed.
    pub fn export(&mut self, name: &str) {
        if let Some(var) = self.vars.get_mut(name) {
            var.flags.exported = true;
            env::set_var(name, &var.value);
        } else {
            let _ = self.set(name, "", true);
        }
    }

    pub fn mark_readonly(&mut self, name: &str) {
        if let Some(var) = self.vars.get_mut(name) {
            var.flags.readonly = true;
        } else {
            self.vars.insert(
                name.to_string(),
                Variable {
                    value: String::new(),
                    flags: VarFlags {
                        exported: false,
                        readonly: true,
                    },
                },
            );
        }
    }

    /// Sorted (name, value, flags) triples, optionally exported-only.
    pub fn list(&self, exported_only: bool) -> Vec<(String, String, VarFlags)> {
        let mut entries: Vec<_> = self
            .vars
            .iter()
            .filter(|(_, v)| !exported_only || v.flags.exported)
            .map(|(n, v)| (n.clone(), v.value.clone(), v.flags))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    /// Variable names for `$`-prefix completion.
    pub fn names(&self) -> Vec<String> {
        self.vars.keys().cloned().collect()
    }
}
