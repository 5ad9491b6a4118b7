use std::env;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;

/// Locate an executable on a `:`-separated search path.
pub fn search_cmd(cmd: &str, paths: &str) -> Option<String> {
    for path in paths.split(':') {
        let cmd_path = format!("{}/{}", path, cmd);
        let executable = fs::metadata(&cmd_path)
            .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
            .unwrap_or(false);
        if executable {
            return Some(cmd_path);
        }
    }
    None
}

pub fn home_dir() -> Option<PathBuf> {
    env::var("HOME").ok().map(PathBuf::from)
}

pub fn expand_tilde(path: &str) -> Result<String, String> {
    if path == "~" {
        env::var("HOME").map_err(|_| "HOME not set".to_string())
    } else if let Some(rest) = path.strip_prefix("~/") {
        env::var("HOME")
            .map(|home| format!("{}/{}", home, rest))
            .map_err(|_| "HOME not set".to_string())
    } else {
        Ok(path.to_string())
    }
}
