use std::env;

const BOLD_GREEN: &str = "\x1b[1;32m";
const BOLD_BLUE: &str = "\x1b[1;34m";
const RESET: &str = "\x1b[0m";

/// The `user@host:cwd$ ` string the main loop hands to the editor. The
/// editor measures the printable width itself, so the ANSI codes go in
/// as-is.
pub fn generate() -> String {
    let user = env::var("USER").unwrap_or_else(|_| "user".to_string());
    let host = nix::unistd::gethostname()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "localhost".to_string());
    // Short hostname only.
    let host = host.split('.').next().unwrap_or("localhost").to_string();

    let cwd = env::current_dir()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| "?".to_string());
    let cwd = match env::var("HOME") {
        Ok(home) if cwd == home => "~".to_string(),
        Ok(home) if cwd.starts_with(&format!("{}/", home)) => {
            format!("~{}", &cwd[home.len()..])
        }
        _ => cwd,
    };

    format!(
        "{}{}@{}{}:{}{}{}$ ",
        BOLD_GREEN, user, host, RESET, BOLD_BLUE, cwd, RESET
    )
}
