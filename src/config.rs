use std::fs;

use log::{debug, warn};

use crate::shell::Shell;
use crate::utils;

/// Execute `~/.aisharc` line by line as if typed at the prompt. Blank and
/// `#` lines are skipped; a bad line reports and startup continues.
pub fn load_rc(shell: &mut Shell) {
    let Some(home) = utils::home_dir() else { return };
    let path = home.join(".aisharc");

    let contents = match fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("could not read {}: {}", path.display(), e);
            }
            return;
        }
    };

    debug!("loading rc file {}", path.display());
    for line in contents.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        shell.run_line(trimmed);
    }
}
