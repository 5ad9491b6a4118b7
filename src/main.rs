use log::{debug, error};

pub mod alias;
pub mod ast;
pub mod builtins;
pub mod completion;
pub mod config;
pub mod editor;
pub mod error;
pub mod executor;
pub mod expand;
pub mod glob;
pub mod history;
pub mod jobs;
pub mod parser;
pub mod prompt;
pub mod shell;
pub mod signals;
pub mod tokenizer;
pub mod utils;
pub mod variables;

use editor::Editor;
use shell::Shell;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().filter_or("AISH_LOG", "warn"))
        .format_timestamp(None)
        .init();

    let mut shell = Shell::new();

    if let Err(e) = signals::install() {
        eprintln!("aish: could not install signal handlers: {}", e);
    }

    config::load_rc(&mut shell);
    debug!("aish ready, interactive={}", shell.interactive);

    let mut editor = Editor::new();
    loop {
        // Completed background work is reported only at prompt boundaries.
        shell.jobs.reap();

        let prompt = if shell.interactive {
            prompt::generate()
        } else {
            String::new()
        };

        match editor.readline(&prompt, &shell) {
            Ok(Some(line)) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                shell.history.add(line);
                debug!("dispatching: {}", line);
                shell.run_line(line);
            }
            Ok(None) => {
                if shell.interactive {
                    println!("logout");
                }
                break;
            }
            Err(e) => {
                // Raw mode is already restored by the editor; report and
                // keep prompting.
                error!("readline failed: {}", e);
                eprintln!("aish: {}", e);
            }
        }
    }

    std::process::exit(shell.vars.last_status);
}

#[cfg(test)]
mod tests;
