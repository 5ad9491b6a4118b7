use std::path::PathBuf;

use log::debug;

use crate::alias::AliasStore;
use crate::executor;
use crate::expand;
use crate::glob;
use crate::history::History;
use crate::jobs::JobTable;
use crate::parser;
use crate::tokenizer::{self, TokenKind};
use crate::utils;
use crate::variables::VarStore;

/// The interpreter state: every store the components share, owned in one
/// place and threaded through explicitly.
pub struct Shell {
    pub vars: VarStore,
    pub aliases: AliasStore,
    pub jobs: JobTable,
    pub history: History,
    pub previous_dir: Option<PathBuf>,
    pub interactive: bool,
}

impl Shell {
    pub fn new() -> Shell {
        let args: Vec<String> = std::env::args().skip(1).collect();
        let history_path = utils::home_dir().map(|home| home.join(".aish_history"));

        Shell {
            vars: VarStore::new("aish", args),
            aliases: AliasStore::new(),
            jobs: JobTable::new(),
            history: History::new(history_path),
            previous_dir: None,
            interactive: unsafe { libc::isatty(libc::STDIN_FILENO) } == 1,
        }
    }

    /// One line, bottom to top: alias and variable expansion on the raw
    /// text, tokenize, validate, glob, build, execute. Nothing here ever
    /// terminates the shell; the status lands in `$?`.
    pub fn run_line(&mut self, line: &str) -> i32 {
        let line = expand::expand_aliases(line, &self.aliases);
        let line = expand::expand_variables(&line, &mut self.vars);
        debug!("expanded line: {}", line);

        let tokens = match tokenizer::tokenize(&line) {
            Ok(tokens) => tokens,
            Err(e) => {
                eprintln!("{}", e);
                self.vars.last_status = 2;
                return 2;
            }
        };
        if tokens.first().map(|t| t.kind) == Some(TokenKind::Eof) {
            return self.vars.last_status;
        }

        if parser::validate(&tokens).is_err() {
            eprintln!("Invalid Syntax!");
            self.vars.last_status = 2;
            return 2;
        }

        let tokens = glob::expand_word_tokens(tokens);
        let segments = match parser::build_list(&tokens) {
            Ok(segments) => segments,
            Err(e) => {
                eprintln!("{}", e);
                self.vars.last_status = 1;
                return 1;
            }
        };

        let status = executor::execute_segments(self, &segments);
        self.vars.last_status = status;
        status
    }
}
