use thiserror::Error;

pub type Result<T> = std::result::Result<T, ShellError>;

/// Error taxonomy for a single line of input. Nothing in here terminates
/// the shell; the main loop reports and re-prompts.
#[derive(Error, Debug)]
pub enum ShellError {
    #[error("Invalid Syntax!")]
    Syntax,

    #[error("{0}")]
    Tokenizer(String),

    #[error("{0}")]
    Redirection(String),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Sys(#[from] nix::Error),
}
