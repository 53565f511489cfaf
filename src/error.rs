// error.rs

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ShellError>;

#[derive(Debug, Error)]
pub enum ShellError {
    #[error("terminal: {0}")]
    Terminal(#[source] nix::Error),
    #[error("cannot read current directory: {0}")]
    CurrentDir(#[source] std::io::Error),
    #[error("pipe failed: {0}")]
    Pipe(#[source] nix::Error),
    #[error("fork failed: {0}")]
    Fork(#[source] nix::Error),
    #[error("wait failed: {0}")]
    Wait(#[source] nix::Error),
    #[error("invalid argument {0:?}: contains a NUL byte")]
    InvalidArgument(String),
    #[error("cd: {}: {source}", path.display())]
    ChangeDir {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("syntax error: empty command in pipeline")]
    EmptyStage,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
