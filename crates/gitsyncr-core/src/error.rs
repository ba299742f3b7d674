use std::path::PathBuf;

/// Central error type for gitsyncr.
#[derive(Debug, thiserror::Error)]
pub enum GitsyncrError {
    #[error("could not determine home directory")]
    HomeDirUnavailable,

    #[error("config file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    #[error("config error: {message}")]
    Config { message: String },

    #[error("invalid fork '{name}': {message}")]
    InvalidFork { name: String, message: String },

    #[error("ssh key {path} could not be read: {message}")]
    KeyUnreadable { path: PathBuf, message: String },

    #[error("credential error: {message}")]
    CredentialError { message: String },

    #[error("git error during {op}: {message}")]
    GitError { op: &'static str, message: String },

    #[error("cannot fast-forward {branch}: local history diverged from {remote}/{branch}")]
    NonFastForward { remote: String, branch: String },

    #[error("push to {remote} rejected: {message}")]
    PushRejected { remote: String, message: String },

    #[error("clone of {fork} cancelled by user")]
    Cancelled { fork: String },

    #[error("{op} exceeded the {secs}s network deadline")]
    TimedOut { op: &'static str, secs: u64 },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl GitsyncrError {
    /// Whether the run must stop even when continuing past failed forks.
    pub fn aborts_run(&self) -> bool {
        matches!(self, GitsyncrError::Cancelled { .. })
    }
}
