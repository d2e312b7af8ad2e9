use std::path::PathBuf;

use thiserror::Error;

/// Unified error type for git-graft operations
#[derive(Error, Debug)]
pub enum GraftError {
    #[error("git {command} failed with exit code {code}: {output}")]
    CommandFailed {
        code: i32,
        command: String,
        output: String,
    },

    #[error("Failed to start git {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Unknown revision: {0}")]
    UnknownRevision(String),

    #[error("Unknown rebase target: {0}")]
    UnknownTarget(String),

    #[error("Detached head in {}", .0.display())]
    DetachedHead(PathBuf),

    #[error("No upstream branch for topic {0}")]
    NoUpstream(String),

    #[error("No remote configured for branch {0}")]
    NoRemote(String),

    #[error("Version parsing error: {0}")]
    Parse(String),

    #[error("Rebase failed: {0}")]
    Rebase(#[source] Box<GraftError>),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Results in git-graft
pub type Result<T> = std::result::Result<T, GraftError>;

impl GraftError {
    /// Create a configuration error with context
    pub fn config(msg: impl Into<String>) -> Self {
        GraftError::Config(msg.into())
    }

    /// Create a version parsing error with context
    pub fn parse(msg: impl Into<String>) -> Self {
        GraftError::Parse(msg.into())
    }

    /// Create an unknown revision error
    pub fn unknown_revision(revision: impl Into<String>) -> Self {
        GraftError::UnknownRevision(revision.into())
    }

    /// Wrap a failed history rewrite
    pub fn rebase(cause: GraftError) -> Self {
        GraftError::Rebase(Box::new(cause))
    }

    /// True when git ran and exited with a non-zero status
    pub fn is_command_failure(&self) -> bool {
        matches!(self, GraftError::CommandFailed { .. })
    }

    /// Exit code of the failed git process, looking through rebase wrappers
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            GraftError::CommandFailed { code, .. } => Some(*code),
            GraftError::Rebase(inner) => inner.exit_code(),
            _ => None,
        }
    }
}
