//! Publishing error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by [`super::publish`].
#[derive(Debug, Error)]
pub enum PublishError {
    /// The external tool needed for publishing is not installed.
    #[error("{tool} is not installed. Install it with:\n  {hint}")]
    DependencyMissing {
        tool: &'static str,
        hint: &'static str,
    },

    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error(
        "No committer identity found. Set one with:\n  git config user.name \"Your Name\"\n  git config user.email \"you@example.com\""
    )]
    MissingIdentity,

    #[error("File name is not valid UTF-8: {}", .0.display())]
    InvalidFileName(PathBuf),

    #[error("IO error when reading `{}`", .0.display())]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Failed to write the fast-import stream")]
    Stream(#[source] std::io::Error),

    /// Anything the repository, `git fast-import` or `git push` reported.
    #[error("Publishing failed")]
    PublishFailed(#[from] anyhow::Error),
}

impl PublishError {
    /// Whether the operator has to install something before retrying.
    pub const fn is_dependency_missing(&self) -> bool {
        matches!(self, Self::DependencyMissing { .. })
    }
}
