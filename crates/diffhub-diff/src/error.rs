//! Error types for the diff crate.

use diffhub_ignore::IgnoreError;

/// Errors that can occur while generating a diff.
#[derive(Debug, thiserror::Error)]
pub enum DiffError {
    /// The repository path is missing or is not a repository.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A branch name failed validation before any repository access.
    #[error("invalid branch name {name:?}: {reason}")]
    InvalidBranchName { name: String, reason: String },

    /// A branch does not exist in the repository.
    #[error("branch not found: {branch} (repository {repository})")]
    BranchNotFound { branch: String, repository: String },

    /// A blob referenced by a tree listing could not be read.
    #[error("object not found: {0}")]
    ObjectNotFound(String),

    /// The version-control command failed; carries its raw diagnostic output.
    #[error("git {command} failed: {stderr}")]
    GitExecution { command: String, stderr: String },

    /// Ignore rules could not be loaded.
    #[error("ignore rules: {0}")]
    Ignore(#[from] IgnoreError),
}

impl DiffError {
    /// `true` for errors that mean "the thing asked for does not exist".
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::BranchNotFound { .. } | Self::ObjectNotFound(_))
    }

    /// `true` for errors caused by the caller's input rather than the repository.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::InvalidInput(_) | Self::InvalidBranchName { .. })
    }
}

/// Convenience alias used throughout the diff crate.
pub type Result<T> = std::result::Result<T, DiffError>;
