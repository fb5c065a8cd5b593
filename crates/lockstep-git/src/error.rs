//! Error types for lockstep-git.

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during git operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Not inside a git repository.
    #[error("not a git repository (or any parent up to mount point)")]
    NotARepository,

    /// The git binary could not be spawned.
    #[error("git binary not found on PATH: {0}")]
    GitBinaryMissing(std::io::Error),

    /// Branch not found.
    #[error("branch not found: {0}")]
    BranchNotFound(String),

    /// Branch already exists where a fresh one was required.
    #[error("branch already exists: {0}")]
    BranchExists(String),

    /// HEAD is detached (not on a branch).
    #[error("HEAD is detached - checkout a branch first")]
    DetachedHead,

    /// Working tree has uncommitted changes.
    #[error("working tree has uncommitted changes")]
    DirtyWorktree,

    /// A rebase is already in progress.
    #[error("a rebase is already in progress")]
    RebaseInProgress,

    /// Invalid commit SHA.
    #[error("invalid commit sha: {0}")]
    InvalidSha(String),

    /// A git invocation exited non-zero in an unexpected way.
    #[error("`git {command}` failed: {stderr}")]
    GitFailed {
        /// The arguments the git binary was invoked with.
        command: String,
        /// Captured stderr, verbatim.
        stderr: String,
    },

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
