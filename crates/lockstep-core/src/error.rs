//! Error taxonomy for lockstep-core.

use lockstep_git::Sha;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while planning or executing a lockstep rebase.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    // === Environment ===
    /// Not inside a Git repository.
    #[error("not a git repository: {0}")]
    NotAGitRepo(String),

    // === Preconditions ===
    /// A repository has uncommitted changes.
    #[error("{repo}: working tree has uncommitted changes")]
    DirtyWorktree { repo: String },

    /// A repository already has a rebase in progress.
    #[error("{repo}: a rebase is already in progress")]
    RebaseInProgress { repo: String },

    /// A required branch does not exist (locally, after any remote flow).
    #[error("{repo}: branch '{branch}' not found")]
    BranchMissing { repo: String, branch: String },

    /// A repository reference matched more than one repository.
    #[error("repository reference '{token}' is ambiguous: matches {matches:?}")]
    AmbiguousRepoRef { token: String, matches: Vec<String> },

    /// A repository reference matched nothing in the hierarchy.
    #[error("repository reference '{0}' does not match any repository")]
    UnknownRepoRef(String),

    /// A --branch-map entry could not be parsed.
    #[error("invalid branch map entry '{0}': expected repo=SRC[:TGT]")]
    InvalidBranchMap(String),

    // === Planning ===
    /// The plan has no enabled work.
    #[error("nothing to do: no enabled rebase tasks")]
    NoEnabledTasks,

    /// An enabled task depends on a submodule with no initialized worktree.
    #[error("{repo}: submodule '{path}' is not initialized")]
    SubmoduleNotInitialized { repo: String, path: String },

    /// A submodule resolves to one of its own ancestors.
    #[error("submodule cycle detected at '{path}'")]
    CycleDetected { path: String },

    // === Execution ===
    /// A submodule pointer conflict with no usable mapping.
    #[error(
        "{repo}: unresolvable submodule conflict at '{path}' (ours {ours:?}, theirs {theirs:?}): \
         no commit mapping found in any child tracker"
    )]
    UnresolvableSubmoduleConflict {
        repo: String,
        path: String,
        ours: Option<Sha>,
        theirs: Option<Sha>,
    },

    /// A rebase failed for a reason other than a resolvable conflict.
    #[error("{repo}: rebase failed: {message}")]
    RebaseFailed { repo: String, message: String },

    /// The user chose to abort at an interaction point.
    #[error("operation aborted by user")]
    UserAborted,

    /// A backup branch with the session's name already exists.
    #[error("{repo}: backup branch '{branch}' already exists")]
    BackupCollision { repo: String, branch: String },

    // === Lower layers ===
    /// Git gateway error.
    #[error("git error: {0}")]
    Git(#[from] lockstep_git::Error),
}

impl Error {
    /// Whether this error can occur only before any repository was mutated.
    ///
    /// Used by the CLI to pick between the pre-write and post-write exit
    /// codes.
    #[must_use]
    pub fn is_pre_write(&self) -> bool {
        !matches!(
            self,
            Self::UnresolvableSubmoduleConflict { .. }
                | Self::RebaseFailed { .. }
                | Self::UserAborted
        )
    }
}
