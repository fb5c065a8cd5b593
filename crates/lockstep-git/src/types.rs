//! Value types returned by gateway operations.

use serde::Serialize;

use crate::sha::Sha;

/// How a `rebase` / `rebase --continue` invocation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebaseOutcome {
    /// All steps replayed; the branch now sits on the new base.
    Completed,
    /// The rebase stopped on a conflict and awaits resolution.
    Stopped,
    /// Git failed for a reason other than a conflict stop.
    Failed(String),
}

/// A gitlink entry recorded in a tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmoduleEntry {
    /// Path of the submodule relative to the repository root.
    pub path: String,
    /// The commit the parent tree points the submodule at (mode 160000).
    pub recorded_sha: Sha,
}

/// One conflicted gitlink entry from the unmerged index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmoduleConflict {
    /// Submodule path relative to the repository root.
    pub path: String,
    /// Stage-2 (ours) pointer, absent when the entry was added on one side.
    pub ours: Option<Sha>,
    /// Stage-3 (theirs) pointer from the commit being replayed.
    pub theirs: Option<Sha>,
}

/// Classification of the unmerged index at a rebase stop.
///
/// Gitlink entries (mode 160000) are split out from ordinary file conflicts
/// because only the former can be resolved automatically.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConflictSet {
    /// Conflicted submodule pointers.
    pub submodules: Vec<SubmoduleConflict>,
    /// Conflicted regular files, repo-relative.
    pub files: Vec<String>,
}

impl ConflictSet {
    /// True when no unmerged entries remain.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.submodules.is_empty() && self.files.is_empty()
    }
}

/// Commit counts between a local branch and its remote counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AheadBehind {
    /// Commits on the local branch the remote lacks.
    pub ahead: usize,
    /// Commits on the remote the local branch lacks.
    pub behind: usize,
}
