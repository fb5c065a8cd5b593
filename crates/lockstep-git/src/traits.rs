//! Trait abstraction for per-repository git operations.
//!
//! This module defines the `GitGateway` trait which abstracts the git
//! subprocess facade, enabling dependency injection and testability.

use std::path::Path;

use crate::sha::Sha;
use crate::types::{AheadBehind, ConflictSet, RebaseOutcome, SubmoduleEntry};
use crate::Result;

/// Trait for git operations against a single repository.
///
/// This trait abstracts the gateway, allowing for:
/// - Dependency injection in the orchestration layer
/// - In-memory fake implementations for testing
///
/// Operations are synchronous: each corresponds to one blocking `git`
/// subprocess invocation, and callers must serialize calls per repository.
#[allow(clippy::missing_errors_doc)]
pub trait GitGateway {
    // === Repository info ===

    /// Absolute path of the working tree root.
    fn workdir(&self) -> &Path;

    /// Get the current branch name.
    ///
    /// Returns [`crate::Error::DetachedHead`] when HEAD is not on a branch.
    fn current_branch(&self) -> Result<String>;

    /// Check whether the worktree is clean: no staged or unstaged changes
    /// (untracked files ignored) and no rebase or merge in progress.
    fn is_clean(&self) -> Result<bool>;

    /// Check whether a rebase is in progress.
    fn is_rebase_in_progress(&self) -> bool;

    /// Whether this worktree is itself a submodule checkout (`.git` is a
    /// file pointing into the superproject's git dir).
    fn is_submodule_worktree(&self) -> bool;

    // === Branches ===

    /// Check whether a local branch exists.
    fn branch_exists_local(&self, name: &str) -> bool;

    /// Check whether a remote-tracking branch `<remote>/<name>` exists.
    fn branch_exists_remote(&self, name: &str, remote: &str) -> bool;

    /// Create a local branch from `<remote>/<name>`. Fails with
    /// [`crate::Error::BranchExists`] if the local branch already exists.
    fn create_local_from_remote(&self, name: &str, remote: &str) -> Result<()>;

    /// Checkout a local branch. Requires a clean worktree.
    fn checkout(&self, branch: &str) -> Result<()>;

    /// List local branch names (full names, including slashes).
    fn list_local_branches(&self) -> Result<Vec<String>>;

    /// Local branches whose history contains the given commit.
    fn branches_containing(&self, sha: &Sha) -> Result<Vec<String>>;

    /// Create a branch pointing at a commit. Fails if the branch exists.
    fn create_branch_at(&self, name: &str, at: &Sha) -> Result<()>;

    /// Delete a local branch.
    fn delete_branch(&self, name: &str, force: bool) -> Result<()>;

    /// Force-move a branch to a commit, updating the worktree when the
    /// branch is currently checked out.
    fn force_update_branch(&self, name: &str, to: &Sha) -> Result<()>;

    // === Commits & trees ===

    /// Resolve a ref to a full commit SHA.
    fn rev_parse(&self, reference: &str) -> Result<Sha>;

    /// Commits in `target..source` in replay order (oldest first,
    /// first-parent): exactly what a rebase onto `target` will replay.
    fn commits_between(&self, target: &str, source: &str) -> Result<Vec<Sha>>;

    /// One-line subject of a commit, for user-facing summaries.
    fn commit_subject(&self, sha: &Sha) -> Result<String>;

    /// Gitlink entries recorded in the tree at `reference`.
    fn submodule_entries(&self, reference: &str) -> Result<Vec<SubmoduleEntry>>;

    /// The gitlink SHA at `path` in the tree at `reference`, if any.
    fn submodule_pointer_at(&self, reference: &str, path: &str) -> Result<Option<Sha>>;

    /// Whether any commit in `target..source` touched the gitlink at `path`.
    fn submodule_touched_between(&self, target: &str, source: &str, path: &str) -> Result<bool>;

    // === Rebase ===

    /// Start rebasing `source` onto `onto`.
    ///
    /// A conflict stop is not an error: it is reported as
    /// [`RebaseOutcome::Stopped`].
    fn rebase_start(&self, source: &str, onto: &str) -> Result<RebaseOutcome>;

    /// Continue an in-progress rebase after the index was resolved.
    fn rebase_continue(&self) -> Result<RebaseOutcome>;

    /// Abort an in-progress rebase.
    fn rebase_abort(&self) -> Result<()>;

    /// Read the unmerged index entries at a rebase stop.
    fn index_conflicts(&self) -> Result<ConflictSet>;

    /// Stage a path (`git add -- <path>`).
    fn stage_path(&self, path: &str) -> Result<()>;

    /// Set the gitlink entry at `path` to `sha` and stage the resolution
    /// (`git update-index --cacheinfo 160000,<sha>,<path>`).
    fn write_submodule_pointer(&self, path: &str, sha: &Sha) -> Result<()>;

    // === Remote ===

    /// Commit counts of `branch` relative to `<remote>/<branch>`.
    /// Returns zeros when the remote-tracking ref does not exist.
    fn ahead_behind(&self, branch: &str, remote: &str) -> Result<AheadBehind>;

    /// Push a branch with `--force-with-lease`.
    fn push_with_lease(&self, branch: &str, remote: &str) -> Result<()>;
}
