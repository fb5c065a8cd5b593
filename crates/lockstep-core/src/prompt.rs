//! User interaction abstraction.
//!
//! The orchestrator never talks to a terminal directly; it raises interaction
//! events through this trait and validates every answer's post-conditions
//! itself. The CLI supplies an interactive implementation, tests a scripted
//! one.

/// Answer to an auto-discovered submodule proposal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmoduleDecision {
    /// Rebase this submodule with the suggested branches.
    Include,
    /// Leave this submodule out of the plan.
    Exclude,
    /// Rebase it, but with different branches.
    IncludeWith { source: String, target: String },
}

/// Answer to a file-conflict suspension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictAction {
    /// The user claims the conflicts are resolved and staged.
    Resolved,
    /// Abort the session.
    Abort,
}

/// Capability set for asking the human questions mid-session.
pub trait UserAgent {
    /// A branch exists only on `remote`; may a local branch be created?
    fn confirm_remote_branch_create(&self, repo: &str, branch: &str, remote: &str) -> bool;

    /// A submodule's pointer changed between target and source; should its
    /// repository join the plan, and on which branches?
    fn choose_submodule(
        &self,
        submodule_path: &str,
        suggested_source: &str,
        suggested_target: &str,
    ) -> SubmoduleDecision;

    /// Block until the user reports the listed file conflicts resolved.
    ///
    /// The orchestrator re-checks the index afterwards and will ask again if
    /// conflicts remain; implementations must tolerate repeat calls.
    fn await_file_conflict_resolution(&self, repo: &str, files: &[String]) -> ConflictAction;

    /// Ask for the exact confirmation phrase before a force-push.
    /// Returns true only when the user typed `phrase` verbatim.
    fn confirm_force_push(&self, branch: &str, ahead: usize, behind: usize, phrase: &str) -> bool;
}

/// Agent that declines every interaction. Used for non-interactive runs
/// where any required question should fail the operation instead of hanging.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpAgent;

impl UserAgent for NoOpAgent {
    fn confirm_remote_branch_create(&self, _repo: &str, _branch: &str, _remote: &str) -> bool {
        false
    }

    fn choose_submodule(
        &self,
        _submodule_path: &str,
        _suggested_source: &str,
        _suggested_target: &str,
    ) -> SubmoduleDecision {
        SubmoduleDecision::Exclude
    }

    fn await_file_conflict_resolution(&self, _repo: &str, _files: &[String]) -> ConflictAction {
        ConflictAction::Abort
    }

    fn confirm_force_push(&self, _branch: &str, _ahead: usize, _behind: usize, _phrase: &str) -> bool {
        false
    }
}
