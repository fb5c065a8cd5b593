//! Conflict classification and auto-resolution at rebase stops.
//!
//! Submodule pointer conflicts are resolved by substituting the rewritten
//! child commit from the child repository's tracker. File conflicts are
//! always handed back to the human; the resolver only verifies the result.

use tracing::{debug, info, warn};

use lockstep_git::{GitGateway, RebaseOutcome, Sha};

use crate::error::{Error, Result};
use crate::hierarchy::{Hierarchy, RepoId};
use crate::tracker::SessionTrackers;

/// One submodule pointer substitution performed automatically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointerResolution {
    /// The child repository whose tracker supplied the mapping.
    pub child: RepoId,
    /// Submodule path in the parent.
    pub path: String,
    /// Pre-rebase child commit (the theirs side of the conflict).
    pub old_sha: Sha,
    /// Rewritten child commit staged as the resolution.
    pub new_sha: Sha,
}

/// What the resolver did with a stop.
#[derive(Debug)]
pub enum ResolveStep {
    /// All conflicts handled; `rebase --continue` was issued and returned
    /// this outcome (which may itself be another stop).
    Continued(RebaseOutcome),
    /// Submodule entries are staged but these file conflicts need a human.
    FilesPending(Vec<String>),
}

/// Resolves conflicts for the currently executing task.
///
/// Borrows the session's hierarchy and trackers; the gateway of the stopped
/// repository is passed per call so the resolver stays re-entrant.
pub struct ConflictResolver<'a> {
    hierarchy: &'a Hierarchy,
    trackers: &'a SessionTrackers,
}

impl<'a> ConflictResolver<'a> {
    /// Create a resolver over the session state.
    #[must_use]
    pub fn new(hierarchy: &'a Hierarchy, trackers: &'a SessionTrackers) -> Self {
        Self {
            hierarchy,
            trackers,
        }
    }

    /// Handle a rebase stop in `repo`.
    ///
    /// Submodule entries are always resolved and staged first; only the file
    /// set is surfaced to the human. When no file conflicts remain the
    /// resolver issues `rebase --continue` itself.
    ///
    /// # Errors
    /// [`Error::UnresolvableSubmoduleConflict`] when a conflicted pointer has
    /// no mapping in the child's tracker and the target side cannot win.
    pub fn handle_stop<G: GitGateway>(
        &self,
        repo: RepoId,
        gateway: &G,
        resolved: &mut Vec<PointerResolution>,
    ) -> Result<ResolveStep> {
        let conflicts = gateway.index_conflicts()?;
        debug!(
            repo = self.hierarchy.node(repo).label(),
            submodules = conflicts.submodules.len(),
            files = conflicts.files.len(),
            "rebase stopped"
        );

        for conflict in &conflicts.submodules {
            self.resolve_submodule(repo, gateway, conflict, resolved)?;
        }

        if conflicts.files.is_empty() {
            Ok(ResolveStep::Continued(gateway.rebase_continue()?))
        } else {
            Ok(ResolveStep::FilesPending(conflicts.files))
        }
    }

    fn resolve_submodule<G: GitGateway>(
        &self,
        repo: RepoId,
        gateway: &G,
        conflict: &lockstep_git::SubmoduleConflict,
        resolved: &mut Vec<PointerResolution>,
    ) -> Result<()> {
        let node = self.hierarchy.node(repo);
        let link = self.hierarchy.link_at(repo, &conflict.path);

        // The theirs side carries the feature commit's pointer; a mapping in
        // the child's tracker means the child was rebased this session.
        if let (Some(link), Some(theirs)) = (link, conflict.theirs.as_ref()) {
            if let Some(new_sha) = self.trackers.resolve(link.child, theirs) {
                gateway.write_submodule_pointer(&conflict.path, new_sha)?;
                info!(
                    repo = node.label(),
                    path = %conflict.path,
                    old = theirs.short(),
                    new = new_sha.short(),
                    "auto-resolved submodule pointer"
                );
                resolved.push(PointerResolution {
                    child: link.child,
                    path: conflict.path.clone(),
                    old_sha: theirs.clone(),
                    new_sha: new_sha.clone(),
                });
                return Ok(());
            }

            // Feature did not rewrite this pointer: the target side wins.
            let feature_untouched = self
                .trackers
                .get(link.child)
                .is_some_and(|t| !t.expects(theirs));
            if let Some(ours) = conflict.ours.as_ref() {
                if feature_untouched || theirs == ours {
                    gateway.write_submodule_pointer(&conflict.path, ours)?;
                    info!(
                        repo = node.label(),
                        path = %conflict.path,
                        sha = ours.short(),
                        "kept target-side submodule pointer"
                    );
                    return Ok(());
                }
            }
        }

        warn!(
            repo = node.label(),
            path = %conflict.path,
            "no commit mapping available for conflicted submodule"
        );
        Err(Error::UnresolvableSubmoduleConflict {
            repo: node.label().to_string(),
            path: conflict.path.clone(),
            ours: conflict.ours.clone(),
            theirs: conflict.theirs.clone(),
        })
    }

    /// Re-examine the index after the user reported file conflicts resolved.
    ///
    /// Refuses to continue while any unmerged entry remains; otherwise
    /// issues `rebase --continue`.
    pub fn verify_and_continue<G: GitGateway>(
        &self,
        repo: RepoId,
        gateway: &G,
    ) -> Result<ResolveStep> {
        let conflicts = gateway.index_conflicts()?;
        if !conflicts.is_empty() {
            let mut pending = conflicts.files;
            pending.extend(conflicts.submodules.into_iter().map(|c| c.path));
            warn!(
                repo = self.hierarchy.node(repo).label(),
                remaining = pending.len(),
                "conflicts still unresolved, refusing to continue"
            );
            return Ok(ResolveStep::FilesPending(pending));
        }
        Ok(ResolveStep::Continued(gateway.rebase_continue()?))
    }
}
