//! Commit hash tracking across a session.
//!
//! During each per-repo rebase the tracker pairs every replayed commit with
//! its rewritten replacement, strictly in replay order. Parent tasks consult
//! frozen child trackers to rewrite submodule pointers.

use std::collections::HashMap;

use tracing::{debug, warn};

use lockstep_git::Sha;

use crate::hierarchy::RepoId;

/// Bidirectional old/new commit map for one repository's rebase.
///
/// The map is append-only: entries are added in replay order as steps commit
/// and never change afterwards. After step *k*, the first *k* expected old
/// SHAs map to the first *k* observed new SHAs.
#[derive(Debug, Clone)]
pub struct CommitTracker {
    /// Commits the rebase will replay, oldest first.
    expected_old: Vec<Sha>,
    forward: HashMap<Sha, Sha>,
    reverse: HashMap<Sha, Sha>,
    frozen: bool,
}

impl CommitTracker {
    /// Start tracking a rebase that will replay `expected_old` (replay order).
    #[must_use]
    pub fn new(expected_old: Vec<Sha>) -> Self {
        Self {
            expected_old,
            forward: HashMap::new(),
            reverse: HashMap::new(),
            frozen: false,
        }
    }

    /// The commits the rebase was expected to replay.
    #[must_use]
    pub fn expected(&self) -> &[Sha] {
        &self.expected_old
    }

    /// Number of mapped steps so far.
    #[must_use]
    pub fn recorded(&self) -> usize {
        self.forward.len()
    }

    /// True once every expected commit has a mapping.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.forward.len() == self.expected_old.len()
    }

    /// True once the owning task finished.
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Absorb the commits currently sitting on the rewritten tip, oldest
    /// first. Pairs the k-th observed commit with the k-th expected old
    /// commit; already-recorded prefixes are verified, not rewritten.
    pub fn sync_observed(&mut self, observed: &[Sha]) {
        if self.frozen {
            warn!("ignoring observation on a frozen tracker");
            return;
        }
        for (index, new_sha) in observed.iter().enumerate() {
            let Some(old_sha) = self.expected_old.get(index) else {
                warn!(
                    new = %new_sha.short(),
                    "observed more rebased commits than expected, ignoring surplus"
                );
                break;
            };
            match self.forward.get(old_sha) {
                Some(existing) if existing == new_sha => {}
                Some(existing) => {
                    // Replay order is stable within one rebase; a changed
                    // prefix means the observation raced something external.
                    warn!(
                        old = %old_sha.short(),
                        was = %existing.short(),
                        now = %new_sha.short(),
                        "rebased commit changed identity mid-session, keeping first"
                    );
                }
                None => {
                    debug!(old = %old_sha.short(), new = %new_sha.short(), "mapped commit");
                    self.forward.insert(old_sha.clone(), new_sha.clone());
                    self.reverse.insert(new_sha.clone(), old_sha.clone());
                }
            }
        }
    }

    /// Seal the tracker once the task is done.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    /// Rewritten SHA for a pre-rebase commit.
    #[must_use]
    pub fn new_sha(&self, old: &Sha) -> Option<&Sha> {
        self.forward.get(old)
    }

    /// Pre-rebase SHA for a rewritten commit.
    #[must_use]
    pub fn old_sha(&self, new: &Sha) -> Option<&Sha> {
        self.reverse.get(new)
    }

    /// Whether `sha` is in the replayed range at all.
    #[must_use]
    pub fn expects(&self, sha: &Sha) -> bool {
        self.expected_old.contains(sha)
    }

    /// Mappings in replay order.
    pub fn mappings(&self) -> impl Iterator<Item = (&Sha, &Sha)> {
        self.expected_old
            .iter()
            .filter_map(|old| self.forward.get(old).map(|new| (old, new)))
    }
}

/// All trackers of one session, keyed by repository.
///
/// A tracker is inserted when its task starts and frozen when it finishes;
/// later tasks observe frozen trackers as a read-only snapshot.
#[derive(Debug, Default)]
pub struct SessionTrackers {
    trackers: HashMap<RepoId, CommitTracker>,
}

impl SessionTrackers {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the tracker for a repository at task start.
    pub fn insert(&mut self, repo: RepoId, tracker: CommitTracker) {
        self.trackers.insert(repo, tracker);
    }

    /// Tracker for a repository, if its task has started.
    #[must_use]
    pub fn get(&self, repo: RepoId) -> Option<&CommitTracker> {
        self.trackers.get(&repo)
    }

    /// Mutable tracker access for the currently executing task.
    pub fn get_mut(&mut self, repo: RepoId) -> Option<&mut CommitTracker> {
        self.trackers.get_mut(&repo)
    }

    /// Resolve an old commit of `repo` to its rewritten SHA.
    #[must_use]
    pub fn resolve(&self, repo: RepoId, old: &Sha) -> Option<&Sha> {
        self.trackers.get(&repo).and_then(|t| t.new_sha(old))
    }
}
