//! Session-scoped backup branches.
//!
//! Every branch a session will rewrite is preserved first as
//! `lockstep/backup/<original-branch>/<session-id>`. The refs themselves are
//! the only record; no metadata file exists outside them.

use serde::Serialize;

use lockstep_git::Sha;

use crate::hierarchy::RepoId;
use crate::plan::SessionId;

/// Ref namespace for backup branches.
pub const BACKUP_PREFIX: &str = "lockstep/backup";

/// Backup branch name for an original branch in a session.
#[must_use]
pub fn backup_branch_name(original_branch: &str, session: &SessionId) -> String {
    format!("{BACKUP_PREFIX}/{original_branch}/{session}")
}

/// Split a backup branch name into `(original_branch, session)`.
///
/// Original branch names may themselves contain slashes; the session id is
/// always the last component.
#[must_use]
pub fn parse_backup_branch(branch: &str) -> Option<(String, String)> {
    let rest = branch.strip_prefix(BACKUP_PREFIX)?.strip_prefix('/')?;
    let (original, session) = rest.rsplit_once('/')?;
    if original.is_empty() || session.is_empty() {
        return None;
    }
    Some((original.to_string(), session.to_string()))
}

/// A backup created for one `(repo, branch)` pair.
#[derive(Debug, Clone)]
pub struct BackupRef {
    pub repo: RepoId,
    pub original_branch: String,
    pub backup_branch: String,
    /// Branch tip at the moment the backup was taken.
    pub tip_at_backup: Sha,
}

/// A backup branch found in a repository, parsed from its name.
#[derive(Debug, Clone, Serialize)]
pub struct BackupEntry {
    /// Display label of the repository the backup lives in.
    pub repo: String,
    /// Repository path relative to the hierarchy root.
    pub repo_rel_path: String,
    pub backup_branch: String,
    pub original_branch: String,
    pub session: String,
}
