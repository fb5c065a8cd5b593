//! Rebase plan model: per-repo tasks, sessions, and branch-map inputs.

use std::fmt;

use chrono::Local;
use serde::Serialize;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::hierarchy::RepoId;

/// A short, time-ordered, locally unique session token.
///
/// Format: `YYYYMMDDThhmmss-<6 hex>`. Used to namespace backup branches, so
/// it must be valid inside a git ref component.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a fresh session id for the current instant.
    #[must_use]
    pub fn generate() -> Self {
        let stamp = Local::now().format("%Y%m%dT%H%M%S");
        let entropy = Uuid::new_v4().simple().to_string();
        Self(format!("{stamp}-{}", &entropy[..6]))
    }

    /// Wrap an existing token (e.g. from a CLI flag).
    #[must_use]
    pub fn from_token(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The token string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The effective rebase to perform in one repository.
#[derive(Debug, Clone)]
pub struct RepoTask {
    pub repo: RepoId,
    pub source: String,
    pub target: String,
    pub enabled: bool,
}

/// An ordered set of per-repository rebase tasks for one session.
///
/// Tasks appear in execution order: every enabled child precedes every
/// ancestor that references it.
#[derive(Debug)]
pub struct Plan {
    pub session_id: SessionId,
    pub tasks: Vec<RepoTask>,
    pub auto_discovered: bool,
}

impl Plan {
    /// Enabled tasks in execution order.
    pub fn enabled(&self) -> impl Iterator<Item = &RepoTask> {
        self.tasks.iter().filter(|t| t.enabled)
    }

    /// The task for a repository, enabled or not.
    #[must_use]
    pub fn task_for(&self, repo: RepoId) -> Option<&RepoTask> {
        self.tasks.iter().find(|t| t.repo == repo)
    }

    /// Number of enabled tasks.
    #[must_use]
    pub fn enabled_count(&self) -> usize {
        self.enabled().count()
    }
}

/// One `--branch-map repo=SRC[:TGT]` override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchMapEntry {
    /// Repository reference (name, relative path, or absolute path).
    pub repo: String,
    pub source: String,
    pub target: Option<String>,
}

impl BranchMapEntry {
    /// Parse `repo=SRC[:TGT]`.
    ///
    /// # Errors
    /// Returns [`Error::InvalidBranchMap`] for malformed entries.
    pub fn parse(raw: &str) -> Result<Self> {
        let (repo, value) = raw
            .split_once('=')
            .ok_or_else(|| Error::InvalidBranchMap(raw.to_string()))?;
        let (source, target) = match value.split_once(':') {
            Some((src, tgt)) => (src, Some(tgt)),
            None => (value, None),
        };
        let repo = repo.trim();
        let source = source.trim();
        if repo.is_empty() || source.is_empty() {
            return Err(Error::InvalidBranchMap(raw.to_string()));
        }
        Ok(Self {
            repo: repo.to_string(),
            source: source.to_string(),
            target: target
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string),
        })
    }
}

/// User-facing inputs to plan construction.
#[derive(Debug, Clone, Default)]
pub struct PlanOptions {
    /// Global source branch (the branch being rebased).
    pub source: String,
    /// Global target branch (the new base).
    pub target: String,
    /// Restrict the plan to these repositories (plus their ancestor chain).
    pub include: Vec<String>,
    /// Disable these repositories unconditionally.
    pub exclude: Vec<String>,
    /// Per-repo branch overrides.
    pub branch_map: Vec<BranchMapEntry>,
    /// Discover changed submodules instead of enabling every repository.
    pub auto_discover: bool,
    /// Accept auto-discovery suggestions without prompting.
    pub auto_select_submodules: bool,
}
