//! Session orchestration: plan construction, backups, bottom-up execution,
//! and restore.
//!
//! One orchestrator instance is one session. It owns a gateway per
//! repository and drives tasks strictly in hierarchy order, because every
//! parent task consumes the commit maps of its children.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::Serialize;
use tracing::{debug, info, warn};

use lockstep_git::{GitGateway, RebaseOutcome, Sha};

use crate::backup::{backup_branch_name, parse_backup_branch, BackupEntry, BackupRef};
use crate::error::{Error, Result};
use crate::gateway::GatewayFactory;
use crate::hierarchy::{self, Hierarchy, RepoId};
use crate::plan::{Plan, PlanOptions, RepoTask, SessionId};
use crate::prompt::{ConflictAction, SubmoduleDecision, UserAgent};
use crate::resolver::{ConflictResolver, PointerResolution, ResolveStep};
use crate::tracker::{CommitTracker, SessionTrackers};

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Idle,
    Planned,
    BackedUp,
    Executing,
    Completed,
    Failed,
    Aborted,
}

/// An auto-resolved submodule pointer, enriched for reporting.
#[derive(Debug, Clone, Serialize)]
pub struct SessionResolution {
    /// Parent repository the conflict occurred in.
    pub repo: String,
    pub submodule_path: String,
    pub old_sha: Sha,
    pub new_sha: Sha,
    /// Subject line of the rewritten child commit.
    pub subject: Option<String>,
    /// True when the old and new child commits carry different subjects.
    pub message_mismatch: bool,
}

/// Outcome of a completed session.
#[derive(Debug)]
pub struct SessionReport {
    pub session_id: SessionId,
    /// Repositories whose rebase finished, in execution order.
    pub completed: Vec<RepoId>,
    /// Backups taken before execution.
    pub backups: Vec<BackupRef>,
    /// `(repo, branch)` pairs that were rewritten.
    pub rewritten: Vec<(RepoId, String)>,
}

/// Outcome of a restore pass. Restore is best-effort per repository.
#[derive(Debug, Default)]
pub struct RestoreOutcome {
    /// `(repo label, branch)` pairs reset to their backup tips.
    pub restored: Vec<(String, String)>,
    /// Repositories with no matching backup.
    pub missing: Vec<String>,
    /// `(repo label, error)` pairs for refs that could not be restored.
    pub failed: Vec<(String, String)>,
}

/// Point-in-time status of one repository, for display.
#[derive(Debug, Clone, Serialize)]
pub struct RepoStatus {
    pub name: String,
    pub rel_path: String,
    pub current_branch: Option<String>,
    pub rebasing: bool,
    pub is_submodule: bool,
    pub depth: usize,
}

/// Result of the post-completion force-push offer for one branch.
#[derive(Debug, Clone, Serialize)]
pub struct PushOutcome {
    pub repo: String,
    pub branch: String,
    pub ahead: usize,
    pub behind: usize,
    pub pushed: bool,
}

/// Orchestrates one multi-repository rebase session.
pub struct RebaseOrchestrator<F: GatewayFactory> {
    hierarchy: Hierarchy,
    gateways: HashMap<RepoId, F::Gateway>,
    trackers: SessionTrackers,
    resolutions: Vec<SessionResolution>,
    status: SessionStatus,
}

impl<F: GatewayFactory> RebaseOrchestrator<F> {
    /// Discover the hierarchy containing `start` and open a gateway per
    /// repository.
    ///
    /// # Errors
    /// Fails when `start` is not inside a git repository or discovery hits a
    /// malformed hierarchy.
    pub fn discover(factory: &F, start: &Path) -> Result<Self> {
        let hierarchy = hierarchy::discover(factory, start)?;
        let mut gateways = HashMap::new();
        for id in hierarchy.ids() {
            let gateway = factory
                .open(&hierarchy.node(id).path)
                .map_err(Error::from)?;
            gateways.insert(id, gateway);
        }
        Ok(Self {
            hierarchy,
            gateways,
            trackers: SessionTrackers::new(),
            resolutions: Vec::new(),
            status: SessionStatus::Idle,
        })
    }

    /// The discovered hierarchy.
    #[must_use]
    pub fn hierarchy(&self) -> &Hierarchy {
        &self.hierarchy
    }

    /// Gateway for a repository in the hierarchy.
    #[must_use]
    pub fn gateway(&self, repo: RepoId) -> &F::Gateway {
        &self.gateways[&repo]
    }

    /// Current session status.
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Auto-resolutions performed so far, in resolution order.
    #[must_use]
    pub fn resolutions(&self) -> &[SessionResolution] {
        &self.resolutions
    }

    /// Commit trackers recorded so far this session.
    #[must_use]
    pub fn trackers(&self) -> &SessionTrackers {
        &self.trackers
    }

    /// Per-repository status snapshot for display.
    #[must_use]
    pub fn repo_statuses(&self) -> Vec<RepoStatus> {
        self.hierarchy
            .ids()
            .map(|id| {
                let node = self.hierarchy.node(id);
                let gateway = self.gateway(id);
                RepoStatus {
                    name: node.name.clone(),
                    rel_path: node.rel_path.clone(),
                    current_branch: gateway.current_branch().ok(),
                    rebasing: gateway.is_rebase_in_progress(),
                    is_submodule: node.parent.is_some(),
                    depth: node.depth,
                }
            })
            .collect()
    }

    // === Planning ===

    /// Construct the session plan from user inputs.
    ///
    /// # Errors
    /// Propagates reference-resolution failures, remote-branch declines and
    /// [`Error::NoEnabledTasks`] when nothing remains to do.
    pub fn plan(&mut self, opts: &PlanOptions, agent: &dyn UserAgent) -> Result<Plan> {
        let mut tasks: Vec<RepoTask> = self
            .hierarchy
            .order()
            .iter()
            .map(|&repo| RepoTask {
                repo,
                source: opts.source.clone(),
                target: opts.target.clone(),
                enabled: true,
            })
            .collect();

        for entry in &opts.branch_map {
            let repo = self.hierarchy.resolve_ref(&entry.repo)?;
            let task = task_mut(&mut tasks, repo);
            task.source = entry.source.clone();
            if let Some(target) = &entry.target {
                task.target = target.clone();
            }
        }

        let mut excluded = HashSet::new();
        for token in &opts.exclude {
            excluded.insert(self.hierarchy.resolve_ref(token)?);
        }
        let mut included = HashSet::new();
        for token in &opts.include {
            included.insert(self.hierarchy.resolve_ref(token)?);
        }

        // A parent must be rebased whenever any of its descendants is, so an
        // include pulls in the ancestor chain unless explicitly excluded.
        let mut enabled: HashSet<RepoId> = if opts.auto_discover {
            let mut set = included.clone();
            set.insert(self.hierarchy.root());
            set
        } else if included.is_empty() {
            self.hierarchy.ids().collect()
        } else {
            included.clone()
        };
        for &repo in &included {
            for ancestor in self.hierarchy.ancestors(repo) {
                enabled.insert(ancestor);
            }
        }
        enabled.retain(|repo| !excluded.contains(repo));

        for task in &mut tasks {
            task.enabled = enabled.contains(&task.repo);
        }

        if opts.auto_discover {
            self.discover_changed_submodules(&mut tasks, &excluded, opts, agent)?;
        }

        // Nothing to replay when a task rebases a branch onto itself.
        for task in &mut tasks {
            if task.enabled && task.source == task.target {
                debug!(
                    repo = self.hierarchy.node(task.repo).label(),
                    "source equals target, disabling task"
                );
                task.enabled = false;
            }
        }

        self.resolve_remote_branches(&tasks, agent)?;

        if !tasks.iter().any(|t| t.enabled) {
            return Err(Error::NoEnabledTasks);
        }

        let plan = Plan {
            session_id: SessionId::generate(),
            tasks,
            auto_discovered: opts.auto_discover,
        };
        info!(
            session = %plan.session_id,
            enabled = plan.enabled_count(),
            "rebase plan constructed"
        );
        self.status = SessionStatus::Planned;
        Ok(plan)
    }

    /// Propose submodules whose pointer differs between target and source,
    /// walking parents before children so inclusions cascade downward.
    fn discover_changed_submodules(
        &self,
        tasks: &mut [RepoTask],
        excluded: &HashSet<RepoId>,
        opts: &PlanOptions,
        agent: &dyn UserAgent,
    ) -> Result<()> {
        for &parent in self.hierarchy.order().iter().rev() {
            if !task_mut(tasks, parent).enabled {
                continue;
            }
            let (parent_source, parent_target) = {
                let task = task_mut(tasks, parent);
                (task.source.clone(), task.target.clone())
            };
            let links: Vec<_> = self.hierarchy.node(parent).links.clone();
            for link in links {
                if excluded.contains(&link.child) || task_mut(tasks, link.child).enabled {
                    continue;
                }
                let gateway = self.gateway(parent);
                let src_ptr =
                    gateway.submodule_pointer_at(&parent_source, &link.path_in_parent)?;
                let tgt_ptr =
                    gateway.submodule_pointer_at(&parent_target, &link.path_in_parent)?;
                if src_ptr == tgt_ptr {
                    continue;
                }

                let child_gateway = self.gateway(link.child);
                let suggested_source = src_ptr
                    .as_ref()
                    .map(|sha| infer_branch(child_gateway, sha, &opts.source))
                    .unwrap_or_else(|| opts.source.clone());
                let suggested_target = tgt_ptr
                    .as_ref()
                    .map(|sha| infer_branch(child_gateway, sha, &opts.target))
                    .unwrap_or_else(|| opts.target.clone());

                let rel = &self.hierarchy.node(link.child).rel_path;
                let decision = if opts.auto_select_submodules {
                    SubmoduleDecision::Include
                } else {
                    agent.choose_submodule(rel, &suggested_source, &suggested_target)
                };

                let task = task_mut(tasks, link.child);
                match decision {
                    SubmoduleDecision::Include => {
                        task.enabled = true;
                        task.source = suggested_source;
                        task.target = suggested_target;
                    }
                    SubmoduleDecision::IncludeWith { source, target } => {
                        task.enabled = true;
                        task.source = source;
                        task.target = target;
                    }
                    SubmoduleDecision::Exclude => {
                        debug!(repo = %rel, "user excluded auto-discovered submodule");
                    }
                }
            }
        }
        Ok(())
    }

    /// Offer to create local branches for source/target refs that exist only
    /// on origin. Declining is fatal for the session.
    fn resolve_remote_branches(&self, tasks: &[RepoTask], agent: &dyn UserAgent) -> Result<()> {
        const REMOTE: &str = "origin";
        for task in tasks.iter().filter(|t| t.enabled) {
            let node = self.hierarchy.node(task.repo);
            let gateway = self.gateway(task.repo);
            for branch in [&task.source, &task.target] {
                if gateway.branch_exists_local(branch)
                    || !gateway.branch_exists_remote(branch, REMOTE)
                {
                    continue;
                }
                if agent.confirm_remote_branch_create(node.label(), branch, REMOTE) {
                    gateway.create_local_from_remote(branch, REMOTE)?;
                    info!(repo = node.label(), branch = %branch, "created local branch from origin");
                } else {
                    return Err(Error::BranchMissing {
                        repo: node.label().to_string(),
                        branch: branch.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Validate every enabled task's repository before execution.
    ///
    /// # Errors
    /// The first violated precondition; no state is mutated.
    pub fn validate(&self, plan: &Plan) -> Result<()> {
        for task in plan.enabled() {
            let node = self.hierarchy.node(task.repo);
            let label = node.label().to_string();
            let gateway = self.gateway(task.repo);

            if gateway.is_rebase_in_progress() {
                return Err(Error::RebaseInProgress { repo: label });
            }
            if !gateway.is_clean()? {
                return Err(Error::DirtyWorktree { repo: label });
            }
            for branch in [&task.source, &task.target] {
                if !gateway.branch_exists_local(branch) {
                    return Err(Error::BranchMissing {
                        repo: label.clone(),
                        branch: branch.clone(),
                    });
                }
            }

            // A pointer change into an uninitialized submodule cannot be
            // tracked, let alone rebased.
            for (parent, path) in self.hierarchy.uninitialized() {
                if *parent == task.repo
                    && gateway.submodule_touched_between(&task.target, &task.source, path)?
                {
                    return Err(Error::SubmoduleNotInitialized {
                        repo: label.clone(),
                        path: path.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    // === Backups ===

    /// Create the session's backup branches, one per enabled `(repo, source)`.
    ///
    /// The pass is atomic: on any failure the backups already created are
    /// removed and the session aborts with no other state changes.
    ///
    /// # Errors
    /// [`Error::BackupCollision`] when a backup ref for this session already
    /// exists, or the underlying gateway failure.
    pub fn create_backups(&mut self, plan: &Plan) -> Result<Vec<BackupRef>> {
        let mut created: Vec<BackupRef> = Vec::new();
        for task in plan.enabled() {
            let node = self.hierarchy.node(task.repo);
            let gateway = self.gateway(task.repo);
            let tip = match gateway.rev_parse(&task.source) {
                Ok(tip) => tip,
                Err(err) => {
                    self.rollback_backups(&created);
                    return Err(err.into());
                }
            };
            let branch = backup_branch_name(&task.source, &plan.session_id);
            match gateway.create_branch_at(&branch, &tip) {
                Ok(()) => {
                    debug!(repo = node.label(), branch = %branch, tip = tip.short(), "backup created");
                    created.push(BackupRef {
                        repo: task.repo,
                        original_branch: task.source.clone(),
                        backup_branch: branch,
                        tip_at_backup: tip,
                    });
                }
                Err(lockstep_git::Error::BranchExists(_)) => {
                    self.rollback_backups(&created);
                    return Err(Error::BackupCollision {
                        repo: node.label().to_string(),
                        branch,
                    });
                }
                Err(err) => {
                    self.rollback_backups(&created);
                    return Err(err.into());
                }
            }
        }
        info!(count = created.len(), session = %plan.session_id, "backup branches created");
        self.status = SessionStatus::BackedUp;
        Ok(created)
    }

    fn rollback_backups(&self, created: &[BackupRef]) {
        for backup in created {
            if let Err(err) = self
                .gateway(backup.repo)
                .delete_branch(&backup.backup_branch, true)
            {
                warn!(
                    branch = %backup.backup_branch,
                    %err,
                    "failed to roll back backup branch"
                );
            }
        }
    }

    // === Execution ===

    /// Execute the plan bottom-up.
    ///
    /// Backups are created first if they were not already. On failure the
    /// current repository's rebase is aborted; completed tasks keep their
    /// results and their backups remain available for restore.
    ///
    /// # Errors
    /// The failure that ended the session; `status()` reflects whether it
    /// was a user abort or a hard failure.
    pub fn execute(&mut self, plan: &Plan, agent: &dyn UserAgent) -> Result<SessionReport> {
        let backups = if self.status == SessionStatus::BackedUp {
            Vec::new()
        } else {
            self.create_backups(plan)?
        };

        self.status = SessionStatus::Executing;
        let mut completed = Vec::new();
        let enabled: Vec<RepoTask> = plan.enabled().cloned().collect();

        for task in &enabled {
            if let Err(err) = self.run_task(task, agent) {
                self.status = if matches!(err, Error::UserAborted) {
                    SessionStatus::Aborted
                } else {
                    SessionStatus::Failed
                };
                let gateway = self.gateway(task.repo);
                if gateway.is_rebase_in_progress() {
                    if let Err(abort_err) = gateway.rebase_abort() {
                        warn!(%abort_err, "failed to abort in-progress rebase");
                    }
                }
                warn!(
                    session = %plan.session_id,
                    repo = self.hierarchy.node(task.repo).label(),
                    %err,
                    "session ended early; completed repos keep their backups"
                );
                return Err(err);
            }
            completed.push(task.repo);
        }

        self.status = SessionStatus::Completed;
        info!(session = %plan.session_id, repos = completed.len(), "session completed");
        Ok(SessionReport {
            session_id: plan.session_id.clone(),
            completed,
            backups,
            rewritten: enabled
                .iter()
                .map(|t| (t.repo, t.source.clone()))
                .collect(),
        })
    }

    /// Run one repository's rebase to completion, resolving stops.
    fn run_task(&mut self, task: &RepoTask, agent: &dyn UserAgent) -> Result<()> {
        let label = self.hierarchy.node(task.repo).label().to_string();
        info!(repo = %label, source = %task.source, target = %task.target, "rebasing");

        let gateway = &self.gateways[&task.repo];
        gateway.checkout(&task.source).map_err(|err| match err {
            lockstep_git::Error::DirtyWorktree => Error::DirtyWorktree {
                repo: label.clone(),
            },
            lockstep_git::Error::BranchNotFound(branch) => Error::BranchMissing {
                repo: label.clone(),
                branch,
            },
            other => other.into(),
        })?;

        let expected = gateway.commits_between(&task.target, &task.source)?;
        debug!(repo = %label, commits = expected.len(), "commits to replay");
        self.trackers.insert(task.repo, CommitTracker::new(expected));

        let mut outcome = gateway.rebase_start(&task.source, &task.target)?;
        loop {
            match outcome {
                RebaseOutcome::Completed => {
                    let observed =
                        self.gateways[&task.repo].commits_between(&task.target, &task.source)?;
                    if let Some(tracker) = self.trackers.get_mut(task.repo) {
                        tracker.sync_observed(&observed);
                        tracker.freeze();
                    }
                    info!(repo = %label, "rebase completed");
                    return Ok(());
                }
                RebaseOutcome::Stopped => {
                    let observed =
                        self.gateways[&task.repo].commits_between(&task.target, "HEAD")?;
                    if let Some(tracker) = self.trackers.get_mut(task.repo) {
                        tracker.sync_observed(&observed);
                    }
                    outcome = self.handle_stop(task, &label, agent)?;
                }
                RebaseOutcome::Failed(message) => {
                    return Err(Error::RebaseFailed {
                        repo: label,
                        message,
                    });
                }
            }
        }
    }

    /// Resolve one stop, suspending on file conflicts until the human is
    /// done. Returns the outcome of the `rebase --continue` that moved past
    /// the stop.
    fn handle_stop(
        &mut self,
        task: &RepoTask,
        label: &str,
        agent: &dyn UserAgent,
    ) -> Result<RebaseOutcome> {
        let gateway = &self.gateways[&task.repo];
        let resolver = ConflictResolver::new(&self.hierarchy, &self.trackers);
        let mut pointer_resolutions = Vec::new();

        let step = resolver.handle_stop(task.repo, gateway, &mut pointer_resolutions)?;
        let outcome = match step {
            ResolveStep::Continued(outcome) => outcome,
            ResolveStep::FilesPending(mut files) => loop {
                if agent.await_file_conflict_resolution(label, &files) == ConflictAction::Abort {
                    return Err(Error::UserAborted);
                }
                match resolver.verify_and_continue(task.repo, gateway)? {
                    ResolveStep::Continued(outcome) => break outcome,
                    ResolveStep::FilesPending(remaining) => files = remaining,
                }
            },
        };

        for resolution in pointer_resolutions {
            let enriched = self.enrich_resolution(label, resolution);
            self.resolutions.push(enriched);
        }
        Ok(outcome)
    }

    /// Attach child commit subjects to a pointer resolution for reporting.
    fn enrich_resolution(&self, label: &str, resolution: PointerResolution) -> SessionResolution {
        let child_gateway = self.gateway(resolution.child);
        let old_subject = child_gateway.commit_subject(&resolution.old_sha).ok();
        let new_subject = child_gateway.commit_subject(&resolution.new_sha).ok();
        let message_mismatch = matches!(
            (&old_subject, &new_subject),
            (Some(old), Some(new)) if old != new
        );
        SessionResolution {
            repo: label.to_string(),
            submodule_path: resolution.path,
            old_sha: resolution.old_sha,
            new_sha: resolution.new_sha,
            subject: new_subject,
            message_mismatch,
        }
    }

    // === Force-push offer ===

    /// After completion, offer a `--force-with-lease` push per rewritten
    /// branch. The agent must return the exact confirmation phrase.
    ///
    /// # Errors
    /// Propagates push failures; declined offers are not errors.
    pub fn offer_force_push(
        &self,
        report: &SessionReport,
        agent: &dyn UserAgent,
    ) -> Result<Vec<PushOutcome>> {
        const REMOTE: &str = "origin";
        let mut outcomes = Vec::new();
        for (repo, branch) in &report.rewritten {
            let node = self.hierarchy.node(*repo);
            let gateway = self.gateway(*repo);
            let counts = gateway.ahead_behind(branch, REMOTE)?;
            if counts.ahead == 0 && counts.behind == 0 {
                continue;
            }
            let phrase = format!("force-push {branch}");
            let pushed =
                agent.confirm_force_push(branch, counts.ahead, counts.behind, &phrase);
            if pushed {
                gateway.push_with_lease(branch, REMOTE)?;
                info!(repo = node.label(), branch = %branch, "force-pushed with lease");
            }
            outcomes.push(PushOutcome {
                repo: node.label().to_string(),
                branch: branch.clone(),
                ahead: counts.ahead,
                behind: counts.behind,
                pushed,
            });
        }
        Ok(outcomes)
    }

    // === Backup listing / restore / deletion ===

    /// List backup branches across the hierarchy, optionally filtered.
    ///
    /// The listing is a pure function of the refs: sorted by session
    /// (newest first), then repository path.
    ///
    /// # Errors
    /// Propagates branch-listing failures.
    pub fn list_backups(
        &self,
        original_branch: Option<&str>,
        session: Option<&str>,
    ) -> Result<Vec<BackupEntry>> {
        let mut entries = Vec::new();
        for id in self.hierarchy.ids() {
            let node = self.hierarchy.node(id);
            for branch in self.gateway(id).list_local_branches()? {
                let Some((original, sess)) = parse_backup_branch(&branch) else {
                    continue;
                };
                if original_branch.is_some_and(|want| want != original) {
                    continue;
                }
                if session.is_some_and(|want| want != sess) {
                    continue;
                }
                entries.push(BackupEntry {
                    repo: node.label().to_string(),
                    repo_rel_path: node.rel_path.clone(),
                    backup_branch: branch,
                    original_branch: original,
                    session: sess,
                });
            }
        }
        entries.sort_by(|a, b| {
            b.session
                .cmp(&a.session)
                .then_with(|| a.repo_rel_path.cmp(&b.repo_rel_path))
        });
        Ok(entries)
    }

    /// The most recent backup session id present anywhere in the hierarchy.
    ///
    /// # Errors
    /// Propagates branch-listing failures.
    pub fn latest_backup_session(&self) -> Result<Option<String>> {
        Ok(self
            .list_backups(None, None)?
            .into_iter()
            .map(|e| e.session)
            .max())
    }

    /// Delete one backup branch in the repository at `repo_rel_path`.
    ///
    /// # Errors
    /// Fails when the repository or branch does not exist.
    pub fn delete_backup(&self, repo_rel_path: &str, backup_branch: &str) -> Result<()> {
        let repo = self.find_by_rel_path(repo_rel_path)?;
        self.gateway(repo).delete_branch(backup_branch, true)?;
        info!(repo = repo_rel_path, branch = backup_branch, "deleted backup branch");
        Ok(())
    }

    /// Restore original branches from the backups of one session,
    /// best-effort across the hierarchy.
    ///
    /// Repositories without a matching backup are reported, not fatal. An
    /// in-progress rebase in a restored repository is aborted first.
    #[must_use]
    pub fn restore(&self, original_branch: Option<&str>, session: &str) -> RestoreOutcome {
        let mut outcome = RestoreOutcome::default();
        for id in self.hierarchy.ids() {
            let node = self.hierarchy.node(id);
            let label = node.label().to_string();
            let gateway = self.gateway(id);

            let branches = match gateway.list_local_branches() {
                Ok(branches) => branches,
                Err(err) => {
                    outcome.failed.push((label, err.to_string()));
                    continue;
                }
            };
            let matching: Vec<(String, String)> = branches
                .into_iter()
                .filter_map(|b| parse_backup_branch(&b).map(|(orig, sess)| (b, orig, sess)))
                .filter(|(_, orig, sess)| {
                    sess == session && original_branch.map_or(true, |want| want == orig)
                })
                .map(|(branch, orig, _)| (branch, orig))
                .collect();

            if matching.is_empty() {
                outcome.missing.push(label);
                continue;
            }

            for (backup_branch, original) in matching {
                match self.restore_one(gateway, &backup_branch, &original) {
                    Ok(()) => outcome.restored.push((label.clone(), original)),
                    Err(err) => outcome.failed.push((label.clone(), err.to_string())),
                }
            }
        }
        outcome
    }

    fn restore_one(
        &self,
        gateway: &F::Gateway,
        backup_branch: &str,
        original: &str,
    ) -> Result<()> {
        let tip = gateway.rev_parse(backup_branch)?;
        if gateway.is_rebase_in_progress() {
            warn!(branch = original, "aborting in-progress rebase before restore");
            gateway.rebase_abort()?;
        }
        gateway.force_update_branch(original, &tip)?;
        info!(branch = original, tip = tip.short(), "restored from backup");
        Ok(())
    }

    fn find_by_rel_path(&self, rel_path: &str) -> Result<RepoId> {
        self.hierarchy
            .ids()
            .find(|&id| self.hierarchy.node(id).rel_path == rel_path)
            .ok_or_else(|| Error::UnknownRepoRef(rel_path.to_string()))
    }
}

fn task_mut(tasks: &mut [RepoTask], repo: RepoId) -> &mut RepoTask {
    tasks
        .iter_mut()
        .find(|t| t.repo == repo)
        .expect("every hierarchy repo has a task")
}

/// Best-guess branch name for a submodule pointer SHA in the child repo:
/// a branch whose tip is exactly the pointer wins, then a branch containing
/// it (preferring `fallback`), then `fallback` itself.
fn infer_branch<G: GitGateway>(gateway: &G, sha: &Sha, fallback: &str) -> String {
    if let Ok(branches) = gateway.list_local_branches() {
        for branch in &branches {
            if gateway.rev_parse(branch).is_ok_and(|tip| tip == *sha) {
                return branch.clone();
            }
        }
    }
    if let Ok(containing) = gateway.branches_containing(sha) {
        if containing.iter().any(|b| b == fallback) {
            return fallback.to_string();
        }
        if let Some(first) = containing.into_iter().next() {
            return first;
        }
    }
    fallback.to_string()
}
