//! In-memory fakes for orchestrator scenario tests.
//!
//! `MockGateway` implements `GitGateway` over shared `RefCell` state with a
//! scripted rebase: a replay set, the rewritten ids each step produces, and
//! the stops to present along the way. `MockFactory` serves gateways by
//! path so hierarchy discovery runs unmodified.

#![allow(dead_code)] // not every scenario uses every helper

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use lockstep_core::{ConflictAction, GatewayFactory, SubmoduleDecision, UserAgent};
use lockstep_git::{
    AheadBehind, ConflictSet, Error as GitError, GitGateway, RebaseOutcome, Result as GitResult,
    Sha, SubmoduleEntry,
};

/// Deterministic SHA from a label, for readable scripts.
pub fn sha(label: &str) -> Sha {
    let mut out = String::with_capacity(40);
    for byte in label.bytes().cycle().take(20) {
        out.push_str(&format!("{byte:02x}"));
    }
    Sha::parse(out).unwrap()
}

/// Scripted state of one fake repository.
#[derive(Default)]
pub struct RepoState {
    pub branches: HashMap<String, Sha>,
    pub remote_branches: HashMap<String, Sha>,
    pub current_branch: Option<String>,
    pub clean: bool,
    pub is_submodule: bool,
    /// Gitlink entries reported for any tree-ish.
    pub submodules_head: Vec<SubmoduleEntry>,
    /// `(ref, path)` -> recorded pointer, for auto-discovery.
    pub pointers: HashMap<(String, String), Sha>,
    /// Paths reported as touched between any target..source.
    pub touched_paths: Vec<String>,
    pub subjects: HashMap<Sha, String>,
    pub ahead_behind: HashMap<String, (usize, usize)>,

    // Rebase script.
    pub old_commits: Vec<Sha>,
    pub new_commits: Vec<Sha>,
    pub stops: VecDeque<(usize, ConflictSet)>,
    pub fail_with: Option<String>,

    // Live state.
    pub in_rebase: bool,
    pub finished: bool,
    pub steps_done: usize,
    pub current_conflict: Option<ConflictSet>,

    // Observability.
    pub written_pointers: Vec<(String, Sha)>,
    pub pushed: Vec<String>,
    pub mutations: Vec<String>,
}

impl RepoState {
    pub fn new() -> Self {
        Self {
            clean: true,
            ..Self::default()
        }
    }

    /// Drop any remaining file conflicts, as a human resolving them would.
    pub fn resolve_files(&mut self) {
        if let Some(conflict) = self.current_conflict.as_mut() {
            conflict.files.clear();
        }
    }
}

/// Cloneable handle to one fake repository.
#[derive(Clone)]
pub struct MockGateway {
    path: PathBuf,
    pub state: Rc<RefCell<RepoState>>,
}

impl MockGateway {
    pub fn new(path: impl Into<PathBuf>, state: RepoState) -> Self {
        Self {
            path: path.into(),
            state: Rc::new(RefCell::new(state)),
        }
    }

    fn advance(&self) -> RebaseOutcome {
        let mut state = self.state.borrow_mut();
        loop {
            let stop_here = state
                .stops
                .front()
                .is_some_and(|(at, _)| *at == state.steps_done);
            if stop_here {
                let (_, conflict) = state.stops.pop_front().unwrap();
                state.current_conflict = Some(conflict);
                return RebaseOutcome::Stopped;
            }
            if state.steps_done == state.old_commits.len() {
                state.in_rebase = false;
                state.finished = true;
                if let (Some(branch), Some(tip)) = (
                    state.current_branch.clone(),
                    state.new_commits.last().cloned(),
                ) {
                    state.branches.insert(branch, tip);
                }
                return RebaseOutcome::Completed;
            }
            state.steps_done += 1;
        }
    }
}

impl GitGateway for MockGateway {
    fn workdir(&self) -> &Path {
        &self.path
    }

    fn current_branch(&self) -> GitResult<String> {
        self.state
            .borrow()
            .current_branch
            .clone()
            .ok_or(GitError::DetachedHead)
    }

    fn is_clean(&self) -> GitResult<bool> {
        let state = self.state.borrow();
        Ok(state.clean && !state.in_rebase)
    }

    fn is_rebase_in_progress(&self) -> bool {
        self.state.borrow().in_rebase
    }

    fn is_submodule_worktree(&self) -> bool {
        self.state.borrow().is_submodule
    }

    fn branch_exists_local(&self, name: &str) -> bool {
        self.state.borrow().branches.contains_key(name)
    }

    fn branch_exists_remote(&self, name: &str, _remote: &str) -> bool {
        self.state.borrow().remote_branches.contains_key(name)
    }

    fn create_local_from_remote(&self, name: &str, _remote: &str) -> GitResult<()> {
        let mut state = self.state.borrow_mut();
        if state.branches.contains_key(name) {
            return Err(GitError::BranchExists(name.to_string()));
        }
        let tip = state
            .remote_branches
            .get(name)
            .cloned()
            .ok_or_else(|| GitError::BranchNotFound(name.to_string()))?;
        state.branches.insert(name.to_string(), tip);
        state.mutations.push(format!("create-from-remote {name}"));
        Ok(())
    }

    fn checkout(&self, branch: &str) -> GitResult<()> {
        let mut state = self.state.borrow_mut();
        if !state.branches.contains_key(branch) {
            return Err(GitError::BranchNotFound(branch.to_string()));
        }
        if !state.clean {
            return Err(GitError::DirtyWorktree);
        }
        state.current_branch = Some(branch.to_string());
        state.mutations.push(format!("checkout {branch}"));
        Ok(())
    }

    fn list_local_branches(&self) -> GitResult<Vec<String>> {
        let mut branches: Vec<String> = self.state.borrow().branches.keys().cloned().collect();
        branches.sort();
        Ok(branches)
    }

    fn branches_containing(&self, sha: &Sha) -> GitResult<Vec<String>> {
        let state = self.state.borrow();
        let mut branches: Vec<String> = state
            .branches
            .iter()
            .filter(|(_, tip)| *tip == sha)
            .map(|(name, _)| name.clone())
            .collect();
        branches.sort();
        Ok(branches)
    }

    fn create_branch_at(&self, name: &str, at: &Sha) -> GitResult<()> {
        let mut state = self.state.borrow_mut();
        if state.branches.contains_key(name) {
            return Err(GitError::BranchExists(name.to_string()));
        }
        state.branches.insert(name.to_string(), at.clone());
        state.mutations.push(format!("branch {name}"));
        Ok(())
    }

    fn delete_branch(&self, name: &str, _force: bool) -> GitResult<()> {
        let mut state = self.state.borrow_mut();
        state
            .branches
            .remove(name)
            .ok_or_else(|| GitError::BranchNotFound(name.to_string()))?;
        state.mutations.push(format!("delete {name}"));
        Ok(())
    }

    fn force_update_branch(&self, name: &str, to: &Sha) -> GitResult<()> {
        let mut state = self.state.borrow_mut();
        state.branches.insert(name.to_string(), to.clone());
        state.mutations.push(format!("force-update {name}"));
        Ok(())
    }

    fn rev_parse(&self, reference: &str) -> GitResult<Sha> {
        let state = self.state.borrow();
        let name = if reference == "HEAD" {
            state
                .current_branch
                .clone()
                .ok_or(GitError::DetachedHead)?
        } else {
            reference.to_string()
        };
        state
            .branches
            .get(&name)
            .cloned()
            .ok_or_else(|| GitError::BranchNotFound(reference.to_string()))
    }

    fn commits_between(&self, _target: &str, source: &str) -> GitResult<Vec<Sha>> {
        let state = self.state.borrow();
        if source == "HEAD" || state.in_rebase || state.finished {
            Ok(state.new_commits[..state.steps_done.min(state.new_commits.len())].to_vec())
        } else {
            Ok(state.old_commits.clone())
        }
    }

    fn commit_subject(&self, sha: &Sha) -> GitResult<String> {
        Ok(self
            .state
            .borrow()
            .subjects
            .get(sha)
            .cloned()
            .unwrap_or_else(|| format!("commit {}", sha.short())))
    }

    fn submodule_entries(&self, _reference: &str) -> GitResult<Vec<SubmoduleEntry>> {
        Ok(self.state.borrow().submodules_head.clone())
    }

    fn submodule_pointer_at(&self, reference: &str, path: &str) -> GitResult<Option<Sha>> {
        Ok(self
            .state
            .borrow()
            .pointers
            .get(&(reference.to_string(), path.to_string()))
            .cloned())
    }

    fn submodule_touched_between(
        &self,
        _target: &str,
        _source: &str,
        path: &str,
    ) -> GitResult<bool> {
        Ok(self.state.borrow().touched_paths.iter().any(|p| p == path))
    }

    fn rebase_start(&self, source: &str, _onto: &str) -> GitResult<RebaseOutcome> {
        {
            let mut state = self.state.borrow_mut();
            if state.in_rebase {
                return Err(GitError::RebaseInProgress);
            }
            if let Some(message) = state.fail_with.clone() {
                return Ok(RebaseOutcome::Failed(message));
            }
            state.in_rebase = true;
            state.steps_done = 0;
            state.mutations.push(format!("rebase {source}"));
        }
        Ok(self.advance())
    }

    fn rebase_continue(&self) -> GitResult<RebaseOutcome> {
        {
            let mut state = self.state.borrow_mut();
            if let Some(conflict) = &state.current_conflict {
                if !conflict.is_empty() {
                    // Continuing with unmerged entries fails and stays stopped.
                    return Ok(RebaseOutcome::Stopped);
                }
            }
            state.current_conflict = None;
            state.steps_done += 1;
        }
        Ok(self.advance())
    }

    fn rebase_abort(&self) -> GitResult<()> {
        let mut state = self.state.borrow_mut();
        state.in_rebase = false;
        state.current_conflict = None;
        state.steps_done = 0;
        state.mutations.push("rebase-abort".to_string());
        Ok(())
    }

    fn index_conflicts(&self) -> GitResult<ConflictSet> {
        Ok(self
            .state
            .borrow()
            .current_conflict
            .clone()
            .unwrap_or_default())
    }

    fn stage_path(&self, path: &str) -> GitResult<()> {
        let mut state = self.state.borrow_mut();
        if let Some(conflict) = state.current_conflict.as_mut() {
            conflict.files.retain(|f| f != path);
        }
        Ok(())
    }

    fn write_submodule_pointer(&self, path: &str, sha: &Sha) -> GitResult<()> {
        let mut state = self.state.borrow_mut();
        if let Some(conflict) = state.current_conflict.as_mut() {
            conflict.submodules.retain(|c| c.path != path);
        }
        state.written_pointers.push((path.to_string(), sha.clone()));
        state.mutations.push(format!("write-pointer {path}"));
        Ok(())
    }

    fn ahead_behind(&self, branch: &str, _remote: &str) -> GitResult<AheadBehind> {
        let (ahead, behind) = self
            .state
            .borrow()
            .ahead_behind
            .get(branch)
            .copied()
            .unwrap_or((0, 0));
        Ok(AheadBehind { ahead, behind })
    }

    fn push_with_lease(&self, branch: &str, _remote: &str) -> GitResult<()> {
        let mut state = self.state.borrow_mut();
        state.pushed.push(branch.to_string());
        state.mutations.push(format!("push {branch}"));
        Ok(())
    }
}

/// Factory serving mock gateways by registered path.
#[derive(Default)]
pub struct MockFactory {
    repos: Vec<MockGateway>,
}

impl MockFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, gateway: MockGateway) {
        self.repos.push(gateway);
    }

    pub fn gateway(&self, path: &str) -> &MockGateway {
        self.repos
            .iter()
            .find(|g| g.workdir() == Path::new(path))
            .expect("gateway registered")
    }
}

impl GatewayFactory for MockFactory {
    type Gateway = MockGateway;

    fn discover(&self, path: &Path) -> GitResult<MockGateway> {
        // Deepest registered worktree containing `path`.
        self.repos
            .iter()
            .filter(|g| path.starts_with(g.workdir()))
            .max_by_key(|g| g.workdir().components().count())
            .cloned()
            .ok_or(GitError::NotARepository)
    }

    fn open(&self, path: &Path) -> GitResult<MockGateway> {
        self.repos
            .iter()
            .find(|g| g.workdir() == path)
            .cloned()
            .ok_or(GitError::NotARepository)
    }
}

type ResolveHook = Box<dyn Fn()>;

/// Scripted user agent recording every interaction.
pub struct ScriptedAgent {
    pub create_remote_branches: bool,
    pub submodule_decisions: RefCell<VecDeque<SubmoduleDecision>>,
    pub conflict_actions: RefCell<VecDeque<ConflictAction>>,
    /// Runs before answering a file-conflict prompt, simulating the human
    /// resolving the files in the worktree.
    pub resolve_hook: RefCell<Option<ResolveHook>>,
    pub confirm_pushes: bool,
    pub events: RefCell<Vec<String>>,
}

impl Default for ScriptedAgent {
    fn default() -> Self {
        Self {
            create_remote_branches: false,
            submodule_decisions: RefCell::new(VecDeque::new()),
            conflict_actions: RefCell::new(VecDeque::new()),
            resolve_hook: RefCell::new(None),
            confirm_pushes: false,
            events: RefCell::new(Vec::new()),
        }
    }
}

impl ScriptedAgent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<String> {
        self.events.borrow().clone()
    }
}

impl UserAgent for ScriptedAgent {
    fn confirm_remote_branch_create(&self, repo: &str, branch: &str, remote: &str) -> bool {
        self.events
            .borrow_mut()
            .push(format!("remote-create {repo} {branch} {remote}"));
        self.create_remote_branches
    }

    fn choose_submodule(
        &self,
        submodule_path: &str,
        suggested_source: &str,
        suggested_target: &str,
    ) -> SubmoduleDecision {
        self.events.borrow_mut().push(format!(
            "submodule {submodule_path} {suggested_source}->{suggested_target}"
        ));
        self.submodule_decisions
            .borrow_mut()
            .pop_front()
            .unwrap_or(SubmoduleDecision::Include)
    }

    fn await_file_conflict_resolution(&self, repo: &str, files: &[String]) -> ConflictAction {
        self.events
            .borrow_mut()
            .push(format!("file-conflicts {repo} {}", files.join(",")));
        if let Some(hook) = self.resolve_hook.borrow().as_ref() {
            hook();
        }
        self.conflict_actions
            .borrow_mut()
            .pop_front()
            .unwrap_or(ConflictAction::Resolved)
    }

    fn confirm_force_push(&self, branch: &str, ahead: usize, behind: usize, _phrase: &str) -> bool {
        self.events
            .borrow_mut()
            .push(format!("force-push {branch} +{ahead}-{behind}"));
        self.confirm_pushes
    }
}
