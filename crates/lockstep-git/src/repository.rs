//! Subprocess-backed gateway implementation.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::sha::Sha;
use crate::traits::GitGateway;
use crate::types::{AheadBehind, ConflictSet, RebaseOutcome, SubmoduleConflict, SubmoduleEntry};

/// Gateway to one repository, invoking `git` against its worktree.
pub struct Repository {
    workdir: PathBuf,
    git_dir: PathBuf,
}

impl Repository {
    /// Open the repository containing `path`, walking up as git does.
    ///
    /// # Errors
    /// Returns [`Error::NotARepository`] if `path` is not inside a worktree.
    pub fn discover(path: impl AsRef<Path>) -> Result<Self> {
        let out = run_in(path.as_ref(), &["rev-parse", "--show-toplevel"])?;
        if !out.status.success() {
            return Err(Error::NotARepository);
        }
        let workdir = PathBuf::from(stdout_line(&out));
        Self::open(workdir)
    }

    /// Open a repository whose worktree root is exactly `path`.
    ///
    /// # Errors
    /// Returns [`Error::NotARepository`] if `path` is not a worktree root.
    /// In particular an uninitialized submodule directory is rejected even
    /// though git would resolve it to the surrounding superproject.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let workdir = path.as_ref().to_path_buf();
        let out = run_in(&workdir, &["rev-parse", "--show-toplevel"])?;
        if !out.status.success() {
            return Err(Error::NotARepository);
        }
        let toplevel = PathBuf::from(stdout_line(&out));
        let same_root = match (toplevel.canonicalize(), workdir.canonicalize()) {
            (Ok(top), Ok(requested)) => top == requested,
            _ => toplevel == workdir,
        };
        if !same_root {
            return Err(Error::NotARepository);
        }

        let out = run_in(&workdir, &["rev-parse", "--absolute-git-dir"])?;
        if !out.status.success() {
            return Err(Error::NotARepository);
        }
        let git_dir = PathBuf::from(stdout_line(&out));
        Ok(Self { workdir, git_dir })
    }

    fn run(&self, args: &[&str]) -> Result<Output> {
        debug!(workdir = %self.workdir.display(), "git {}", args.join(" "));
        run_in(&self.workdir, args)
    }

    /// Run git and require success, returning trimmed stdout.
    fn run_checked(&self, args: &[&str]) -> Result<String> {
        let out = self.run(args)?;
        if out.status.success() {
            Ok(String::from_utf8_lossy(&out.stdout).trim_end().to_string())
        } else {
            Err(git_failed(args, &out))
        }
    }

    /// Run git and report only whether it succeeded.
    fn run_status(&self, args: &[&str]) -> Result<bool> {
        Ok(self.run(args)?.status.success())
    }
}

fn run_in(dir: &Path, args: &[&str]) -> Result<Output> {
    Command::new("git")
        .args(args)
        .current_dir(dir)
        // Never fall into an editor or credential prompt from a subprocess.
        .env("GIT_EDITOR", "true")
        .env("GIT_TERMINAL_PROMPT", "0")
        .output()
        .map_err(Error::GitBinaryMissing)
}

fn stdout_line(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).trim_end().to_string()
}

fn git_failed(args: &[&str], out: &Output) -> Error {
    Error::GitFailed {
        command: args.join(" "),
        stderr: String::from_utf8_lossy(&out.stderr).trim_end().to_string(),
    }
}

impl GitGateway for Repository {
    fn workdir(&self) -> &Path {
        &self.workdir
    }

    fn current_branch(&self) -> Result<String> {
        let out = self.run(&["symbolic-ref", "--quiet", "--short", "HEAD"])?;
        if out.status.success() {
            Ok(stdout_line(&out))
        } else {
            Err(Error::DetachedHead)
        }
    }

    fn is_clean(&self) -> Result<bool> {
        if self.is_rebase_in_progress() || self.git_dir.join("MERGE_HEAD").exists() {
            return Ok(false);
        }
        // Gitlink drift is expected between per-repo rebases; only file
        // changes block. Untracked files do not block a rebase either.
        let status = self.run_checked(&["status", "--porcelain", "--ignore-submodules=all"])?;
        Ok(status.lines().all(|l| l.starts_with("??")))
    }

    fn is_rebase_in_progress(&self) -> bool {
        self.git_dir.join("rebase-merge").exists() || self.git_dir.join("rebase-apply").exists()
    }

    fn is_submodule_worktree(&self) -> bool {
        self.workdir.join(".git").is_file()
    }

    fn branch_exists_local(&self, name: &str) -> bool {
        let r = format!("refs/heads/{name}");
        self.run_status(&["show-ref", "--verify", "--quiet", &r])
            .unwrap_or(false)
    }

    fn branch_exists_remote(&self, name: &str, remote: &str) -> bool {
        let r = format!("refs/remotes/{remote}/{name}");
        self.run_status(&["show-ref", "--verify", "--quiet", &r])
            .unwrap_or(false)
    }

    fn create_local_from_remote(&self, name: &str, remote: &str) -> Result<()> {
        if self.branch_exists_local(name) {
            return Err(Error::BranchExists(name.to_string()));
        }
        let tracking = format!("{remote}/{name}");
        self.run_checked(&["branch", "--track", name, &tracking])?;
        Ok(())
    }

    fn checkout(&self, branch: &str) -> Result<()> {
        if !self.branch_exists_local(branch) {
            return Err(Error::BranchNotFound(branch.to_string()));
        }
        if !self.is_clean()? {
            return Err(Error::DirtyWorktree);
        }
        self.run_checked(&["checkout", branch])?;
        Ok(())
    }

    fn list_local_branches(&self) -> Result<Vec<String>> {
        let out = self.run_checked(&["for-each-ref", "--format=%(refname:short)", "refs/heads"])?;
        Ok(out.lines().map(str::to_string).collect())
    }

    fn branches_containing(&self, sha: &Sha) -> Result<Vec<String>> {
        let out = self.run_checked(&[
            "for-each-ref",
            "--format=%(refname:short)",
            "refs/heads",
            "--contains",
            sha.as_str(),
        ])?;
        Ok(out.lines().map(str::to_string).collect())
    }

    fn create_branch_at(&self, name: &str, at: &Sha) -> Result<()> {
        if self.branch_exists_local(name) {
            return Err(Error::BranchExists(name.to_string()));
        }
        self.run_checked(&["branch", name, at.as_str()])?;
        Ok(())
    }

    fn delete_branch(&self, name: &str, force: bool) -> Result<()> {
        let flag = if force { "-D" } else { "-d" };
        self.run_checked(&["branch", flag, name])?;
        Ok(())
    }

    fn force_update_branch(&self, name: &str, to: &Sha) -> Result<()> {
        if self.current_branch().ok().as_deref() == Some(name) {
            self.run_checked(&["reset", "--hard", to.as_str()])?;
        } else {
            self.run_checked(&["branch", "-f", name, to.as_str()])?;
        }
        Ok(())
    }

    fn rev_parse(&self, reference: &str) -> Result<Sha> {
        let peeled = format!("{reference}^{{commit}}");
        let out = self.run(&["rev-parse", "--verify", "--quiet", &peeled])?;
        if out.status.success() {
            Sha::parse(stdout_line(&out))
        } else {
            Err(Error::BranchNotFound(reference.to_string()))
        }
    }

    fn commits_between(&self, target: &str, source: &str) -> Result<Vec<Sha>> {
        let range = format!("{target}..{source}");
        let out = self.run_checked(&["rev-list", "--reverse", "--first-parent", &range])?;
        out.lines().map(Sha::parse).collect()
    }

    fn commit_subject(&self, sha: &Sha) -> Result<String> {
        self.run_checked(&["show", "-s", "--format=%s", sha.as_str()])
    }

    fn submodule_entries(&self, reference: &str) -> Result<Vec<SubmoduleEntry>> {
        let out = self.run_checked(&["ls-tree", "-r", reference])?;
        let mut entries = Vec::new();
        for line in out.lines() {
            if let Some((path, sha)) = parse_gitlink_line(line) {
                entries.push(SubmoduleEntry {
                    path,
                    recorded_sha: sha,
                });
            }
        }
        Ok(entries)
    }

    fn submodule_pointer_at(&self, reference: &str, path: &str) -> Result<Option<Sha>> {
        let out = self.run(&["ls-tree", reference, "--", path])?;
        if !out.status.success() {
            return Err(git_failed(&["ls-tree", reference, "--", path], &out));
        }
        Ok(stdout_line(&out)
            .lines()
            .find_map(|l| parse_gitlink_line(l).map(|(_, sha)| sha)))
    }

    fn submodule_touched_between(&self, target: &str, source: &str, path: &str) -> Result<bool> {
        let range = format!("{target}..{source}");
        let out = self.run_checked(&["diff", "--name-only", &range, "--", path])?;
        Ok(!out.is_empty())
    }

    fn rebase_start(&self, source: &str, onto: &str) -> Result<RebaseOutcome> {
        if self.is_rebase_in_progress() {
            return Err(Error::RebaseInProgress);
        }
        let out = self.run(&["rebase", onto, source])?;
        Ok(self.classify_rebase(&["rebase", onto, source], &out))
    }

    fn rebase_continue(&self) -> Result<RebaseOutcome> {
        let out = self.run(&["rebase", "--continue"])?;
        Ok(self.classify_rebase(&["rebase", "--continue"], &out))
    }

    fn rebase_abort(&self) -> Result<()> {
        self.run_checked(&["rebase", "--abort"])?;
        Ok(())
    }

    fn index_conflicts(&self) -> Result<ConflictSet> {
        let out = self.run_checked(&["ls-files", "--unmerged"])?;
        Ok(parse_unmerged(&out))
    }

    fn stage_path(&self, path: &str) -> Result<()> {
        self.run_checked(&["add", "--", path])?;
        Ok(())
    }

    fn write_submodule_pointer(&self, path: &str, sha: &Sha) -> Result<()> {
        let cacheinfo = format!("160000,{},{}", sha.as_str(), path);
        self.run_checked(&["update-index", "--cacheinfo", &cacheinfo])?;
        Ok(())
    }

    fn ahead_behind(&self, branch: &str, remote: &str) -> Result<AheadBehind> {
        let tracking = format!("refs/remotes/{remote}/{branch}");
        let exists = self.run_status(&["show-ref", "--verify", "--quiet", &tracking])?;
        if !exists {
            return Ok(AheadBehind {
                ahead: 0,
                behind: 0,
            });
        }
        let range = format!("{remote}/{branch}...{branch}");
        let out = self.run_checked(&["rev-list", "--left-right", "--count", &range])?;
        let mut parts = out.split_whitespace();
        let behind = parts.next().and_then(|s| s.parse().ok()).unwrap_or(0);
        let ahead = parts.next().and_then(|s| s.parse().ok()).unwrap_or(0);
        Ok(AheadBehind { ahead, behind })
    }

    fn push_with_lease(&self, branch: &str, remote: &str) -> Result<()> {
        self.run_checked(&["push", "--force-with-lease", remote, branch])?;
        Ok(())
    }
}

impl Repository {
    /// A non-zero rebase exit that left rebase state behind is a conflict
    /// stop; anything else non-zero is a genuine failure.
    fn classify_rebase(&self, args: &[&str], out: &Output) -> RebaseOutcome {
        if out.status.success() {
            // A rebase may exit zero while steps remain (e.g. `--continue`
            // after an edit); treat lingering state as a stop.
            if self.is_rebase_in_progress() {
                return RebaseOutcome::Stopped;
            }
            return RebaseOutcome::Completed;
        }
        if self.is_rebase_in_progress() {
            warn!("`git {}` stopped on conflicts", args.join(" "));
            RebaseOutcome::Stopped
        } else {
            RebaseOutcome::Failed(String::from_utf8_lossy(&out.stderr).trim_end().to_string())
        }
    }
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("workdir", &self.workdir)
            .finish()
    }
}

/// Parse an `ls-tree` line, returning `(path, sha)` for gitlink entries.
///
/// Format: `160000 commit <sha>\t<path>`.
fn parse_gitlink_line(line: &str) -> Option<(String, Sha)> {
    let (meta, path) = line.split_once('\t')?;
    let mut fields = meta.split_whitespace();
    if fields.next()? != "160000" {
        return None;
    }
    if fields.next()? != "commit" {
        return None;
    }
    let sha = Sha::parse(fields.next()?).ok()?;
    Some((path.to_string(), sha))
}

/// Parse `ls-files --unmerged` output into a [`ConflictSet`].
///
/// Format per line: `<mode> <sha> <stage>\t<path>`; gitlinks carry mode
/// 160000, stage 2 is ours, stage 3 is theirs.
fn parse_unmerged(out: &str) -> ConflictSet {
    let mut set = ConflictSet::default();
    for line in out.lines() {
        let Some((meta, path)) = line.split_once('\t') else {
            continue;
        };
        let fields: Vec<&str> = meta.split_whitespace().collect();
        let &[mode, sha, stage] = fields.as_slice() else {
            continue;
        };
        if mode == "160000" {
            let entry = match set.submodules.iter_mut().find(|c| c.path == path) {
                Some(entry) => entry,
                None => {
                    set.submodules.push(SubmoduleConflict {
                        path: path.to_string(),
                        ours: None,
                        theirs: None,
                    });
                    set.submodules.last_mut().expect("just pushed")
                }
            };
            match stage {
                "2" => entry.ours = Sha::parse(sha).ok(),
                "3" => entry.theirs = Sha::parse(sha).ok(),
                _ => {}
            }
        } else if !set.files.iter().any(|f| f == path) {
            set.files.push(path.to_string());
        }
    }
    set
}
