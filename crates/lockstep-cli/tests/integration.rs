//! Integration tests for the lockstep-rebase CLI.
//!
//! These run the real binary against scratch git repositories, including a
//! two-level gitlink hierarchy that exercises pointer auto-resolution
//! end-to-end.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command as StdCommand;
use tempfile::TempDir;

fn git(dir: &Path, args: &[&str]) -> String {
    let out = StdCommand::new("git")
        .args(args)
        .current_dir(dir)
        .env("GIT_AUTHOR_NAME", "Test")
        .env("GIT_AUTHOR_EMAIL", "test@example.com")
        .env("GIT_COMMITTER_NAME", "Test")
        .env("GIT_COMMITTER_EMAIL", "test@example.com")
        .output()
        .expect("failed to run git");
    assert!(
        out.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&out.stderr)
    );
    String::from_utf8_lossy(&out.stdout).trim_end().to_string()
}

fn commit_file(dir: &Path, name: &str, content: &str, msg: &str) {
    fs::write(dir.join(name), content).expect("write file");
    git(dir, &["add", "."]);
    git(dir, &["commit", "-m", msg]);
}

fn init_repo(dir: &Path) {
    git(dir, &["init", "-b", "main"]);
    git(dir, &["config", "user.email", "test@example.com"]);
    git(dir, &["config", "user.name", "Test"]);
}

/// Helper to get the lockstep-rebase command with logging redirected into
/// the scratch directory.
fn lockstep(dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_lockstep-rebase"));
    cmd.current_dir(dir);
    cmd.env("LOCKSTEP_REBASE_LOG", dir.join("lockstep.log"));
    cmd.env("NO_COLOR", "1");
    cmd
}

fn setup_single_repo() -> TempDir {
    let temp = TempDir::new().expect("temp dir");
    init_repo(temp.path());
    commit_file(temp.path(), "README.md", "# test\n", "initial commit");
    temp
}

/// Root repo with a nested child repo recorded as a gitlink at `libs/c`.
///
/// Child: `main` advances past the branch point of `feat`; `feat` carries
/// one commit to replay. Root: `main` bumps the pointer to the child's
/// `main`; `feat` bumps it to the child's old `feat` tip plus a text commit,
/// so the root rebase hits exactly one gitlink conflict.
struct HierarchyFixture {
    temp: TempDir,
    root: PathBuf,
    child: PathBuf,
    child_feat_old: String,
    root_feat_old: String,
}

fn setup_hierarchy() -> HierarchyFixture {
    let temp = TempDir::new().expect("temp dir");
    let root = temp.path().join("r");
    let child = root.join("libs/c");
    fs::create_dir_all(&child).unwrap();

    init_repo(&root);
    commit_file(&root, "r.txt", "base\n", "r initial");

    init_repo(&child);
    commit_file(&child, "f.txt", "a\n", "c initial");
    let c_init = git(&child, &["rev-parse", "HEAD"]);
    git(&child, &["branch", "feat"]);
    commit_file(&child, "f.txt", "b\n", "c main advance");
    git(&child, &["checkout", "feat"]);
    commit_file(&child, "g.txt", "feature\n", "c feat work");
    let child_feat_old = git(&child, &["rev-parse", "feat"]);

    // Root main: record the gitlink at the child's initial commit, then
    // advance it to the child's main.
    git(&child, &["checkout", &c_init]);
    git(&root, &["add", "libs/c"]);
    git(&root, &["commit", "-m", "r: add c"]);
    git(&root, &["branch", "feat"]);
    git(&child, &["checkout", "main"]);
    git(&root, &["add", "libs/c"]);
    git(&root, &["commit", "-m", "r main: bump c to main"]);

    // Root feat: point at the child's old feat tip, plus a text-only commit.
    git(&root, &["checkout", "feat"]);
    git(&child, &["checkout", "feat"]);
    git(&root, &["add", "libs/c"]);
    git(&root, &["commit", "-m", "r feat: bump c to feat"]);
    commit_file(&root, "r.txt", "base\nfeature\n", "r feat: text");
    let root_feat_old = git(&root, &["rev-parse", "feat"]);

    HierarchyFixture {
        temp,
        root,
        child,
        child_feat_old,
        root_feat_old,
    }
}

// ============================================================================
// Basic CLI tests
// ============================================================================

#[test]
fn test_version_flag() {
    let temp = TempDir::new().unwrap();
    lockstep(temp.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("lockstep-rebase"));
}

#[test]
fn test_help_lists_commands() {
    let temp = TempDir::new().unwrap();
    lockstep(temp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("rebase"))
        .stdout(predicate::str::contains("backups"))
        .stdout(predicate::str::contains("hierarchy"));
}

#[test]
fn test_fails_outside_git_repo() {
    let temp = TempDir::new().unwrap();
    lockstep(temp.path())
        .arg("status")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("not a git repository"));
}

#[test]
fn test_status_single_repo() {
    let temp = setup_single_repo();
    lockstep(temp.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("main"))
        .stdout(predicate::str::contains("clean"));
}

#[test]
fn test_hierarchy_single_repo() {
    let temp = setup_single_repo();
    lockstep(temp.path())
        .args(["hierarchy"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[root]"));
}

#[test]
fn test_hierarchy_json_output() {
    let temp = setup_single_repo();
    let output = lockstep(temp.path())
        .args(["hierarchy", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let json_start = output
        .iter()
        .position(|&b| b == b'[')
        .expect("json array in output");
    let parsed: serde_json::Value = serde_json::from_slice(&output[json_start..]).unwrap();
    assert_eq!(parsed.as_array().unwrap().len(), 1);
    assert_eq!(parsed[0]["is_submodule"], false);
}

#[test]
fn test_rebase_same_branch_is_rejected() {
    let temp = setup_single_repo();
    lockstep(temp.path())
        .args(["rebase", "main", "main", "--no-auto-discovery", "--yes"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("nothing to do"));
}

#[test]
fn test_rebase_missing_branch_is_rejected() {
    let temp = setup_single_repo();
    lockstep(temp.path())
        .args(["rebase", "nope", "main", "--no-auto-discovery", "--yes"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("nope"));
}

#[test]
fn test_validate_reports_success() {
    let temp = setup_single_repo();
    git(temp.path(), &["branch", "feat"]);
    lockstep(temp.path())
        .args(["validate", "feat", "main"])
        .assert()
        .success()
        .stdout(predicate::str::contains("All checks passed"));
}

#[test]
fn test_rebase_dry_run_changes_nothing() {
    let temp = setup_single_repo();
    let base = git(temp.path(), &["rev-parse", "main"]);
    git(temp.path(), &["checkout", "-b", "feat"]);
    commit_file(temp.path(), "feature.txt", "x\n", "feature work");
    git(temp.path(), &["checkout", "main"]);
    commit_file(temp.path(), "main.txt", "y\n", "main work");
    git(temp.path(), &["checkout", "feat"]);
    let feat_tip = git(temp.path(), &["rev-parse", "feat"]);

    lockstep(temp.path())
        .args(["rebase", "feat", "main", "--no-auto-discovery", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Dry run complete"));

    assert_eq!(git(temp.path(), &["rev-parse", "feat"]), feat_tip);
    assert_ne!(git(temp.path(), &["rev-parse", "main"]), base);
    assert_eq!(git(temp.path(), &["for-each-ref", "refs/heads/lockstep"]), "");
}

// ============================================================================
// Hierarchy end-to-end
// ============================================================================

#[test]
fn test_hierarchy_rebase_resolves_pointer_then_restores() {
    let fixture = setup_hierarchy();
    let root = &fixture.root;
    let child = &fixture.child;

    lockstep(root)
        .args(["rebase", "feat", "main", "--no-auto-discovery", "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Rebase completed"))
        .stdout(predicate::str::contains("Auto-resolved submodule pointers"));

    // The child's feat was rewritten on top of its main.
    let child_feat_new = git(child, &["rev-parse", "feat"]);
    assert_ne!(child_feat_new, fixture.child_feat_old);
    let child_main = git(child, &["rev-parse", "main"]);
    git(
        child,
        &["merge-base", "--is-ancestor", &child_main, &child_feat_new],
    );

    // The root's rewritten feat records the NEW child commit in its tree.
    let gitlink = git(root, &["ls-tree", "feat", "--", "libs/c"]);
    assert!(
        gitlink.contains(&child_feat_new),
        "gitlink should point at rebased child: {gitlink}"
    );
    let root_feat_new = git(root, &["rev-parse", "feat"]);
    assert_ne!(root_feat_new, fixture.root_feat_old);

    // One backup per repo, at the pre-rebase tips.
    let root_backups = git(
        root,
        &["for-each-ref", "--format=%(refname:short)", "refs/heads/lockstep/backup"],
    );
    let child_backups = git(
        child,
        &["for-each-ref", "--format=%(refname:short)", "refs/heads/lockstep/backup"],
    );
    assert_eq!(root_backups.lines().count(), 1);
    assert_eq!(child_backups.lines().count(), 1);
    let backup_branch = root_backups.trim();
    assert!(backup_branch.starts_with("lockstep/backup/feat/"));
    assert_eq!(
        git(root, &["rev-parse", backup_branch]),
        fixture.root_feat_old
    );

    let session = backup_branch.rsplit('/').next().unwrap().to_string();

    // Listing finds the session in both repos.
    lockstep(root)
        .args(["backups", "list", "--latest"])
        .assert()
        .success()
        .stdout(predicate::str::contains(&session))
        .stdout(predicate::str::contains("2 repo(s)"));

    // Restore returns every touched branch to its pre-session tip.
    lockstep(root)
        .args(["backups", "restore", "--session-id", &session])
        .assert()
        .success()
        .stdout(predicate::str::contains("restored 'feat'").count(2));

    assert_eq!(git(root, &["rev-parse", "feat"]), fixture.root_feat_old);
    assert_eq!(git(child, &["rev-parse", "feat"]), fixture.child_feat_old);

    // Backups survive the restore and are removed only by delete.
    lockstep(root)
        .args(["backups", "delete", "--session-id", &session])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted 2 backup branch(es)"));
    assert_eq!(git(root, &["for-each-ref", "refs/heads/lockstep"]), "");
    assert_eq!(git(child, &["for-each-ref", "refs/heads/lockstep"]), "");

    drop(fixture.temp);
}

#[test]
fn test_hierarchy_excluding_child_fails_with_backups_kept() {
    let fixture = setup_hierarchy();
    let root = &fixture.root;

    lockstep(root)
        .args([
            "rebase",
            "feat",
            "main",
            "--no-auto-discovery",
            "--yes",
            "--exclude",
            "libs/c",
        ])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("unresolvable submodule conflict"));

    // Root rebase was aborted; its tip is unchanged and a backup remains.
    assert_eq!(git(root, &["rev-parse", "feat"]), fixture.root_feat_old);
    assert!(!root.join(".git/rebase-merge").exists());
    let backups = git(root, &["for-each-ref", "refs/heads/lockstep/backup"]);
    assert!(!backups.is_empty());

    // The excluded child was never touched.
    assert_eq!(
        git(&fixture.child, &["rev-parse", "feat"]),
        fixture.child_feat_old
    );
    assert_eq!(
        git(&fixture.child, &["for-each-ref", "refs/heads/lockstep"]),
        ""
    );
}

#[test]
fn test_hierarchy_command_shows_submodule() {
    let fixture = setup_hierarchy();
    lockstep(&fixture.root)
        .args(["hierarchy"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[root]"))
        .stdout(predicate::str::contains("[submodule (L1)]"));
}
