//! `backups` subcommands: list, delete, restore.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{bail, Result};

use lockstep_core::BackupEntry;

use crate::commands::utils;
use crate::output;

pub fn list(
    repo_path: Option<&Path>,
    original_branch: Option<&str>,
    session_id: Option<&str>,
    latest: bool,
    json: bool,
) -> Result<()> {
    let orch = utils::open_orchestrator(repo_path)?;
    let entries = select_entries(&orch, original_branch, session_id, latest)?;

    if entries.is_empty() {
        output::info("No backup branches found.");
        return Ok(());
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    // Group session -> original branch -> repos for a compact view.
    let mut sessions: BTreeMap<&str, BTreeMap<&str, Vec<&BackupEntry>>> = BTreeMap::new();
    for entry in &entries {
        sessions
            .entry(entry.session.as_str())
            .or_default()
            .entry(entry.original_branch.as_str())
            .or_default()
            .push(entry);
    }

    for (session, branches) in sessions.iter().rev() {
        output::info(&format!("Session {session}"));
        for (original, repos) in branches {
            let repo_list: Vec<&str> = repos.iter().map(|e| e.repo.as_str()).collect();
            output::detail(&format!(
                "{original} -> {} ({} repo(s): {})",
                repos[0].backup_branch,
                repos.len(),
                repo_list.join(", ")
            ));
        }
    }
    Ok(())
}

pub fn delete(
    repo_path: Option<&Path>,
    branches: &[String],
    all: bool,
    session_id: Option<&str>,
    latest: bool,
) -> Result<()> {
    let orch = utils::open_orchestrator(repo_path)?;

    let entries = if all {
        orch.list_backups(None, None)?
    } else if session_id.is_some() || latest {
        select_entries(&orch, None, session_id, latest)?
    } else if !branches.is_empty() {
        orch.list_backups(None, None)?
            .into_iter()
            .filter(|e| branches.iter().any(|b| *b == e.backup_branch))
            .collect()
    } else {
        bail!("nothing selected: pass --branch, --session-id, --latest or --all");
    };

    if entries.is_empty() {
        output::info("No matching backup branches.");
        return Ok(());
    }

    let mut deleted = 0;
    for entry in &entries {
        match orch.delete_backup(&entry.repo_rel_path, &entry.backup_branch) {
            Ok(()) => deleted += 1,
            Err(e) => output::warn(&format!("could not delete {}: {e}", entry.backup_branch)),
        }
    }
    output::success(&format!("Deleted {deleted} backup branch(es)"));
    Ok(())
}

pub fn restore(
    repo_path: Option<&Path>,
    original_branch: Option<&str>,
    session_id: Option<&str>,
    latest: bool,
) -> Result<()> {
    let orch = utils::open_orchestrator(repo_path)?;

    let session = match session_id {
        Some(session) => session.to_string(),
        None if latest || original_branch.is_some() => {
            let entries = orch.list_backups(original_branch, None)?;
            match entries.into_iter().map(|e| e.session).max() {
                Some(session) => session,
                None => {
                    output::info("No matching backups found.");
                    return Ok(());
                }
            }
        }
        None => bail!("specify ORIGINAL_BRANCH, --session-id or --latest"),
    };

    let outcome = orch.restore(original_branch, &session);

    for (repo, branch) in &outcome.restored {
        output::success(&format!("{repo}: restored '{branch}'"));
    }
    for (repo, error) in &outcome.failed {
        output::warn(&format!("{repo}: restore failed: {error}"));
    }
    if outcome.restored.is_empty() && outcome.failed.is_empty() {
        output::info("No matching backups found.");
    } else {
        output::detail(&format!(
            "session {session}: {} restored, {} repo(s) without a matching backup",
            outcome.restored.len(),
            outcome.missing.len()
        ));
    }
    Ok(())
}

fn select_entries(
    orch: &lockstep_core::RebaseOrchestrator<lockstep_core::SystemGateways>,
    original_branch: Option<&str>,
    session_id: Option<&str>,
    latest: bool,
) -> Result<Vec<BackupEntry>> {
    let entries = orch.list_backups(original_branch, session_id)?;
    if session_id.is_none() && latest {
        let Some(newest) = entries.iter().map(|e| e.session.clone()).max() else {
            return Ok(vec![]);
        };
        return Ok(entries.into_iter().filter(|e| e.session == newest).collect());
    }
    Ok(entries)
}
