//! `rebase` command - the lockstep rebase itself.

use std::path::Path;

use anyhow::Result;
use inquire::{Confirm, InquireError};
use serde::Serialize;

use lockstep_core::{BranchMapEntry, PlanOptions, SessionResolution};
use lockstep_git::GitGateway;

use crate::commands::utils::{self, Interrupted};
use crate::output;
use crate::prompts::InquireAgent;

use super::RebaseArgs;

/// JSON output for a completed rebase.
#[derive(Debug, Serialize)]
struct RebaseOutput<'a> {
    status: &'static str,
    session_id: String,
    repos: Vec<String>,
    resolutions: &'a [SessionResolution],
}

pub fn run(repo_path: Option<&Path>, args: &RebaseArgs) -> Result<()> {
    let mut orch = utils::open_orchestrator(repo_path)?;

    output::info(&format!(
        "Discovered {} repositories under '{}'",
        orch.hierarchy().len(),
        orch.hierarchy().node(orch.hierarchy().root()).name
    ));
    for entry in orch.hierarchy().entries() {
        let indent = "  ".repeat(entry.depth);
        output::detail(&format!(
            "{indent}{} [{}]",
            entry.name,
            output::repo_kind(entry.is_submodule, entry.depth)
        ));
    }

    let mut branch_map = Vec::with_capacity(args.branch_map.len());
    for raw in &args.branch_map {
        branch_map.push(BranchMapEntry::parse(raw)?);
    }

    let options = PlanOptions {
        source: args.source.clone(),
        target: args.target.clone(),
        include: args.include.clone(),
        exclude: args.exclude.clone(),
        branch_map,
        auto_discover: !args.no_auto_discovery,
        auto_select_submodules: args.auto_select_submodules,
    };

    let agent = InquireAgent;
    let plan = orch.plan(&options, &agent)?;

    output::hr();
    output::info(&format!(
        "Rebase plan for session {} ({} mode)",
        plan.session_id,
        if plan.auto_discovered {
            "auto-discovery"
        } else {
            "manual"
        }
    ));
    for (index, task) in plan.enabled().enumerate() {
        let node = orch.hierarchy().node(task.repo);
        let commits = orch
            .gateway(task.repo)
            .commits_between(&task.target, &task.source)
            .map(|c| c.len())
            .unwrap_or(0);
        output::detail(&format!(
            "{}. {} : {} -> {} ({} commit{})",
            index + 1,
            node.label(),
            task.source,
            task.target,
            commits,
            if commits == 1 { "" } else { "s" }
        ));
    }

    match orch.validate(&plan) {
        Ok(()) => {}
        Err(e) if args.force => {
            output::warn(&format!("validation warning (continuing with --force): {e}"));
        }
        Err(e) => return Err(e.into()),
    }

    if args.dry_run {
        output::info("Dry run complete - no changes made");
        return Ok(());
    }

    if !args.yes {
        let proceed = Confirm::new(&format!(
            "Proceed with the rebase across {} repositories?",
            plan.enabled_count()
        ))
        .with_default(false)
        .prompt();
        match proceed {
            Ok(true) => {}
            Ok(false) => {
                output::info("Operation cancelled.");
                return Ok(());
            }
            Err(InquireError::OperationInterrupted | InquireError::OperationCanceled) => {
                return Err(Interrupted.into());
            }
            Err(e) => return Err(e.into()),
        }
    }

    let session = plan.session_id.clone();
    let report = match orch.execute(&plan, &agent) {
        Ok(report) => report,
        Err(e) => {
            for task in plan.enabled() {
                let Some(tracker) = orch.trackers().get(task.repo) else {
                    continue;
                };
                let node = orch.hierarchy().node(task.repo);
                if let Some((old, new)) = tracker.mappings().last() {
                    output::detail(&format!(
                        "{}: {}/{} commits mapped (last {} -> {})",
                        node.label(),
                        tracker.recorded(),
                        tracker.expected().len(),
                        old.short(),
                        new.short()
                    ));
                }
            }
            output::warn(&format!(
                "Backups from session {session} remain; restore with \
                 `lockstep-rebase backups restore --session-id {session}`"
            ));
            return Err(e.into());
        }
    };

    output::success(&format!(
        "Rebase completed across {} repositories (session {session})",
        report.completed.len()
    ));

    if !orch.resolutions().is_empty() {
        output::info("Auto-resolved submodule pointers:");
        for resolution in orch.resolutions() {
            let mismatch = if resolution.message_mismatch {
                " [subject changed]"
            } else {
                ""
            };
            output::detail(&format!(
                "{}/{} : {} -> {} {}{}",
                resolution.repo,
                resolution.submodule_path,
                output::short_sha(&resolution.old_sha),
                output::short_sha(&resolution.new_sha),
                resolution.subject.as_deref().unwrap_or(""),
                mismatch
            ));
        }
    }

    if args.offer_force_push {
        let outcomes = orch.offer_force_push(&report, &agent)?;
        for outcome in &outcomes {
            if outcome.pushed {
                output::success(&format!("pushed '{}' with lease", outcome.branch));
            } else {
                output::detail(&format!(
                    "'{}' not pushed ({} ahead, {} behind)",
                    outcome.branch, outcome.ahead, outcome.behind
                ));
            }
        }
    }

    if args.json {
        let json = RebaseOutput {
            status: "completed",
            session_id: session.to_string(),
            repos: report
                .completed
                .iter()
                .map(|&id| orch.hierarchy().node(id).label().to_string())
                .collect(),
            resolutions: orch.resolutions(),
        };
        println!("{}", serde_json::to_string_pretty(&json)?);
    }

    if args.yes {
        output::detail(&format!(
            "Backups kept; manage them with `lockstep-rebase backups list --session-id {session}`"
        ));
    } else {
        offer_backup_cleanup(&orch, &session.to_string())?;
    }

    Ok(())
}

/// Offer to delete this session's backup branches.
fn offer_backup_cleanup(
    orch: &lockstep_core::RebaseOrchestrator<lockstep_core::SystemGateways>,
    session: &str,
) -> Result<()> {
    let entries = orch.list_backups(None, Some(session))?;
    if entries.is_empty() {
        return Ok(());
    }
    let delete = Confirm::new(&format!(
        "Delete the {} backup branch(es) created for this session?",
        entries.len()
    ))
    .with_default(false)
    .prompt()
    .unwrap_or(false);

    if delete {
        let mut deleted = 0;
        for entry in &entries {
            match orch.delete_backup(&entry.repo_rel_path, &entry.backup_branch) {
                Ok(()) => deleted += 1,
                Err(e) => output::warn(&format!("could not delete {}: {e}", entry.backup_branch)),
            }
        }
        output::success(&format!("Deleted {deleted} backup branch(es)"));
    } else {
        output::detail("Keeping backups; manage them with `lockstep-rebase backups`");
    }
    Ok(())
}
