//! `status` command - per-repository state of the hierarchy.

use std::path::Path;

use anyhow::Result;

use crate::commands::utils;
use crate::output;

pub fn run(repo_path: Option<&Path>, json: bool) -> Result<()> {
    let orch = utils::open_orchestrator(repo_path)?;
    let statuses = orch.repo_statuses();

    if json {
        println!("{}", serde_json::to_string_pretty(&statuses)?);
        return Ok(());
    }

    output::info("Repository status");
    for status in &statuses {
        let branch = status.current_branch.as_deref().unwrap_or("(detached)");
        let state = if status.rebasing { "rebasing" } else { "clean" };
        let path = if status.rel_path.is_empty() {
            "."
        } else {
            &status.rel_path
        };
        output::detail(&format!(
            "{:<24} {:<20} {:<10} {} [{}]",
            status.name,
            branch,
            state,
            path,
            output::repo_kind(status.is_submodule, status.depth)
        ));
    }
    Ok(())
}
