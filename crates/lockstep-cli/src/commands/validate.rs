//! `validate` command - preflight checks without any mutation.

use std::path::Path;

use anyhow::Result;

use lockstep_core::{NoOpAgent, PlanOptions};

use crate::commands::utils;
use crate::output;

pub fn run(repo_path: Option<&Path>, source: &str, target: &str) -> Result<()> {
    let mut orch = utils::open_orchestrator(repo_path)?;

    output::info(&format!("Validating rebase of '{source}' onto '{target}'"));

    // NoOpAgent declines interactive fixes, so anything that would need a
    // prompt (e.g. a remote-only branch) surfaces as a validation failure.
    let options = PlanOptions {
        source: source.to_string(),
        target: target.to_string(),
        ..PlanOptions::default()
    };
    let plan = orch.plan(&options, &NoOpAgent)?;
    orch.validate(&plan)?;

    output::success(&format!(
        "All checks passed for {} repositories",
        plan.enabled_count()
    ));
    Ok(())
}
