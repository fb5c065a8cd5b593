//! `hierarchy` command - render the discovered repository tree.

use std::path::Path;

use anyhow::Result;

use crate::commands::utils;
use crate::output;

pub fn run(repo_path: Option<&Path>, json: bool) -> Result<()> {
    let orch = utils::open_orchestrator(repo_path)?;
    let entries = orch.hierarchy().entries();

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    output::info("Repository hierarchy");
    for entry in &entries {
        let indent = "  ".repeat(entry.depth);
        output::detail(&format!(
            "{indent}{} [{}]",
            entry.name,
            output::repo_kind(entry.is_submodule, entry.depth)
        ));
    }

    let uninitialized = orch.hierarchy().uninitialized();
    if !uninitialized.is_empty() {
        for (parent, path) in uninitialized {
            let parent = orch.hierarchy().node(*parent);
            output::warn(&format!(
                "{}: submodule '{path}' is not initialized",
                parent.label()
            ));
        }
    }
    Ok(())
}
