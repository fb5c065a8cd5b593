//! Interactive prompt implementation of the core's `UserAgent`.
//!
//! Every method degrades safely when no terminal is attached: the answer is
//! the conservative default (decline / abort), never a hang.

use colored::Colorize;
use inquire::{Confirm, Select, Text};
use lockstep_core::{ConflictAction, SubmoduleDecision, UserAgent};

use crate::output;

/// Sentinel word the user types once file conflicts are resolved and staged.
const DONE_WORD: &str = "done";

pub struct InquireAgent;

impl UserAgent for InquireAgent {
    fn confirm_remote_branch_create(&self, repo: &str, branch: &str, remote: &str) -> bool {
        Confirm::new(&format!(
            "{repo}: branch '{branch}' exists only on {remote}. Create a local branch from {remote}/{branch}?"
        ))
        .with_default(true)
        .prompt()
        .unwrap_or(false)
    }

    fn choose_submodule(
        &self,
        submodule_path: &str,
        suggested_source: &str,
        suggested_target: &str,
    ) -> SubmoduleDecision {
        output::info(&format!(
            "Submodule '{submodule_path}' changed pointer ({} -> {})",
            suggested_source.cyan(),
            suggested_target.cyan()
        ));
        let options = vec![
            format!("Include ({suggested_source} -> {suggested_target})"),
            "Include with different branches".to_string(),
            "Exclude".to_string(),
        ];
        let choice = Select::new("Rebase this submodule too?", options)
            .with_starting_cursor(0)
            .prompt();
        match choice.as_deref() {
            Ok(answer) if answer.starts_with("Include with") => {
                let source = Text::new("Source branch:")
                    .with_initial_value(suggested_source)
                    .prompt()
                    .unwrap_or_else(|_| suggested_source.to_string());
                let target = Text::new("Target branch:")
                    .with_initial_value(suggested_target)
                    .prompt()
                    .unwrap_or_else(|_| suggested_target.to_string());
                SubmoduleDecision::IncludeWith { source, target }
            }
            Ok(answer) if answer.starts_with("Include") => SubmoduleDecision::Include,
            _ => SubmoduleDecision::Exclude,
        }
    }

    fn await_file_conflict_resolution(&self, repo: &str, files: &[String]) -> ConflictAction {
        output::warn(&format!("{repo}: file conflicts need manual resolution:"));
        for file in files {
            output::detail(file);
        }
        output::detail("Resolve them in another terminal, stage with `git add`,");
        output::detail(&format!("then type '{DONE_WORD}' here (or 'abort' to abort)."));
        loop {
            match Text::new("Status:").prompt() {
                Ok(answer) if answer.trim().eq_ignore_ascii_case(DONE_WORD) => {
                    return ConflictAction::Resolved;
                }
                Ok(answer) if answer.trim().eq_ignore_ascii_case("abort") => {
                    return ConflictAction::Abort;
                }
                Ok(_) => output::detail(&format!("type '{DONE_WORD}' or 'abort'")),
                Err(_) => return ConflictAction::Abort,
            }
        }
    }

    fn confirm_force_push(&self, branch: &str, ahead: usize, behind: usize, phrase: &str) -> bool {
        output::warn(&format!(
            "'{branch}' diverges from origin: {ahead} ahead, {behind} behind"
        ));
        output::detail(&format!("type '{phrase}' to push with --force-with-lease"));
        matches!(Text::new("Confirm:").prompt(), Ok(answer) if answer.trim() == phrase)
    }
}
