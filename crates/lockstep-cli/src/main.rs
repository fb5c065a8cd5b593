//! Lockstep Rebase CLI - coordinated rebases across a git submodule hierarchy.

use clap::Parser;

mod commands;
mod logging;
mod output;
mod prompts;

use commands::{BackupsCommands, Cli, Commands};
use commands::utils::Interrupted;

fn main() {
    // Respect NO_COLOR environment variable (https://no-color.org/)
    if std::env::var("NO_COLOR").is_ok() {
        colored::control::set_override(false);
    }

    let cli = Cli::parse();

    match logging::init(cli.verbose) {
        Ok(log_path) => {
            if !cli.verbose {
                output::detail(&format!(
                    "Logs are written to {} (use --verbose for console logs)",
                    log_path.display()
                ));
            }
        }
        Err(e) => output::warn(&format!("logging disabled: {e}")),
    }

    let repo_path = cli.repo_path.as_deref();
    let result = match cli.command {
        Commands::Rebase(opts) => commands::rebase::run(repo_path, &opts),
        Commands::Status { json } => commands::status::run(repo_path, json),
        Commands::Hierarchy { json } => commands::hierarchy::run(repo_path, json),
        Commands::Validate { source, target } => {
            commands::validate::run(repo_path, &source, &target)
        }
        Commands::Backups { command } => match command {
            BackupsCommands::List {
                original_branch,
                session_id,
                latest,
                json,
            } => commands::backups::list(
                repo_path,
                original_branch.as_deref(),
                session_id.as_deref(),
                latest,
                json,
            ),
            BackupsCommands::Delete {
                branch,
                all,
                session_id,
                latest,
            } => commands::backups::delete(repo_path, &branch, all, session_id.as_deref(), latest),
            BackupsCommands::Restore {
                original_branch,
                session_id,
                latest,
            } => commands::backups::restore(
                repo_path,
                original_branch.as_deref(),
                session_id.as_deref(),
                latest,
            ),
        },
    };

    if let Err(e) = result {
        if e.downcast_ref::<Interrupted>().is_some() {
            output::warn("Operation cancelled by user");
            std::process::exit(130);
        }
        output::error(&format!("{e:#}"));
        let code = match e.downcast_ref::<lockstep_core::Error>() {
            Some(core_err) if !core_err.is_pre_write() => 2,
            _ => 1,
        };
        std::process::exit(code);
    }
}
