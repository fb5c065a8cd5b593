//! CLI surface definition and command modules.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

pub mod backups;
pub mod hierarchy;
pub mod rebase;
pub mod status;
pub mod utils;
pub mod validate;

#[derive(Parser)]
#[command(
    name = "lockstep-rebase",
    version,
    about = "Coordinated rebases across a tree of git repositories linked by submodules"
)]
pub struct Cli {
    /// Enable console logging (file logging is always on).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run against this repository instead of the current directory.
    #[arg(long, global = true, value_name = "DIR")]
    pub repo_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Rebase SOURCE onto TARGET across the submodule hierarchy.
    Rebase(RebaseArgs),

    /// Show the status of every repository in the hierarchy.
    Status {
        /// Emit JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Display the discovered repository hierarchy.
    Hierarchy {
        /// Emit JSON instead of a tree.
        #[arg(long)]
        json: bool,
    },

    /// Check that branches exist and worktrees are ready, without rebasing.
    Validate {
        /// Branch to rebase.
        source: String,
        /// Branch to rebase onto.
        target: String,
    },

    /// Manage session backup branches.
    Backups {
        #[command(subcommand)]
        command: BackupsCommands,
    },
}

#[derive(Args)]
pub struct RebaseArgs {
    /// Branch to rebase.
    pub source: String,

    /// Branch to rebase onto.
    pub target: String,

    /// Plan and validate only; run no mutating git command.
    #[arg(long)]
    pub dry_run: bool,

    /// Proceed despite validation warnings.
    #[arg(long)]
    pub force: bool,

    /// Skip the confirmation prompt (also skips post-run offers).
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Enable every repository instead of discovering changed submodules.
    #[arg(long)]
    pub no_auto_discovery: bool,

    /// Accept every auto-discovery suggestion without prompting.
    #[arg(long)]
    pub auto_select_submodules: bool,

    /// Offer a --force-with-lease push per rewritten branch afterwards.
    #[arg(long)]
    pub offer_force_push: bool,

    /// Restrict the plan to these repositories (name or path). Repeatable.
    #[arg(long, value_name = "REPO")]
    pub include: Vec<String>,

    /// Exclude these repositories unconditionally. Repeatable.
    #[arg(long, value_name = "REPO")]
    pub exclude: Vec<String>,

    /// Per-repo branch override, as repo=SRC[:TGT]. Repeatable.
    #[arg(long, value_name = "MAP")]
    pub branch_map: Vec<String>,

    /// Emit a JSON summary on success.
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum BackupsCommands {
    /// List backup branches across the hierarchy.
    List {
        /// Only backups of this original branch.
        #[arg(long)]
        original_branch: Option<String>,
        /// Only backups of this session.
        #[arg(long)]
        session_id: Option<String>,
        /// Only the most recent session.
        #[arg(long)]
        latest: bool,
        /// Emit JSON instead of a tree.
        #[arg(long)]
        json: bool,
    },

    /// Delete backup branches.
    Delete {
        /// Backup branch to delete (repeatable).
        #[arg(long = "branch", value_name = "BRANCH")]
        branch: Vec<String>,
        /// Delete every backup branch in the hierarchy.
        #[arg(long)]
        all: bool,
        /// Delete all backups of this session.
        #[arg(long)]
        session_id: Option<String>,
        /// Delete the most recent session's backups.
        #[arg(long)]
        latest: bool,
    },

    /// Restore original branches from a session's backups.
    Restore {
        /// Original branch to restore (all branches of the session if omitted).
        original_branch: Option<String>,
        /// Session to restore from.
        #[arg(long)]
        session_id: Option<String>,
        /// Use the most recent session.
        #[arg(long)]
        latest: bool,
    },
}
