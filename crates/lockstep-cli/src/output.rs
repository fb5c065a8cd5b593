//! Terminal output formatting utilities.

use colored::Colorize;

/// Print a success message.
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print an error message.
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a warning message.
pub fn warn(msg: &str) {
    println!("{} {}", "!".yellow(), msg);
}

/// Print an info message.
pub fn info(msg: &str) {
    println!("{} {}", "→".blue(), msg);
}

/// Print a dimmed detail line.
pub fn detail(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Print a horizontal line.
pub fn hr() {
    println!("{}", "─".repeat(50).dimmed());
}

/// A short colored sha for display.
#[must_use]
pub fn short_sha(sha: &lockstep_git::Sha) -> String {
    sha.short().cyan().to_string()
}

/// Repo kind tag for hierarchy and status tables.
#[must_use]
pub fn repo_kind(is_submodule: bool, depth: usize) -> String {
    if is_submodule {
        format!("submodule (L{depth})")
    } else {
        "root".to_string()
    }
}
