//! Shared command helpers.

use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use lockstep_core::{RebaseOrchestrator, SystemGateways};

/// Marker error for a user interrupt (Ctrl-C at a prompt); mapped to exit
/// code 130 in `main`.
#[derive(Debug)]
pub struct Interrupted;

impl fmt::Display for Interrupted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("interrupted")
    }
}

impl std::error::Error for Interrupted {}

/// Discover the hierarchy around `repo_path` (or the current directory) and
/// open real gateways for it.
pub fn open_orchestrator(repo_path: Option<&Path>) -> Result<RebaseOrchestrator<SystemGateways>> {
    let start = match repo_path {
        Some(path) => path.to_path_buf(),
        None => std::env::current_dir().context("cannot determine current directory")?,
    };
    Ok(RebaseOrchestrator::discover(&SystemGateways, &start)?)
}
