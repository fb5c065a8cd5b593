//! Gateway construction abstraction.
//!
//! Discovery and orchestration open one gateway per repository in the
//! hierarchy. Abstracting construction behind a factory lets the whole
//! pipeline, including discovery itself, run against in-memory fakes.

use std::path::Path;

use lockstep_git::{GitGateway, Repository};

/// Opens gateways for repositories by filesystem path.
pub trait GatewayFactory {
    /// The gateway type produced by this factory.
    type Gateway: GitGateway;

    /// Open the repository containing `path`, walking up as git does.
    fn discover(&self, path: &Path) -> lockstep_git::Result<Self::Gateway>;

    /// Open a repository whose worktree root is exactly `path`.
    fn open(&self, path: &Path) -> lockstep_git::Result<Self::Gateway>;
}

/// Factory producing real subprocess-backed gateways.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemGateways;

impl GatewayFactory for SystemGateways {
    type Gateway = Repository;

    fn discover(&self, path: &Path) -> lockstep_git::Result<Repository> {
        Repository::discover(path)
    }

    fn open(&self, path: &Path) -> lockstep_git::Result<Repository> {
        Repository::open(path)
    }
}
