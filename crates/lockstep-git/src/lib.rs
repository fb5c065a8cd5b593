//! # lockstep-git
//!
//! Git operations gateway for Lockstep Rebase. Every operation shells out to
//! the `git` binary (>= 2.0) against a single repository's worktree and maps
//! the result into typed values. The [`GitGateway`] trait abstracts the
//! gateway so orchestration logic can run against an in-memory fake.

mod error;
mod repository;
mod sha;
mod traits;
mod types;

pub use error::{Error, Result};
pub use repository::Repository;
pub use sha::Sha;
pub use traits::GitGateway;
pub use types::{AheadBehind, ConflictSet, RebaseOutcome, SubmoduleConflict, SubmoduleEntry};
