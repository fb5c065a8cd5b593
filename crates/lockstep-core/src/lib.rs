//! # lockstep-core
//!
//! Core engine for Lockstep Rebase: hierarchy discovery, commit-hash
//! tracking, submodule conflict auto-resolution, and session orchestration.
//!
//! # Architecture
//!
//! The orchestrator is generic over a [`GatewayFactory`], so every scenario
//! can run against in-memory fake gateways; production wires in
//! [`SystemGateways`] which shells out to git via `lockstep-git`. Human
//! interaction points are abstracted behind [`UserAgent`]; the orchestrator
//! validates every answer's post-conditions itself.

pub mod backup;
mod error;
mod gateway;
pub mod hierarchy;
mod plan;
mod prompt;
mod resolver;
mod tracker;

mod orchestrator;

pub use backup::{backup_branch_name, parse_backup_branch, BackupEntry, BackupRef, BACKUP_PREFIX};
pub use error::{Error, Result};
pub use gateway::{GatewayFactory, SystemGateways};
pub use hierarchy::{discover, Hierarchy, HierarchyEntry, RepoId, RepoNode, SubmoduleLink};
pub use orchestrator::{
    PushOutcome, RebaseOrchestrator, RepoStatus, RestoreOutcome, SessionReport, SessionResolution,
    SessionStatus,
};
pub use plan::{BranchMapEntry, Plan, PlanOptions, RepoTask, SessionId};
pub use prompt::{ConflictAction, NoOpAgent, SubmoduleDecision, UserAgent};
pub use resolver::{ConflictResolver, PointerResolution, ResolveStep};
pub use tracker::{CommitTracker, SessionTrackers};
