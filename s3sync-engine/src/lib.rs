//! # s3sync-engine
//!
//! Content-addressed reconciliation between a local tree and an object-store
//! prefix.
//!
//! Build a [`SyncOrchestrator`] over an [`ObjectStore`] and a [`Confirm`]
//! implementation, then call [`SyncOrchestrator::run`] with the project
//! paths to push or pull.

pub mod confirm;
pub mod content_type;
pub mod diff;
pub mod error;
pub mod executor;
pub mod hasher;
pub mod path_map;
pub mod pipeline;
pub mod plan;
pub mod remote;
pub mod rename;
pub mod report;
pub mod scanner;
pub mod store;

pub use confirm::{Confirm, ScriptedConfirm};
pub use diff::{diff_trees, DiffResult};
pub use error::{StoreError, SyncError};
pub use executor::{DeletionGate, SyncExecutor};
pub use path_map::{PathMapper, PathTarget};
pub use pipeline::{ConfirmMode, RunReport, SyncOptions, SyncOrchestrator};
pub use plan::{build_plan, PlanItem, PlannedRename, SyncPlan};
pub use remote::{list_remote, RemoteObject, RemoteTree};
pub use rename::RenameCandidate;
pub use report::{format_size, Outcome, PathReport, PathStatus, Tally};
pub use scanner::{scan, FileRecord, LocalTree};
pub use store::{MemoryStore, ObjectStore, ObjectSummary, OpendalStore};
