//! s3sync core library: domain types, configuration and errors.
//!
//! Public API surface:
//! - [`types`]: fingerprints, directions, path kinds, sync scopes
//! - [`config`]: [`SyncConfig`] resolution and project-root discovery
//! - [`error`]: [`ConfigError`]

pub mod config;
pub mod error;
pub mod types;

pub use config::{ConfigOverrides, ExcludeRules, SyncConfig};
pub use error::ConfigError;
pub use types::{Direction, Fingerprint, PathKind, SyncScope};
