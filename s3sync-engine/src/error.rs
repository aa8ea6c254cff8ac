//! Error types for s3sync-engine.

use std::path::PathBuf;

use thiserror::Error;

use s3sync_core::ConfigError;

/// Failures reported by an [`ObjectStore`](crate::store::ObjectStore).
#[derive(Debug, Error)]
pub enum StoreError {
    /// The key does not exist.
    #[error("object not found: {key}")]
    NotFound { key: String },

    /// Any backend failure (permission denied, missing bucket, network).
    #[error("{0}")]
    Backend(String),

    /// Local file I/O while uploading or downloading.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<opendal::Error> for StoreError {
    fn from(err: opendal::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

/// All errors that can arise from sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// An error from configuration resolution.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Listing or probing a scope failed outright; aborts that path only.
    #[error("cannot list {prefix}: {source}")]
    Listing {
        prefix: String,
        #[source]
        source: StoreError,
    },

    /// An error from the object store outside of listing.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Convenience constructor for [`StoreError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.into(),
        source,
    }
}
