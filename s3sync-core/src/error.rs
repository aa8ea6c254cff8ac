//! Error types for s3sync-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise while resolving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure, with the offending path.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error on load, with file path and line context from serde_yaml.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// Neither the config file nor the CLI supplied a bucket.
    #[error("no bucket configured; set `bucket` in {file} or pass --bucket")]
    MissingBucket { file: &'static str },

    /// No ancestor of `start` carries a project marker.
    #[error("could not find project root above {start} (looked for {markers})")]
    ProjectRootNotFound { start: PathBuf, markers: String },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ConfigError {
    ConfigError::Io {
        path: path.into(),
        source,
    }
}
