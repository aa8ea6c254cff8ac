//! Project path → (local path, remote prefix, scope).
//!
//! Kind decision order for a project-relative path:
//!
//! 1. It exists locally: use the actual type.
//! 2. The last segment has a non-empty extension and the path has no `/`:
//!    a file.
//! 3. Anything else: a directory.

use std::path::PathBuf;

use serde::Serialize;

use s3sync_core::config::normalize_prefix;
use s3sync_core::{PathKind, SyncConfig, SyncScope};

/// Everything the engine needs to know about one requested path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathTarget {
    /// Normalized project-relative path (`/`-separated, no leading slash).
    pub project_path: String,
    pub local_path: PathBuf,
    pub kind: PathKind,
    /// Prefix of the remote directory holding the target.
    pub remote_prefix: String,
    pub scope: SyncScope,
    pub existed_locally: bool,
}

#[derive(Debug, Clone)]
pub struct PathMapper {
    project_root: PathBuf,
    base_prefix: String,
    prefix_override: Option<String>,
}

impl PathMapper {
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            project_root: config.project_root.clone(),
            base_prefix: config.prefix.clone(),
            prefix_override: None,
        }
    }

    /// Replace the computed remote prefix with `prefix` for every path.
    pub fn with_prefix_override(mut self, prefix: Option<&str>) -> Self {
        self.prefix_override = prefix.map(normalize_prefix);
        self
    }

    pub fn map(&self, project_path: &str) -> PathTarget {
        let rel = normalize_project_path(project_path);
        let local_path = if rel.is_empty() {
            self.project_root.clone()
        } else {
            self.project_root.join(&rel)
        };

        let meta = std::fs::metadata(&local_path).ok();
        let existed_locally = meta.is_some();
        let kind = match meta {
            Some(m) if m.is_file() => PathKind::File,
            Some(_) => PathKind::Directory,
            None => guess_kind(&rel),
        };

        let name = rel.rsplit('/').next().unwrap_or_default();

        let (remote_prefix, scope) = match kind {
            PathKind::Directory => {
                let prefix = match &self.prefix_override {
                    Some(p) => p.clone(),
                    None if rel.is_empty() => self.base_prefix.clone(),
                    None => format!("{}{}/", self.base_prefix, rel),
                };
                (prefix.clone(), SyncScope::directory(prefix))
            }
            PathKind::File => {
                // Files land directly under the base prefix, whatever their
                // local directory.
                let prefix = match &self.prefix_override {
                    Some(p) => p.clone(),
                    None => self.base_prefix.clone(),
                };
                let key = format!("{prefix}{name}");
                (prefix, SyncScope::file(key))
            }
        };

        tracing::debug!(
            "mapped {} as {kind} -> {}",
            if rel.is_empty() { "." } else { &rel },
            scope.remote_prefix
        );

        PathTarget {
            project_path: rel,
            local_path,
            kind,
            remote_prefix,
            scope,
            existed_locally,
        }
    }
}

/// Strip leading separators, turn `\` into `/` and drop `.` / empty segments.
pub fn normalize_project_path(path: &str) -> String {
    path.replace('\\', "/")
        .split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .collect::<Vec<_>>()
        .join("/")
}

fn guess_kind(rel: &str) -> PathKind {
    if rel.contains('/') {
        return PathKind::Directory;
    }
    match rel.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => PathKind::File,
        _ => PathKind::Directory,
    }
}
