//! Project configuration.
//!
//! # File layout
//!
//! ```text
//! <project_root>/
//!   .s3sync.yaml      bucket, prefix, region, default paths, exclusions
//!   index.html        fallback project marker
//! ```
//!
//! # API pattern
//!
//! - `load_at(root, overrides)` reads `<root>/.s3sync.yaml` (if present),
//!   applies CLI overrides and validates the result.
//! - `find_project_root_from(start)` walks up from `start`.
//!
//! The resolved [`SyncConfig`] is built once per process and passed
//! explicitly to every component.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{io_err, ConfigError};

/// Name of the per-project configuration file.
pub const CONFIG_FILE_NAME: &str = ".s3sync.yaml";

/// Files whose presence marks a project root, checked in order.
pub const PROJECT_MARKERS: &[&str] = &[CONFIG_FILE_NAME, "index.html"];

pub const DEFAULT_REGION: &str = "us-east-1";

// ---------------------------------------------------------------------------
// Exclusion rules
// ---------------------------------------------------------------------------

/// Names and extensions that are never scanned, compared, transferred or
/// deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExcludeRules {
    /// Exact file names, e.g. `README.md`.
    pub files: BTreeSet<String>,
    /// Extensions including the leading dot, matched case-insensitively.
    pub extensions: BTreeSet<String>,
    /// Directory names pruned wherever they appear in a tree.
    pub dirs: BTreeSet<String>,
}

impl Default for ExcludeRules {
    fn default() -> Self {
        Self {
            files: [".s3-sync-metadata.json", "generate-index.js", "README.md"]
                .into_iter()
                .map(String::from)
                .collect(),
            extensions: [".psd"].into_iter().map(String::from).collect(),
            dirs: ["archive"].into_iter().map(String::from).collect(),
        }
    }
}

impl ExcludeRules {
    /// Rules that exclude nothing.
    pub fn none() -> Self {
        Self {
            files: BTreeSet::new(),
            extensions: BTreeSet::new(),
            dirs: BTreeSet::new(),
        }
    }

    /// Lowercase extensions and make sure each carries a leading dot.
    fn normalized(mut self) -> Self {
        self.extensions = self
            .extensions
            .into_iter()
            .filter(|e| !e.trim().is_empty())
            .map(|e| {
                let e = e.trim().to_ascii_lowercase();
                if e.starts_with('.') {
                    e
                } else {
                    format!(".{e}")
                }
            })
            .collect();
        self
    }

    /// `true` if a directory with this name must not be descended into.
    pub fn excludes_dir(&self, name: &str) -> bool {
        self.dirs.contains(name)
    }

    /// `true` if a file with this base name is skipped by name or extension.
    pub fn excludes_file(&self, name: &str) -> bool {
        if self.files.contains(name) {
            return true;
        }
        match extension_of(name) {
            Some(ext) => self.extensions.contains(&ext),
            None => false,
        }
    }

    /// `true` if a `/`-separated relative path is excluded, either through
    /// one of its directory components or through its file name.
    pub fn excludes_relative(&self, rel_path: &str) -> bool {
        let mut segments: Vec<&str> = rel_path.split('/').filter(|s| !s.is_empty()).collect();
        let Some(name) = segments.pop() else {
            return false;
        };
        segments.iter().any(|d| self.excludes_dir(d)) || self.excludes_file(name)
    }
}

/// Lowercased extension with leading dot; `None` for dotfiles and bare names.
fn extension_of(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// On-disk shape of `.s3sync.yaml`; every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub bucket: Option<String>,
    pub prefix: Option<String>,
    pub region: Option<String>,
    pub endpoint: Option<String>,
    pub fs_root: Option<PathBuf>,
    pub default_paths: Vec<String>,
    pub exclude: Option<ExcludeRules>,
}

/// Values supplied on the command line; `Some` wins over the file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub bucket: Option<String>,
    pub prefix: Option<String>,
    pub region: Option<String>,
}

/// Fully resolved configuration threaded through every component call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncConfig {
    pub project_root: PathBuf,
    pub bucket: String,
    /// Base prefix inside the bucket; empty or ending with `/`.
    pub prefix: String,
    pub region: String,
    /// Custom S3-compatible endpoint.
    pub endpoint: Option<String>,
    /// Serve the bucket from `<fs_root>/<bucket>` on the local filesystem.
    pub fs_root: Option<PathBuf>,
    pub default_paths: Vec<String>,
    pub exclude: ExcludeRules,
}

impl SyncConfig {
    /// Minimal configuration with default exclusions, mostly for tests.
    pub fn new(project_root: impl Into<PathBuf>, bucket: &str, prefix: &str) -> Self {
        Self {
            project_root: project_root.into(),
            bucket: bucket.to_string(),
            prefix: normalize_prefix(prefix),
            region: DEFAULT_REGION.to_string(),
            endpoint: None,
            fs_root: None,
            default_paths: Vec::new(),
            exclude: ExcludeRules::default(),
        }
    }
}

/// Ensure a non-empty prefix ends with exactly one `/` and has no leading `/`.
pub fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_start_matches('/');
    if trimmed.is_empty() {
        return String::new();
    }
    let mut out = trimmed.trim_end_matches('/').to_string();
    out.push('/');
    out
}

/// `<root>/.s3sync.yaml`; pure, no I/O.
pub fn config_path_at(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE_NAME)
}

/// Read `<root>/.s3sync.yaml`.
///
/// Returns an empty [`ConfigFile`] if the file does not exist,
/// [`ConfigError::Parse`] (with path + line context) if malformed.
pub fn read_file_at(root: &Path) -> Result<ConfigFile, ConfigError> {
    let path = config_path_at(root);
    let contents = match std::fs::read_to_string(&path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(ConfigFile::default()),
        Err(e) => return Err(io_err(path, e)),
    };
    if contents.trim().is_empty() {
        return Ok(ConfigFile::default());
    }
    serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse { path, source: e })
}

/// Load and resolve the configuration for the project rooted at `root`.
pub fn load_at(root: &Path, overrides: &ConfigOverrides) -> Result<SyncConfig, ConfigError> {
    let file = read_file_at(root)?;
    resolve(root, file, overrides)
}

/// Merge a parsed file with CLI overrides and validate.
pub fn resolve(
    root: &Path,
    file: ConfigFile,
    overrides: &ConfigOverrides,
) -> Result<SyncConfig, ConfigError> {
    let bucket = overrides
        .bucket
        .clone()
        .or(file.bucket)
        .filter(|b| !b.trim().is_empty())
        .ok_or(ConfigError::MissingBucket {
            file: CONFIG_FILE_NAME,
        })?;
    let prefix = overrides.prefix.clone().or(file.prefix).unwrap_or_default();
    let region = overrides
        .region
        .clone()
        .or(file.region)
        .unwrap_or_else(|| DEFAULT_REGION.to_string());
    let fs_root = file.fs_root.map(|p| if p.is_absolute() { p } else { root.join(p) });

    Ok(SyncConfig {
        project_root: root.to_path_buf(),
        bucket,
        prefix: normalize_prefix(&prefix),
        region,
        endpoint: file.endpoint,
        fs_root,
        default_paths: file.default_paths,
        exclude: file.exclude.unwrap_or_default().normalized(),
    })
}

/// Walk up from `start` to the first directory containing a project marker.
pub fn find_project_root_from(start: &Path) -> Result<PathBuf, ConfigError> {
    let mut current = Some(start);
    while let Some(dir) = current {
        if PROJECT_MARKERS.iter().any(|m| dir.join(m).is_file()) {
            return Ok(dir.to_path_buf());
        }
        current = dir.parent();
    }
    Err(ConfigError::ProjectRootNotFound {
        start: start.to_path_buf(),
        markers: PROJECT_MARKERS.join(", "),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_normalization() {
        assert_eq!(normalize_prefix(""), "");
        assert_eq!(normalize_prefix("/"), "");
        assert_eq!(normalize_prefix("games/pull-tabs"), "games/pull-tabs/");
        assert_eq!(normalize_prefix("/games/pull-tabs//"), "games/pull-tabs/");
    }

    #[test]
    fn default_rules_skip_psd_and_archive() {
        let rules = ExcludeRules::default();
        assert!(rules.excludes_file("cover.PSD"));
        assert!(rules.excludes_file("README.md"));
        assert!(!rules.excludes_file("readme.txt"));
        assert!(rules.excludes_dir("archive"));
        assert!(rules.excludes_relative("img/archive/old.png"));
        assert!(!rules.excludes_relative("img/archived/old.png"));
    }

    #[test]
    fn extensions_are_normalized_on_resolve() {
        let file = ConfigFile {
            bucket: Some("b".into()),
            exclude: Some(ExcludeRules {
                files: BTreeSet::new(),
                extensions: ["TMP", ".Bak"].into_iter().map(String::from).collect(),
                dirs: BTreeSet::new(),
            }),
            ..ConfigFile::default()
        };
        let cfg = resolve(Path::new("/p"), file, &ConfigOverrides::default()).unwrap();
        assert!(cfg.exclude.excludes_file("x.tmp"));
        assert!(cfg.exclude.excludes_file("x.BAK"));
    }

    #[test]
    fn dotfile_has_no_extension() {
        let rules = ExcludeRules {
            extensions: [".htaccess"].into_iter().map(String::from).collect(),
            ..ExcludeRules::none()
        };
        assert!(!rules.excludes_file(".htaccess"));
    }
}
