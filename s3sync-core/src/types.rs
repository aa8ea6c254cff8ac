//! Domain types shared by the engine and the CLI.
//!
//! Remote keys and relative paths are always `/`-separated `String`s;
//! local filesystem locations are `PathBuf`.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Lowercase hex content digest of a file or object.
///
/// Local files are hashed with MD5 so the value is directly comparable to the
/// ETag S3 reports for single-part uploads.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(pub String);

impl Fingerprint {
    /// Build a fingerprint from a raw ETag, stripping surrounding quotes.
    ///
    /// Returns `None` for an empty tag and for multipart tags (`<hex>-<parts>`),
    /// which are not a digest of the content.
    pub fn from_etag(etag: &str) -> Option<Self> {
        let trimmed = etag.trim().trim_matches('"');
        if trimmed.is_empty() || trimmed.contains('-') {
            return None;
        }
        Some(Self(trimmed.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for Fingerprint {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Fingerprint {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Which side of a sync is authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Local tree → object store.
    Push,
    /// Object store → local tree.
    Pull,
}

impl Direction {
    /// Verb used for newly created files ("upload" / "download").
    pub fn transfer_verb(self) -> &'static str {
        match self {
            Direction::Push => "upload",
            Direction::Pull => "download",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Push => write!(f, "push"),
            Direction::Pull => write!(f, "pull"),
        }
    }
}

/// Whether a project path denotes a single file or a directory subtree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathKind {
    File,
    Directory,
}

impl fmt::Display for PathKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathKind::File => write!(f, "file"),
            PathKind::Directory => write!(f, "directory"),
        }
    }
}

// ---------------------------------------------------------------------------
// Scope
// ---------------------------------------------------------------------------

/// The part of the remote namespace a single path-level sync may touch.
///
/// Directory scopes end with `/` and admit every key below them; file scopes
/// admit exactly one key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncScope {
    pub remote_prefix: String,
    pub is_directory: bool,
}

impl SyncScope {
    pub fn directory(prefix: impl Into<String>) -> Self {
        let mut remote_prefix = prefix.into();
        if !remote_prefix.is_empty() && !remote_prefix.ends_with('/') {
            remote_prefix.push('/');
        }
        Self {
            remote_prefix,
            is_directory: true,
        }
    }

    pub fn file(key: impl Into<String>) -> Self {
        Self {
            remote_prefix: key.into(),
            is_directory: false,
        }
    }

    /// `true` if `key` may be created, modified or deleted by this sync.
    pub fn contains(&self, key: &str) -> bool {
        if self.is_directory {
            key.starts_with(&self.remote_prefix)
        } else {
            key == self.remote_prefix
        }
    }

    /// Remote key for a path relative to this scope. A file scope has only
    /// one key, whatever `relative` says.
    pub fn key_for(&self, relative: &str) -> String {
        if self.is_directory {
            format!("{}{}", self.remote_prefix, relative)
        } else {
            self.remote_prefix.clone()
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn etag_quotes_are_stripped() {
        let fp = Fingerprint::from_etag("\"9E107D9D372BB6826BD81D3542A419D6\"").unwrap();
        assert_eq!(fp.as_str(), "9e107d9d372bb6826bd81d3542a419d6");
        assert!(Fingerprint::from_etag("\"\"").is_none());
        assert!(Fingerprint::from_etag("\"d41d8cd98f00b204e9800998ecf8427e-3\"").is_none());
    }

    #[test]
    fn directory_scope_admits_children_only() {
        let scope = SyncScope::directory("site/Themes");
        assert_eq!(scope.remote_prefix, "site/Themes/");
        assert!(scope.contains("site/Themes/a.png"));
        assert!(scope.contains("site/Themes/deep/b.png"));
        assert!(!scope.contains("site/Themes2/a.png"));
        assert!(!scope.contains("site/index.html"));
    }

    #[test]
    fn file_scope_admits_exactly_one_key() {
        let scope = SyncScope::file("site/index.html");
        assert!(scope.contains("site/index.html"));
        assert!(!scope.contains("site/index.html.bak"));
        assert!(!scope.contains("site/other.html"));
        assert_eq!(scope.key_for("index.html"), "site/index.html");
    }

    #[test]
    fn directory_scope_joins_relative_keys() {
        let scope = SyncScope::directory("site/");
        assert_eq!(scope.key_for("img/a.png"), "site/img/a.png");
        assert_eq!(SyncScope::directory("").key_for("a.png"), "a.png");
    }

    #[test]
    fn direction_display() {
        assert_eq!(Direction::Push.to_string(), "push");
        assert_eq!(Direction::Pull.transfer_verb(), "download");
    }
}
