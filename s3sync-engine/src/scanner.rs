//! Local tree scanning.
//!
//! Produces a map from `/`-separated relative path to [`FileRecord`]. A
//! missing root yields an empty map: "nothing to protect locally".

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use serde::Serialize;
use walkdir::WalkDir;

use s3sync_core::{ExcludeRules, Fingerprint};

use crate::hasher::hash_file;

/// A scanned local file. Immutable for the duration of one sync pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    pub relative_path: String,
    pub fingerprint: Fingerprint,
    pub size: u64,
    pub absolute_path: PathBuf,
}

/// Relative path → record, ordered for deterministic output.
pub type LocalTree = BTreeMap<String, FileRecord>;

/// Scan `root`, which may be a single file or a directory.
pub fn scan(root: &Path, rules: &ExcludeRules) -> LocalTree {
    let mut tree = LocalTree::new();

    let Ok(meta) = std::fs::metadata(root) else {
        tracing::debug!("scan root {} does not exist", root.display());
        return tree;
    };

    if meta.is_file() {
        let name = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if !rules.excludes_file(&name) {
            if let Some(record) = record_for(root, name) {
                tree.insert(record.relative_path.clone(), record);
            }
        }
        return tree;
    }

    let walker = WalkDir::new(root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            !(entry.file_type().is_dir()
                && rules.excludes_dir(&entry.file_name().to_string_lossy()))
        });

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(err) => {
                tracing::warn!("skipping unreadable entry under {}: {err}", root.display());
                continue;
            }
        };
        if entry.file_type().is_dir() || !entry.path().is_file() {
            continue;
        }
        if rules.excludes_file(&entry.file_name().to_string_lossy()) {
            tracing::debug!("excluded: {}", entry.path().display());
            continue;
        }
        let Ok(rel) = entry.path().strip_prefix(root) else {
            continue;
        };
        let rel = to_slash_path(rel);
        if let Some(record) = record_for(entry.path(), rel) {
            tree.insert(record.relative_path.clone(), record);
        }
    }

    tree
}

fn record_for(path: &Path, relative_path: String) -> Option<FileRecord> {
    let Some(fingerprint) = hash_file(path) else {
        tracing::warn!("skipping {}: could not be hashed", path.display());
        return None;
    };
    let size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
    Some(FileRecord {
        relative_path,
        fingerprint,
        size,
        absolute_path: path.to_path_buf(),
    })
}

/// Join the normal components of a relative path with `/`.
pub fn to_slash_path(rel: &Path) -> String {
    rel.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn missing_root_is_empty_not_error() {
        let tmp = TempDir::new().unwrap();
        let tree = scan(&tmp.path().join("ghost"), &ExcludeRules::default());
        assert!(tree.is_empty());
    }

    #[test]
    fn single_file_is_keyed_by_name() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "site/index.html", "<html>");
        let tree = scan(&tmp.path().join("site/index.html"), &ExcludeRules::default());
        assert_eq!(tree.keys().collect::<Vec<_>>(), vec!["index.html"]);
        assert_eq!(tree["index.html"].size, 6);
    }

    #[test]
    fn excluded_single_file_yields_nothing() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "cover.psd", "layers");
        let tree = scan(&tmp.path().join("cover.psd"), &ExcludeRules::default());
        assert!(tree.is_empty());
    }

    #[test]
    fn directory_walk_prunes_and_skips() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("Themes");
        write(&root, "a.png", "A");
        write(&root, "dark/b.png", "B");
        write(&root, "dark/archive/old.png", "OLD");
        write(&root, "archive/older.png", "OLDER");
        write(&root, "README.md", "docs");
        write(&root, "mock.PSD", "psd");

        let tree = scan(&root, &ExcludeRules::default());
        assert_eq!(
            tree.keys().cloned().collect::<Vec<_>>(),
            vec!["a.png".to_string(), "dark/b.png".to_string()]
        );
        assert_eq!(tree["dark/b.png"].absolute_path, root.join("dark").join("b.png"));
    }

    #[test]
    fn identical_content_shares_fingerprint() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "one.js", "same");
        write(tmp.path(), "two.js", "same");
        let tree = scan(tmp.path(), &ExcludeRules::none());
        assert_eq!(tree["one.js"].fingerprint, tree["two.js"].fingerprint);
    }

    #[test]
    fn slash_path_normalizes_components() {
        assert_eq!(to_slash_path(Path::new("a/b/c.txt")), "a/b/c.txt");
        assert_eq!(to_slash_path(Path::new("./a/b")), "a/b");
    }
}
