//! Object-store capability consumed by the sync engine.
//!
//! The engine never talks to S3 directly; it goes through [`ObjectStore`],
//! which is implemented by [`OpendalStore`] (S3 or a local directory) and by
//! the in-process [`MemoryStore`].

use std::path::Path;

use serde::Serialize;

use crate::error::StoreError;

pub mod memory;
pub mod opendal_store;

pub use self::memory::MemoryStore;
pub use self::opendal_store::OpendalStore;

/// One listed or probed object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectSummary {
    pub key: String,
    /// Raw ETag as reported by the backend, if any.
    pub etag: Option<String>,
    pub size: u64,
}

impl ObjectSummary {
    /// Zero-byte objects whose key ends with `/` only mark a directory.
    pub fn is_folder_marker(&self) -> bool {
        self.key.ends_with('/') && self.size == 0
    }
}

/// An authenticated client bound to one bucket.
///
/// All calls block until complete. Pagination is handled inside
/// [`ObjectStore::list`], which always returns the complete collection.
pub trait ObjectStore {
    /// Display name, e.g. `s3://bucket`.
    fn name(&self) -> &str;

    /// Every object whose key starts with `prefix`, folder markers included.
    fn list(&self, prefix: &str) -> Result<Vec<ObjectSummary>, StoreError>;

    /// Metadata for exactly one key; `Ok(None)` when it does not exist.
    fn head(&self, key: &str) -> Result<Option<ObjectSummary>, StoreError>;

    /// Full object content.
    fn read(&self, key: &str) -> Result<Vec<u8>, StoreError>;

    /// Upload a local file under `key` with the given `Content-Type`.
    fn put(&self, local: &Path, key: &str, content_type: &str) -> Result<(), StoreError>;

    /// Download `key` into `local`, creating parent directories.
    fn get(&self, key: &str, local: &Path) -> Result<(), StoreError>;

    /// Delete `key`. Deleting a missing key is not an error.
    fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// Write `data` to `<path>.s3sync.tmp` and rename it into place.
pub(crate) fn write_local_atomically(path: &Path, data: &[u8]) -> Result<(), StoreError> {
    use crate::error::io_err;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    let tmp = std::path::PathBuf::from(format!("{}.s3sync.tmp", path.display()));
    std::fs::write(&tmp, data).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(path, e));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn folder_marker_detection() {
        let marker = ObjectSummary {
            key: "site/img/".into(),
            etag: None,
            size: 0,
        };
        let odd = ObjectSummary {
            key: "site/img/".into(),
            etag: None,
            size: 3,
        };
        assert!(marker.is_folder_marker());
        assert!(!odd.is_folder_marker());
    }

    #[test]
    fn atomic_local_write_creates_parents_and_cleans_tmp() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a").join("b").join("c.txt");
        write_local_atomically(&path, b"payload").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"payload");
        let leftover = std::path::PathBuf::from(format!("{}.s3sync.tmp", path.display()));
        assert!(!leftover.exists());
    }
}
