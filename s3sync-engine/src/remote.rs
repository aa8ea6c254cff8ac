//! Remote side of a sync: everything the store holds inside one scope.

use std::collections::BTreeMap;

use serde::Serialize;

use s3sync_core::{ExcludeRules, Fingerprint, SyncScope};

use crate::error::{StoreError, SyncError};
use crate::hasher::hash_bytes;
use crate::store::{ObjectStore, ObjectSummary};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteObject {
    pub key: String,
    pub fingerprint: Fingerprint,
    pub size: u64,
}

/// Scope-relative path → object, plus the folder markers found in scope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RemoteTree {
    pub objects: BTreeMap<String, RemoteObject>,
    /// Full keys of zero-byte `/`-terminated objects.
    pub folder_markers: Vec<String>,
}

impl RemoteTree {
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

/// List (directory scope) or probe (file scope) the store.
///
/// A missing key or empty prefix is an empty tree; any other store failure
/// is returned as [`SyncError::Listing`].
pub fn list_remote(
    store: &dyn ObjectStore,
    scope: &SyncScope,
    rules: &ExcludeRules,
) -> Result<RemoteTree, SyncError> {
    let listing_err = |source: StoreError| SyncError::Listing {
        prefix: scope.remote_prefix.clone(),
        source,
    };

    let mut tree = RemoteTree::default();

    if !scope.is_directory {
        let Some(summary) = store.head(&scope.remote_prefix).map_err(listing_err)? else {
            return Ok(tree);
        };
        let name = summary.key.rsplit('/').next().unwrap_or_default().to_string();
        if name.is_empty() || rules.excludes_file(&name) {
            return Ok(tree);
        }
        let object = to_remote_object(store, summary).map_err(listing_err)?;
        tree.objects.insert(name, object);
        return Ok(tree);
    }

    for summary in store.list(&scope.remote_prefix).map_err(listing_err)? {
        let Some(rel) = summary.key.strip_prefix(&scope.remote_prefix) else {
            continue;
        };
        if summary.is_folder_marker() {
            if !rel.split('/').any(|d| rules.excludes_dir(d)) {
                tree.folder_markers.push(summary.key.clone());
            }
            continue;
        }
        if rel.is_empty() {
            continue;
        }
        if rules.excludes_relative(rel) {
            tracing::debug!("excluded remote: {}", summary.key);
            continue;
        }
        let rel = rel.to_string();
        let object = to_remote_object(store, summary).map_err(listing_err)?;
        tree.objects.insert(rel, object);
    }

    Ok(tree)
}

/// Use the ETag when the backend reports one, otherwise hash the content.
fn to_remote_object(
    store: &dyn ObjectStore,
    summary: ObjectSummary,
) -> Result<RemoteObject, StoreError> {
    let fingerprint = match summary.etag.as_deref().and_then(Fingerprint::from_etag) {
        Some(fp) => fp,
        None => hash_bytes(&store.read(&summary.key)?),
    };
    Ok(RemoteObject {
        key: summary.key,
        fingerprint,
        size: summary.size,
    })
}
