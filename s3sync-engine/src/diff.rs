//! Three-way content diff between an authoritative tree and its mirror.
//!
//! The engine does not know which side is local: for a push the local tree
//! is authoritative and the remote tree is the mirror, for a pull the roles
//! swap. Paths are compared by fingerprint only.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use s3sync_core::Fingerprint;

use crate::remote::RemoteObject;
use crate::rename::{detect_renames, RenameCandidate, Unmatched};
use crate::scanner::FileRecord;

/// Anything carrying a content fingerprint.
pub trait Fingerprinted {
    fn fingerprint(&self) -> &Fingerprint;
}

impl Fingerprinted for FileRecord {
    fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }
}

impl Fingerprinted for RemoteObject {
    fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }
}

/// Classification of every relative path seen on either side.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DiffResult {
    pub in_sync: Vec<String>,
    /// Authoritative only, not explained by a rename.
    pub new: Vec<String>,
    /// Present on both sides with different content.
    pub changed: Vec<String>,
    /// Mirror only, in scope, not explained by a rename.
    pub orphaned: Vec<String>,
    pub renames: Vec<RenameCandidate>,
}

impl DiffResult {
    pub fn is_empty(&self) -> bool {
        self.new.is_empty()
            && self.changed.is_empty()
            && self.orphaned.is_empty()
            && self.renames.is_empty()
    }
}

/// Compare two trees.
///
/// `mirror_in_scope` decides whether a mirror path may be deleted or
/// renamed by this sync. With `force`, paths that are already in sync are
/// reported as changed so they are transferred again.
pub fn diff_trees<A, M>(
    authoritative: &BTreeMap<String, A>,
    mirror: &BTreeMap<String, M>,
    mirror_in_scope: &dyn Fn(&str) -> bool,
    force: bool,
) -> DiffResult
where
    A: Fingerprinted,
    M: Fingerprinted,
{
    let mut result = DiffResult::default();

    // 1. Equality pass.
    let mut in_sync_fingerprints: BTreeSet<&Fingerprint> = BTreeSet::new();
    let mut auth_only: Unmatched<'_> = BTreeMap::new();
    for (path, entry) in authoritative {
        match mirror.get(path) {
            Some(other) if other.fingerprint() == entry.fingerprint() => {
                in_sync_fingerprints.insert(entry.fingerprint());
                result.in_sync.push(path.clone());
            }
            Some(_) => result.changed.push(path.clone()),
            None => {
                auth_only.insert(path.as_str(), entry.fingerprint());
            }
        }
    }
    let mirror_only: Unmatched<'_> = mirror
        .iter()
        .filter(|(path, _)| !authoritative.contains_key(*path))
        .map(|(path, entry)| (path.as_str(), entry.fingerprint()))
        .collect();

    // 2. Renames among the leftovers.
    result.renames = detect_renames(
        &auth_only,
        &mirror_only,
        &in_sync_fingerprints,
        mirror_in_scope,
    );
    let renamed_targets: BTreeSet<&str> =
        result.renames.iter().map(|r| r.target_path.as_str()).collect();
    let renamed_sources: BTreeSet<&str> =
        result.renames.iter().map(|r| r.source_path.as_str()).collect();

    // 3. Whatever is left is new or orphaned.
    result.new = auth_only
        .keys()
        .filter(|p| !renamed_targets.contains(*p))
        .map(|p| p.to_string())
        .collect();
    result.orphaned = mirror_only
        .keys()
        .filter(|p| !renamed_sources.contains(*p))
        .filter(|p| {
            let admitted = mirror_in_scope(p);
            if !admitted {
                tracing::debug!("out of scope, ignored: {p}");
            }
            admitted
        })
        .map(|p| p.to_string())
        .collect();

    if force {
        result.changed.append(&mut result.in_sync);
        result.changed.sort();
    }

    result
}
