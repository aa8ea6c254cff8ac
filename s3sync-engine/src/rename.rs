//! Rename inference.
//!
//! A rename is an entry that disappeared from one name on the mirror side
//! and reappeared with identical content under a similar name on the
//! authoritative side. Pairs are scored by base file name similarity and
//! assigned greedily, highest score first, so every source and every target
//! is used at most once.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::Serialize;
use similar::TextDiff;

use s3sync_core::Fingerprint;

/// Minimum name similarity for a rename pair.
pub const RENAME_THRESHOLD: f32 = 0.7;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenameCandidate {
    /// Stale path on the mirror side.
    pub source_path: String,
    /// New path on the authoritative side.
    pub target_path: String,
    pub similarity: f32,
    pub source_name: String,
    pub target_name: String,
}

/// Normalized matching-character ratio `2·M / T` of two base file names.
///
/// Names whose stems share nothing score 0.0 even when the extension is the
/// same.
pub fn filename_similarity(a: &str, b: &str) -> f32 {
    if a == b {
        return 1.0;
    }
    let stem_a = stem_of(a);
    let stem_b = stem_of(b);
    if (!stem_a.is_empty() || !stem_b.is_empty())
        && TextDiff::from_chars(stem_a, stem_b).ratio() == 0.0
    {
        return 0.0;
    }
    TextDiff::from_chars(a, b).ratio()
}

fn stem_of(name: &str) -> &str {
    Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name)
}

/// Base name of a `/`-separated relative path.
pub fn base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// One side's unmatched entries: relative path → fingerprint.
pub type Unmatched<'a> = BTreeMap<&'a str, &'a Fingerprint>;

/// Pair unmatched authoritative and mirror entries.
///
/// `in_sync` holds the fingerprints of paths already equal on both sides;
/// content that is in sync somewhere is never treated as moved.
/// `mirror_in_scope` filters mirror entries this sync may touch.
pub fn detect_renames(
    authoritative: &Unmatched<'_>,
    mirror: &Unmatched<'_>,
    in_sync: &BTreeSet<&Fingerprint>,
    mirror_in_scope: &dyn Fn(&str) -> bool,
) -> Vec<RenameCandidate> {
    let auth_index = index_by_fingerprint(authoritative);
    let mirror_index = index_by_fingerprint(mirror);

    let mut candidates = Vec::new();
    for (fingerprint, targets) in &auth_index {
        if in_sync.contains(fingerprint) {
            continue;
        }
        let Some(sources) = mirror_index.get(fingerprint) else {
            continue;
        };
        for &target in targets {
            for &source in sources {
                if !mirror_in_scope(source) {
                    continue;
                }
                let source_name = base_name(source);
                let target_name = base_name(target);
                let similarity = filename_similarity(source_name, target_name);
                if similarity < RENAME_THRESHOLD {
                    tracing::debug!(
                        "no rename {source} -> {target}: similarity {similarity:.2}"
                    );
                    continue;
                }
                candidates.push(RenameCandidate {
                    source_path: source.to_string(),
                    target_path: target.to_string(),
                    similarity,
                    source_name: source_name.to_string(),
                    target_name: target_name.to_string(),
                });
            }
        }
    }

    // Stable: ties keep fingerprint-then-path enumeration order.
    candidates.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));

    let mut claimed_sources = BTreeSet::new();
    let mut claimed_targets = BTreeSet::new();
    let mut renames = Vec::new();
    for candidate in candidates {
        if claimed_sources.contains(&candidate.source_path)
            || claimed_targets.contains(&candidate.target_path)
        {
            continue;
        }
        claimed_sources.insert(candidate.source_path.clone());
        claimed_targets.insert(candidate.target_path.clone());
        renames.push(candidate);
    }
    renames
}

fn index_by_fingerprint<'a>(
    entries: &Unmatched<'a>,
) -> BTreeMap<&'a Fingerprint, Vec<&'a str>> {
    let mut index: BTreeMap<&Fingerprint, Vec<&str>> = BTreeMap::new();
    for (&path, &fingerprint) in entries {
        index.entry(fingerprint).or_default().push(path);
    }
    index
}
