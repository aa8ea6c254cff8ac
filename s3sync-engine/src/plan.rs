//! Turning a diff into concrete, direction-aware operations.

use std::path::PathBuf;

use serde::Serialize;

use s3sync_core::{Direction, PathKind, SyncScope};

use crate::diff::diff_trees;
use crate::path_map::PathTarget;
use crate::remote::RemoteTree;
use crate::scanner::LocalTree;

/// One file as both sides see it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanItem {
    /// Path relative to the sync target.
    pub relative_path: String,
    pub key: String,
    pub local_path: PathBuf,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedRename {
    /// Stale entry on the mirror side; removed.
    pub from: PlanItem,
    /// Entry on the authoritative side; transferred.
    pub to: PlanItem,
    pub similarity: f32,
}

/// Everything a sync of one path would do. Built before any mutation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncPlan {
    pub to_create: Vec<PlanItem>,
    pub to_update: Vec<PlanItem>,
    pub to_delete: Vec<PlanItem>,
    pub to_rename: Vec<PlannedRename>,
    pub folders_added: Vec<String>,
    pub folders_deleted: Vec<String>,
    /// Remote folder-marker keys, deepest first.
    pub marker_deletes: Vec<String>,
}

impl SyncPlan {
    /// `true` when nothing would be transferred, renamed or deleted.
    pub fn is_empty(&self) -> bool {
        self.to_create.is_empty()
            && self.to_update.is_empty()
            && self.to_delete.is_empty()
            && self.to_rename.is_empty()
            && self.marker_deletes.is_empty()
    }

    pub fn has_deletions(&self) -> bool {
        !self.to_delete.is_empty() || !self.marker_deletes.is_empty()
    }

    pub fn transfer_bytes(&self) -> u64 {
        self.to_create
            .iter()
            .chain(&self.to_update)
            .map(|i| i.size)
            .chain(self.to_rename.iter().map(|r| r.to.size))
            .sum()
    }

    pub fn delete_bytes(&self) -> u64 {
        self.to_delete.iter().map(|i| i.size).sum()
    }
}

/// Compare the scanned local tree with the listed remote tree for `target`.
pub fn build_plan(
    target: &PathTarget,
    direction: Direction,
    local: &LocalTree,
    remote: &RemoteTree,
    force: bool,
) -> SyncPlan {
    let scope = &target.scope;
    // Orphans may only come from keys the scope really covers. On push the
    // mirror is the listing, so check the listed key itself.
    let in_scope = |rel: &str| match direction {
        Direction::Push => remote
            .objects
            .get(rel)
            .is_some_and(|obj| scope.contains(&obj.key)),
        Direction::Pull => scope.contains(&scope.key_for(rel)),
    };

    let local_item = |rel: &str| {
        let rec = &local[rel];
        PlanItem {
            relative_path: rel.to_string(),
            key: scope.key_for(rel),
            local_path: rec.absolute_path.clone(),
            size: rec.size,
        }
    };
    let remote_item = |rel: &str| {
        let obj = &remote.objects[rel];
        PlanItem {
            relative_path: rel.to_string(),
            key: obj.key.clone(),
            local_path: local_path_for(target, rel),
            size: obj.size,
        }
    };

    let (diff, authoritative_empty, mirror_empty) = match direction {
        Direction::Push => (
            diff_trees(local, &remote.objects, &in_scope, force),
            local.is_empty(),
            remote.objects.is_empty(),
        ),
        Direction::Pull => (
            diff_trees(&remote.objects, local, &in_scope, force),
            remote.objects.is_empty(),
            local.is_empty(),
        ),
    };
    let (auth_item, mirror_item): (&dyn Fn(&str) -> PlanItem, &dyn Fn(&str) -> PlanItem) =
        match direction {
            Direction::Push => (&local_item, &remote_item),
            Direction::Pull => (&remote_item, &local_item),
        };

    let mut plan = SyncPlan {
        to_create: diff.new.iter().map(|p| auth_item(p)).collect(),
        to_update: diff.changed.iter().map(|p| auth_item(p)).collect(),
        to_delete: diff.orphaned.iter().map(|p| mirror_item(p)).collect(),
        to_rename: diff
            .renames
            .iter()
            .map(|r| PlannedRename {
                from: mirror_item(&r.source_path),
                to: auth_item(&r.target_path),
                similarity: r.similarity,
            })
            .collect(),
        ..SyncPlan::default()
    };

    if scope.is_directory {
        let label = if target.project_path.is_empty() {
            ".".to_string()
        } else {
            target.project_path.clone()
        };
        if mirror_empty && !plan.to_create.is_empty() {
            plan.folders_added.push(label.clone());
        }
        if authoritative_empty && !plan.to_delete.is_empty() {
            plan.folders_deleted.push(label);
            if direction == Direction::Push {
                plan.marker_deletes = markers_deepest_first(scope, &remote.folder_markers);
            }
        }
    }

    plan
}

/// Where a scope-relative path lives locally.
fn local_path_for(target: &PathTarget, rel: &str) -> PathBuf {
    match target.kind {
        PathKind::File => target.local_path.clone(),
        PathKind::Directory => rel
            .split('/')
            .fold(target.local_path.clone(), |acc, part| acc.join(part)),
    }
}

fn markers_deepest_first(scope: &SyncScope, markers: &[String]) -> Vec<String> {
    let mut keys: Vec<String> = markers
        .iter()
        .filter(|k| scope.contains(k))
        .cloned()
        .collect();
    keys.sort_by(|a, b| {
        b.matches('/')
            .count()
            .cmp(&a.matches('/').count())
            .then_with(|| a.cmp(b))
    });
    keys
}
