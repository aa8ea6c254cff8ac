//! Applying a [`SyncPlan`] against the local tree and the object store.
//!
//! Order per path:
//!
//! 1. creates, then updates
//! 2. renames, each as remove-old followed by transfer-new
//! 3. deletions, behind a confirmation unless already approved
//! 4. folder markers of a deleted folder
//!
//! Item failures are recorded as [`Outcome::Failed`] and the batch carries
//! on. The cancel flag is checked before every item.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use s3sync_core::Direction;

use crate::confirm::Confirm;
use crate::content_type::content_type_for;
use crate::error::{io_err, StoreError};
use crate::plan::PlanItem;
use crate::report::{format_size, Outcome, PathReport, PathStatus};
use crate::store::ObjectStore;

/// Whether deletions still need their own confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionGate {
    /// Covered by an earlier global confirmation.
    Approved,
    /// Ask before the first deletion of this path.
    Ask,
}

pub struct SyncExecutor<'a> {
    store: &'a dyn ObjectStore,
    direction: Direction,
    cancel: &'a AtomicBool,
}

impl<'a> SyncExecutor<'a> {
    pub fn new(store: &'a dyn ObjectStore, direction: Direction, cancel: &'a AtomicBool) -> Self {
        Self {
            store,
            direction,
            cancel,
        }
    }

    /// Execute the plan held by `report`, recording outcomes and status.
    pub fn execute(&self, report: &mut PathReport, gate: DeletionGate, confirm: &dyn Confirm) {
        if report.plan.is_empty() {
            report.status = PathStatus::NoChanges;
            return;
        }
        report.status = PathStatus::Applied;
        let plan = report.plan.clone();

        // 1. Creates and updates.
        for item in &plan.to_create {
            if self.interrupted(report) {
                return;
            }
            let outcome = match self.transfer(item) {
                Ok(()) => Outcome::Created {
                    key: self.label(item),
                },
                Err(err) => self.failure(item, self.direction.transfer_verb(), err),
            };
            report.outcomes.push(outcome);
        }
        for item in &plan.to_update {
            if self.interrupted(report) {
                return;
            }
            let outcome = match self.transfer(item) {
                Ok(()) => Outcome::Updated {
                    key: self.label(item),
                },
                Err(err) => self.failure(item, "update", err),
            };
            report.outcomes.push(outcome);
        }

        // 2. Renames.
        for rename in &plan.to_rename {
            if self.interrupted(report) {
                return;
            }
            let result = self
                .remove(&rename.from)
                .map_err(|e| ("remove", e))
                .and_then(|()| self.transfer(&rename.to).map_err(|e| ("transfer", e)));
            let outcome = match result {
                Ok(()) => {
                    tracing::info!(
                        "renamed {} -> {}",
                        self.label(&rename.from),
                        self.label(&rename.to)
                    );
                    Outcome::Renamed {
                        from: self.label(&rename.from),
                        to: self.label(&rename.to),
                    }
                }
                Err((half, err)) => self.failure(&rename.to, &format!("rename ({half})"), err),
            };
            report.outcomes.push(outcome);
        }

        // 3. Deletions.
        if !plan.has_deletions() {
            return;
        }
        if gate == DeletionGate::Ask && !confirm.confirm(&self.deletion_question(report)) {
            tracing::info!("deletions declined for {}", report.project_path);
            report.deletions_declined = true;
            return;
        }
        for item in &plan.to_delete {
            if self.interrupted(report) {
                return;
            }
            let outcome = match self.remove(item) {
                Ok(()) => Outcome::Deleted {
                    key: self.label(item),
                },
                Err(err) => self.failure(item, "delete", err),
            };
            report.outcomes.push(outcome);
        }

        // 4. Folder markers.
        for key in &plan.marker_deletes {
            if self.interrupted(report) {
                return;
            }
            let outcome = match self.store.delete(key) {
                Ok(()) => {
                    tracing::info!("deleted folder marker {key}");
                    Outcome::FolderMarkerDeleted { key: key.clone() }
                }
                Err(err) => {
                    tracing::warn!("failed to delete folder marker {key}: {err}");
                    Outcome::Failed {
                        key: key.clone(),
                        operation: "delete folder marker".to_string(),
                        error: err.to_string(),
                    }
                }
            };
            report.outcomes.push(outcome);
        }
    }

    fn interrupted(&self, report: &mut PathReport) -> bool {
        if self.cancel.load(Ordering::SeqCst) {
            tracing::warn!("interrupted while syncing {}", report.project_path);
            report.status = PathStatus::Interrupted;
            return true;
        }
        false
    }

    /// Authoritative side → mirror side.
    fn transfer(&self, item: &PlanItem) -> Result<(), StoreError> {
        match self.direction {
            Direction::Push => {
                let content_type = content_type_for(&item.local_path);
                tracing::debug!("{} as {content_type}", item.key);
                self.store.put(&item.local_path, &item.key, content_type)?;
                tracing::info!("uploaded {} ({})", item.key, format_size(item.size));
            }
            Direction::Pull => {
                self.store.get(&item.key, &item.local_path)?;
                tracing::info!(
                    "downloaded {} ({})",
                    item.local_path.display(),
                    format_size(item.size)
                );
            }
        }
        Ok(())
    }

    /// Remove a mirror-side entry.
    fn remove(&self, item: &PlanItem) -> Result<(), StoreError> {
        match self.direction {
            Direction::Push => {
                self.store.delete(&item.key)?;
                tracing::info!("deleted {}", item.key);
            }
            Direction::Pull => {
                remove_local_file(&item.local_path)?;
                tracing::info!("deleted {}", item.local_path.display());
            }
        }
        Ok(())
    }

    /// Display name of an item on the side being changed.
    fn label(&self, item: &PlanItem) -> String {
        match self.direction {
            Direction::Push => item.key.clone(),
            Direction::Pull => item.local_path.display().to_string(),
        }
    }

    fn failure(&self, item: &PlanItem, operation: &str, err: StoreError) -> Outcome {
        let key = self.label(item);
        tracing::warn!("{operation} failed for {key}: {err}");
        Outcome::Failed {
            key,
            operation: operation.to_string(),
            error: err.to_string(),
        }
    }

    fn deletion_question(&self, report: &PathReport) -> String {
        let plan = &report.plan;
        let side = match self.direction {
            Direction::Push => "remote object(s)",
            Direction::Pull => "local file(s)",
        };
        format!(
            "Delete {} {side} ({}) for {}?",
            plan.to_delete.len(),
            format_size(plan.delete_bytes()),
            if report.project_path.is_empty() {
                "."
            } else {
                report.project_path.as_str()
            }
        )
    }
}

/// Delete a local file and, if that empties it, its parent directory.
fn remove_local_file(path: &Path) -> Result<(), StoreError> {
    match std::fs::remove_file(path) {
        Ok(()) => {}
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => return Err(io_err(path, err)),
    }
    if let Some(parent) = path.parent() {
        let is_empty = std::fs::read_dir(parent)
            .map(|mut entries| entries.next().is_none())
            .unwrap_or(false);
        if is_empty {
            let _ = std::fs::remove_dir(parent);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::confirm::ScriptedConfirm;
    use crate::plan::{PlannedRename, SyncPlan};
    use crate::store::MemoryStore;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn item(rel: &str, key: &str, local: PathBuf) -> PlanItem {
        PlanItem {
            relative_path: rel.to_string(),
            key: key.to_string(),
            local_path: local,
            size: 1,
        }
    }

    fn report(plan: SyncPlan, direction: Direction) -> PathReport {
        PathReport::new("site", direction, plan)
    }

    #[test]
    fn push_uploads_with_content_type_and_keeps_going_after_failure() {
        let tmp = TempDir::new().expect("tmp");
        fs::write(tmp.path().join("a.js"), "a").expect("write");
        fs::write(tmp.path().join("b.css"), "b").expect("write");
        let store = MemoryStore::default();
        store.fail_on("site/a.js");
        let plan = SyncPlan {
            to_create: vec![
                item("a.js", "site/a.js", tmp.path().join("a.js")),
                item("b.css", "site/b.css", tmp.path().join("b.css")),
            ],
            ..SyncPlan::default()
        };
        let cancel = AtomicBool::new(false);
        let mut r = report(plan, Direction::Push);

        SyncExecutor::new(&store, Direction::Push, &cancel).execute(
            &mut r,
            DeletionGate::Ask,
            &ScriptedConfirm::default(),
        );
        assert_eq!(r.status, PathStatus::Applied);
        let tally = r.tally();
        assert_eq!((tally.created, tally.failed), (1, 1));
        assert_eq!(store.content_type("site/b.css").as_deref(), Some("text/css"));
    }

    #[test]
    fn declined_deletions_are_not_failures() {
        let store = MemoryStore::default();
        store.insert("site/old.js", b"x");
        let plan = SyncPlan {
            to_delete: vec![item("old.js", "site/old.js", PathBuf::from("unused"))],
            ..SyncPlan::default()
        };
        let cancel = AtomicBool::new(false);
        let confirm = ScriptedConfirm::new([false]);
        let mut r = report(plan, Direction::Push);

        SyncExecutor::new(&store, Direction::Push, &cancel).execute(
            &mut r,
            DeletionGate::Ask,
            &confirm,
        );
        assert!(r.deletions_declined);
        assert_eq!(r.tally().failed, 0);
        assert!(store.contents("site/old.js").is_some());
        assert_eq!(confirm.questions().len(), 1);
        assert!(confirm.questions()[0].starts_with("Delete 1 remote object(s)"));
    }

    #[test]
    fn approved_gate_deletes_without_asking() {
        let store = MemoryStore::default();
        store.insert("site/old.js", b"x");
        store.insert_marker("site/");
        let plan = SyncPlan {
            to_delete: vec![item("old.js", "site/old.js", PathBuf::from("unused"))],
            marker_deletes: vec!["site/".to_string()],
            folders_deleted: vec!["site".to_string()],
            ..SyncPlan::default()
        };
        let cancel = AtomicBool::new(false);
        let confirm = ScriptedConfirm::default();
        let mut r = report(plan, Direction::Push);

        SyncExecutor::new(&store, Direction::Push, &cancel).execute(
            &mut r,
            DeletionGate::Approved,
            &confirm,
        );
        assert!(confirm.questions().is_empty());
        assert!(store.keys().is_empty());
        let tally = r.tally();
        assert_eq!((tally.deleted, tally.folders_deleted, tally.failed), (1, 1, 0));
    }

    #[test]
    fn failed_rename_half_counts_once() {
        let tmp = TempDir::new().expect("tmp");
        fs::write(tmp.path().join("logo.png"), "L").expect("write");
        let store = MemoryStore::default();
        store.insert("img/logo-old.png", b"L");
        store.fail_on("img/logo.png");
        let plan = SyncPlan {
            to_rename: vec![PlannedRename {
                from: item("logo-old.png", "img/logo-old.png", tmp.path().join("logo-old.png")),
                to: item("logo.png", "img/logo.png", tmp.path().join("logo.png")),
                similarity: 0.8,
            }],
            ..SyncPlan::default()
        };
        let cancel = AtomicBool::new(false);
        let mut r = report(plan, Direction::Push);

        SyncExecutor::new(&store, Direction::Push, &cancel).execute(
            &mut r,
            DeletionGate::Ask,
            &ScriptedConfirm::default(),
        );
        let tally = r.tally();
        assert_eq!((tally.renamed, tally.failed), (0, 1));
    }

    #[test]
    fn pull_downloads_and_prunes_emptied_directories() {
        let tmp = TempDir::new().expect("tmp");
        let stale_dir = tmp.path().join("old");
        fs::create_dir_all(&stale_dir).expect("mkdir");
        fs::write(stale_dir.join("gone.txt"), "g").expect("write");
        let store = MemoryStore::default();
        store.insert("new/deep/file.txt", b"fresh");
        let plan = SyncPlan {
            to_create: vec![item(
                "new/deep/file.txt",
                "new/deep/file.txt",
                tmp.path().join("new/deep/file.txt"),
            )],
            to_delete: vec![item("old/gone.txt", "old/gone.txt", stale_dir.join("gone.txt"))],
            ..SyncPlan::default()
        };
        let cancel = AtomicBool::new(false);
        let mut r = report(plan, Direction::Pull);

        SyncExecutor::new(&store, Direction::Pull, &cancel).execute(
            &mut r,
            DeletionGate::Approved,
            &ScriptedConfirm::default(),
        );
        assert_eq!(
            fs::read_to_string(tmp.path().join("new/deep/file.txt")).expect("read"),
            "fresh"
        );
        assert!(!stale_dir.exists());
        assert_eq!(r.tally().deleted, 1);
    }

    #[test]
    fn cancel_flag_stops_before_next_item() {
        let tmp = TempDir::new().expect("tmp");
        fs::write(tmp.path().join("a.js"), "a").expect("write");
        let store = MemoryStore::default();
        let plan = SyncPlan {
            to_create: vec![item("a.js", "site/a.js", tmp.path().join("a.js"))],
            ..SyncPlan::default()
        };
        let cancel = AtomicBool::new(true);
        let mut r = report(plan, Direction::Push);

        SyncExecutor::new(&store, Direction::Push, &cancel).execute(
            &mut r,
            DeletionGate::Approved,
            &ScriptedConfirm::default(),
        );
        assert_eq!(r.status, PathStatus::Interrupted);
        assert_eq!(store.mutation_count(), 0);
    }
}
