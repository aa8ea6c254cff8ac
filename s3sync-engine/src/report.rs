//! Per-item outcomes, per-path reports and aggregate counters.

use std::ops::AddAssign;

use serde::Serialize;

use s3sync_core::Direction;

use crate::plan::SyncPlan;

/// What happened to one planned item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    Created { key: String },
    Updated { key: String },
    Deleted { key: String },
    Renamed { from: String, to: String },
    FolderMarkerDeleted { key: String },
    Failed { key: String, operation: String, error: String },
}

impl Outcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failed { .. })
    }
}

/// Aggregate counters; summed across paths.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub renamed: usize,
    pub folders_added: usize,
    pub folders_deleted: usize,
    pub failed: usize,
}

impl Tally {
    /// Count what a plan would do if everything succeeded.
    pub fn from_plan(plan: &SyncPlan) -> Self {
        Self {
            created: plan.to_create.len(),
            updated: plan.to_update.len(),
            deleted: plan.to_delete.len(),
            renamed: plan.to_rename.len(),
            folders_added: plan.folders_added.len(),
            folders_deleted: plan.folders_deleted.len(),
            failed: 0,
        }
    }

    pub fn total_changes(&self) -> usize {
        self.created + self.updated + self.deleted + self.renamed
    }
}

impl AddAssign for Tally {
    fn add_assign(&mut self, other: Self) {
        self.created += other.created;
        self.updated += other.updated;
        self.deleted += other.deleted;
        self.renamed += other.renamed;
        self.folders_added += other.folders_added;
        self.folders_deleted += other.folders_deleted;
        self.failed += other.failed;
    }
}

/// How processing of one path ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum PathStatus {
    /// The plan was executed (individual items may still have failed).
    Applied,
    /// Dry run: plan computed, nothing touched.
    Previewed,
    NoChanges,
    /// The user answered no; nothing touched.
    Declined,
    /// Cancelled part-way; completed items are kept.
    Interrupted,
    /// Listing or probing failed before a plan existed.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathReport {
    pub project_path: String,
    pub direction: Direction,
    pub plan: SyncPlan,
    pub outcomes: Vec<Outcome>,
    pub status: PathStatus,
    /// Deletions were planned but the user did not approve them.
    pub deletions_declined: bool,
}

impl PathReport {
    pub fn new(project_path: impl Into<String>, direction: Direction, plan: SyncPlan) -> Self {
        let status = if plan.is_empty() {
            PathStatus::NoChanges
        } else {
            PathStatus::Previewed
        };
        Self {
            project_path: project_path.into(),
            direction,
            plan,
            outcomes: Vec::new(),
            status,
            deletions_declined: false,
        }
    }

    pub fn failed(project_path: impl Into<String>, direction: Direction, reason: String) -> Self {
        Self {
            project_path: project_path.into(),
            direction,
            plan: SyncPlan::default(),
            outcomes: Vec::new(),
            status: PathStatus::Failed(reason),
            deletions_declined: false,
        }
    }

    /// Counters for this path.
    ///
    /// Applied and interrupted paths count actual outcomes; previewed paths
    /// count the plan. A scope-level failure counts as one failure.
    pub fn tally(&self) -> Tally {
        match &self.status {
            PathStatus::Previewed => Tally::from_plan(&self.plan),
            PathStatus::NoChanges | PathStatus::Declined => Tally::default(),
            PathStatus::Failed(_) => Tally {
                failed: 1,
                ..Tally::default()
            },
            PathStatus::Applied | PathStatus::Interrupted => {
                let mut tally = Tally::default();
                for outcome in &self.outcomes {
                    match outcome {
                        Outcome::Created { .. } => tally.created += 1,
                        Outcome::Updated { .. } => tally.updated += 1,
                        Outcome::Deleted { .. } => tally.deleted += 1,
                        Outcome::Renamed { .. } => tally.renamed += 1,
                        Outcome::FolderMarkerDeleted { .. } => {}
                        Outcome::Failed { .. } => tally.failed += 1,
                    }
                }
                if tally.created > 0 {
                    tally.folders_added = self.plan.folders_added.len();
                }
                if tally.deleted > 0 && !self.deletions_declined {
                    tally.folders_deleted = self.plan.folders_deleted.len();
                }
                tally
            }
        }
    }

    pub fn has_failures(&self) -> bool {
        self.tally().failed > 0
    }
}

/// Human-readable byte count with two decimals, e.g. `1.50 KB`.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    for unit in UNITS {
        if size < 1024.0 {
            return format!("{size:.2} {unit}");
        }
        size /= 1024.0;
    }
    format!("{size:.2} PB")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, "0.00 B")]
    #[case(1023, "1023.00 B")]
    #[case(1536, "1.50 KB")]
    #[case(5 * 1024 * 1024, "5.00 MB")]
    #[case(3 * 1024u64.pow(4), "3.00 TB")]
    #[case(2 * 1024u64.pow(5), "2.00 PB")]
    fn sizes_are_human_readable(#[case] bytes: u64, #[case] expected: &str) {
        assert_eq!(format_size(bytes), expected);
    }

    #[test]
    fn tallies_add_up() {
        let mut total = Tally {
            created: 1,
            failed: 1,
            ..Tally::default()
        };
        total += Tally {
            created: 2,
            deleted: 3,
            ..Tally::default()
        };
        assert_eq!(total.created, 3);
        assert_eq!(total.deleted, 3);
        assert_eq!(total.failed, 1);
        assert_eq!(total.total_changes(), 6);
    }

    #[test]
    fn applied_report_counts_outcomes() {
        let mut report = PathReport::new("Themes", Direction::Push, SyncPlan::default());
        report.status = PathStatus::Applied;
        report.outcomes = vec![
            Outcome::Created { key: "a".into() },
            Outcome::Renamed {
                from: "b-old".into(),
                to: "b".into(),
            },
            Outcome::FolderMarkerDeleted { key: "x/".into() },
            Outcome::Failed {
                key: "c".into(),
                operation: "upload".into(),
                error: "denied".into(),
            },
        ];
        let tally = report.tally();
        assert_eq!((tally.created, tally.renamed, tally.failed), (1, 1, 1));
        assert_eq!(tally.deleted, 0);
        assert!(report.has_failures());
    }

    #[test]
    fn scope_failure_counts_once() {
        let report = PathReport::failed("Locked", Direction::Pull, "access denied".into());
        assert_eq!(report.tally().failed, 1);
        assert_eq!(report.tally().total_changes(), 0);
    }

    #[test]
    fn empty_plan_reports_no_changes() {
        let report = PathReport::new("index.html", Direction::Push, SyncPlan::default());
        assert_eq!(report.status, PathStatus::NoChanges);
    }

    #[test]
    fn outcome_json_is_tagged() {
        let json = serde_json::to_value(Outcome::Deleted { key: "k".into() }).expect("json");
        assert_eq!(json["kind"], "deleted");
        assert_eq!(json["key"], "k");
    }
}
