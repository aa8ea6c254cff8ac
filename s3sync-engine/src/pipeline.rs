//! Multi-path sync pipeline shared by `push` and `pull`.
//!
//! For each requested path: map → scan local → list remote → plan. What
//! happens next depends on [`ConfirmMode`]:
//!
//! - `DryRun`: every plan is reported as previewed; nothing is touched.
//! - `AutoConfirm`: each path is executed as soon as it is planned;
//!   deletions still ask, per path.
//! - `Default`: every path is planned first, the aggregate is shown once
//!   and a single answer covers every operation, deletions included.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;

use s3sync_core::{Direction, SyncConfig};

use crate::confirm::Confirm;
use crate::executor::{DeletionGate, SyncExecutor};
use crate::path_map::PathMapper;
use crate::plan::build_plan;
use crate::remote::list_remote;
use crate::report::{PathReport, PathStatus, Tally};
use crate::scanner::scan;
use crate::store::ObjectStore;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmMode {
    #[default]
    Default,
    AutoConfirm,
    DryRun,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    pub direction: Direction,
    pub mode: ConfirmMode,
    /// Transfer files even when fingerprints already match.
    pub force: bool,
    /// Exact remote prefix replacing the computed one.
    pub prefix_override: Option<String>,
}

impl SyncOptions {
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            mode: ConfirmMode::Default,
            force: false,
            prefix_override: None,
        }
    }

    pub fn mode(mut self, mode: ConfirmMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }
}

/// Result of a whole run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub direction: Direction,
    pub mode: ConfirmMode,
    pub paths: Vec<PathReport>,
    /// `Some(answer)` when the single global question was asked.
    pub confirmed: Option<bool>,
    pub interrupted: bool,
}

impl RunReport {
    pub fn tally(&self) -> Tally {
        let mut total = Tally::default();
        for path in &self.paths {
            total += path.tally();
        }
        total
    }

    pub fn has_failures(&self) -> bool {
        self.tally().failed > 0
    }

    /// No path had anything to do.
    pub fn is_noop(&self) -> bool {
        self.paths
            .iter()
            .all(|p| matches!(p.status, PathStatus::NoChanges))
    }
}

pub struct SyncOrchestrator<'a> {
    config: &'a SyncConfig,
    store: &'a dyn ObjectStore,
    confirm: &'a dyn Confirm,
    cancel: Arc<AtomicBool>,
}

impl<'a> SyncOrchestrator<'a> {
    pub fn new(config: &'a SyncConfig, store: &'a dyn ObjectStore, confirm: &'a dyn Confirm) -> Self {
        Self {
            config,
            store,
            confirm,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Share a cancellation flag, typically set from a Ctrl-C handler.
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    /// Plan one path without touching anything.
    ///
    /// Listing failures are reported as [`PathStatus::Failed`] instead of
    /// being returned, so the caller can carry on with other paths.
    pub fn preview_path(&self, project_path: &str, options: &SyncOptions) -> PathReport {
        let target = PathMapper::new(self.config)
            .with_prefix_override(options.prefix_override.as_deref())
            .map(project_path);
        tracing::info!(
            "{} {} ({}) <-> {}{}",
            options.direction,
            target.local_path.display(),
            target.kind,
            self.store.name(),
            if target.scope.remote_prefix.is_empty() {
                "/".to_string()
            } else {
                format!("/{}", target.scope.remote_prefix)
            }
        );

        let local = scan(&target.local_path, &self.config.exclude);
        let remote = match list_remote(self.store, &target.scope, &self.config.exclude) {
            Ok(remote) => remote,
            Err(err) => {
                tracing::warn!("skipping {}: {err}", display_path(&target.project_path));
                return PathReport::failed(target.project_path, options.direction, err.to_string());
            }
        };
        let plan = build_plan(&target, options.direction, &local, &remote, options.force);
        PathReport::new(target.project_path, options.direction, plan)
    }

    /// Run every path with no preview callback.
    pub fn run(&self, paths: &[String], options: &SyncOptions) -> RunReport {
        self.run_with(paths, options, &mut |_| {})
    }

    /// Run every path. In default mode `on_preview` receives all plans right
    /// before the global confirmation is asked.
    pub fn run_with(
        &self,
        paths: &[String],
        options: &SyncOptions,
        on_preview: &mut dyn FnMut(&[PathReport]),
    ) -> RunReport {
        let mut run = RunReport {
            direction: options.direction,
            mode: options.mode,
            paths: Vec::with_capacity(paths.len()),
            confirmed: None,
            interrupted: false,
        };

        match options.mode {
            ConfirmMode::DryRun => {
                for path in paths {
                    if self.is_cancelled() {
                        run.interrupted = true;
                        break;
                    }
                    run.paths.push(self.preview_path(path, options));
                }
            }
            ConfirmMode::AutoConfirm => {
                for path in paths {
                    if self.is_cancelled() {
                        run.interrupted = true;
                        break;
                    }
                    let mut report = self.preview_path(path, options);
                    self.apply(&mut report, options, DeletionGate::Ask);
                    run.paths.push(report);
                }
            }
            ConfirmMode::Default => {
                for path in paths {
                    if self.is_cancelled() {
                        run.interrupted = true;
                        return run;
                    }
                    run.paths.push(self.preview_path(path, options));
                }

                let pending: Tally = run
                    .paths
                    .iter()
                    .filter(|p| p.status == PathStatus::Previewed)
                    .map(|p| Tally::from_plan(&p.plan))
                    .fold(Tally::default(), |mut acc, t| {
                        acc += t;
                        acc
                    });
                let actionable = run
                    .paths
                    .iter()
                    .filter(|p| p.status == PathStatus::Previewed)
                    .count();
                if actionable == 0 {
                    tracing::info!("nothing to do");
                    return run;
                }

                on_preview(&run.paths);
                let question = format!(
                    "Proceed with {} of {actionable} path(s): {} new, {} updated, {} renamed, {} deleted?",
                    options.direction,
                    pending.created,
                    pending.updated,
                    pending.renamed,
                    pending.deleted,
                );
                let answer = self.confirm.confirm(&question);
                run.confirmed = Some(answer);

                for report in &mut run.paths {
                    if report.status != PathStatus::Previewed {
                        continue;
                    }
                    if !answer {
                        report.status = PathStatus::Declined;
                        continue;
                    }
                    if self.is_cancelled() {
                        report.status = PathStatus::Interrupted;
                        continue;
                    }
                    self.apply(report, options, DeletionGate::Approved);
                }
            }
        }

        run.interrupted |= self.is_cancelled();
        run
    }

    fn apply(&self, report: &mut PathReport, options: &SyncOptions, gate: DeletionGate) {
        if report.status != PathStatus::Previewed {
            return;
        }
        SyncExecutor::new(self.store, options.direction, &self.cancel).execute(
            report,
            gate,
            self.confirm,
        );
        if self.is_cancelled() && report.status == PathStatus::Applied {
            report.status = PathStatus::Interrupted;
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }
}

fn display_path(path: &str) -> &str {
    if path.is_empty() {
        "."
    } else {
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::confirm::ScriptedConfirm;
    use crate::store::MemoryStore;
    use std::fs;
    use tempfile::TempDir;

    fn project() -> (TempDir, SyncConfig) {
        let tmp = TempDir::new().expect("tmp");
        fs::create_dir_all(tmp.path().join("Themes")).expect("mkdir");
        fs::write(tmp.path().join("Themes/a.png"), "A").expect("write");
        fs::write(tmp.path().join("index.html"), "<html>").expect("write");
        let config = SyncConfig::new(tmp.path(), "bucket", "site");
        (tmp, config)
    }

    #[test]
    fn default_mode_asks_once_for_all_paths() {
        let (_tmp, config) = project();
        let store = MemoryStore::default();
        let confirm = ScriptedConfirm::new([true]);
        let orch = SyncOrchestrator::new(&config, &store, &confirm);
        let paths = vec!["Themes".to_string(), "index.html".to_string()];

        let mut previewed = 0;
        let run = orch.run_with(&paths, &SyncOptions::new(Direction::Push), &mut |p| {
            previewed = p.len()
        });
        assert_eq!(previewed, 2);
        assert_eq!(confirm.questions().len(), 1);
        assert_eq!(run.confirmed, Some(true));
        assert_eq!(run.tally().created, 2);
        assert!(store.contents("site/Themes/a.png").is_some());
        assert!(store.contents("site/index.html").is_some());
    }

    #[test]
    fn declined_run_touches_nothing() {
        let (_tmp, config) = project();
        let store = MemoryStore::default();
        let confirm = ScriptedConfirm::new([false]);
        let run = SyncOrchestrator::new(&config, &store, &confirm)
            .run(&["Themes".to_string()], &SyncOptions::new(Direction::Push));
        assert_eq!(run.paths[0].status, PathStatus::Declined);
        assert_eq!(store.mutation_count(), 0);
        assert!(!run.has_failures());
    }

    #[test]
    fn nothing_to_do_skips_the_prompt() {
        let (_tmp, config) = project();
        let store = MemoryStore::default();
        store.insert("site/index.html", b"<html>");
        let confirm = ScriptedConfirm::default();
        let run = SyncOrchestrator::new(&config, &store, &confirm)
            .run(&["index.html".to_string()], &SyncOptions::new(Direction::Push));
        assert!(run.is_noop());
        assert!(run.confirmed.is_none());
        assert!(confirm.questions().is_empty());
    }

    #[test]
    fn listing_failure_is_isolated_to_its_path() {
        let (_tmp, config) = project();
        let store = MemoryStore::default();
        store.fail_listing("site/Themes/");
        let confirm = ScriptedConfirm::default();
        let run = SyncOrchestrator::new(&config, &store, &confirm).run(
            &["Themes".to_string(), "index.html".to_string()],
            &SyncOptions::new(Direction::Push).mode(ConfirmMode::AutoConfirm),
        );
        assert!(matches!(run.paths[0].status, PathStatus::Failed(_)));
        assert_eq!(run.paths[1].status, PathStatus::Applied);
        assert_eq!(run.tally().failed, 1);
        assert_eq!(run.tally().created, 1);
    }

    #[test]
    fn preset_cancel_flag_starts_nothing() {
        let (_tmp, config) = project();
        let store = MemoryStore::default();
        let confirm = ScriptedConfirm::new([true]);
        let run = SyncOrchestrator::new(&config, &store, &confirm)
            .with_cancel_flag(Arc::new(AtomicBool::new(true)))
            .run(
                &["Themes".to_string()],
                &SyncOptions::new(Direction::Push).mode(ConfirmMode::AutoConfirm),
            );
        assert!(run.interrupted);
        assert!(run.paths.is_empty());
        assert_eq!(store.mutation_count(), 0);
    }
}
