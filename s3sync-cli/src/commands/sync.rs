//! `s3sync push` and `s3sync pull`: reconcile project paths with the bucket.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Args;

use s3sync_core::config::{self, find_project_root_from};
use s3sync_core::{ConfigOverrides, Direction};
use s3sync_engine::{ConfirmMode, OpendalStore, SyncOptions, SyncOrchestrator};

use crate::output;
use crate::prompt::TerminalPrompt;

/// Arguments shared by `push` and `pull`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Project-relative files or directories; defaults to `default_paths`.
    pub paths: Vec<String>,

    /// Bucket name (overrides `.s3sync.yaml`).
    #[arg(long)]
    pub bucket: Option<String>,

    /// Base prefix inside the bucket (overrides `.s3sync.yaml`).
    #[arg(long)]
    pub prefix: Option<String>,

    /// Exact remote prefix to sync against, bypassing path mapping.
    #[arg(long)]
    pub remote_prefix: Option<String>,

    /// AWS region (overrides `.s3sync.yaml`).
    #[arg(long)]
    pub region: Option<String>,

    /// Show what would change without changing anything.
    #[arg(long, conflicts_with = "yes")]
    pub dry_run: bool,

    /// Skip the confirmation; deletions still ask.
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Transfer every file even if its content already matches.
    #[arg(long)]
    pub force: bool,

    /// List every file of every path before the summary.
    #[arg(long)]
    pub preview_paths: bool,

    /// Project root (default: nearest directory with `.s3sync.yaml` or `index.html`).
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Emit a machine-readable JSON report.
    #[arg(long)]
    pub json: bool,
}

impl SyncArgs {
    fn mode(&self) -> ConfirmMode {
        if self.dry_run {
            ConfirmMode::DryRun
        } else if self.yes {
            ConfirmMode::AutoConfirm
        } else {
            ConfirmMode::Default
        }
    }

    /// Returns `Ok(false)` when at least one operation failed.
    pub fn run(self, direction: Direction) -> Result<bool> {
        let root = match &self.root {
            Some(root) => root.clone(),
            None => {
                let cwd = std::env::current_dir().context("could not determine current directory")?;
                find_project_root_from(&cwd)?
            }
        };
        let overrides = ConfigOverrides {
            bucket: self.bucket.clone(),
            prefix: self.prefix.clone(),
            region: self.region.clone(),
        };
        let config = config::load_at(&root, &overrides)
            .with_context(|| format!("failed to load configuration from {}", root.display()))?;

        let paths = if self.paths.is_empty() {
            config.default_paths.clone()
        } else {
            self.paths.clone()
        };
        if paths.is_empty() {
            bail!(
                "no paths given and no default_paths in {}",
                config::config_path_at(&root).display()
            );
        }

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .context("failed to start async runtime")?;
        let cancel = Arc::new(AtomicBool::new(false));
        {
            let cancel = Arc::clone(&cancel);
            runtime.spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    cancel.store(true, Ordering::SeqCst);
                }
            });
        }

        let store = OpendalStore::from_config(&config, runtime.handle().clone())
            .with_context(|| format!("failed to open bucket '{}'", config.bucket))?;
        let prompt = TerminalPrompt::new(Arc::clone(&cancel));
        let orchestrator =
            SyncOrchestrator::new(&config, &store, &prompt).with_cancel_flag(Arc::clone(&cancel));

        let mut options = SyncOptions::new(direction)
            .mode(self.mode())
            .force(self.force);
        options.prefix_override = self.remote_prefix.clone();

        tracing::info!(
            "{direction} {} path(s) against {} ({:?})",
            paths.len(),
            config.bucket,
            options.mode
        );

        let json = self.json;
        let details = self.preview_paths;
        let bucket = config.bucket.clone();
        let run = orchestrator.run_with(&paths, &options, &mut |reports| {
            if !json {
                output::print_pending(reports, &bucket, details);
            }
        });

        if json {
            output::print_json(&run, &config.bucket)?;
        } else {
            output::print_run(&run, details);
        }

        Ok(!run.has_failures() && !run.interrupted)
    }
}
