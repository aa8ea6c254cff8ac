//! Human and JSON rendering of plans and run results.

use anyhow::{Context, Result};
use chrono::Utc;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use s3sync_core::Direction;
use s3sync_engine::{
    format_size, ConfirmMode, Outcome, PathReport, PathStatus, RunReport, SyncPlan, Tally,
};

// ---------------------------------------------------------------------------
// Per-path details
// ---------------------------------------------------------------------------

fn display_path(path: &str) -> &str {
    if path.is_empty() {
        "."
    } else {
        path
    }
}

/// File-level listing of one path's plan.
pub fn print_plan(report: &PathReport) {
    println!(
        "\n{} {}",
        report.direction.to_string().to_uppercase().bold(),
        display_path(&report.project_path).bold()
    );

    if let PathStatus::Failed(reason) = &report.status {
        println!("  {} {reason}", "✗".red().bold());
        return;
    }
    let plan = &report.plan;
    if plan.is_empty() {
        println!("  {} no changes", "✓".green());
        return;
    }

    let (verb, side) = match report.direction {
        Direction::Push => ("upload", "remote"),
        Direction::Pull => ("download", "local"),
    };
    for item in &plan.to_create {
        println!(
            "  {} {verb} {} ({})",
            "+".green().bold(),
            item.relative_path,
            format_size(item.size)
        );
    }
    for item in &plan.to_update {
        println!(
            "  {} update {} ({})",
            "~".yellow().bold(),
            item.relative_path,
            format_size(item.size)
        );
    }
    for rename in &plan.to_rename {
        println!(
            "  {} rename {} → {} ({:.0}% similar)",
            "→".cyan().bold(),
            rename.from.relative_path,
            rename.to.relative_path,
            rename.similarity * 100.0
        );
    }
    for item in &plan.to_delete {
        println!(
            "  {} delete {side} {} ({})",
            "-".red().bold(),
            item.relative_path,
            format_size(item.size)
        );
    }
    for folder in &plan.folders_added {
        println!("  {} new folder {folder}", "+".green());
    }
    for folder in &plan.folders_deleted {
        println!("  {} folder {folder} will be removed", "-".red());
    }
}

// ---------------------------------------------------------------------------
// Summaries
// ---------------------------------------------------------------------------

#[derive(Tabled)]
struct SummaryRow {
    #[tabled(rename = "path")]
    path: String,
    #[tabled(rename = "status")]
    status: String,
    #[tabled(rename = "new")]
    created: usize,
    #[tabled(rename = "updated")]
    updated: usize,
    #[tabled(rename = "renamed")]
    renamed: usize,
    #[tabled(rename = "deleted")]
    deleted: usize,
    #[tabled(rename = "failed")]
    failed: usize,
}

impl SummaryRow {
    fn new(path: String, status: String, tally: Tally) -> Self {
        Self {
            path,
            status,
            created: tally.created,
            updated: tally.updated,
            renamed: tally.renamed,
            deleted: tally.deleted,
            failed: tally.failed,
        }
    }
}

fn status_label(report: &PathReport) -> String {
    let label = match &report.status {
        PathStatus::Applied if report.deletions_declined => "applied, deletions skipped",
        PathStatus::Applied => "applied",
        PathStatus::Previewed => "pending",
        PathStatus::NoChanges => "in sync",
        PathStatus::Declined => "declined",
        PathStatus::Interrupted => "interrupted",
        PathStatus::Failed(_) => "failed",
    };
    label.to_string()
}

fn summary_table(rows: Vec<SummaryRow>, total: Tally) -> Table {
    let mut rows = rows;
    if rows.len() > 1 {
        rows.push(SummaryRow::new("TOTAL".to_string(), String::new(), total));
    }
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    table
}

/// Aggregate of every previewed plan, shown before the global question.
pub fn print_pending(reports: &[PathReport], bucket: &str, details: bool) {
    if details {
        for report in reports {
            print_plan(report);
        }
    }

    let separator = "=".repeat(70).bright_black().to_string();
    println!("\n{separator}");
    println!("{}", "SUMMARY OF ALL CHANGES".bold());
    println!("{separator}");

    let mut total = Tally::default();
    let mut plan_total = SyncPlan::default();
    let rows: Vec<SummaryRow> = reports
        .iter()
        .map(|r| {
            let tally = r.tally();
            total += tally;
            plan_total.to_create.extend(r.plan.to_create.iter().cloned());
            plan_total.to_update.extend(r.plan.to_update.iter().cloned());
            plan_total.to_delete.extend(r.plan.to_delete.iter().cloned());
            plan_total.to_rename.extend(r.plan.to_rename.iter().cloned());
            SummaryRow::new(display_path(&r.project_path).to_string(), status_label(r), tally)
        })
        .collect();
    println!("{}", summary_table(rows, total));

    println!("Bucket: {bucket}");
    println!(
        "Transfer: {}   Delete: {}",
        format_size(plan_total.transfer_bytes()),
        format_size(plan_total.delete_bytes())
    );
    if total.folders_added > 0 {
        println!("{} {} new folder(s)", "+".green(), total.folders_added);
    }
    if total.folders_deleted > 0 {
        println!(
            "{} {} folder(s) will be removed",
            "-".red(),
            total.folders_deleted
        );
    }
}

/// Final report after the run.
pub fn print_run(run: &RunReport, details: bool) {
    if details && run.mode != ConfirmMode::Default {
        for report in &run.paths {
            print_plan(report);
        }
    }

    let failures: Vec<&Outcome> = run
        .paths
        .iter()
        .flat_map(|p| p.outcomes.iter())
        .filter(|o| o.is_failure())
        .collect();
    for failure in &failures {
        if let Outcome::Failed {
            key,
            operation,
            error,
        } = failure
        {
            println!("  {} {operation} {key}: {error}", "✗".red().bold());
        }
    }
    for report in &run.paths {
        if let PathStatus::Failed(reason) = &report.status {
            println!(
                "  {} {}: {reason}",
                "✗".red().bold(),
                display_path(&report.project_path)
            );
        }
    }

    if run.is_noop() && !run.paths.is_empty() {
        println!(
            "\n{} No changes detected. Everything is already in sync.",
            "✓".green().bold()
        );
        return;
    }

    let total = run.tally();
    let rows: Vec<SummaryRow> = run
        .paths
        .iter()
        .map(|r| {
            SummaryRow::new(
                display_path(&r.project_path).to_string(),
                status_label(r),
                r.tally(),
            )
        })
        .collect();
    println!("\n{}", summary_table(rows, total));

    match (run.mode, run.confirmed) {
        (ConfirmMode::DryRun, _) => {
            println!("{}", "[dry-run] no changes were made".yellow());
        }
        (_, Some(false)) => println!("{}", "Sync cancelled; no changes were made.".yellow()),
        _ if run.interrupted => println!("{}", "Interrupted; completed transfers were kept.".yellow()),
        _ if total.failed > 0 => println!(
            "{} {} operation(s) failed",
            "✗".red().bold(),
            total.failed
        ),
        _ => println!(
            "{} {} complete: {} new, {} updated, {} renamed, {} deleted",
            "✓".green().bold(),
            run.direction,
            total.created,
            total.updated,
            total.renamed,
            total.deleted
        ),
    }
}

// ---------------------------------------------------------------------------
// JSON
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct JsonReport<'a> {
    generated_at: String,
    bucket: &'a str,
    totals: Tally,
    #[serde(flatten)]
    run: &'a RunReport,
}

pub fn print_json(run: &RunReport, bucket: &str) -> Result<()> {
    let payload = JsonReport {
        generated_at: Utc::now().to_rfc3339(),
        bucket,
        totals: run.tally(),
        run,
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to serialize sync report")?
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_labels() {
        let mut report = PathReport::new("Themes", Direction::Push, SyncPlan::default());
        assert_eq!(status_label(&report), "in sync");
        report.status = PathStatus::Applied;
        report.deletions_declined = true;
        assert_eq!(status_label(&report), "applied, deletions skipped");
    }

    #[test]
    fn json_report_flattens_run() {
        let run = RunReport {
            direction: Direction::Pull,
            mode: ConfirmMode::DryRun,
            paths: vec![PathReport::failed("x", Direction::Pull, "denied".into())],
            confirmed: None,
            interrupted: false,
        };
        let value = serde_json::to_value(JsonReport {
            generated_at: "now".into(),
            bucket: "b",
            totals: run.tally(),
            run: &run,
        })
        .expect("json");
        assert_eq!(value["direction"], "pull");
        assert_eq!(value["mode"], "dry_run");
        assert_eq!(value["totals"]["failed"], 1);
        assert_eq!(value["paths"][0]["status"]["status"], "failed");
    }
}
