//! s3sync: content-addressed sync between a project tree and an S3 prefix.
//!
//! # Usage
//!
//! ```text
//! s3sync push [PATHS]... [--bucket B] [--prefix P] [--remote-prefix P] [--region R]
//!                        [--dry-run] [-y|--yes] [--force] [--preview-paths]
//!                        [--root DIR] [--json] [-v|--verbose]
//! s3sync pull [PATHS]... (same flags)
//! ```

mod commands;
mod output;
mod prompt;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use colored::Colorize;

use commands::sync::SyncArgs;
use s3sync_core::Direction;

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "s3sync",
    version,
    about = "Sync project files with S3 by content, not timestamps",
    long_about = None,
)]
struct Cli {
    /// Log debug details to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Upload new and changed files; delete and rename remote objects to match.
    Push(SyncArgs),

    /// Download new and changed objects; delete and rename local files to match.
    Pull(SyncArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Push(args) => args.run(Direction::Push),
        Commands::Pull(args) => args.run(Direction::Pull),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("{} {err:#}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
