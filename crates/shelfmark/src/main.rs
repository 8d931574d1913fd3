//! Shelfmark command-line entry point

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use shelfmark::catalog::infer_version_key;
use shelfmark::{run_scan, Config, PlainTextExtractor, RunOptions};
use shelfmark_logging::{init_logging, LogConfig};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;

#[derive(Parser, Debug)]
#[command(name = "shelfmark", about = "Document catalog scanner")]
struct Cli {
    /// Enable verbose logging (info/debug to stderr)
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Catalog the configured roots into per-document artifacts
    Scan {
        /// Configuration file (YAML)
        #[arg(long)]
        config: PathBuf,

        /// Output directory for artifacts, state, and the latest map
        #[arg(long)]
        out: PathBuf,

        /// State file path (default: <out>/state.json)
        #[arg(long)]
        state: Option<PathBuf>,

        /// Run the full decision pipeline without writing anything
        #[arg(long)]
        dry_run: bool,

        /// Disable the progress bar
        #[arg(long)]
        no_progress: bool,
    },

    /// Show the inferred version key for a filename
    VersionKey {
        /// Filename to inspect (mtime is read when the file exists)
        filename: PathBuf,
    },
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Scan {
            config,
            out,
            state,
            dry_run,
            no_progress,
        } => {
            let cfg = Config::load(&config)
                .with_context(|| format!("Failed to load config {}", config.display()))?;

            let opts = RunOptions {
                out_dir: out,
                state_path: state,
                dry_run,
                progress: !no_progress && std::io::stderr().is_terminal(),
            };
            let report = run_scan(&cfg, &PlainTextExtractor, &opts)
                .context("Catalog run failed")?;

            println!("Done. docs={} out={}", report.docs, report.out_dir.display());
            Ok(())
        }
        Commands::VersionKey { filename } => {
            let mtime_ms = std::fs::metadata(&filename)
                .ok()
                .and_then(|m| m.modified().ok())
                .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                .map(|d| d.as_millis() as i64)
                .unwrap_or(0);
            let name = filename
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            println!("{}", infer_version_key(&name, mtime_ms));
            Ok(())
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(LogConfig {
        app_name: "shelfmark",
        verbose: cli.verbose,
    }) {
        eprintln!("Failed to initialize logging: {e:#}");
        return ExitCode::FAILURE;
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{e:#}"), "Run failed");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
