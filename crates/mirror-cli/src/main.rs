//! bucket-mirror CLI
//!
//! Mirrors an object-storage bucket into a git repository.

mod cli;
mod commands;
mod error;

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use error::{CliError, Result};

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    match cli.command {
        Some(Commands::Reconcile(args)) => commands::run_reconcile(&args),
        Some(Commands::Plan(args)) => commands::run_plan(&args),
        None => {
            println!(
                "{} Mirror a bucket into a git repository",
                "bucket-mirror".green().bold()
            );
            println!();
            println!("Run {} for available commands.", "bucket-mirror --help".cyan());
            Ok(())
        }
    }
}

/// Log to stderr, honouring `RUST_LOG`; `--verbose` raises the default to debug.
fn init_tracing(verbose: bool) -> Result<()> {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .try_init()
        .map_err(|e| CliError::user(format!("Failed to set tracing subscriber: {e}")))?;
    tracing::debug!("Verbose mode enabled");
    Ok(())
}
