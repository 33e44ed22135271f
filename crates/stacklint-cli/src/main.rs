//! # stacklint CLI entry point
//!
//! Parses command-line arguments, installs the tracing subscriber and runs
//! the lint command.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use stacklint_cli::lint::{run_lint, LintArgs};

/// Static analysis for infrastructure templates.
///
/// Validates every resource against its provider schema in each requested
/// region, following parameters, mappings, conditions and intrinsic
/// functions to the values they can take.
#[derive(Parser, Debug)]
#[command(name = "stacklint", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(flatten)]
    lint: LintArgs,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(templates = cli.lint.templates.len(), "stacklint starting");

    match run_lint(&cli.lint) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
