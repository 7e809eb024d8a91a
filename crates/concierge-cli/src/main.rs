//! # concierge CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use concierge_cli::check::{run_check, run_normalize, CheckArgs, NormalizeArgs};
use concierge_cli::graph::{run_graph, GraphArgs};
use concierge_cli::replay::{run_replay, ReplayArgs};

/// Concierge case lifecycle toolchain.
///
/// Checks proposed case and stage status changes against the lifecycle
/// graph, normalizes stored values, and replays recorded histories.
#[derive(Parser, Debug)]
#[command(name = "concierge", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check whether one status change is legal (exit 1 if not).
    Check(CheckArgs),

    /// Print the status a stored value resolves to.
    Normalize(NormalizeArgs),

    /// Print the case and stage transition graphs.
    Graph(GraphArgs),

    /// Validate every step of a JSON or YAML status journal.
    Replay(ReplayArgs),
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

    let result = match cli.command {
        Commands::Check(args) => run_check(&args),
        Commands::Normalize(args) => run_normalize(&args),
        Commands::Graph(args) => run_graph(&args),
        Commands::Replay(args) => run_replay(&args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(2)
        }
    }
}
