//! AirLayer CLI - Command-line interface
//!
//! This binary exercises the airlayer library from a terminal: a one-shot
//! probe that fetches all configured layers for a viewport, and a pure
//! inspect command that prints the derived fetch parameters.

mod commands;
mod error;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "airlayer", version, about = "Live airspace-restriction overlays for moving maps")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fetch all configured layers for a viewport once and print statistics
    Probe(commands::probe::ProbeArgs),
    /// Print the bbox, tile key and LOD parameters derived from a viewport
    Inspect(commands::inspect::InspectArgs),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Probe(args) => commands::probe::run(args).await,
        Command::Inspect(args) => commands::inspect::run(args),
    };

    if let Err(e) = result {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
