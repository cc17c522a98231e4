#![deny(missing_docs)]

//! # routegen CLI
//!
//! Generates the route contract artifact from endpoint files.
//!
//! Supported Commands:
//! - `generate`: Full scan and a single artifact write (`--check` to verify only).
//! - `watch`: Full scan, then incremental updates for paths read from stdin.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::args::ProjectArgs;
use crate::error::CliResult;

mod args;
mod error;
mod generate;
mod watch;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Route contract generator")]
struct Cli {
    #[clap(flatten)]
    project: ProjectArgs,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyze every endpoint file and write the artifact once.
    Generate(generate::GenerateArgs),
    /// Keep the artifact current from a stream of changed paths.
    Watch(watch::WatchArgs),
}

#[tokio::main]
async fn main() -> CliResult<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.project.resolve()?;

    match &cli.command {
        Commands::Generate(args) => generate::execute(args, &config).await?,
        Commands::Watch(args) => watch::execute(args, &config).await?,
    }

    Ok(())
}
