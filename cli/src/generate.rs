#![deny(missing_docs)]

//! # Generate Command
//!
//! One full scan of the routes directory followed by a single artifact write.
//! With `--check` nothing is written; the command fails when the artifact on disk
//! is stale, which suits CI.

use crate::error::{CliError, CliResult};
use routegen_core::codegen::{self, CodegenOptions};
use routegen_core::controller::{ArtifactSink, Controller};
use routegen_core::{AppResult, Analyzer, GeneratorConfig, Registry};
use std::fs;
use std::path::PathBuf;
use tracing::info;

/// Arguments for the generate command.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct GenerateArgs {
    /// Only verify that the artifact is up to date.
    #[clap(long)]
    pub check: bool,
}

/// Compares the would-be artifact with the one on disk.
struct CheckSink {
    path: PathBuf,
    options: CodegenOptions,
    up_to_date: bool,
}

impl ArtifactSink for CheckSink {
    fn emit(&mut self, registry: &Registry) -> AppResult<()> {
        let expected = codegen::serialize(registry, &self.options)?;
        self.up_to_date = fs::read_to_string(&self.path).is_ok_and(|actual| actual == expected);
        Ok(())
    }
}

/// Executes the generate command.
pub async fn execute(args: &GenerateArgs, config: &GeneratorConfig) -> CliResult<()> {
    if !args.check {
        let mut controller = Controller::new(config);
        controller.start().await?;
        info!(routes = controller.registry().len(), "generation complete");
        return Ok(());
    }

    let sink = CheckSink {
        path: config.artifact_path(),
        options: CodegenOptions::from(config),
        up_to_date: false,
    };
    let mut controller = Controller::with_sink(Analyzer::new(config), config.debounce(), sink);
    controller.start().await?;

    if controller.sink().up_to_date {
        info!(artifact = %config.artifact_path().display(), "artifact is up to date");
        Ok(())
    } else {
        Err(CliError::General(format!(
            "{} is out of date, run `routegen generate`",
            config.artifact_path().display()
        )))
    }
}
