#![deny(missing_docs)]

//! # Watch Command
//!
//! Keeps the artifact current while a dev server runs. After an initial full scan,
//! changed paths are read from stdin, one per line, so any file watcher can drive
//! it:
//!
//! ```text
//! inotifywait -m -r -e close_write,delete,moved_to --format '%w%f' src/routes | routegen watch
//! ```
//!
//! The command exits once stdin closes, after flushing pending changes.

use crate::error::CliResult;
use routegen_core::{Controller, GeneratorConfig};
use std::path::PathBuf;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Arguments for the watch command.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct WatchArgs {
    /// Skip the initial full scan and start from an empty registry.
    #[clap(long)]
    pub no_initial_scan: bool,
}

/// Executes the watch command on stdin.
pub async fn execute(args: &WatchArgs, config: &GeneratorConfig) -> CliResult<()> {
    watch(args, config, BufReader::new(tokio::io::stdin())).await
}

async fn watch<R>(args: &WatchArgs, config: &GeneratorConfig, input: R) -> CliResult<()>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    let mut controller = Controller::new(config);
    if !args.no_initial_scan {
        controller.start().await?;
    }

    let (tx, rx) = mpsc::channel(64);
    let reader = tokio::spawn(forward_lines(input, tx));

    info!(
        debounce_ms = config.debounce_ms,
        "watching for changed paths on stdin"
    );
    controller.run(rx).await?;

    if let Err(err) = reader.await {
        warn!(%err, "stdin reader stopped unexpectedly");
    }
    Ok(())
}

async fn forward_lines<R>(input: R, tx: mpsc::Sender<PathBuf>)
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if tx.send(PathBuf::from(line)).await.is_err() {
                    break;
                }
            }
            Ok(None) => break,
            Err(err) => {
                warn!(%err, "failed to read from stdin");
                break;
            }
        }
    }
}
