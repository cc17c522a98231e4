#![deny(missing_docs)]

//! # Incremental Update Controller
//!
//! Owns the registry. A full scan at startup analyzes every endpoint file in
//! parallel and emits the artifact once; afterwards each changed file is
//! re-analyzed on its own and emits are debounced so a burst of saves produces a
//! single write.

use crate::analyzer::{AnalysisResult, Analyzer};
use crate::codegen::{self, CodegenOptions};
use crate::config::GeneratorConfig;
use crate::error::AppResult;
use crate::registry::Registry;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info};

/// State of the debounce machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushState {
    /// Nothing to write.
    Idle,
    /// A write is due at `deadline` unless another change arrives first.
    PendingFlush {
        /// When the quiet period ends.
        deadline: Instant,
    },
}

/// Collapses bursts of changes into one flush per quiet period.
///
/// Time is supplied by the caller, which keeps the machine deterministic under test.
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    state: FlushState,
}

impl Debouncer {
    /// A debouncer waiting `window` after the last change.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            state: FlushState::Idle,
        }
    }

    /// Current state.
    pub fn state(&self) -> FlushState {
        self.state
    }

    /// Pending deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            FlushState::PendingFlush { deadline } => Some(deadline),
            FlushState::Idle => None,
        }
    }

    /// Records a change at `now`, (re)starting the quiet period.
    pub fn notify(&mut self, now: Instant) {
        self.state = FlushState::PendingFlush {
            deadline: now + self.window,
        };
    }

    /// Returns `true` exactly once when the quiet period has elapsed.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.state {
            FlushState::PendingFlush { deadline } if now >= deadline => {
                self.state = FlushState::Idle;
                true
            }
            _ => false,
        }
    }

    /// Drops any pending flush, returning whether one was pending.
    pub fn take_pending(&mut self) -> bool {
        let pending = matches!(self.state, FlushState::PendingFlush { .. });
        self.state = FlushState::Idle;
        pending
    }
}

/// Destination of the serialized registry.
pub trait ArtifactSink: Send {
    /// Writes the registry out.
    fn emit(&mut self, registry: &Registry) -> AppResult<()>;
}

/// Writes the generated module to the configured artifact path.
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
    options: CodegenOptions,
}

impl FileSink {
    /// A sink writing where `config` says.
    pub fn new(config: &GeneratorConfig) -> Self {
        Self {
            path: config.artifact_path(),
            options: CodegenOptions::from(config),
        }
    }

    /// The artifact path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ArtifactSink for FileSink {
    fn emit(&mut self, registry: &Registry) -> AppResult<()> {
        codegen::emit(registry, &self.path, &self.options)
    }
}

/// Drives analysis, the registry and artifact emission.
pub struct Controller<S: ArtifactSink = FileSink> {
    analyzer: Analyzer,
    registry: Registry,
    debouncer: Debouncer,
    sink: S,
}

impl Controller<FileSink> {
    /// A controller writing the artifact configured in `config`.
    pub fn new(config: &GeneratorConfig) -> Self {
        Self::with_sink(Analyzer::new(config), config.debounce(), FileSink::new(config))
    }
}

impl<S: ArtifactSink> Controller<S> {
    /// A controller with a custom analyzer and sink.
    pub fn with_sink(analyzer: Analyzer, debounce: Duration, sink: S) -> Self {
        Self {
            analyzer,
            registry: Registry::new(),
            debouncer: Debouncer::new(debounce),
            sink,
        }
    }

    /// The current registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The artifact sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// The debounce machine.
    pub fn debouncer(&self) -> &Debouncer {
        &self.debouncer
    }

    /// Analyzes every endpoint file concurrently, rebuilds the registry from the
    /// results and emits once.
    ///
    /// A file that fails to analyze is logged and skipped; the rest of the batch is
    /// still merged. Routes whose files are gone are dropped.
    pub async fn start(&mut self) -> AppResult<()> {
        let files = self.analyzer.layout().discover();
        info!(
            routes_dir = %self.analyzer.layout().routes_dir().display(),
            files = files.len(),
            "scanning endpoint files"
        );

        let mut tasks = JoinSet::new();
        for path in files {
            let analyzer = self.analyzer.clone();
            tasks.spawn_blocking(move || {
                let result = analyzer.analyze_file(&path);
                (path, result)
            });
        }

        let mut results: Vec<AnalysisResult> = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(result))) => results.push(result),
                Ok((path, Err(err))) => {
                    error!(file = %path.display(), %err, "analysis failed");
                }
                Err(err) => error!(%err, "analysis task did not complete"),
            }
        }

        // Completion order is arbitrary.
        results.sort_by(|a, b| a.source.cmp(&b.source));
        self.registry.replace_all(results);

        self.sink.emit(&self.registry)
    }

    /// Applies one file change observed at `now`. Returns whether the registry
    /// changed.
    ///
    /// Paths that are not endpoint files are ignored. A file that no longer exists
    /// is removed from the registry. A file that fails to analyze keeps its
    /// previous entry.
    pub fn handle_change(&mut self, path: &Path, now: Instant) -> bool {
        let Some((route_id, path)) = self.locate(path) else {
            return false;
        };
        let analysis = path.exists().then(|| self.analyzer.analyze_file(&path));
        self.apply(&route_id, &path, analysis, now)
    }

    /// Like [`Controller::handle_change`], with the file read and parsed on the
    /// blocking thread pool.
    pub async fn handle_change_blocking(&mut self, path: &Path) -> bool {
        let Some((route_id, path)) = self.locate(path) else {
            return false;
        };
        let analyzer = self.analyzer.clone();
        let task_path = path.clone();
        let joined = tokio::task::spawn_blocking(move || {
            task_path.exists().then(|| analyzer.analyze_file(&task_path))
        })
        .await;

        match joined {
            Ok(analysis) => self.apply(&route_id, &path, analysis, Instant::now()),
            Err(err) => {
                error!(file = %path.display(), %err, "analysis task did not complete");
                false
            }
        }
    }

    fn locate(&self, path: &Path) -> Option<(String, PathBuf)> {
        let layout = self.analyzer.layout();
        let route_id = layout.route_id(path)?;
        Some((route_id, layout.absolute(path)))
    }

    /// `analysis` is `None` when the file no longer exists.
    fn apply(
        &mut self,
        route_id: &str,
        path: &Path,
        analysis: Option<AppResult<AnalysisResult>>,
        now: Instant,
    ) -> bool {
        let changed = match analysis {
            Some(Ok(result)) => self.registry.merge(route_id, result),
            Some(Err(err)) => {
                error!(file = %path.display(), %err, "analysis failed");
                false
            }
            None => {
                debug!(file = %path.display(), "endpoint file removed");
                self.registry.remove_source(path)
            }
        };

        if changed {
            debug!(route = %route_id, generation = self.registry.generation(), "registry updated");
            self.debouncer.notify(now);
        }
        changed
    }

    /// Emits the artifact if the quiet period has elapsed at `now`. Returns whether
    /// an emit happened.
    pub fn tick(&mut self, now: Instant) -> AppResult<bool> {
        if !self.debouncer.poll(now) {
            return Ok(false);
        }
        self.sink.emit(&self.registry)?;
        Ok(true)
    }

    /// Consumes changed paths until the channel closes, then flushes anything still
    /// pending.
    pub async fn run(&mut self, mut changes: mpsc::Receiver<PathBuf>) -> AppResult<()> {
        loop {
            let deadline = self.debouncer.deadline();
            let wake = deadline.unwrap_or_else(|| Instant::now() + Duration::from_secs(3600));

            tokio::select! {
                change = changes.recv() => match change {
                    Some(path) => {
                        self.handle_change_blocking(&path).await;
                    }
                    None => break,
                },
                _ = sleep_until(wake), if deadline.is_some() => {
                    self.tick(Instant::now())?;
                }
            }
        }

        if self.debouncer.take_pending() {
            self.sink.emit(&self.registry)?;
        }
        info!("change stream closed");
        Ok(())
    }
}
