#![deny(missing_docs)]

//! # Generator Configuration
//!
//! Where endpoint files live, where companion type files are looked up, and where the
//! artifact is written. Every path is relative to `root` unless absolute.

use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default configuration file name looked up in the project root.
pub const CONFIG_FILE: &str = "routegen.yml";

/// Settings shared by the analyzer, the artifact writer and the controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    /// Project root.
    pub root: PathBuf,
    /// Directory holding the endpoint tree (e.g. `src/routes`).
    pub routes_dir: PathBuf,
    /// File name marking an endpoint (e.g. `server.rs`).
    pub endpoint_file: String,
    /// Directory the host framework writes companion type files into.
    pub types_dir: PathBuf,
    /// Companion type file name inside each mirrored route directory.
    pub types_file: String,
    /// Generated artifact path.
    pub artifact: PathBuf,
    /// Crate path the artifact imports `Endpoint`, `Method` and `NoData` from.
    pub runtime_crate: String,
    /// Quiet period before a burst of changes is flushed, in milliseconds.
    pub debounce_ms: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            routes_dir: PathBuf::from("src/routes"),
            endpoint_file: "server.rs".to_string(),
            types_dir: PathBuf::from(".routegen/types"),
            types_file: "types.rs".to_string(),
            artifact: PathBuf::from("src/api.rs"),
            runtime_crate: "routegen".to_string(),
            debounce_ms: 300,
        }
    }
}

impl GeneratorConfig {
    /// Default settings rooted at `root`.
    pub fn for_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Reads a YAML configuration file. Missing keys keep their defaults.
    ///
    /// A relative `root` inside the file is resolved against the file's directory.
    pub fn load(path: &Path) -> AppResult<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read {:?}: {}", path, e)))?;
        let mut config: Self = serde_yaml::from_str(&text)
            .map_err(|e| AppError::Config(format!("Failed to parse {:?}: {}", path, e)))?;

        if config.root.is_relative() {
            if let Some(dir) = path.parent() {
                config.root = dir.join(&config.root);
            }
        }
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings the pipeline can't work with.
    pub fn validate(&self) -> AppResult<()> {
        if self.endpoint_file.is_empty() || self.endpoint_file.contains(['/', '\\']) {
            return Err(AppError::Config(format!(
                "endpoint_file must be a bare file name, got {:?}",
                self.endpoint_file
            )));
        }
        if self.types_file.is_empty() || self.types_file.contains(['/', '\\']) {
            return Err(AppError::Config(format!(
                "types_file must be a bare file name, got {:?}",
                self.types_file
            )));
        }
        if self.runtime_crate.is_empty() {
            return Err(AppError::Config("runtime_crate must not be empty".into()));
        }
        Ok(())
    }

    /// Resolves a configured path against `root`.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    /// Absolute routes directory.
    pub fn routes_path(&self) -> PathBuf {
        self.resolve(&self.routes_dir)
    }

    /// Absolute artifact path.
    pub fn artifact_path(&self) -> PathBuf {
        self.resolve(&self.artifact)
    }

    /// The debounce window.
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}
