#![deny(missing_docs)]

//! # Project Arguments
//!
//! Options shared by every command. Settings are layered: defaults, then
//! `routegen.yml` (or `--config`), then flags and their environment variables.

use crate::error::CliResult;
use routegen_core::config::{GeneratorConfig, CONFIG_FILE};
use std::fs;
use std::path::PathBuf;
use tracing::debug;

/// Where the project lives and how it is laid out.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct ProjectArgs {
    /// Project root. A configuration file sets its own root, relative to the file.
    #[clap(long, env = "ROUTEGEN_ROOT", default_value = ".")]
    pub root: PathBuf,

    /// Configuration file. Defaults to `routegen.yml` in the root, when present.
    #[clap(long, env = "ROUTEGEN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory holding the endpoint tree, relative to the root.
    #[clap(long, env = "ROUTEGEN_ROUTES_DIR")]
    pub routes_dir: Option<PathBuf>,

    /// Artifact path, relative to the root.
    #[clap(long, env = "ROUTEGEN_ARTIFACT")]
    pub artifact: Option<PathBuf>,

    /// Crate path the artifact imports its runtime items from.
    #[clap(long, env = "ROUTEGEN_RUNTIME_CRATE")]
    pub runtime_crate: Option<String>,

    /// Quiet period before a burst of changes is written out.
    #[clap(long, env = "ROUTEGEN_DEBOUNCE_MS")]
    pub debounce_ms: Option<u64>,
}

impl ProjectArgs {
    /// Resolves the effective configuration.
    pub fn resolve(&self) -> CliResult<GeneratorConfig> {
        let root = fs::canonicalize(&self.root)?;

        let file = match &self.config {
            Some(path) => Some(path.clone()),
            None => Some(root.join(CONFIG_FILE)).filter(|p| p.is_file()),
        };
        let mut config = match &file {
            Some(path) => {
                debug!(config = %path.display(), "loading configuration");
                GeneratorConfig::load(path)?
            }
            None => GeneratorConfig::for_root(&root),
        };

        if let Some(routes_dir) = &self.routes_dir {
            config.routes_dir = routes_dir.clone();
        }
        if let Some(artifact) = &self.artifact {
            config.artifact = artifact.clone();
        }
        if let Some(runtime_crate) = &self.runtime_crate {
            config.runtime_crate = runtime_crate.clone();
        }
        if let Some(debounce_ms) = self.debounce_ms {
            config.debounce_ms = debounce_ms;
        }

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_the_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE),
            "artifact: src/gen.rs\ndebounce_ms: 10\n",
        )
        .unwrap();

        let args = ProjectArgs {
            root: dir.path().to_path_buf(),
            debounce_ms: Some(50),
            ..ProjectArgs::default()
        };
        let config = args.resolve().unwrap();
        assert_eq!(config.artifact, PathBuf::from("src/gen.rs"));
        assert_eq!(config.debounce_ms, 50);
        assert_eq!(config.root, fs::canonicalize(dir.path()).unwrap());
    }

    #[test]
    fn test_defaults_without_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let args = ProjectArgs {
            root: dir.path().to_path_buf(),
            ..ProjectArgs::default()
        };
        let config = args.resolve().unwrap();
        assert_eq!(config.routes_dir, PathBuf::from("src/routes"));
    }
}
