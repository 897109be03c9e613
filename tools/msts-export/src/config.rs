//! Converter configuration (optional TOML file)
//!
//! ```toml
//! verbosity = "verbose"
//! optimize_controllers = true
//! compare_tcb_shape = false
//! texture_dirs = ["../GLOBAL/TEXTURES"]
//! workers = 4
//! run_seed = 1234
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// How much the converter reports while working.
///
/// Only picks the default log filter; `RUST_LOG` replaces it when set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    Quiet,
    #[default]
    Normal,
    Verbose,
}

impl Verbosity {
    /// Default tracing directive for this verbosity
    pub fn level(self) -> tracing::Level {
        match self {
            Self::Quiet => tracing::Level::WARN,
            Self::Normal => tracing::Level::INFO,
            Self::Verbose => tracing::Level::DEBUG,
        }
    }

    /// Log filter from `RUST_LOG` style directives, falling back to
    /// [`Self::level`] when `directives` is empty
    pub fn env_filter(self, directives: &str) -> EnvFilter {
        EnvFilter::builder()
            .with_default_directive(self.level().into())
            .parse_lossy(directives)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConvertConfig {
    pub verbosity: Verbosity,

    /// Drop animation controllers whose keys never change.
    /// Default: true
    pub optimize_controllers: bool,

    /// Also compare TCB tension/continuity/bias/ease when deciding whether a
    /// controller is constant. Off collapses keys that differ only in easing.
    /// Default: false
    pub compare_tcb_shape: bool,

    /// Extra directories searched for shape textures, after the shape's own
    /// directory and its `../TEXTURES` sibling
    pub texture_dirs: Vec<PathBuf>,

    /// Batch worker count (default: one per core)
    pub workers: Option<usize>,

    /// Seed for material-name disambiguators (default: random per run)
    pub run_seed: Option<u64>,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            verbosity: Verbosity::Normal,
            optimize_controllers: true,
            compare_tcb_shape: false,
            texture_dirs: Vec::new(),
            workers: None,
            run_seed: None,
        }
    }
}

impl ConvertConfig {
    pub fn parse(source: &str) -> Result<Self> {
        toml::from_str(source).context("Failed to parse converter config")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        Self::parse(&source).with_context(|| format!("Invalid config: {}", path.display()))
    }
}
