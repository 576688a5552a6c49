//! Configuration loading
//!
//! Resolution priority order:
//! 1. Command-line `--config` path (highest priority)
//! 2. `WELLFORM_CONFIG` environment variable
//! 3. Platform config directory (`<config dir>/wellform/config.toml`)
//! 4. Built-in defaults (fallback)

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;
use wellform_common::{Error, Result, ToleratedValues};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV: &str = "WELLFORM_CONFIG";

/// Engine configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FvConfig {
    /// Run full verification by default
    pub full_check: bool,
    /// Extra tolerated placeholder values, in wire form
    pub tolerated: Vec<String>,
    /// Pretty-print the JSON report
    pub pretty: bool,
}

impl FvConfig {
    /// Load configuration following the priority order
    pub fn load(cli_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = cli_path {
            return Self::from_file(path);
        }

        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Self::from_file(Path::new(&path));
        }

        if let Some(path) = default_config_path() {
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Parse a specific TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("cannot parse {}: {e}", path.display())))?;
        debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// The tolerated-value set: defaults plus configured extras
    pub fn tolerated_values(&self) -> ToleratedValues {
        let mut tolerated = ToleratedValues::default();
        for value in &self.tolerated {
            tolerated.insert(value.as_str());
        }
        tolerated
    }
}

/// Platform default config path (`<config dir>/wellform/config.toml`)
fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("wellform").join("config.toml"))
}
