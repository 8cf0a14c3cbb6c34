//! Agent configuration file.
//!
//! `meterd.toml` lists the external processes to run:
//!
//! ```toml
//! [[inputs]]
//! command = ["/usr/local/bin/gather-disk"]
//! signal = "STDIN"
//! interval_ms = 10000
//!
//! [[processors]]
//! command = ["meterd", "shim", "add-tag", "--option", "key=host", "--option", "value=web1"]
//! ```
//!
//! Path resolution chain: `--config` flag > `METERD_CONFIG` env var >
//! `$XDG_CONFIG_HOME/meterd/meterd.toml` > `~/.config/meterd/meterd.toml`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use meterd_core::{ConfigError, ExecdConfig};

pub const CONFIG_ENV: &str = "METERD_CONFIG";

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default)]
    pub inputs: Vec<InputConfig>,
    #[serde(default)]
    pub processors: Vec<ExecdConfig>,
}

/// An external process polled on a fixed period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    #[serde(flatten)]
    pub execd: ExecdConfig,
    /// How often the input's trigger fires.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

impl InputConfig {
    pub const DEFAULT_INTERVAL_MS: u64 = 10_000;

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

fn default_interval_ms() -> u64 {
    InputConfig::DEFAULT_INTERVAL_MS
}

impl AgentConfig {
    /// Check every entry; the first problem found is returned.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for input in &self.inputs {
            input.execd.validate()?;
            if input.interval_ms == 0 {
                return Err(ConfigError::ZeroDuration {
                    field: "interval_ms",
                });
            }
        }
        for processor in &self.processors {
            processor.validate()?;
        }
        Ok(())
    }
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the meterd config directory: `$XDG_CONFIG_HOME/meterd` or
/// `~/.config/meterd`.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("meterd");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("meterd")
}

/// Resolve the config path from the flag, the environment, or the default.
pub fn resolve_config_path(cli: Option<&Path>) -> PathBuf {
    resolve_config_path_with(
        cli,
        std::env::var(CONFIG_ENV).ok(),
        config_dir().join("meterd.toml"),
    )
}

fn resolve_config_path_with(cli: Option<&Path>, env: Option<String>, default: PathBuf) -> PathBuf {
    if let Some(path) = cli {
        return path.to_path_buf();
    }
    match env {
        Some(path) if !path.is_empty() => PathBuf::from(path),
        _ => default,
    }
}

// -----------------------------------------------------------------------
// Loading
// -----------------------------------------------------------------------

/// Read, parse and validate the config file at `path`.
pub fn load_config(path: &Path) -> Result<AgentConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    parse_config(&contents).with_context(|| format!("invalid config file {}", path.display()))
}

fn parse_config(contents: &str) -> Result<AgentConfig> {
    let config: AgentConfig = toml::from_str(contents).context("failed to parse config")?;
    config.validate()?;
    Ok(config)
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------
