use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::trigger::TriggerSignal;

/// Configuration for one supervised external process.
///
/// Deserializes from a TOML table such as:
///
/// ```toml
/// command = ["/usr/local/bin/my-plugin", "--verbose"]
/// environment = { PLUGIN_MODE = "fast" }
/// restart_delay_ms = 10000
/// signal = "SIGUSR1"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecdConfig {
    /// Name used in logs. Defaults to the program's file name.
    #[serde(default)]
    pub name: Option<String>,
    /// Program path followed by its arguments.
    pub command: Vec<String>,
    /// Environment overrides merged over the agent's own environment.
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
    /// Wait after an unexpected exit before starting the next process.
    #[serde(default = "default_restart_delay_ms")]
    pub restart_delay_ms: u64,
    /// Trigger delivered by `trigger_flush`.
    #[serde(default)]
    pub signal: TriggerSignal,
    /// How long `stop` waits for the process to exit before killing it.
    #[serde(default = "default_stop_timeout_ms")]
    pub stop_timeout_ms: u64,
}

impl ExecdConfig {
    pub const DEFAULT_RESTART_DELAY_MS: u64 = 10_000;
    pub const DEFAULT_STOP_TIMEOUT_MS: u64 = 5_000;

    /// Build a config for `command` with default delays and no trigger.
    pub fn new<I, S>(command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: None,
            command: command.into_iter().map(Into::into).collect(),
            environment: BTreeMap::new(),
            restart_delay_ms: Self::DEFAULT_RESTART_DELAY_MS,
            signal: TriggerSignal::None,
            stop_timeout_ms: Self::DEFAULT_STOP_TIMEOUT_MS,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }

    pub fn with_restart_delay(mut self, delay: Duration) -> Self {
        self.restart_delay_ms = delay.as_millis() as u64;
        self
    }

    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_signal(mut self, signal: TriggerSignal) -> Self {
        self.signal = signal;
        self
    }

    pub fn restart_delay(&self) -> Duration {
        Duration::from_millis(self.restart_delay_ms)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }

    /// The configured name, or the program's file name.
    pub fn display_name(&self) -> String {
        if let Some(name) = &self.name {
            return name.clone();
        }
        self.command
            .first()
            .map(|program| {
                Path::new(program)
                    .file_name()
                    .map(|f| f.to_string_lossy().into_owned())
                    .unwrap_or_else(|| program.clone())
            })
            .unwrap_or_else(|| "execd".to_string())
    }

    /// The command as a single string, for error messages.
    pub fn command_line(&self) -> String {
        self.command.join(" ")
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.command.first().is_none_or(|p| p.is_empty()) {
            return Err(ConfigError::EmptyCommand);
        }
        if self.stop_timeout_ms == 0 {
            return Err(ConfigError::ZeroDuration {
                field: "stop_timeout_ms",
            });
        }
        Ok(())
    }
}

fn default_restart_delay_ms() -> u64 {
    ExecdConfig::DEFAULT_RESTART_DELAY_MS
}

fn default_stop_timeout_ms() -> u64 {
    ExecdConfig::DEFAULT_STOP_TIMEOUT_MS
}
