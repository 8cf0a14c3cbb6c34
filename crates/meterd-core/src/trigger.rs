//! Out-of-band trigger selection.
//!
//! A trigger asks the external process to produce output outside of the
//! normal pipe traffic, e.g. an input plugin that gathers on SIGUSR1.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// How the supervisor nudges its external process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TriggerSignal {
    /// Never trigger.
    #[default]
    None,
    Sighup,
    Sigusr1,
    Sigusr2,
    /// Write a single `\n` to the process's stdin.
    Stdin,
}

impl TriggerSignal {
    /// Whether this trigger is delivered as an OS signal.
    pub fn is_os_signal(self) -> bool {
        matches!(
            self,
            TriggerSignal::Sighup | TriggerSignal::Sigusr1 | TriggerSignal::Sigusr2
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TriggerSignal::None => "none",
            TriggerSignal::Sighup => "SIGHUP",
            TriggerSignal::Sigusr1 => "SIGUSR1",
            TriggerSignal::Sigusr2 => "SIGUSR2",
            TriggerSignal::Stdin => "STDIN",
        }
    }
}

impl fmt::Display for TriggerSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TriggerSignal {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" | "" => Ok(TriggerSignal::None),
            "SIGHUP" => Ok(TriggerSignal::Sighup),
            "SIGUSR1" => Ok(TriggerSignal::Sigusr1),
            "SIGUSR2" => Ok(TriggerSignal::Sigusr2),
            "STDIN" => Ok(TriggerSignal::Stdin),
            other => Err(ConfigError::UnknownSignal(other.to_string())),
        }
    }
}

impl TryFrom<String> for TriggerSignal {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TriggerSignal> for String {
    fn from(value: TriggerSignal) -> Self {
        value.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_known_names() {
        assert_eq!("SIGHUP".parse::<TriggerSignal>().unwrap(), TriggerSignal::Sighup);
        assert_eq!("SIGUSR1".parse::<TriggerSignal>().unwrap(), TriggerSignal::Sigusr1);
        assert_eq!("SIGUSR2".parse::<TriggerSignal>().unwrap(), TriggerSignal::Sigusr2);
        assert_eq!("STDIN".parse::<TriggerSignal>().unwrap(), TriggerSignal::Stdin);
        assert_eq!("none".parse::<TriggerSignal>().unwrap(), TriggerSignal::None);
    }

    #[test]
    fn parse_unknown_name_is_config_error() {
        let err = "SIGKILL".parse::<TriggerSignal>().unwrap_err();
        assert!(matches!(err, ConfigError::UnknownSignal(ref s) if s == "SIGKILL"));
    }

    #[test]
    fn display_round_trips_through_from_str() {
        for signal in [
            TriggerSignal::None,
            TriggerSignal::Sighup,
            TriggerSignal::Sigusr1,
            TriggerSignal::Sigusr2,
            TriggerSignal::Stdin,
        ] {
            assert_eq!(signal.to_string().parse::<TriggerSignal>().unwrap(), signal);
        }
    }

    #[test]
    fn only_posix_variants_are_os_signals() {
        assert!(TriggerSignal::Sigusr1.is_os_signal());
        assert!(!TriggerSignal::Stdin.is_os_signal());
        assert!(!TriggerSignal::None.is_os_signal());
    }
}
