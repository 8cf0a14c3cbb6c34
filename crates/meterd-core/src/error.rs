//! Errors surfaced by the host-side engine.

use std::io;

use tokio_util::codec::LinesCodecError;

use crate::codec::{CodecError, ParseError};
use crate::trigger::TriggerSignal;

/// Errors from [`crate::Supervisor`] operations.
///
/// `Stream` and `ProcessExit` are never returned to callers; the reader and
/// monitor tasks build them so that logs carry the same wording.
#[derive(Debug, thiserror::Error)]
pub enum ExecdError {
    #[error("failed to start external process `{command}`: {source}")]
    Startup {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("supervisor is already running")]
    AlreadyRunning,

    #[error("no external process is running")]
    NotRunning,

    #[error("failed to write to external process stdin: {0}")]
    Write(#[source] io::Error),

    #[error(transparent)]
    Encode(CodecError),

    #[error("failed to read external process stdout: {0}")]
    Stream(#[source] CodecError),

    #[error("external process (generation {generation}) exited: {status}")]
    ProcessExit { generation: u64, status: String },

    #[error(transparent)]
    Signal(#[from] SignalError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ExecdError {
    /// Whether this is a write that failed because the child closed its stdin.
    pub fn is_broken_pipe(&self) -> bool {
        matches!(self, ExecdError::Write(e) if e.kind() == io::ErrorKind::BrokenPipe)
    }
}

/// Errors delivering a trigger. Always non-fatal.
#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    #[error("{signal} is not supported by the {backend} process control backend")]
    Unsupported {
        signal: TriggerSignal,
        backend: &'static str,
    },

    #[error("failed to send {signal} to pid {pid}: {source}")]
    Delivery {
        signal: TriggerSignal,
        pid: u32,
        #[source]
        source: io::Error,
    },

    #[error("timed out writing trigger newline to stdin")]
    StdinTimeout,

    #[error("failed to write trigger newline to stdin: {0}")]
    StdinWrite(#[source] io::Error),
}

/// Errors that end a [`crate::Shim`] run.
#[derive(Debug, thiserror::Error)]
pub enum ShimError {
    #[error("no processor configured")]
    NoProcessor,

    #[error("no input configured")]
    NoInput,

    #[error("a plugin is already configured")]
    PluginAlreadySet,

    #[error("malformed input: {0}")]
    Malformed(#[source] ParseError),

    #[error("failed to read input: {0}")]
    Read(#[source] CodecError),

    #[error("failed to write output: {0}")]
    Write(#[source] CodecError),

    #[error("failed to read trigger from stdin: {0}")]
    Trigger(#[source] LinesCodecError),

    #[error("failed to install signal handler: {0}")]
    SignalSetup(#[source] io::Error),
}

/// Invalid external-process configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("command must name a program to run")]
    EmptyCommand,

    #[error("invalid signal {0:?} (expected SIGHUP, SIGUSR1, SIGUSR2, STDIN or none)")]
    UnknownSignal(String),

    #[error("{field} must be greater than zero")]
    ZeroDuration { field: &'static str },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broken_pipe_detection() {
        let err = ExecdError::Write(io::Error::from(io::ErrorKind::BrokenPipe));
        assert!(err.is_broken_pipe());
        let err = ExecdError::Write(io::Error::from(io::ErrorKind::WouldBlock));
        assert!(!err.is_broken_pipe());
        assert!(!ExecdError::NotRunning.is_broken_pipe());
    }

    #[test]
    fn startup_error_names_command() {
        let err = ExecdError::Startup {
            command: "/no/such/plugin --flag".to_string(),
            source: io::Error::from(io::ErrorKind::NotFound),
        };
        assert!(err.to_string().contains("/no/such/plugin --flag"));
    }
}
