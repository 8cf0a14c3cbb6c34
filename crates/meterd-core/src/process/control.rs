//! Signal delivery to external processes.
//!
//! The supervisor talks to a [`ProcessControl`] and never checks the target
//! platform itself. Unix builds get [`PosixControl`]; everything else gets
//! [`NoopControl`], which logs and carries on.

use std::fmt;
use std::sync::Arc;

use tracing::warn;

use crate::error::SignalError;
use crate::trigger::TriggerSignal;

/// Delivers OS-level triggers to a process by pid.
pub trait ProcessControl: Send + Sync + fmt::Debug {
    /// Backend name for logs and errors.
    fn name(&self) -> &'static str;

    /// Whether `signal` can be delivered by this backend.
    fn supports(&self, signal: TriggerSignal) -> bool;

    /// Deliver `signal` to `pid`.
    fn signal(&self, pid: u32, signal: TriggerSignal) -> Result<(), SignalError>;
}

/// The backend for the current build target.
pub fn platform_control() -> Arc<dyn ProcessControl> {
    #[cfg(unix)]
    {
        Arc::new(PosixControl)
    }
    #[cfg(not(unix))]
    {
        Arc::new(NoopControl)
    }
}

/// Sends real signals with `kill(2)`.
#[cfg(unix)]
#[derive(Debug, Default, Clone, Copy)]
pub struct PosixControl;

#[cfg(unix)]
impl PosixControl {
    fn signal_number(signal: TriggerSignal) -> Option<libc::c_int> {
        match signal {
            TriggerSignal::Sighup => Some(libc::SIGHUP),
            TriggerSignal::Sigusr1 => Some(libc::SIGUSR1),
            TriggerSignal::Sigusr2 => Some(libc::SIGUSR2),
            TriggerSignal::Stdin | TriggerSignal::None => None,
        }
    }
}

#[cfg(unix)]
impl ProcessControl for PosixControl {
    fn name(&self) -> &'static str {
        "posix"
    }

    fn supports(&self, signal: TriggerSignal) -> bool {
        Self::signal_number(signal).is_some()
    }

    fn signal(&self, pid: u32, signal: TriggerSignal) -> Result<(), SignalError> {
        let signo = Self::signal_number(signal).ok_or(SignalError::Unsupported {
            signal,
            backend: self.name(),
        })?;
        let pid = libc::pid_t::try_from(pid).map_err(|_| SignalError::Delivery {
            signal,
            pid,
            source: std::io::Error::from(std::io::ErrorKind::InvalidInput),
        })?;

        // SAFETY: kill(2) has no memory-safety preconditions; pid comes from
        // a child this process spawned.
        let ret = unsafe { libc::kill(pid, signo) };
        if ret != 0 {
            return Err(SignalError::Delivery {
                signal,
                pid: pid as u32,
                source: std::io::Error::last_os_error(),
            });
        }
        Ok(())
    }
}

/// Backend for targets without signal delivery: every OS signal is a no-op.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopControl;

impl ProcessControl for NoopControl {
    fn name(&self) -> &'static str {
        "noop"
    }

    fn supports(&self, _signal: TriggerSignal) -> bool {
        false
    }

    fn signal(&self, pid: u32, signal: TriggerSignal) -> Result<(), SignalError> {
        warn!(pid, %signal, "signal delivery is not available on this platform, ignoring trigger");
        Ok(())
    }
}
