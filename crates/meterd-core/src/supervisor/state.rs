//! Supervisor lifecycle states.

use std::fmt;

/// Where a [`super::Supervisor`] is in its lifecycle.
///
/// ```text
/// Stopped --start--> Starting --spawned--> Running --exit--> Crashed
///                                                              |
///           Starting <--------- restart delay ----------------+
///
/// Starting | Running | Crashed --stop--> Stopping --drained--> Stopped
/// ```
///
/// A spawn failure in `start` goes straight back to `Stopped`; during a
/// restart it goes back to `Crashed` and waits again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SupervisorState {
    #[default]
    Stopped,
    Starting,
    Running,
    Crashed,
    Stopping,
}

impl SupervisorState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SupervisorState::Stopped => "stopped",
            SupervisorState::Starting => "starting",
            SupervisorState::Running => "running",
            SupervisorState::Crashed => "crashed",
            SupervisorState::Stopping => "stopping",
        }
    }

    /// Whether `stop` has work to do in this state.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            SupervisorState::Starting | SupervisorState::Running | SupervisorState::Crashed
        )
    }
}

impl fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
