//! Spawned external processes and the OS facilities used to control them.

pub mod control;

use std::io;
use std::process::{ExitStatus, Stdio};

use tokio::process::{Child, ChildStdin, ChildStdout, Command};

use crate::config::ExecdConfig;
use crate::error::{ConfigError, ExecdError};

pub use control::{NoopControl, ProcessControl, platform_control};
#[cfg(unix)]
pub use control::PosixControl;

/// One running external process and its standard streams.
///
/// stdin and stdout are piped and handed out once via `take_*`; stderr is
/// inherited so the plugin's diagnostics land in the agent's log stream.
#[derive(Debug)]
pub struct ProcessHandle {
    child: Child,
    pid: u32,
    stdin: Option<ChildStdin>,
    stdout: Option<ChildStdout>,
}

impl ProcessHandle {
    /// Spawn `config.command` with the configured environment overrides.
    pub fn spawn(config: &ExecdConfig) -> Result<Self, ExecdError> {
        let (program, args) = config
            .command
            .split_first()
            .ok_or(ExecdError::Config(ConfigError::EmptyCommand))?;

        let mut cmd = Command::new(program);
        cmd.args(args)
            .envs(&config.environment)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        let startup_error = |source: io::Error| ExecdError::Startup {
            command: config.command_line(),
            source,
        };

        let mut child = cmd.spawn().map_err(startup_error)?;
        let pid = child
            .id()
            .ok_or_else(|| startup_error(io::Error::other("process exited before reporting a pid")))?;
        let stdin = child.stdin.take();
        let stdout = child.stdout.take();

        Ok(Self {
            child,
            pid,
            stdin,
            stdout,
        })
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Take the write end of the process's stdin. Dropping it closes the pipe.
    pub fn take_stdin(&mut self) -> Option<ChildStdin> {
        self.stdin.take()
    }

    /// Take the read end of the process's stdout.
    pub fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.stdout.take()
    }

    /// Wait for the process to exit.
    pub async fn wait(&mut self) -> io::Result<ExitStatus> {
        self.child.wait().await
    }

    /// Send SIGKILL (or the platform equivalent) without waiting.
    pub fn start_kill(&mut self) -> io::Result<()> {
        self.child.start_kill()
    }
}
