//! Host side of the out-of-process plugin protocol.
//!
//! A [`Supervisor`] owns one external process at a time. It writes encoded
//! samples to the process's stdin, decodes what the process prints on
//! stdout into an [`Accumulator`], and replaces the process when it exits
//! unexpectedly.
//!
//! Three tasks cooperate per start:
//!
//! - the caller's task, which submits samples under the input lock;
//! - the reader task, one per process generation, which forwards decoded
//!   samples in arrival order;
//! - the monitor task, which waits for exits and performs restarts until
//!   `stop` cancels it.
//!
//! `stop` closes stdin first and then waits for the monitor, which in turn
//! waits for the reader to reach end-of-stream, so every sample the process
//! prints before exiting is delivered before `stop` returns.

mod monitor;
mod reader;
mod state;

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use bytes::BytesMut;
use tokio::io::AsyncWriteExt;
use tokio::process::ChildStdin;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::accumulator::Accumulator;
use crate::codec::{LineProtocol, SampleCodec};
use crate::config::ExecdConfig;
use crate::error::{ExecdError, SignalError};
use crate::process::{ProcessControl, ProcessHandle, platform_control};
use crate::sample::Sample;
use crate::trigger::TriggerSignal;

pub use state::SupervisorState;

/// Upper bound on a STDIN trigger waiting for the input lock and the pipe.
const STDIN_TRIGGER_TIMEOUT: Duration = Duration::from_secs(1);

/// Runs and restarts one external plugin process.
///
/// All methods take `&self`; share a supervisor between tasks with `Arc`.
pub struct Supervisor<C: SampleCodec = LineProtocol> {
    shared: Arc<Shared<C>>,
    run: Mutex<Option<Run>>,
}

/// Background tasks belonging to one `start`..`stop` cycle.
struct Run {
    shutdown: CancellationToken,
    kill: CancellationToken,
    monitor: JoinHandle<()>,
}

/// State shared between the supervisor and its background tasks.
struct Shared<C: SampleCodec> {
    name: String,
    config: ExecdConfig,
    codec: C,
    control: Arc<dyn ProcessControl>,
    state: watch::Sender<SupervisorState>,
    input: Mutex<Option<InputStream<C>>>,
    /// 0 while no process is attached.
    pid: AtomicU32,
    generation: AtomicU64,
    restarts: AtomicU64,
}

/// A freshly spawned process whose output is already being read.
struct Launched {
    process: ProcessHandle,
    reader: JoinHandle<()>,
    generation: u64,
}

/// Write side of the current process's stdin.
struct InputStream<C> {
    stdin: ChildStdin,
    codec: C,
    buf: BytesMut,
}

impl<C: SampleCodec> InputStream<C> {
    fn new(stdin: ChildStdin, codec: C) -> Self {
        Self {
            stdin,
            codec,
            buf: BytesMut::new(),
        }
    }

    async fn write(&mut self, sample: Sample) -> Result<(), ExecdError> {
        self.buf.clear();
        self.codec
            .encode(sample, &mut self.buf)
            .map_err(ExecdError::Encode)?;
        self.stdin
            .write_all(&self.buf)
            .await
            .map_err(ExecdError::Write)?;
        self.stdin.flush().await.map_err(ExecdError::Write)
    }

    /// The STDIN trigger: one bare newline.
    async fn nudge(&mut self) -> io::Result<()> {
        self.stdin.write_all(b"\n").await?;
        self.stdin.flush().await
    }
}

impl<C: SampleCodec> Shared<C> {
    /// Move from any state in `from` to `to`. Returns whether it happened.
    fn transition(&self, from: &[SupervisorState], to: SupervisorState) -> bool {
        self.state.send_if_modified(|current| {
            if from.contains(current) {
                *current = to;
                true
            } else {
                false
            }
        })
    }

    fn set_state(&self, to: SupervisorState) {
        self.state.send_replace(to);
    }

    /// Spawn the next generation and start reading its stdout.
    fn launch(&self, acc: &Arc<dyn Accumulator>) -> Result<(Launched, ChildStdin), ExecdError> {
        let mut process = ProcessHandle::spawn(&self.config)?;
        let (stdin, stdout) = match (process.take_stdin(), process.take_stdout()) {
            (Some(stdin), Some(stdout)) => (stdin, stdout),
            _ => {
                return Err(ExecdError::Startup {
                    command: self.config.command_line(),
                    source: io::Error::other("standard streams were not piped"),
                });
            }
        };

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let frames = FramedRead::new(stdout, self.codec.clone());
        let reader = tokio::spawn(reader::read_output(
            frames,
            Arc::clone(acc),
            self.name.clone(),
            generation,
        ));
        debug!(plugin = %self.name, pid = process.pid(), generation, "spawned external process");

        Ok((
            Launched {
                process,
                reader,
                generation,
            },
            stdin,
        ))
    }

    /// Publish a launched process to `submit`, unless a stop is underway.
    ///
    /// The state check happens under the input lock, so a concurrent `stop`
    /// either sees the new stream and closes it or this drops it unused.
    async fn install(&self, stdin: ChildStdin, pid: u32) -> bool {
        let mut input = self.input.lock().await;
        if !self.transition(&[SupervisorState::Starting], SupervisorState::Running) {
            debug!(plugin = %self.name, pid, "stop requested during start, closing stdin");
            return false;
        }
        *input = Some(InputStream::new(stdin, self.codec.clone()));
        self.pid.store(pid, Ordering::SeqCst);
        true
    }

    /// Forget the current process: close its stdin and clear its pid.
    async fn detach(&self) {
        let stream = self.input.lock().await.take();
        self.pid.store(0, Ordering::SeqCst);
        drop(stream);
    }
}

impl Supervisor<LineProtocol> {
    /// A line-protocol supervisor using the platform's signal backend.
    pub fn new(config: ExecdConfig) -> Self {
        Self::with_parts(config, LineProtocol::new(), platform_control())
    }
}

impl<C: SampleCodec> Supervisor<C> {
    /// A supervisor with an explicit codec and signal backend.
    pub fn with_parts(config: ExecdConfig, codec: C, control: Arc<dyn ProcessControl>) -> Self {
        let (state, _) = watch::channel(SupervisorState::Stopped);
        Self {
            shared: Arc::new(Shared {
                name: config.display_name(),
                config,
                codec,
                control,
                state,
                input: Mutex::new(None),
                pid: AtomicU32::new(0),
                generation: AtomicU64::new(0),
                restarts: AtomicU64::new(0),
            }),
            run: Mutex::new(None),
        }
    }

    /// Spawn the external process and begin forwarding its output to `acc`.
    ///
    /// Fails with [`ExecdError::AlreadyRunning`] unless the supervisor is
    /// stopped. A spawn failure leaves it stopped.
    pub async fn start(&self, acc: Arc<dyn Accumulator>) -> Result<(), ExecdError> {
        let mut run = self.run.lock().await;
        self.shared.config.validate()?;
        if !self
            .shared
            .transition(&[SupervisorState::Stopped], SupervisorState::Starting)
        {
            return Err(ExecdError::AlreadyRunning);
        }

        let signal = self.shared.config.signal;
        if signal.is_os_signal() && !self.shared.control.supports(signal) {
            warn!(
                plugin = %self.shared.name,
                %signal,
                backend = self.shared.control.name(),
                "configured trigger signal is not supported here, triggers will be ignored"
            );
        }

        let (launched, stdin) = match self.shared.launch(&acc) {
            Ok(launched) => launched,
            Err(e) => {
                self.shared.set_state(SupervisorState::Stopped);
                return Err(e);
            }
        };
        let pid = launched.process.pid();
        let generation = launched.generation;
        self.shared.install(stdin, pid).await;

        let shutdown = CancellationToken::new();
        let kill = CancellationToken::new();
        let monitor = tokio::spawn(monitor::watch_process(
            Arc::clone(&self.shared),
            acc,
            launched,
            shutdown.clone(),
            kill.clone(),
        ));
        *run = Some(Run {
            shutdown,
            kill,
            monitor,
        });

        info!(plugin = %self.shared.name, pid, generation, "external process started");
        Ok(())
    }

    /// Encode `sample` and write it to the current process's stdin.
    ///
    /// Writes are serialized, so concurrent callers never interleave
    /// records. Returns [`ExecdError::NotRunning`] when no process is
    /// attached, e.g. between a crash and the restart.
    pub async fn submit(&self, sample: Sample) -> Result<(), ExecdError> {
        let mut input = self.shared.input.lock().await;
        let stream = input.as_mut().ok_or(ExecdError::NotRunning)?;
        let result = stream.write(sample).await;
        if let Err(e) = &result {
            if e.is_broken_pipe() {
                input.take();
                self.shared.pid.store(0, Ordering::SeqCst);
                self.shared
                    .transition(&[SupervisorState::Running], SupervisorState::Crashed);
                warn!(plugin = %self.shared.name, "external process closed its stdin");
            }
        }
        result
    }

    /// Stop the process and wait until all of its output has been delivered.
    ///
    /// Closes stdin, waits up to `stop_timeout_ms` for the process to exit
    /// and kills it after that. Calling `stop` on a stopped supervisor, or
    /// concurrently from several tasks, is fine; a `start` issued meanwhile
    /// waits for the stop to complete.
    pub async fn stop(&self) -> Result<(), ExecdError> {
        // Held until the process is gone, so a concurrent `start` or `stop`
        // waits for this one to finish.
        let mut run = self.run.lock().await;
        let stopping = self.shared.state.send_if_modified(|current| {
            if current.is_active() {
                *current = SupervisorState::Stopping;
                true
            } else {
                false
            }
        });
        if !stopping {
            return Ok(());
        }

        self.shared.detach().await;

        if let Some(run) = run.take() {
            run.shutdown.cancel();
            let mut monitor = run.monitor;
            let stop_timeout = self.shared.config.stop_timeout();
            let waited = tokio::time::timeout(stop_timeout, &mut monitor).await;
            let joined = match waited {
                Ok(joined) => joined,
                Err(_) => {
                    warn!(
                        plugin = %self.shared.name,
                        timeout_ms = self.shared.config.stop_timeout_ms,
                        "external process did not exit after stdin closed, killing it"
                    );
                    run.kill.cancel();
                    monitor.await
                }
            };
            if let Err(e) = joined {
                warn!(plugin = %self.shared.name, error = %e, "monitor task failed");
            }
        }

        self.shared.set_state(SupervisorState::Stopped);
        info!(plugin = %self.shared.name, "external process stopped");
        Ok(())
    }

    /// Ask the process to emit whatever it has buffered.
    ///
    /// Delivers the configured signal. Does nothing when no trigger is
    /// configured, when no process is attached, or when the platform cannot
    /// deliver the signal. Failures are reported but never stop the
    /// supervisor.
    pub async fn trigger_flush(&self) -> Result<(), ExecdError> {
        match self.shared.config.signal {
            TriggerSignal::None => Ok(()),
            TriggerSignal::Stdin => {
                let nudge = async {
                    let mut input = self.shared.input.lock().await;
                    match input.as_mut() {
                        Some(stream) => stream.nudge().await.map(|()| true),
                        None => Ok(false),
                    }
                };
                match tokio::time::timeout(STDIN_TRIGGER_TIMEOUT, nudge).await {
                    Ok(Ok(true)) => Ok(()),
                    Ok(Ok(false)) => {
                        debug!(plugin = %self.shared.name, "no process attached, skipping trigger");
                        Ok(())
                    }
                    Ok(Err(e)) => Err(SignalError::StdinWrite(e).into()),
                    Err(_) => Err(SignalError::StdinTimeout.into()),
                }
            }
            signal => {
                if !self.shared.control.supports(signal) {
                    return Ok(());
                }
                let pid = self.shared.pid.load(Ordering::SeqCst);
                if pid == 0 {
                    debug!(plugin = %self.shared.name, %signal, "no process attached, skipping trigger");
                    return Ok(());
                }
                self.shared.control.signal(pid, signal)?;
                Ok(())
            }
        }
    }

    pub fn state(&self) -> SupervisorState {
        *self.shared.state.borrow()
    }

    /// A receiver that observes every state change.
    pub fn subscribe(&self) -> watch::Receiver<SupervisorState> {
        self.shared.state.subscribe()
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn config(&self) -> &ExecdConfig {
        &self.shared.config
    }

    /// Number of processes spawned so far; the first process is generation 1.
    pub fn generation(&self) -> u64 {
        self.shared.generation.load(Ordering::SeqCst)
    }

    /// Number of unexpected exits observed so far.
    pub fn restarts(&self) -> u64 {
        self.shared.restarts.load(Ordering::SeqCst)
    }

    /// Pid of the attached process, if any.
    pub fn pid(&self) -> Option<u32> {
        match self.shared.pid.load(Ordering::SeqCst) {
            0 => None,
            pid => Some(pid),
        }
    }
}

impl<C: SampleCodec> std::fmt::Debug for Supervisor<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field("name", &self.shared.name)
            .field("state", &self.state())
            .field("generation", &self.generation())
            .finish()
    }
}

impl<C: SampleCodec> Drop for Supervisor<C> {
    fn drop(&mut self) {
        if let Some(run) = self.run.get_mut().take() {
            run.shutdown.cancel();
            run.kill.cancel();
        }
    }
}

/// Lets a supervisor sit in the middle of a processor chain: samples added
/// to it are submitted to its process. Rejected samples are logged and
/// dropped.
#[async_trait::async_trait]
impl<C: SampleCodec> Accumulator for Supervisor<C> {
    async fn add_sample(&self, sample: Sample) {
        if let Err(e) = self.submit(sample).await {
            warn!(plugin = %self.shared.name, error = %e, "dropping sample");
        }
    }
}
