//! Exit detection and restart loop.

use std::io;
use std::process::ExitStatus;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::{Launched, Shared, SupervisorState};
use crate::accumulator::Accumulator;
use crate::codec::SampleCodec;
use crate::error::ExecdError;
use crate::process::ProcessHandle;

/// Watch the current process and replace it whenever it exits on its own.
///
/// Returns once an exit is observed while the supervisor is stopping, or
/// once `shutdown` cancels a pending restart. Cancelling `kill` makes the
/// current process get killed instead of waited for.
pub(super) async fn watch_process<C: SampleCodec>(
    shared: Arc<Shared<C>>,
    acc: Arc<dyn Accumulator>,
    launched: Launched,
    shutdown: CancellationToken,
    kill: CancellationToken,
) {
    let Launched {
        mut process,
        mut reader,
        mut generation,
    } = launched;
    let drain_timeout = shared.config.stop_timeout();

    loop {
        let status = wait_for_exit(&mut process, &kill).await;
        shared.detach().await;

        if !shared.transition(
            &[SupervisorState::Running, SupervisorState::Crashed],
            SupervisorState::Crashed,
        ) {
            debug!(plugin = %shared.name, generation, status = %describe(&status), "process exited during stop");
            drain(reader, drain_timeout, &shared.name).await;
            return;
        }

        let restarts = shared.restarts.fetch_add(1, std::sync::atomic::Ordering::SeqCst) + 1;
        let err = ExecdError::ProcessExit {
            generation,
            status: describe(&status),
        };
        warn!(
            plugin = %shared.name,
            error = %err,
            restarts,
            restart_delay_ms = shared.config.restart_delay_ms,
            "external process exited unexpectedly, restarting (no retry limit)"
        );
        drain(reader, drain_timeout, &shared.name).await;

        match relaunch(&shared, &acc, &shutdown).await {
            Some(next) => {
                process = next.process;
                reader = next.reader;
                generation = next.generation;
            }
            None => return,
        }
    }
}

async fn wait_for_exit(
    process: &mut ProcessHandle,
    kill: &CancellationToken,
) -> io::Result<ExitStatus> {
    tokio::select! {
        status = process.wait() => return status,
        _ = kill.cancelled() => {}
    }
    if let Err(e) = process.start_kill() {
        warn!(pid = process.pid(), error = %e, "failed to kill external process");
    }
    process.wait().await
}

/// Wait out the restart delay and spawn the next generation.
///
/// Spawn failures are retried after another delay. Returns `None` when the
/// supervisor is stopping.
async fn relaunch<C: SampleCodec>(
    shared: &Arc<Shared<C>>,
    acc: &Arc<dyn Accumulator>,
    shutdown: &CancellationToken,
) -> Option<Launched> {
    loop {
        tokio::select! {
            _ = tokio::time::sleep(shared.config.restart_delay()) => {}
            _ = shutdown.cancelled() => return None,
        }
        if !shared.transition(&[SupervisorState::Crashed], SupervisorState::Starting) {
            return None;
        }

        match shared.launch(acc) {
            Ok((launched, stdin)) => {
                let pid = launched.process.pid();
                if shared.install(stdin, pid).await {
                    info!(plugin = %shared.name, pid, generation = launched.generation, "external process restarted");
                }
                // Even when a stop raced the install, the new process has to
                // be reaped, so keep watching it.
                return Some(launched);
            }
            Err(e) => {
                error!(plugin = %shared.name, error = %e, "restart failed, retrying after delay");
                if !shared.transition(&[SupervisorState::Starting], SupervisorState::Crashed) {
                    return None;
                }
            }
        }
    }
}

/// Let the reader finish delivering output, giving up after `timeout`.
async fn drain(mut reader: JoinHandle<()>, timeout: Duration, name: &str) {
    let waited = tokio::time::timeout(timeout, &mut reader).await;
    match waited {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(plugin = %name, error = %e, "reader task failed"),
        Err(_) => {
            warn!(plugin = %name, "process output still open after exit, abandoning reader");
            reader.abort();
        }
    }
}

fn describe(status: &io::Result<ExitStatus>) -> String {
    match status {
        Ok(status) => status.to_string(),
        Err(e) => format!("wait failed: {e}"),
    }
}
