//! `meterd run`: wire inputs and processors together and run until Ctrl+C.
//!
//! ```text
//! input 1 --+
//! input 2 --+--> processor 1 --> processor 2 --> ... --> stdout
//! input n --+
//! ```
//!
//! Every stage is a [`Supervisor`]. Processors are started tail-first so
//! each one's downstream is already accepting samples; shutdown goes inputs
//! first, then processors head-first, so in-flight samples drain through
//! the chain.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use meterd_core::{Accumulator, Supervisor};

use crate::config::AgentConfig;
use crate::output::LineWriter;

/// A started input and how often to trigger it.
struct Input {
    supervisor: Arc<Supervisor>,
    interval: Duration,
}

/// Run the agent described by `config` until interrupted.
pub async fn run_agent(config: AgentConfig) -> Result<()> {
    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();
    let got_first_signal = Arc::new(AtomicBool::new(false));
    let got_first_clone = Arc::clone(&got_first_signal);

    tokio::spawn(async move {
        loop {
            tokio::signal::ctrl_c().await.ok();
            if got_first_clone.swap(true, Ordering::SeqCst) {
                eprintln!("\nForce exit.");
                std::process::exit(130);
            }
            eprintln!("\nShutting down gracefully (Ctrl+C again to force)...");
            cancel_clone.cancel();
        }
    });

    run_until_cancelled(config, Arc::new(LineWriter::stdout()), cancel).await
}

/// Start the pipeline delivering into `sink` and run it until `cancel` fires.
pub async fn run_until_cancelled(
    config: AgentConfig,
    sink: Arc<dyn Accumulator>,
    cancel: CancellationToken,
) -> Result<()> {
    let processors = start_processors(&config, sink.clone()).await?;
    let head: Arc<dyn Accumulator> = match processors.first() {
        Some(first) => first.clone(),
        None => sink,
    };
    let inputs = start_inputs(&config, &head).await?;

    tracing::info!(
        inputs = inputs.len(),
        processors = processors.len(),
        "agent running"
    );

    let tickers: Vec<JoinHandle<()>> = inputs
        .iter()
        .map(|input| {
            tokio::spawn(trigger_loop(
                input.supervisor.clone(),
                input.interval,
                cancel.clone(),
            ))
        })
        .collect();

    cancel.cancelled().await;

    for ticker in tickers {
        ticker.await.ok();
    }
    for input in &inputs {
        stop_stage(&input.supervisor).await;
    }
    for processor in &processors {
        stop_stage(processor).await;
    }
    tracing::info!("agent stopped");
    Ok(())
}

async fn start_processors(
    config: &AgentConfig,
    sink: Arc<dyn Accumulator>,
) -> Result<Vec<Arc<Supervisor>>> {
    let mut downstream = sink;
    let mut started = Vec::with_capacity(config.processors.len());
    for execd in config.processors.iter().rev() {
        let supervisor = Arc::new(Supervisor::new(execd.clone()));
        supervisor
            .start(downstream.clone())
            .await
            .with_context(|| format!("failed to start processor {}", supervisor.name()))?;
        downstream = supervisor.clone();
        started.push(supervisor);
    }
    started.reverse();
    Ok(started)
}

async fn start_inputs(config: &AgentConfig, head: &Arc<dyn Accumulator>) -> Result<Vec<Input>> {
    let mut started = Vec::with_capacity(config.inputs.len());
    for input in &config.inputs {
        let supervisor = Arc::new(Supervisor::new(input.execd.clone()));
        supervisor
            .start(head.clone())
            .await
            .with_context(|| format!("failed to start input {}", supervisor.name()))?;
        started.push(Input {
            supervisor,
            interval: input.interval(),
        });
    }
    Ok(started)
}

/// Fire the input's trigger every `interval` until cancelled.
async fn trigger_loop(supervisor: Arc<Supervisor>, interval: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = cancel.cancelled() => return,
        }
        if let Err(e) = supervisor.trigger_flush().await {
            tracing::warn!(input = supervisor.name(), error = %e, "trigger failed");
        }
    }
}

async fn stop_stage(supervisor: &Supervisor) {
    if let Err(e) = supervisor.stop().await {
        tracing::warn!(stage = supervisor.name(), error = %e, "failed to stop");
    }
}
