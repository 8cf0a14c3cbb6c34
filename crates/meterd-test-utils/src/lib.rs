//! Shared test utilities for meterd integration tests.
//!
//! - [`CollectingAccumulator`] records every sample a supervisor delivers
//!   and lets a test wait until a given number has arrived.
//! - [`write_script`] drops an executable shell script into a temp dir to
//!   act as an external plugin.
//! - [`sample_at`] / [`counter_sample`] build samples with fixed timestamps.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::Notify;

use meterd_core::{Accumulator, Sample, Supervisor, SupervisorState};

/// An accumulator that keeps every sample it receives.
#[derive(Debug, Default)]
pub struct CollectingAccumulator {
    samples: Mutex<Vec<Sample>>,
    notify: Notify,
}

impl CollectingAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything received so far, in arrival order.
    pub fn samples(&self) -> Vec<Sample> {
        self.samples.lock().expect("accumulator lock poisoned").clone()
    }

    pub fn len(&self) -> usize {
        self.samples.lock().expect("accumulator lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wait until at least `n` samples have arrived. Returns `false` on
    /// timeout.
    pub async fn wait_for(&self, n: usize, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let notified = self.notify.notified();
            if self.len() >= n {
                return true;
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return self.len() >= n;
            }
        }
    }
}

#[async_trait]
impl Accumulator for CollectingAccumulator {
    async fn add_sample(&self, sample: Sample) {
        self.samples
            .lock()
            .expect("accumulator lock poisoned")
            .push(sample);
        self.notify.notify_waiters();
    }
}

/// Write an executable `/bin/sh` script named `name` into `dir`.
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("failed to write script");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
            .expect("failed to mark script executable");
    }
    path
}

/// Poll until the supervisor reaches `state`. Returns `false` on timeout.
pub async fn wait_for_state<C>(
    supervisor: &Supervisor<C>,
    state: SupervisorState,
    timeout: Duration,
) -> bool
where
    C: meterd_core::SampleCodec,
{
    let mut rx = supervisor.subscribe();
    tokio::time::timeout(timeout, rx.wait_for(|s| *s == state))
        .await
        .is_ok_and(|r| r.is_ok())
}

/// A fixed reference time, 2023-11-14T22:13:20Z.
pub fn base_time() -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000, 0)
        .single()
        .expect("valid timestamp")
}

/// `base_time()` plus `offset_ns` nanoseconds.
pub fn sample_at(name: &str, offset_ns: i64) -> Sample {
    Sample::new(name, base_time() + chrono::Duration::nanoseconds(offset_ns))
}

/// `test,city=Toronto count=<count>i` at `base_time() + offset_ns`.
pub fn counter_sample(count: i64, offset_ns: i64) -> Sample {
    sample_at("test", offset_ns)
        .with_tag("city", "Toronto")
        .with_field("count", count)
}
