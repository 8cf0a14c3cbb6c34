//! Final pipeline stage: line protocol on stdout.

use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

use meterd_core::{Accumulator, LineProtocol, Sample};

/// Writes every sample it receives as one line-protocol record.
pub struct LineWriter<W> {
    out: Mutex<W>,
}

impl LineWriter<tokio::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }
}

impl<W: AsyncWrite + Unpin + Send> LineWriter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }

    async fn write(&self, sample: &Sample) -> std::io::Result<()> {
        let line = LineProtocol::to_line(sample).map_err(std::io::Error::other)?;
        let mut out = self.out.lock().await;
        out.write_all(line.as_bytes()).await?;
        out.flush().await
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> Accumulator for LineWriter<W> {
    async fn add_sample(&self, sample: Sample) {
        if let Err(e) = self.write(&sample).await {
            tracing::warn!(error = %e, measurement = sample.name(), "failed to write sample");
        }
    }
}
