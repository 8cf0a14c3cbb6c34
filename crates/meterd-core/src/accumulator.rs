//! The sink that receives samples decoded from an external process.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

use crate::sample::Sample;

/// Destination for samples produced by a pipeline stage.
///
/// The supervisor's reader task awaits `add_sample` for each decoded record
/// before decoding the next one, so delivery order equals arrival order.
#[async_trait]
pub trait Accumulator: Send + Sync {
    async fn add_sample(&self, sample: Sample);
}

/// Forwards samples into a tokio channel.
#[async_trait]
impl Accumulator for mpsc::UnboundedSender<Sample> {
    async fn add_sample(&self, sample: Sample) {
        if self.send(sample).is_err() {
            debug!("accumulator channel closed, dropping sample");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn channel_accumulator_forwards_samples() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.add_sample(Sample::new("a", Utc::now()).with_field("v", 1i64))
            .await;
        let received = rx.recv().await.unwrap();
        assert_eq!(received.name(), "a");
    }

    #[tokio::test]
    async fn closed_channel_drops_silently() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        tx.add_sample(Sample::new("a", Utc::now())).await;
    }
}
