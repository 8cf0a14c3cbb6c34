//! Per-generation stdout reader.

use std::sync::Arc;

use futures::StreamExt;
use tokio::io::AsyncRead;
use tokio_util::codec::FramedRead;
use tracing::{debug, warn};

use crate::accumulator::Accumulator;
use crate::codec::{Decoded, SampleCodec};
use crate::error::ExecdError;

/// Forward every decoded sample to `acc` until the stream ends.
///
/// Each sample is delivered before the next record is decoded. Malformed
/// records are logged and skipped; a read error ends the loop.
pub(super) async fn read_output<R, C>(
    mut frames: FramedRead<R, C>,
    acc: Arc<dyn Accumulator>,
    name: String,
    generation: u64,
) where
    R: AsyncRead + Unpin,
    C: SampleCodec,
{
    let mut delivered: u64 = 0;
    let mut malformed: u64 = 0;

    while let Some(item) = frames.next().await {
        match item {
            Ok(Decoded::Sample(sample)) => {
                acc.add_sample(sample).await;
                delivered += 1;
            }
            Ok(Decoded::Malformed(e)) => {
                malformed += 1;
                warn!(plugin = %name, generation, error = %e, "skipping malformed record");
            }
            Err(e) => {
                let err = ExecdError::Stream(e);
                warn!(plugin = %name, generation, error = %err, "stopped reading process output");
                break;
            }
        }
    }

    debug!(plugin = %name, generation, delivered, malformed, "process output closed");
}
