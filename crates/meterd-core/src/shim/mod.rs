//! Guest side of the out-of-process plugin protocol.
//!
//! A program that wants to act as an external plugin links this crate and
//! wraps its plugin in a [`Shim`].
//!
//! - A [`Processor`] runs under [`Shim::run_processor`]: the shim reads
//!   line-protocol records from stdin, applies the processor to each one, and
//!   writes the results to stdout, flushing after every input record so the
//!   host sees output promptly.
//! - An [`Input`] runs under [`Shim::run_input`]: the shim gathers once per
//!   line received on stdin (the host's STDIN trigger) and, on unix, once per
//!   SIGUSR1, writing each batch to stdout.
//!
//! Both loops end cleanly when stdin reaches end-of-file.

use futures::stream::{self, BoxStream};
use futures::{SinkExt, Stream, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec};
use tracing::{debug, warn};

use crate::codec::line_protocol::DEFAULT_MAX_LINE_LENGTH;
use crate::codec::{Decoded, LineProtocol, SampleCodec};
use crate::error::ShimError;
use crate::plugin::{Input, Processor};

/// Adapts one plugin to a stdin/stdout record stream.
pub struct Shim<C: SampleCodec = LineProtocol> {
    processor: Option<Box<dyn Processor>>,
    input: Option<Box<dyn Input>>,
    codec: C,
}

impl Shim<LineProtocol> {
    pub fn new() -> Self {
        Self::with_codec(LineProtocol::new())
    }
}

impl Default for Shim<LineProtocol> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: SampleCodec> Shim<C> {
    pub fn with_codec(codec: C) -> Self {
        Self {
            processor: None,
            input: None,
            codec,
        }
    }

    fn ensure_empty(&self) -> Result<(), ShimError> {
        if self.processor.is_some() || self.input.is_some() {
            return Err(ShimError::PluginAlreadySet);
        }
        Ok(())
    }

    /// Install the processor to run. Only one plugin per shim.
    pub fn add_processor(&mut self, processor: Box<dyn Processor>) -> Result<(), ShimError> {
        self.ensure_empty()?;
        self.processor = Some(processor);
        Ok(())
    }

    /// Install the input to run. Only one plugin per shim.
    pub fn add_input(&mut self, input: Box<dyn Input>) -> Result<(), ShimError> {
        self.ensure_empty()?;
        self.input = Some(input);
        Ok(())
    }

    /// Run against the real process stdin and stdout until stdin closes.
    pub async fn run_processor(&mut self) -> Result<(), ShimError> {
        self.run_with(tokio::io::stdin(), tokio::io::stdout()).await
    }

    /// Run against arbitrary streams until `reader` reaches end-of-file.
    ///
    /// A processor error drops that one record and the loop continues.
    /// Malformed input and I/O errors end the run.
    pub async fn run_with<R, W>(&mut self, reader: R, writer: W) -> Result<(), ShimError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let processor = self.processor.as_mut().ok_or(ShimError::NoProcessor)?;
        let mut input = FramedRead::new(reader, self.codec.clone());
        let mut output = FramedWrite::new(writer, self.codec.clone());
        let mut processed: u64 = 0;
        let mut dropped: u64 = 0;

        while let Some(item) = input.next().await {
            let sample = match item {
                Ok(Decoded::Sample(sample)) => sample,
                Ok(Decoded::Malformed(e)) => return Err(ShimError::Malformed(e)),
                Err(e) => return Err(ShimError::Read(e)),
            };

            match processor.apply(sample) {
                Ok(results) => {
                    for result in results {
                        output.feed(result).await.map_err(ShimError::Write)?;
                    }
                    output.flush().await.map_err(ShimError::Write)?;
                    processed += 1;
                }
                Err(e) => {
                    dropped += 1;
                    warn!(error = %e, "processor failed, dropping sample");
                }
            }
        }

        output.close().await.map_err(ShimError::Write)?;
        debug!(processed, dropped, "input closed, shim finished");
        Ok(())
    }

    /// Run the input against the real process stdin and stdout, gathering on
    /// every stdin line and, on unix, every SIGUSR1.
    pub async fn run_input(&mut self) -> Result<(), ShimError> {
        let signals = sigusr1_stream()?;
        self.run_input_with(tokio::io::stdin(), tokio::io::stdout(), signals)
            .await
    }

    /// Gather once per line on `reader` and once per item of `signals`,
    /// until `reader` reaches end-of-file.
    ///
    /// A gather error skips that batch. Unreadable trigger input and write
    /// failures end the run.
    pub async fn run_input_with<R, W, S>(
        &mut self,
        reader: R,
        writer: W,
        signals: S,
    ) -> Result<(), ShimError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
        S: Stream<Item = ()> + Unpin,
    {
        let source = self.input.as_mut().ok_or(ShimError::NoInput)?;
        let mut triggers = FramedRead::new(
            reader,
            LinesCodec::new_with_max_length(DEFAULT_MAX_LINE_LENGTH),
        );
        let mut signals = signals.fuse();
        let mut output = FramedWrite::new(writer, self.codec.clone());
        let mut gathered: u64 = 0;
        let mut failed: u64 = 0;

        loop {
            tokio::select! {
                line = triggers.next() => match line {
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(ShimError::Trigger(e)),
                    None => break,
                },
                Some(()) = signals.next() => debug!("gather requested by signal"),
            }

            match source.gather() {
                Ok(samples) => {
                    for sample in samples {
                        output.feed(sample).await.map_err(ShimError::Write)?;
                    }
                    output.flush().await.map_err(ShimError::Write)?;
                    gathered += 1;
                }
                Err(e) => {
                    failed += 1;
                    warn!(error = %e, "gather failed, skipping");
                }
            }
        }

        output.close().await.map_err(ShimError::Write)?;
        debug!(gathered, failed, "input closed, shim finished");
        Ok(())
    }
}

#[cfg(unix)]
fn sigusr1_stream() -> Result<BoxStream<'static, ()>, ShimError> {
    use tokio::signal::unix::{SignalKind, signal};

    let usr1 = signal(SignalKind::user_defined1()).map_err(ShimError::SignalSetup)?;
    Ok(stream::unfold(usr1, |mut usr1| async move {
        usr1.recv().await.map(|()| ((), usr1))
    })
    .boxed())
}

#[cfg(not(unix))]
fn sigusr1_stream() -> Result<BoxStream<'static, ()>, ShimError> {
    Ok(stream::pending().boxed())
}
