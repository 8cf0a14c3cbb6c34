//! Record codec contract shared by the supervisor and the shim.
//!
//! The engine only needs two things from a codec: encode one [`Sample`] into
//! a delimited record, and decode a byte stream incrementally. Both are
//! expressed through `tokio_util::codec` so the same codec drives
//! `FramedRead`/`FramedWrite` on either side of the pipe.
//!
//! Decoding outcomes map onto the framed stream as follows:
//!
//! | outcome          | `Decoder::decode` result            |
//! |------------------|-------------------------------------|
//! | need more data   | `Ok(None)`                          |
//! | one record       | `Ok(Some(Decoded::Sample(_)))`      |
//! | malformed record | `Ok(Some(Decoded::Malformed(_)))`   |
//! | end of stream    | stream yields `None`                |
//!
//! A malformed record is reported as an item, not as an `Err`, because a
//! `FramedRead` stops after the first decoder error and a single bad line
//! must not end the stream.

pub mod line_protocol;

use std::io;

use tokio_util::codec::{Decoder, Encoder};

use crate::sample::Sample;

pub use line_protocol::LineProtocol;

/// One decoded record, or a record that could not be parsed.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    Sample(Sample),
    Malformed(ParseError),
}

/// A single record that does not follow the wire grammar.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("malformed record ({reason}): {line:?}")]
pub struct ParseError {
    pub line: String,
    pub reason: String,
}

impl ParseError {
    pub fn new(line: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            line: line.into(),
            reason: reason.into(),
        }
    }
}

/// Stream-level codec failures.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("stream I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("cannot encode sample: {0}")]
    Encode(String),
}

/// Everything the engine requires from a record codec.
///
/// Blanket-implemented for any `tokio_util` codec with the right item and
/// error types, so custom codecs only implement `Encoder` and `Decoder`.
pub trait SampleCodec:
    Decoder<Item = Decoded, Error = CodecError>
    + Encoder<Sample, Error = CodecError>
    + Clone
    + Send
    + Sync
    + 'static
{
}

impl<T> SampleCodec for T where
    T: Decoder<Item = Decoded, Error = CodecError>
        + Encoder<Sample, Error = CodecError>
        + Clone
        + Send
        + Sync
        + 'static
{
}
