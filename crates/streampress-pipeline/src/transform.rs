//! Transform Stage
//!
//! Pulls raw bytes from the record channel, feeds them through an
//! [`IncrementalCodec`], and pushes whatever the codec emits into the
//! encoded channel.
//!
//! The stage is built around the codec's right to consume less than it
//! was offered. After each call it commits exactly `consumed` bytes back
//! to the input channel; unconsumed bytes stay buffered and are part of
//! the next delivery. No byte is dropped and none is offered out of order.
//!
//! ## Termination
//!
//! End of stream is a three-part condition: the input reported
//! end-of-stream, the codec consumed the whole final delivery, and
//! [`is_finished`](IncrementalCodec::is_finished) returned true. Until all
//! three hold the stage keeps calling `encode` (with `is_final = true`
//! once the input has ended) so codecs may spread trailer emission over
//! several calls.
//!
//! A delivery larger than [`max_chunk_len`](IncrementalCodec::max_chunk_len)
//! is a fatal [`CodecOverflow`](crate::Error::CodecOverflow); the stage
//! never splits input to hide a codec's limit.

use tracing::debug;

use crate::channel::{ChannelReader, ChannelWriter};
use crate::codec::IncrementalCodec;
use crate::{Error, Result};

/// Middle stage: incremental compression between two channels.
pub struct TransformStage {
    input: ChannelReader,
    output: ChannelWriter,
    codec: Box<dyn IncrementalCodec>,
}

/// Byte totals observed by the transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformReport {
    /// Raw bytes consumed from the input channel.
    pub bytes_in: u64,
    /// Encoded bytes written to the output channel.
    pub bytes_out: u64,
}

impl TransformStage {
    pub fn new(
        input: ChannelReader,
        output: ChannelWriter,
        codec: Box<dyn IncrementalCodec>,
    ) -> Self {
        Self {
            input,
            output,
            codec,
        }
    }

    /// Drive the codec until the input ends and the container is sealed.
    ///
    /// # Errors
    ///
    /// - [`Error::CodecOverflow`] if a delivery exceeds the codec's limit
    /// - [`Error::Codec`] if the engine itself fails
    /// - [`Error::ChannelClosed`] if the sink drops its reader mid-stream
    pub async fn run(mut self) -> Result<TransformReport> {
        let mut bytes_in = 0u64;
        let mut bytes_out = 0u64;

        loop {
            let chunk = self.input.read(usize::MAX).await;
            let len = chunk.data.len();
            let max = self.codec.max_chunk_len();
            if len > max {
                return Err(Error::CodecOverflow { len, max });
            }

            let step = self.codec.encode(&chunk.data, chunk.end_of_stream)?;
            self.input.consume(step.consumed).await?;
            bytes_in += step.consumed as u64;

            if !step.output.is_empty() {
                self.output.write(&step.output).await?;
                bytes_out += step.output.len() as u64;
            }

            if chunk.end_of_stream && step.consumed == len && self.codec.is_finished() {
                break;
            }
        }

        self.output.complete();
        debug!(
            codec = self.codec.name(),
            bytes_in, bytes_out, "transform completed"
        );
        Ok(TransformReport { bytes_in, bytes_out })
    }
}
