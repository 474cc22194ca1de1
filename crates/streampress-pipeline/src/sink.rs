//! Sink Stage
//!
//! Drains the encoded channel into a [`ByteStore`]. Each delivered chunk
//! becomes exactly one atomic append, and bytes are committed back to the
//! channel only after the store has accepted them, so a store failure
//! leaves nothing half-acknowledged.
//!
//! [`ByteStore::finalize`] runs once, on the success path, after the
//! end-of-stream chunk has been persisted. On failure the store is simply
//! dropped; whatever it had durably written stays as-is.

use tracing::debug;

use crate::channel::ChannelReader;
use crate::store::ByteStore;
use crate::Result;

/// Terminal stage: persists the encoded stream.
pub struct SinkStage {
    input: ChannelReader,
    store: Box<dyn ByteStore>,
}

/// What the sink persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkReport {
    /// Bytes appended to the store.
    pub bytes: u64,
    /// Number of append calls issued.
    pub appends: u64,
}

impl SinkStage {
    pub fn new(input: ChannelReader, store: Box<dyn ByteStore>) -> Self {
        Self { input, store }
    }

    /// Persist until end of stream, then finalize the store.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`](crate::Error::Storage) when an append or
    /// the final flush fails.
    pub async fn run(mut self) -> Result<SinkReport> {
        let mut bytes = 0u64;
        let mut appends = 0u64;

        loop {
            let chunk = self.input.read(usize::MAX).await;
            if !chunk.data.is_empty() {
                self.store.append(&chunk.data).await?;
                self.input.consume(chunk.data.len()).await?;
                bytes += chunk.data.len() as u64;
                appends += 1;
            }
            if chunk.end_of_stream {
                break;
            }
        }

        self.store.finalize().await?;
        debug!(bytes, appends, store = %self.store.describe(), "sink completed");
        Ok(SinkReport { bytes, appends })
    }
}
