//! Record Generator Stage
//!
//! Walks the counter from zero, classifies each value by divisibility,
//! and streams the fixed-width wire records into the raw channel.
//!
//! Records are staged in a local buffer and pushed to the channel every
//! `flush_interval_records`, so the channel sees batched writes rather
//! than 9-byte dribbles. The first flush happens right after record 0;
//! after that, batches carry a full interval of records. Progress is
//! reported through the injected [`ProgressObserver`] on its own cadence.
//!
//! The stage consumes itself in [`run`](RecordGenerator::run) and
//! completes the channel on normal exit. A failed write means the reader
//! side is gone; there is nothing to clean up beyond dropping the writer,
//! which marks the stream complete.

use std::sync::Arc;

use bytes::BytesMut;
use tracing::debug;

use streampress_core::{Record, RECORD_LEN};

use crate::channel::ChannelWriter;
use crate::config::PipelineConfig;
use crate::progress::ProgressObserver;
use crate::Result;

/// Upper bound on the staging buffer preallocation.
const STAGING_CAP: usize = 64 * 1024;

/// Producer stage: emits classified counter records into a channel.
pub struct RecordGenerator {
    output: ChannelWriter,
    flush_interval: u64,
    progress_interval: u64,
    limit: u64,
    observer: Arc<dyn ProgressObserver>,
}

/// What the generator accomplished before returning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneratorReport {
    /// Records emitted.
    pub records: u64,
    /// Bytes written to the raw channel.
    pub bytes: u64,
}

impl RecordGenerator {
    pub fn new(
        output: ChannelWriter,
        config: &PipelineConfig,
        observer: Arc<dyn ProgressObserver>,
    ) -> Self {
        Self {
            output,
            flush_interval: config.flush_interval_records.max(1),
            progress_interval: config.progress_interval_records.max(1),
            limit: config.record_limit.unwrap_or(u64::MAX),
            observer,
        }
    }

    /// Emit records until the limit is reached, then complete the channel.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelClosed`](crate::Error::ChannelClosed) if the
    /// transform stage drops its reader mid-stream.
    pub async fn run(mut self) -> Result<GeneratorReport> {
        let staging_cap = (self.flush_interval)
            .saturating_mul(RECORD_LEN as u64)
            .min(STAGING_CAP as u64) as usize;
        let mut staging = BytesMut::with_capacity(staging_cap);

        let mut records = 0u64;
        let mut bytes = 0u64;

        for value in 0..self.limit {
            Record::new(value).encode_into(&mut staging);
            records += 1;

            if value % self.flush_interval == 0 {
                bytes += staging.len() as u64;
                self.output.write(&staging).await?;
                staging.clear();
            }
            if value % self.progress_interval == 0 {
                self.observer.on_progress(value);
            }
        }

        if !staging.is_empty() {
            bytes += staging.len() as u64;
            self.output.write(&staging).await?;
        }
        self.output.complete();

        debug!(records, bytes, "generator completed");
        Ok(GeneratorReport { records, bytes })
    }
}
