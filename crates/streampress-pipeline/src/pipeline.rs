//! Pipeline Orchestration
//!
//! Wires the three stages together and supervises them to completion:
//!
//! ```text
//! RecordGenerator --raw channel--> TransformStage --encoded channel--> SinkStage
//! ```
//!
//! Each stage runs as its own tokio task. The orchestrator always joins
//! all three, even when one fails early: the channels' drop semantics
//! unwind the neighbours (a dropped reader fails the upstream writer, a
//! dropped writer ends the downstream reader's stream), so no task can
//! wait forever on a dead peer and no task is ever aborted mid-write.
//!
//! ## Failure reporting
//!
//! When stages fail together, the disconnect errors are collateral: a
//! sink whose disk filled up drops its reader, which fails the transform
//! with [`ChannelClosed`](crate::Error::ChannelClosed), which in turn
//! fails the generator. The orchestrator reports the first error in
//! stage order that is not a disconnect and logs the rest at debug.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error, info};

use crate::channel::{byte_channel, ChannelStats};
use crate::codec::IncrementalCodec;
use crate::config::PipelineConfig;
use crate::generator::RecordGenerator;
use crate::progress::{NoopProgress, ProgressObserver};
use crate::sink::SinkStage;
use crate::store::ByteStore;
use crate::transform::TransformStage;
use crate::{Error, Result, StageId};

/// Three-stage bounded pipeline, ready to run.
pub struct Pipeline {
    config: PipelineConfig,
    observer: Arc<dyn ProgressObserver>,
}

/// Totals for a completed run.
#[derive(Debug, Clone)]
pub struct PipelineSummary {
    /// Records generated.
    pub records: u64,
    /// Raw bytes that entered the codec.
    pub raw_bytes: u64,
    /// Encoded bytes persisted to the store.
    pub encoded_bytes: u64,
    /// Append calls the store received.
    pub appends: u64,
    /// Wall-clock duration of the run.
    pub elapsed: Duration,
    /// Final counters of the generator -> transform channel.
    pub raw_channel: ChannelStats,
    /// Final counters of the transform -> sink channel.
    pub encoded_channel: ChannelStats,
}

impl PipelineSummary {
    /// Encoded-to-raw size ratio; zero for an empty run.
    pub fn ratio(&self) -> f64 {
        if self.raw_bytes == 0 {
            0.0
        } else {
            self.encoded_bytes as f64 / self.raw_bytes as f64
        }
    }
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            observer: Arc::new(NoopProgress),
        }
    }

    /// Route progress callbacks to `observer` instead of discarding them.
    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the pipeline to completion with the given codec and store.
    ///
    /// # Errors
    ///
    /// Returns the root-cause stage failure, wrapped in
    /// [`Error::Stage`](crate::Error::Stage) naming the stage it came
    /// from. The call returns only after every stage task has exited.
    pub async fn run(
        &self,
        codec: Box<dyn IncrementalCodec>,
        store: Box<dyn ByteStore>,
    ) -> Result<PipelineSummary> {
        let started = Instant::now();

        let (raw_tx, raw_rx) = byte_channel(self.config.raw_watermarks)?;
        let (enc_tx, enc_rx) = byte_channel(self.config.encoded_watermarks)?;
        let raw_monitor = raw_tx.monitor();
        let encoded_monitor = enc_tx.monitor();

        info!(
            codec = codec.name(),
            store = %store.describe(),
            record_limit = ?self.config.record_limit,
            "pipeline starting"
        );

        let generator = RecordGenerator::new(raw_tx, &self.config, self.observer.clone());
        let transform = TransformStage::new(raw_rx, enc_tx, codec);
        let sink = SinkStage::new(enc_rx, store);

        let generator_task = tokio::spawn(generator.run());
        let transform_task = tokio::spawn(transform.run());
        let sink_task = tokio::spawn(sink.run());

        let (generator_res, transform_res, sink_res) =
            tokio::join!(generator_task, transform_task, sink_task);

        let generator_res = flatten(generator_res, StageId::Generator);
        let transform_res = flatten(transform_res, StageId::Transform);
        let sink_res = flatten(sink_res, StageId::Sink);

        match (generator_res, transform_res, sink_res) {
            (Ok(generator), Ok(transform), Ok(sink)) => {
                let summary = PipelineSummary {
                    records: generator.records,
                    raw_bytes: transform.bytes_in,
                    encoded_bytes: sink.bytes,
                    appends: sink.appends,
                    elapsed: started.elapsed(),
                    raw_channel: raw_monitor.snapshot(),
                    encoded_channel: encoded_monitor.snapshot(),
                };
                info!(
                    records = summary.records,
                    raw_bytes = summary.raw_bytes,
                    encoded_bytes = summary.encoded_bytes,
                    elapsed_ms = summary.elapsed.as_millis() as u64,
                    "pipeline completed"
                );
                Ok(summary)
            }
            (generator_res, transform_res, sink_res) => {
                let mut failures = Vec::new();
                if let Err(e) = generator_res {
                    failures.push(e);
                }
                if let Err(e) = transform_res {
                    failures.push(e);
                }
                if let Err(e) = sink_res {
                    failures.push(e);
                }

                // First non-disconnect failure in stage order is the root
                // cause; disconnects are downstream collateral.
                let root_idx = failures
                    .iter()
                    .position(|e| !e.is_disconnect())
                    .unwrap_or(0);
                let root = failures.swap_remove(root_idx);
                for collateral in &failures {
                    debug!(error = %collateral, "collateral stage failure");
                }
                error!(error = %root, "pipeline failed");
                Err(root)
            }
        }
    }
}

fn flatten<T>(
    joined: std::result::Result<Result<T>, tokio::task::JoinError>,
    stage: StageId,
) -> Result<T> {
    match joined {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(err.in_stage(stage)),
        Err(join_err) => {
            error!(%stage, error = %join_err, "stage task did not finish");
            Err(Error::StagePanicked(stage))
        }
    }
}
