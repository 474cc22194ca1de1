//! Chaos / Fault-Injection Tests for the Pipeline
//!
//! These tests break one stage on purpose and verify the contract of the
//! orchestrator: every task unwinds, the run returns promptly (no stage
//! left parked on a dead peer), and the reported error names the stage
//! that actually caused the failure rather than the collateral channel
//! disconnects around it.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use tokio::time::timeout;

use streampress_core::{Record, RECORD_LEN};
use streampress_pipeline::{
    ByteStore, CodecKind, EncodeStep, Error, IncrementalCodec, Pipeline, PipelineConfig, StageId,
    Watermarks,
};

// ============================================================================
// Fault Injection Doubles
// ============================================================================

/// Store that accepts a limited number of appends, then fails every call
/// with an I/O error.
struct FlakyStore {
    accepted: Arc<Mutex<Vec<u8>>>,
    appends_left: u64,
}

impl FlakyStore {
    fn new(appends_left: u64) -> (Self, Arc<Mutex<Vec<u8>>>) {
        let accepted = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                accepted: accepted.clone(),
                appends_left,
            },
            accepted,
        )
    }
}

#[async_trait]
impl ByteStore for FlakyStore {
    async fn append(&mut self, data: &[u8]) -> streampress_pipeline::Result<()> {
        if self.appends_left == 0 {
            return Err(Error::Storage(std::io::Error::new(
                std::io::ErrorKind::Other,
                "injected disk failure",
            )));
        }
        self.appends_left -= 1;
        self.accepted.lock().unwrap().extend_from_slice(data);
        Ok(())
    }

    async fn finalize(&mut self) -> streampress_pipeline::Result<()> {
        Ok(())
    }

    fn describe(&self) -> String {
        "flaky-memory".to_string()
    }
}

/// Store whose appends succeed but whose final flush fails.
struct UnflushableStore {
    accepted: Arc<Mutex<Vec<u8>>>,
}

#[async_trait]
impl ByteStore for UnflushableStore {
    async fn append(&mut self, data: &[u8]) -> streampress_pipeline::Result<()> {
        self.accepted.lock().unwrap().extend_from_slice(data);
        Ok(())
    }

    async fn finalize(&mut self) -> streampress_pipeline::Result<()> {
        Err(Error::Storage(std::io::Error::new(
            std::io::ErrorKind::Other,
            "injected fsync failure",
        )))
    }

    fn describe(&self) -> String {
        "unflushable-memory".to_string()
    }
}

/// Codec that passes bytes through until its fuse burns, then fails.
struct FusedCodec {
    encode_calls_left: u64,
}

impl IncrementalCodec for FusedCodec {
    fn name(&self) -> &'static str {
        "fused"
    }

    fn encode(&mut self, input: &[u8], _is_final: bool) -> streampress_pipeline::Result<EncodeStep> {
        if self.encode_calls_left == 0 {
            return Err(Error::Codec("injected engine failure".to_string()));
        }
        self.encode_calls_left -= 1;
        Ok(EncodeStep {
            consumed: input.len(),
            output: Bytes::copy_from_slice(input),
        })
    }

    fn is_finished(&self) -> bool {
        false
    }
}

/// Helper: tiny channels and an effectively unbounded record supply, so
/// the generator is guaranteed to be parked when the fault fires.
fn pressured_config() -> PipelineConfig {
    PipelineConfig {
        raw_watermarks: Watermarks::new(4096, 1024),
        encoded_watermarks: Watermarks::new(4096, 1024),
        flush_interval_records: 16,
        record_limit: Some(u64::MAX / 2),
        ..Default::default()
    }
}

/// Helper producing the canonical wire stream for values `0..limit`.
fn canonical_stream(limit: u64) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(limit as usize * RECORD_LEN);
    for value in 0..limit {
        Record::new(value).encode_into(&mut buf);
    }
    buf.to_vec()
}

// ============================================================================
// Sink Faults
// ============================================================================

#[tokio::test]
async fn chaos_sink_disk_failure_fails_pipeline_fast() {
    let (store, _accepted) = FlakyStore::new(2);

    let result = timeout(
        Duration::from_secs(10),
        Pipeline::new(pressured_config()).run(CodecKind::None.build(0).unwrap(), Box::new(store)),
    )
    .await
    .expect("pipeline hung after sink failure");

    match result {
        Err(Error::Stage { stage: StageId::Sink, source }) => {
            assert!(
                matches!(source.as_ref(), Error::Storage(_)),
                "wrong root cause: {source}"
            );
        }
        other => panic!("expected a sink stage failure, got {other:?}"),
    }
}

#[tokio::test]
async fn chaos_sink_failure_with_immediate_rejection() {
    // Zero successful appends: the failure hits on the very first chunk,
    // while both upstream stages are still mid-flight.
    let (store, accepted) = FlakyStore::new(0);

    let result = timeout(
        Duration::from_secs(10),
        Pipeline::new(pressured_config()).run(CodecKind::None.build(0).unwrap(), Box::new(store)),
    )
    .await
    .expect("pipeline hung after sink failure");

    assert!(matches!(result, Err(Error::Stage { stage: StageId::Sink, .. })));
    assert!(accepted.lock().unwrap().is_empty());
}

#[tokio::test]
async fn chaos_failed_run_leaves_clean_prefix() {
    let (store, accepted) = FlakyStore::new(4);

    let result = timeout(
        Duration::from_secs(10),
        Pipeline::new(pressured_config()).run(CodecKind::None.build(0).unwrap(), Box::new(store)),
    )
    .await
    .expect("pipeline hung after sink failure");
    assert!(result.is_err());

    // Whatever made it to the store must be an unbroken prefix of the
    // canonical stream: no gaps, no reordering, no torn records.
    let accepted = accepted.lock().unwrap().clone();
    let expected = canonical_stream(accepted.len() as u64 / RECORD_LEN as u64 + 1);
    assert!(
        !accepted.is_empty(),
        "four appends were accepted, the prefix cannot be empty"
    );
    assert_eq!(accepted, expected[..accepted.len()]);
}

#[tokio::test]
async fn chaos_finalize_failure_surfaces_as_sink_error() {
    let accepted = Arc::new(Mutex::new(Vec::new()));
    let store = UnflushableStore {
        accepted: accepted.clone(),
    };

    let config = PipelineConfig {
        record_limit: Some(100),
        ..Default::default()
    };
    let result = timeout(
        Duration::from_secs(10),
        Pipeline::new(config).run(CodecKind::None.build(0).unwrap(), Box::new(store)),
    )
    .await
    .expect("pipeline hung after finalize failure");

    assert!(matches!(result, Err(Error::Stage { stage: StageId::Sink, .. })));
    // Every append preceded the failed flush, so the data is all there.
    assert_eq!(accepted.lock().unwrap().clone(), canonical_stream(100));
}

// ============================================================================
// Transform Faults
// ============================================================================

#[tokio::test]
async fn chaos_codec_failure_fails_pipeline_fast() {
    let codec = FusedCodec {
        encode_calls_left: 3,
    };

    let result = timeout(
        Duration::from_secs(10),
        Pipeline::new(pressured_config()).run(
            Box::new(codec),
            Box::new(streampress_pipeline::MemoryStore::new()),
        ),
    )
    .await
    .expect("pipeline hung after codec failure");

    match result {
        Err(Error::Stage { stage: StageId::Transform, source }) => {
            assert!(
                matches!(source.as_ref(), Error::Codec(_)),
                "wrong root cause: {source}"
            );
        }
        other => panic!("expected a transform stage failure, got {other:?}"),
    }
}

#[tokio::test]
async fn chaos_codec_failure_on_first_call() {
    let codec = FusedCodec {
        encode_calls_left: 0,
    };

    let result = timeout(
        Duration::from_secs(10),
        Pipeline::new(pressured_config()).run(
            Box::new(codec),
            Box::new(streampress_pipeline::MemoryStore::new()),
        ),
    )
    .await
    .expect("pipeline hung after codec failure");

    assert!(matches!(
        result,
        Err(Error::Stage { stage: StageId::Transform, .. })
    ));
}
