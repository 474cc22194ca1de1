//! Streampress Pipeline
//!
//! This crate implements a three-stage streaming compression pipeline: a
//! record generator, an incremental compression transform, and an append-only
//! persistence sink, connected by bounded in-memory byte channels.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────┐
//! │ RecordGenerator  │  emits 9-byte records (flag + LE u64)
//! └────────┬─────────┘
//!          │ raw bytes
//!          ▼
//! ┌──────────────────┐
//! │ BoundedChannel A │  high/low watermark flow control (32 KiB / 16 KiB)
//! └────────┬─────────┘
//!          │ raw bytes
//!          ▼
//! ┌──────────────────┐
//! │ TransformStage   │  drives an IncrementalCodec (zstd by default)
//! └────────┬─────────┘
//!          │ compressed bytes
//!          ▼
//! ┌──────────────────┐
//! │ BoundedChannel B │  high/low watermark flow control (128 MiB / 16 KiB)
//! └────────┬─────────┘
//!          │ compressed bytes
//!          ▼
//! ┌──────────────────┐
//! │ SinkStage        │  atomic appends into a ByteStore
//! └──────────────────┘
//! ```
//!
//! ## Main Components
//!
//! ### BoundedByteChannel
//! Single-producer single-consumer ordered byte stream. Writers suspend when
//! buffered-unread bytes reach the high watermark and resume once the reader
//! drains the level to the low watermark (hysteresis, so write rates don't
//! oscillate around a single threshold). Readers peek delivered bytes and
//! commit consumption explicitly, which is what lets the transform stage hand
//! partially-consumed chunks back to the channel.
//!
//! ### IncrementalCodec
//! Opaque stateful compressor driven chunk by chunk. Implementations may
//! consume fewer bytes than offered and may buffer internally; the final call
//! flushes all residual state into a decodable container.
//!
//! ### Pipeline
//! Spawns the three stages as tokio tasks, joins all of them, and surfaces
//! the root failure with the failing stage attached. All errors are fatal;
//! nothing here retries.
//!
//! ## Usage Example
//! ```ignore
//! use streampress_pipeline::{Pipeline, PipelineConfig, CodecKind, FileStore};
//!
//! let mut config = PipelineConfig::default();
//! config.record_limit = Some(1_000_000);
//!
//! let store = FileStore::create("out/records.zst").await?;
//! let summary = Pipeline::new(config)
//!     .run(CodecKind::Zstd.build(1)?, Box::new(store))
//!     .await?;
//! println!("{} records -> {} bytes", summary.records, summary.encoded_bytes);
//! ```

pub mod channel;
pub mod codec;
pub mod config;
pub mod error;
pub mod generator;
pub mod pipeline;
pub mod progress;
pub mod sink;
pub mod store;
pub mod transform;

pub use channel::{
    byte_channel, ChannelMonitor, ChannelReader, ChannelStats, ChannelWriter, ReadChunk, Watermarks,
};
pub use codec::{CodecKind, EncodeStep, IncrementalCodec};
pub use config::PipelineConfig;
pub use error::{Error, Result, StageId};
pub use generator::{GeneratorReport, RecordGenerator};
pub use pipeline::{Pipeline, PipelineSummary};
pub use progress::{LatestProgress, NoopProgress, ProgressObserver, TracingProgress};
pub use sink::{SinkReport, SinkStage};
pub use store::{ByteStore, FileStore, MemoryStore, MemoryStoreHandle};
pub use transform::{TransformReport, TransformStage};
