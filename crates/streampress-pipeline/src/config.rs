//! Pipeline Configuration
//!
//! This module defines configuration for a pipeline run.
//!
//! ## PipelineConfig
//!
//! Controls buffering, flush cadence, and run length:
//!
//! - **raw_watermarks**: Flow control for the record channel (default: 32KiB / 16KiB)
//! - **encoded_watermarks**: Flow control for the encoded channel (default: 128MiB / 16KiB)
//! - **flush_interval_records**: Records staged between channel writes (default: 128)
//! - **progress_interval_records**: Records between progress callbacks (default: 1M)
//! - **record_limit**: Stop after this many records (default: None, full counter range)
//!
//! The raw channel is deliberately shallow so the generator stays close to
//! the codec; the encoded channel is deep so a slow store soaks up bursts
//! without stalling compression.
//!
//! ## Usage
//!
//! ```ignore
//! use streampress_pipeline::PipelineConfig;
//!
//! // Bounded run for testing
//! let config = PipelineConfig {
//!     record_limit: Some(1_000),
//!     ..Default::default()
//! };
//! ```

use serde::{Deserialize, Serialize};

use crate::channel::Watermarks;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Watermarks for the generator -> transform channel (default: 32KiB high, 16KiB low)
    #[serde(default = "default_raw_watermarks")]
    pub raw_watermarks: Watermarks,

    /// Watermarks for the transform -> sink channel (default: 128MiB high, 16KiB low)
    #[serde(default = "default_encoded_watermarks")]
    pub encoded_watermarks: Watermarks,

    /// Records staged before each channel write (default: 128; 0 behaves as 1)
    #[serde(default = "default_flush_interval")]
    pub flush_interval_records: u64,

    /// Records between progress callbacks (default: 1,000,000; 0 behaves as 1)
    #[serde(default = "default_progress_interval")]
    pub progress_interval_records: u64,

    /// Stop after this many records; `None` runs the full u64 counter range
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_limit: Option<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            raw_watermarks: default_raw_watermarks(),
            encoded_watermarks: default_encoded_watermarks(),
            flush_interval_records: default_flush_interval(),
            progress_interval_records: default_progress_interval(),
            record_limit: None, // run until the counter is exhausted
        }
    }
}

fn default_raw_watermarks() -> Watermarks {
    Watermarks::new(32 * 1024, 16 * 1024) // 32KiB / 16KiB
}

fn default_encoded_watermarks() -> Watermarks {
    Watermarks::new(128 * 1024 * 1024, 16 * 1024) // 128MiB / 16KiB
}

fn default_flush_interval() -> u64 {
    128
}

fn default_progress_interval() -> u64 {
    1_000_000
}
