//! Pipeline Error Types
//!
//! This module defines all error types that can occur while the pipeline runs.
//! Every error is fatal: the stage that hits it stops, the orchestrator tears
//! the pipeline down, and nothing retries.
//!
//! ## Error Categories
//!
//! ### Channel Contract Violations
//! - `ConsumeOverrun`: Reader committed more bytes than the last read delivered
//! - `WriteAfterComplete`: Writer appended after marking end-of-stream
//! - `InvalidWatermarks`: Channel configured with low watermark >= high
//!
//! ### Channel Disconnects
//! - `ChannelClosed`: Peer end dropped mid-stream. This is how a failing
//!   consumer unblocks its producer; the orchestrator treats it as collateral
//!   damage, never as the root failure.
//!
//! ### Codec Errors
//! - `CodecOverflow`: A single input chunk exceeded the codec's declared capacity
//! - `Codec`: The compression engine itself reported a failure
//!
//! ### Storage Errors
//! - `Storage`: An append or finalize against the byte store failed
//!
//! ### Orchestration
//! - `Stage`: Wraps a stage's failure with the stage's identity
//! - `StagePanicked`: A stage task panicked instead of returning
//!
//! ## Usage
//! All pipeline operations return `Result<T>`, aliased to `Result<T, Error>`,
//! so stage loops propagate with `?`.

use std::fmt;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Identifies which of the three pipeline stages an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageId {
    Generator,
    Transform,
    Sink,
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageId::Generator => write!(f, "generator"),
            StageId::Transform => write!(f, "transform"),
            StageId::Sink => write!(f, "sink"),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Consume overrun: requested {requested} bytes, only {delivered} delivered")]
    ConsumeOverrun { requested: usize, delivered: usize },

    #[error("Write after complete")]
    WriteAfterComplete,

    #[error("Invalid watermarks: low {low} must be below high {high}")]
    InvalidWatermarks { high: usize, low: usize },

    #[error("Channel closed by peer")]
    ChannelClosed,

    #[error("Codec overflow: chunk of {len} bytes exceeds codec capacity of {max}")]
    CodecOverflow { len: usize, max: usize },

    #[error("Codec error: {0}")]
    Codec(String),

    #[error("Storage error: {0}")]
    Storage(#[source] std::io::Error),

    #[error("{stage} stage failed: {source}")]
    Stage {
        stage: StageId,
        #[source]
        source: Box<Error>,
    },

    #[error("{0} stage panicked")]
    StagePanicked(StageId),
}

impl Error {
    /// Attach a stage identity to this error.
    pub fn in_stage(self, stage: StageId) -> Error {
        Error::Stage {
            stage,
            source: Box::new(self),
        }
    }

    /// True if this error (unwrapping any stage context) is a peer-disconnect.
    ///
    /// Disconnects are collateral: they happen to healthy stages when a
    /// neighbor dies, so root-cause selection skips them whenever a primary
    /// failure exists.
    pub fn is_disconnect(&self) -> bool {
        match self {
            Error::ChannelClosed => true,
            Error::Stage { source, .. } => source.is_disconnect(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_context_displays_stage_name() {
        let err = Error::WriteAfterComplete.in_stage(StageId::Generator);
        let msg = format!("{}", err);
        assert!(msg.contains("generator"), "got: {}", msg);
        assert!(msg.contains("Write after complete"), "got: {}", msg);
    }

    #[test]
    fn test_disconnect_detection_through_stage_wrapper() {
        assert!(Error::ChannelClosed.is_disconnect());
        assert!(Error::ChannelClosed.in_stage(StageId::Transform).is_disconnect());
        assert!(!Error::WriteAfterComplete.is_disconnect());
        let io_err = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        assert!(!Error::Storage(io_err).in_stage(StageId::Sink).is_disconnect());
    }

    #[test]
    fn test_stage_wrapper_preserves_source() {
        let err = Error::CodecOverflow { len: 10, max: 4 }.in_stage(StageId::Transform);
        let source = std::error::Error::source(&err);
        assert!(source.is_some());
        assert!(format!("{}", source.unwrap()).contains("Codec overflow"));
    }

    #[test]
    fn test_stage_id_display() {
        assert_eq!(StageId::Generator.to_string(), "generator");
        assert_eq!(StageId::Transform.to_string(), "transform");
        assert_eq!(StageId::Sink.to_string(), "sink");
    }
}
