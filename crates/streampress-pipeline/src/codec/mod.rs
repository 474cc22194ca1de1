//! Incremental Compression Codecs
//!
//! This module defines the codec seam the transform stage drives, plus the
//! built-in implementations.
//!
//! ## The Contract
//!
//! A codec is an opaque, stateful, single-owner compressor fed chunk by
//! chunk:
//!
//! - `encode(input, is_final)` may consume **fewer** bytes than offered and
//!   may produce empty output (engines buffer internally). The caller must
//!   re-offer unconsumed bytes on the next call.
//! - `is_final = true` asks the engine to flush everything, trailer
//!   included. Finalization may itself span several calls; the stream is
//!   done only once `is_finished()` reports true.
//! - `max_chunk_len()` bounds a single call's input. The built-in engines
//!   accept anything; the transform stage still enforces the bound so a
//!   constrained codec can be dropped in without changing the stages.
//!
//! Dropping a codec releases its engine state.
//!
//! ## Implementations
//!
//! | kind      | engine                         | container        |
//! |-----------|--------------------------------|------------------|
//! | `Zstd`    | zstd streaming encoder         | zstd frame       |
//! | `Deflate` | flate2 deflate                 | zlib stream      |
//! | `None`    | passthrough                    | raw bytes        |
//!
//! Zstd at level 1 is the production default: the pipeline is generator-fast
//! by construction, so the codec is tuned for throughput over ratio.

mod deflate;
mod passthrough;
mod zstd;

use bytes::Bytes;

use crate::Result;

pub use self::deflate::DeflateCodec;
pub use self::passthrough::PassthroughCodec;
pub use self::zstd::ZstdCodec;

/// One step of incremental encoding.
#[derive(Debug)]
pub struct EncodeStep {
    /// How many input bytes this call consumed.
    pub consumed: usize,

    /// Compressed bytes produced by this call; often empty while the engine
    /// is still buffering.
    pub output: Bytes,
}

/// Stateful incremental compressor driven by the transform stage.
pub trait IncrementalCodec: Send {
    /// Short engine name for logs.
    fn name(&self) -> &'static str;

    /// Maximum input bytes a single `encode` call accepts.
    fn max_chunk_len(&self) -> usize {
        usize::MAX
    }

    /// Feed `input` to the engine. With `is_final`, flush all residual
    /// state into the output container.
    fn encode(&mut self, input: &[u8], is_final: bool) -> Result<EncodeStep>;

    /// True once the final flush has been fully emitted.
    fn is_finished(&self) -> bool;
}

/// Selects one of the built-in codec implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecKind {
    Zstd,
    Deflate,
    None,
}

impl CodecKind {
    /// Engine name as used in logs and summaries.
    pub fn name(&self) -> &'static str {
        match self {
            CodecKind::Zstd => "zstd",
            CodecKind::Deflate => "deflate",
            CodecKind::None => "none",
        }
    }

    /// Conventional file extension for this codec's output container.
    pub fn extension(&self) -> &'static str {
        match self {
            CodecKind::Zstd => "zst",
            CodecKind::Deflate => "zz",
            CodecKind::None => "bin",
        }
    }

    /// Build a boxed codec at the given compression level.
    ///
    /// The level is engine-specific (zstd: 1-22, deflate: 0-9) and ignored
    /// by the passthrough codec.
    pub fn build(self, level: u32) -> Result<Box<dyn IncrementalCodec>> {
        Ok(match self {
            CodecKind::Zstd => Box::new(ZstdCodec::new(level as i32)?),
            CodecKind::Deflate => Box::new(DeflateCodec::new(level)?),
            CodecKind::None => Box::new(PassthroughCodec::new()),
        })
    }
}

impl std::fmt::Display for CodecKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names() {
        assert_eq!(CodecKind::Zstd.name(), "zstd");
        assert_eq!(CodecKind::Deflate.name(), "deflate");
        assert_eq!(CodecKind::None.name(), "none");
        assert_eq!(CodecKind::Zstd.to_string(), "zstd");
    }

    #[test]
    fn test_build_produces_matching_engine() {
        for (kind, expected) in [
            (CodecKind::Zstd, "zstd"),
            (CodecKind::Deflate, "deflate"),
            (CodecKind::None, "none"),
        ] {
            let codec = kind.build(1).unwrap();
            assert_eq!(codec.name(), expected);
            assert!(!codec.is_finished(), "fresh codec cannot be finished");
        }
    }

    #[test]
    fn test_built_codecs_accept_any_chunk_len() {
        for kind in [CodecKind::Zstd, CodecKind::Deflate, CodecKind::None] {
            assert_eq!(kind.build(1).unwrap().max_chunk_len(), usize::MAX);
        }
    }
}
