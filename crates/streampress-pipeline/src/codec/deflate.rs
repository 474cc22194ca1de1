//! Deflate Incremental Codec
//!
//! Drives a raw `flate2::Compress` state machine with zlib framing. The
//! output is one zlib stream decodable by `flate2::read::ZlibDecoder`.
//!
//! flate2 reports consumption through its running `total_in`/`total_out`
//! counters, so each step takes deltas around the call instead of trusting
//! the status alone.

use bytes::BytesMut;
use flate2::{Compress, Compression, FlushCompress, Status};

use super::{EncodeStep, IncrementalCodec};
use crate::{Error, Result};

const SCRATCH_LEN: usize = 32 * 1024;

#[derive(Debug)]
pub struct DeflateCodec {
    compress: Compress,
    scratch: Vec<u8>,
    finished: bool,
}

impl DeflateCodec {
    /// Create a deflate codec at the given compression level (0-9).
    pub fn new(level: u32) -> Result<Self> {
        if level > 9 {
            return Err(Error::Codec(format!("invalid deflate level {}", level)));
        }
        Ok(Self {
            compress: Compress::new(Compression::new(level), true),
            scratch: vec![0u8; SCRATCH_LEN],
            finished: false,
        })
    }
}

impl IncrementalCodec for DeflateCodec {
    fn name(&self) -> &'static str {
        "deflate"
    }

    fn encode(&mut self, input: &[u8], is_final: bool) -> Result<EncodeStep> {
        let mut consumed = 0;
        let mut output = BytesMut::new();

        loop {
            let flush = if is_final {
                FlushCompress::Finish
            } else {
                FlushCompress::None
            };

            let before_in = self.compress.total_in();
            let before_out = self.compress.total_out();
            let status = self
                .compress
                .compress(&input[consumed..], &mut self.scratch, flush)
                .map_err(|e| Error::Codec(e.to_string()))?;
            let read = (self.compress.total_in() - before_in) as usize;
            let written = (self.compress.total_out() - before_out) as usize;
            consumed += read;
            output.extend_from_slice(&self.scratch[..written]);

            if matches!(status, Status::StreamEnd) {
                self.finished = true;
                break;
            }
            if is_final {
                if read == 0 && written == 0 {
                    return Err(Error::Codec("deflate stalled during finish".to_string()));
                }
                // Finish keeps emitting until StreamEnd.
                continue;
            }
            if consumed == input.len() {
                break;
            }
            if read == 0 && written == 0 {
                // Stalled mid-chunk; report partial consumption and let the
                // caller re-offer the rest.
                break;
            }
        }

        Ok(EncodeStep {
            consumed,
            output: output.freeze(),
        })
    }

    fn is_finished(&self) -> bool {
        self.finished
    }
}
