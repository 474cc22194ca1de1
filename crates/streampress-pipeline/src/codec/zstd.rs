//! Zstd Incremental Codec
//!
//! Drives the zstd streaming encoder one step at a time, producing a single
//! standard zstd frame across the life of the codec. Output can be decoded
//! with `zstd::decode_all` or the `zstd` CLI.
//!
//! Level 1 is the pipeline default: the generator outproduces any codec, so
//! the engine runs in its fastest mode and lets the channel watermarks do
//! the pacing.

use bytes::BytesMut;
use zstd::stream::raw::{Encoder, Operation, OutBuffer};

use super::{EncodeStep, IncrementalCodec};
use crate::{Error, Result};

/// Output scratch per engine step. Big enough that a step is never starved
/// for output room, small enough to stay cache-friendly.
const SCRATCH_LEN: usize = 64 * 1024;

pub struct ZstdCodec {
    encoder: Encoder<'static>,
    scratch: Vec<u8>,
    finished: bool,
}

impl ZstdCodec {
    /// Create a zstd codec at the given compression level (1-22).
    pub fn new(level: i32) -> Result<Self> {
        let encoder = Encoder::new(level).map_err(|e| Error::Codec(e.to_string()))?;
        Ok(Self {
            encoder,
            scratch: vec![0u8; SCRATCH_LEN],
            finished: false,
        })
    }
}

impl IncrementalCodec for ZstdCodec {
    fn name(&self) -> &'static str {
        "zstd"
    }

    fn encode(&mut self, input: &[u8], is_final: bool) -> Result<EncodeStep> {
        let mut consumed = 0;
        let mut output = BytesMut::new();

        while consumed < input.len() {
            let status = self
                .encoder
                .run_on_buffers(&input[consumed..], &mut self.scratch)
                .map_err(|e| Error::Codec(e.to_string()))?;
            consumed += status.bytes_read;
            output.extend_from_slice(&self.scratch[..status.bytes_written]);

            if status.bytes_read == 0 && status.bytes_written == 0 {
                // Engine stalled mid-chunk; report partial consumption and
                // let the caller re-offer the rest.
                break;
            }
        }

        if is_final && consumed == input.len() {
            loop {
                let (remaining, written) = {
                    let mut out = OutBuffer::around(&mut self.scratch[..]);
                    let remaining = self
                        .encoder
                        .finish(&mut out, true)
                        .map_err(|e| Error::Codec(e.to_string()))?;
                    (remaining, out.pos())
                };
                output.extend_from_slice(&self.scratch[..written]);
                if remaining == 0 {
                    self.finished = true;
                    break;
                }
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
