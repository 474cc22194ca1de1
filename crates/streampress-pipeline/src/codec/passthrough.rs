//! Passthrough Codec
//!
//! Identity codec: output equals input, no container. Useful when the
//! pipeline's flow control is under test and compression would only get in
//! the way, and as the `none` choice on the command line.

use bytes::Bytes;

use super::{EncodeStep, IncrementalCodec};
use crate::Result;

#[derive(Debug, Default)]
pub struct PassthroughCodec {
    finished: bool,
}

impl PassthroughCodec {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IncrementalCodec for PassthroughCodec {
    fn name(&self) -> &'static str {
        "none"
    }

    fn encode(&mut self, input: &[u8], is_final: bool) -> Result<EncodeStep> {
        if is_final {
            self.finished = true;
        }
        Ok(EncodeStep {
            consumed: input.len(),
            output: Bytes::copy_from_slice(input),
        })
    }

    fn is_finished(&self) -> bool {
        self.finished
    }
}
