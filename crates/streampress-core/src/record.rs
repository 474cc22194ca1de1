//! Record Data Structure and Wire Format
//!
//! This module defines the `Record` type - the fundamental unit of data flowing
//! through the streampress pipeline - and its fixed-width wire encoding.
//!
//! ## What is a Record?
//! A record pairs a monotonically increasing counter value with a divisibility
//! tag computed from that value. The generator stage emits one record per
//! counter value, starting at 0.
//!
//! ## Flag Rules
//! The flag byte is a two-bit mask over the divisibility predicates:
//!
//! | flag   | meaning                          |
//! |--------|----------------------------------|
//! | `0x00` | divisible by neither 3 nor 5     |
//! | `0x01` | divisible by 3 only              |
//! | `0x02` | divisible by 5 only              |
//! | `0x03` | divisible by both 3 and 5        |
//!
//! Note that 0 is divisible by both, so the very first record carries `0x03`.
//!
//! ## Wire Format
//! Every record occupies exactly [`RECORD_LEN`] (9) bytes:
//!
//! ```text
//! +------+----------------------------------+
//! | flag |        value (u64, LE)           |
//! | 1 B  |             8 B                  |
//! +------+----------------------------------+
//! ```
//!
//! Fixed width keeps the downstream byte stream trivially seekable before
//! compression and makes truncation detectable from length alone.
//!
//! ## Design Decisions
//! - Encoding works over `bytes::BufMut` so records serialize straight into a
//!   staging buffer with no intermediate allocation
//! - Decoding rejects flag bytes above `0x03` instead of masking them, so
//!   corruption surfaces as a typed error rather than silently remapped data
//! - Records are immutable once constructed
//!
//! ## Example
//! ```ignore
//! let mut buf = BytesMut::new();
//! Record::new(15).encode_into(&mut buf);      // flag 0x03, value 15
//! let decoded = Record::decode(&mut buf.freeze())?;
//! assert_eq!(decoded.value, 15);
//! ```

use bytes::{Buf, BufMut};

use crate::{Error, Result};

/// Encoded size of a record on the wire: 1 flag byte + 8 value bytes.
pub const RECORD_LEN: usize = 9;

/// Divisibility tag carried in the first byte of every record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RecordFlag {
    /// Divisible by neither 3 nor 5.
    None = 0x00,
    /// Divisible by 3 only.
    ByThree = 0x01,
    /// Divisible by 5 only.
    ByFive = 0x02,
    /// Divisible by both 3 and 5.
    ByBoth = 0x03,
}

impl RecordFlag {
    /// Compute the flag for a counter value.
    pub fn classify(value: u64) -> RecordFlag {
        match (value % 3 == 0, value % 5 == 0) {
            (false, false) => RecordFlag::None,
            (true, false) => RecordFlag::ByThree,
            (false, true) => RecordFlag::ByFive,
            (true, true) => RecordFlag::ByBoth,
        }
    }
}

impl TryFrom<u8> for RecordFlag {
    type Error = crate::Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0x00 => Ok(RecordFlag::None),
            0x01 => Ok(RecordFlag::ByThree),
            0x02 => Ok(RecordFlag::ByFive),
            0x03 => Ok(RecordFlag::ByBoth),
            _ => Err(Error::InvalidFlag(value)),
        }
    }
}

/// A single record in the stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Record {
    /// Counter value this record was generated from
    pub value: u64,

    /// Divisibility tag for `value`
    pub flag: RecordFlag,
}

impl Record {
    /// Create a record, computing the flag from the value.
    pub fn new(value: u64) -> Self {
        Self {
            value,
            flag: RecordFlag::classify(value),
        }
    }

    /// Serialize this record into `buf` in wire order (flag, then LE value).
    pub fn encode_into(&self, buf: &mut impl BufMut) {
        buf.put_u8(self.flag as u8);
        buf.put_u64_le(self.value);
    }

    /// Decode one record from the front of `buf`, advancing it by
    /// [`RECORD_LEN`] on success.
    ///
    /// # Errors
    ///
    /// - [`Error::TruncatedRecord`] if fewer than [`RECORD_LEN`] bytes remain
    /// - [`Error::InvalidFlag`] if the flag byte is above `0x03`
    pub fn decode(buf: &mut impl Buf) -> Result<Record> {
        if buf.remaining() < RECORD_LEN {
            return Err(Error::TruncatedRecord {
                needed: RECORD_LEN,
                available: buf.remaining(),
            });
        }

        let flag = RecordFlag::try_from(buf.get_u8())?;
        let value = buf.get_u64_le();

        Ok(Record { value, flag })
    }
}
