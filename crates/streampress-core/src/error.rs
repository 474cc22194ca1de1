//! Error Types for the Record Wire Format
//!
//! This module defines the errors that can occur when decoding records from
//! a byte stream.
//!
//! ## Error Categories
//!
//! ### Wire Format Errors
//! - `InvalidFlag`: Flag byte is outside the four defined divisibility tags
//! - `TruncatedRecord`: Buffer ended mid-record (records are fixed width)
//!
//! ## Usage
//! All fallible functions in this crate return `Result<T>`, aliased to
//! `Result<T, Error>`, so callers can propagate with `?`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid flag byte: {0:#04x}")]
    InvalidFlag(u8),

    #[error("Truncated record: need {needed} bytes, have {available}")]
    TruncatedRecord { needed: usize, available: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
