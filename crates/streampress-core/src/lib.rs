pub mod error;
pub mod record;

pub use error::{Error, Result};
pub use record::{Record, RecordFlag, RECORD_LEN};
