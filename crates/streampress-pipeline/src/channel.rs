//! Bounded Byte Channel with Watermark Flow Control
//!
//! This module implements the ordered, in-memory byte stream that connects
//! adjacent pipeline stages. It is the only place in the crate where
//! backpressure exists: every other component just reads, writes, and lets
//! the channel decide who runs.
//!
//! ## Flow Control
//!
//! The channel tracks the number of buffered-unread bytes (the *level*) and
//! compares it against a pair of watermarks:
//!
//! ```text
//! level
//!   │
//! high ─────► writer suspends: a write finding level >= high parks
//!   │         until the reader drains the buffer
//!   │
//!   │   (writes stay parked anywhere in this band)
//!   │
//! low  ─────► writer resumes: consumption that brings level <= low
//!   │         wakes the parked writer
//!   │
//!   0
//! ```
//!
//! The gap between the watermarks is deliberate hysteresis: a single
//! threshold would make a fast producer oscillate park/unpark on every
//! chunk, while the band lets the reader build up real drain progress before
//! the writer is allowed back in.
//!
//! ## Read/Consume Protocol
//!
//! Reads deliver buffered bytes without removing them; `consume` commits how
//! many of the delivered bytes the consumer actually used. This split is
//! what lets the transform stage feed an incremental codec that may accept
//! only part of a chunk: the unconsumed tail stays in the channel and is
//! redelivered by the next read.
//!
//! Reads on an empty, incomplete channel suspend until bytes arrive, so a
//! consumer can never busy-spin on empty deliveries.
//!
//! ## Lifecycle
//!
//! - `complete()` marks end-of-stream; it is idempotent, and dropping the
//!   writer completes implicitly so a crashed producer still releases its
//!   consumer.
//! - A read observes `end_of_stream` only on the chunk that delivers the
//!   final byte (or on an empty chunk once everything was delivered).
//! - Dropping the reader closes the channel; a parked writer wakes into
//!   [`Error::ChannelClosed`] instead of waiting forever.
//!
//! ## Concurrency
//!
//! Single producer, single consumer, enforced by ownership: each end is an
//! owned value with `&mut self` methods. Internally the buffer sits behind a
//! `tokio::sync::Mutex` and the two parked directions each have a `Notify`.
//! Waiter futures are created before the state is re-checked, which is what
//! makes the `notify_waiters` wakeup race-free.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use bytes::{Buf, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, Notify};
use tracing::trace;

use crate::{Error, Result};

/// Flow-control thresholds for a bounded byte channel, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Watermarks {
    /// Writer suspends when a write finds this many buffered-unread bytes.
    pub high: usize,
    /// Suspended writer resumes once the level falls to this or below.
    pub low: usize,
}

impl Watermarks {
    pub fn new(high: usize, low: usize) -> Self {
        Self { high, low }
    }
}

/// One delivery from [`ChannelReader::read`].
#[derive(Debug, Clone)]
pub struct ReadChunk {
    /// Delivered bytes. They remain buffered until committed via `consume`.
    pub data: Bytes,

    /// True only if no byte beyond this chunk will ever arrive.
    pub end_of_stream: bool,
}

/// Counter snapshot for one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelStats {
    /// Total bytes appended by the writer.
    pub bytes_written: u64,
    /// Total bytes committed by the reader.
    pub bytes_consumed: u64,
    /// Times a write parked at the high watermark.
    pub writer_pauses: u64,
    /// Times a read parked on an empty channel.
    pub reader_empty_waits: u64,
    /// Buffered-unread bytes at snapshot time.
    pub buffered: u64,
}

#[derive(Debug)]
struct State {
    buffer: BytesMut,
    /// Byte budget of the most recent read that `consume` may commit against.
    delivered: usize,
    /// Writer parked at the high watermark, waiting for the low.
    paused: bool,
}

#[derive(Debug)]
struct Shared {
    watermarks: Watermarks,
    state: Mutex<State>,
    /// Stream completed; set once, before the final `readable` wakeup.
    completed: AtomicBool,
    /// Reader end dropped; parked writers wake into `ChannelClosed`.
    reader_closed: AtomicBool,
    /// Signaled when bytes arrive or the stream completes.
    readable: Notify,
    /// Signaled when the level falls to the low watermark or the reader drops.
    writable: Notify,
    bytes_written: AtomicU64,
    bytes_consumed: AtomicU64,
    writer_pauses: AtomicU64,
    reader_empty_waits: AtomicU64,
    buffered: AtomicU64,
}

impl Shared {
    fn complete(&self) {
        if !self.completed.swap(true, Ordering::AcqRel) {
            self.readable.notify_waiters();
        }
    }

    fn snapshot(&self) -> ChannelStats {
        ChannelStats {
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            bytes_consumed: self.bytes_consumed.load(Ordering::Relaxed),
            writer_pauses: self.writer_pauses.load(Ordering::Relaxed),
            reader_empty_waits: self.reader_empty_waits.load(Ordering::Relaxed),
            buffered: self.buffered.load(Ordering::Relaxed),
        }
    }
}

/// Cloneable read-only view of a channel's counters.
///
/// Outlives both ends, so the orchestrator can report channel totals after
/// the stages have consumed their endpoints.
#[derive(Clone)]
pub struct ChannelMonitor {
    shared: Arc<Shared>,
}

impl ChannelMonitor {
    pub fn snapshot(&self) -> ChannelStats {
        self.shared.snapshot()
    }
}

/// Producing end of a bounded byte channel.
#[derive(Debug)]
pub struct ChannelWriter {
    shared: Arc<Shared>,
}

/// Consuming end of a bounded byte channel.
#[derive(Debug)]
pub struct ChannelReader {
    shared: Arc<Shared>,
}

/// Create a bounded byte channel with the given watermarks.
///
/// # Errors
///
/// [`Error::InvalidWatermarks`] unless `low < high`.
pub fn byte_channel(watermarks: Watermarks) -> Result<(ChannelWriter, ChannelReader)> {
    if watermarks.low >= watermarks.high {
        return Err(Error::InvalidWatermarks {
            high: watermarks.high,
            low: watermarks.low,
        });
    }

    let shared = Arc::new(Shared {
        watermarks,
        state: Mutex::new(State {
            buffer: BytesMut::new(),
            delivered: 0,
            paused: false,
        }),
        completed: AtomicBool::new(false),
        reader_closed: AtomicBool::new(false),
        readable: Notify::new(),
        writable: Notify::new(),
        bytes_written: AtomicU64::new(0),
        bytes_consumed: AtomicU64::new(0),
        writer_pauses: AtomicU64::new(0),
        reader_empty_waits: AtomicU64::new(0),
        buffered: AtomicU64::new(0),
    });

    let writer = ChannelWriter {
        shared: shared.clone(),
    };
    let reader = ChannelReader { shared };
    Ok((writer, reader))
}

impl ChannelWriter {
    /// Append `data` to the channel, suspending at the high watermark.
    ///
    /// The whole chunk is appended in one piece once the writer is allowed
    /// to run, so the level may overshoot `high` by up to one chunk. Empty
    /// writes are no-ops.
    ///
    /// Cancellation: a cancelled write appends nothing; the writer end stays
    /// usable.
    ///
    /// # Errors
    ///
    /// - [`Error::WriteAfterComplete`] after `complete()` was called
    /// - [`Error::ChannelClosed`] if the reader end was dropped
    pub async fn write(&mut self, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        if self.shared.completed.load(Ordering::Acquire) {
            return Err(Error::WriteAfterComplete);
        }

        loop {
            // The waiter must exist before the level is re-checked, or a
            // resume between check and park would be lost.
            let resumed = self.shared.writable.notified();
            {
                let mut state = self.shared.state.lock().await;
                if self.shared.reader_closed.load(Ordering::Acquire) {
                    return Err(Error::ChannelClosed);
                }

                let level = state.buffer.len();
                if state.paused {
                    if level <= self.shared.watermarks.low {
                        state.paused = false;
                    }
                } else if level >= self.shared.watermarks.high {
                    state.paused = true;
                    self.shared.writer_pauses.fetch_add(1, Ordering::Relaxed);
                    trace!(
                        level,
                        high = self.shared.watermarks.high,
                        "writer parked at high watermark"
                    );
                }

                if !state.paused {
                    state.buffer.extend_from_slice(data);
                    self.shared.buffered.store(state.buffer.len() as u64, Ordering::Relaxed);
                    self.shared
                        .bytes_written
                        .fetch_add(data.len() as u64, Ordering::Relaxed);
                    self.shared.readable.notify_waiters();
                    return Ok(());
                }
            }
            resumed.await;
        }
    }

    /// Mark end-of-stream. Idempotent; also invoked when the writer drops.
    pub fn complete(&mut self) {
        self.shared.complete();
    }

    pub fn monitor(&self) -> ChannelMonitor {
        ChannelMonitor {
            shared: self.shared.clone(),
        }
    }
}

impl Drop for ChannelWriter {
    fn drop(&mut self) {
        self.shared.complete();
    }
}

impl ChannelReader {
    /// Deliver up to `max` buffered bytes, suspending while the channel is
    /// empty and incomplete.
    ///
    /// Delivered bytes stay buffered until committed with [`consume`]; a
    /// later read redelivers any uncommitted tail. `end_of_stream` is set on
    /// the chunk that delivers the final byte, and on every (empty) read
    /// after that.
    ///
    /// [`consume`]: ChannelReader::consume
    pub async fn read(&mut self, max: usize) -> ReadChunk {
        loop {
            let readable = self.shared.readable.notified();
            {
                let mut state = self.shared.state.lock().await;
                let available = state.buffer.len();
                if available > 0 {
                    let n = available.min(max);
                    let data = Bytes::copy_from_slice(&state.buffer[..n]);
                    state.delivered = n;
                    let end_of_stream =
                        self.shared.completed.load(Ordering::Acquire) && n == available;
                    return ReadChunk { data, end_of_stream };
                }
                if self.shared.completed.load(Ordering::Acquire) {
                    state.delivered = 0;
                    return ReadChunk {
                        data: Bytes::new(),
                        end_of_stream: true,
                    };
                }
            }
            self.shared.reader_empty_waits.fetch_add(1, Ordering::Relaxed);
            trace!("reader parked on empty channel");
            readable.await;
        }
    }

    /// Commit `n` delivered bytes, freeing channel capacity.
    ///
    /// Commits may be split across several calls; the running budget is the
    /// size of the most recent read. Consumption that brings the level to
    /// the low watermark wakes a parked writer.
    ///
    /// # Errors
    ///
    /// [`Error::ConsumeOverrun`] if `n` exceeds the uncommitted budget.
    pub async fn consume(&mut self, n: usize) -> Result<()> {
        if n == 0 {
            return Ok(());
        }
        let mut state = self.shared.state.lock().await;
        if n > state.delivered {
            return Err(Error::ConsumeOverrun {
                requested: n,
                delivered: state.delivered,
            });
        }

        state.buffer.advance(n);
        state.delivered -= n;
        self.shared.buffered.store(state.buffer.len() as u64, Ordering::Relaxed);
        self.shared.bytes_consumed.fetch_add(n as u64, Ordering::Relaxed);

        if state.paused && state.buffer.len() <= self.shared.watermarks.low {
            state.paused = false;
            self.shared.writable.notify_waiters();
            trace!(level = state.buffer.len(), "level at low watermark; waking writer");
        }
        Ok(())
    }

    pub fn monitor(&self) -> ChannelMonitor {
        ChannelMonitor {
            shared: self.shared.clone(),
        }
    }
}

impl Drop for ChannelReader {
    fn drop(&mut self) {
        self.shared.reader_closed.store(true, Ordering::Release);
        self.shared.writable.notify_waiters();
    }
}
