//! Ordered read-ahead cursor over an index-addressed source.
//!
//! This crate hides per-item fetch latency behind pipelining. A consumer
//! reads items `0, 1, 2, ...` strictly in order while fetches for later
//! indices are already running in the background.
//!
//! # Architecture
//!
//! The cursor consists of three main components:
//!
//! - [`OrderedBuffer`]: Insertion-ordered map from index to result slot
//! - Scheduler: Admission and fan-out of fetches under the concurrency and
//!   occupancy limits, driven only by consumption and fetch completion
//! - [`StreamingCursor`]: Sequential `has_next` / `next` / `reset` API
//!
//! # Usage
//!
//! ```ignore
//! use pc_cursor::{CursorConfig, StreamingCursor};
//!
//! let config = CursorConfig::new()
//!     .with_max_index(10)
//!     .with_max_concurrency(5)
//!     .with_buffer_size(5);
//! let cursor = StreamingCursor::with_fetcher(config, fetcher);
//!
//! while cursor.has_next() {
//!     match cursor.next().await {
//!         Some(Fetched::Ready(item)) => process(item),
//!         Some(Fetched::Failed(err)) => warn!(error = %err, "Skipping item"),
//!         None => break,
//!     }
//! }
//! ```
//!
//! # Limits
//!
//! - At most `max_concurrency` fetches are in flight at any time
//! - When `buffer_size < max_index`, at most `buffer_size` results (pending,
//!   settled, or failed) are held, and each is evicted once delivered
//! - Otherwise every result is kept, so a second pass after `reset()` reuses
//!   them without fetching again
//!
//! Limits are not validated. A zero `max_concurrency` or `buffer_size` stalls
//! the cursor; use [`CursorConfig::validate`] to catch that up front.
//!
//! Calling `reset()` mid-iteration with the default [`ResetPolicy::Retain`]
//! keeps the later slots, but drops the ones furthest ahead when a bounded
//! buffer would otherwise have no room for index 0.

pub mod buffer;
pub mod config;
pub mod cursor;
mod scheduler;
pub mod slot;
pub mod stats;

pub use buffer::OrderedBuffer;
pub use config::{
    CursorConfig, DEFAULT_BUFFER_SIZE, DEFAULT_FANOUT_PACING, DEFAULT_MAX_CONCURRENCY,
    DEFAULT_MAX_INDEX, ResetPolicy,
};
pub use cursor::{CursorPhase, StreamingCursor};
pub use slot::Fetched;
pub use stats::CursorStats;
