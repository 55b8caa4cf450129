//! Cursor configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default exclusive upper bound of the sequence.
pub const DEFAULT_MAX_INDEX: u64 = 100;

/// Default maximum number of in-flight fetches.
pub const DEFAULT_MAX_CONCURRENCY: usize = 10;

/// Default maximum number of buffered slots (pending and settled).
pub const DEFAULT_BUFFER_SIZE: usize = 50;

/// Default pause between launch attempts during a fan-out walk (10ms).
pub const DEFAULT_FANOUT_PACING: Duration = Duration::from_millis(10);

/// What `reset()` does with buffered slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResetPolicy {
    /// Keep buffered slots; a later pass can reuse settled results.
    ///
    /// In bounded mode, slots furthest ahead are dropped if index 0 would
    /// not fit otherwise.
    #[default]
    Retain,

    /// Drop every buffered slot and recorded failure.
    Purge,
}

/// Configuration for a streaming cursor.
///
/// Limits are not checked when a cursor is built from this configuration.
/// A zero `max_concurrency` or `buffer_size` leaves the scheduler unable to
/// admit anything and the cursor stalls on the first `next()`. Call
/// [`validate`](CursorConfig::validate) to reject such values up front.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CursorConfig {
    /// Exclusive upper bound of the sequence (default: 100).
    #[serde(default = "default_max_index")]
    pub max_index: u64,

    /// Maximum in-flight fetches (default: 10).
    ///
    /// Also the width of one fan-out window.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Maximum buffered slots, pending or settled (default: 50).
    ///
    /// When this is smaller than `max_index` the cursor runs in bounded mode
    /// and evicts each slot once it has been delivered.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    /// Log every dispatched fetch at info level (default: false).
    #[serde(default)]
    pub debug_mode: bool,

    /// Pause between launch attempts in a fan-out walk (default: 10ms).
    #[serde(default = "default_fanout_pacing", with = "humantime_serde")]
    pub fanout_pacing: Duration,

    /// Whether `reset()` purges the buffer (default: retain).
    #[serde(default)]
    pub reset_policy: ResetPolicy,
}

fn default_max_index() -> u64 {
    DEFAULT_MAX_INDEX
}

fn default_max_concurrency() -> usize {
    DEFAULT_MAX_CONCURRENCY
}

fn default_buffer_size() -> usize {
    DEFAULT_BUFFER_SIZE
}

fn default_fanout_pacing() -> Duration {
    DEFAULT_FANOUT_PACING
}

impl Default for CursorConfig {
    fn default() -> Self {
        Self {
            max_index: default_max_index(),
            max_concurrency: default_max_concurrency(),
            buffer_size: default_buffer_size(),
            debug_mode: false,
            fanout_pacing: default_fanout_pacing(),
            reset_policy: ResetPolicy::default(),
        }
    }
}

impl CursorConfig {
    /// Create a new cursor configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the exclusive upper bound of the sequence.
    pub fn with_max_index(mut self, max_index: u64) -> Self {
        self.max_index = max_index;
        self
    }

    /// Set the maximum number of in-flight fetches.
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    /// Set the maximum number of buffered slots.
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    /// Enable or disable dispatch logging.
    pub fn with_debug_mode(mut self, debug_mode: bool) -> Self {
        self.debug_mode = debug_mode;
        self
    }

    /// Set the pause between fan-out launch attempts.
    pub fn with_fanout_pacing(mut self, pacing: Duration) -> Self {
        self.fanout_pacing = pacing;
        self
    }

    /// Set the reset policy.
    pub fn with_reset_policy(mut self, policy: ResetPolicy) -> Self {
        self.reset_policy = policy;
        self
    }

    /// Check if consumed slots are evicted.
    pub fn is_bounded(&self) -> bool {
        (self.buffer_size as u64) < self.max_index
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_concurrency == 0 {
            return Err("max_concurrency must be at least 1".to_string());
        }
        if self.buffer_size == 0 {
            return Err("buffer_size must be at least 1".to_string());
        }
        Ok(())
    }
}
