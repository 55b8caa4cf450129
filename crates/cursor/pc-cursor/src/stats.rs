//! Statistics for cursor runs.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Running counters, updated under the cursor state lock.
#[derive(Debug, Clone)]
pub(crate) struct Counters {
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) last_delivery_at: Option<DateTime<Utc>>,
    pub(crate) fetches_launched: u64,
    pub(crate) fetches_succeeded: u64,
    pub(crate) fetches_failed: u64,
    pub(crate) items_delivered: u64,
    pub(crate) max_in_flight: usize,
    pub(crate) max_buffered: usize,
}

impl Counters {
    pub(crate) fn new() -> Self {
        Self {
            created_at: Utc::now(),
            last_delivery_at: None,
            fetches_launched: 0,
            fetches_succeeded: 0,
            fetches_failed: 0,
            items_delivered: 0,
            max_in_flight: 0,
            max_buffered: 0,
        }
    }

    /// Record a launch and the occupancy it produced.
    pub(crate) fn record_launch(&mut self, in_flight: usize, buffered: usize) {
        self.fetches_launched += 1;
        self.max_in_flight = self.max_in_flight.max(in_flight);
        self.max_buffered = self.max_buffered.max(buffered);
    }

    pub(crate) fn record_delivery(&mut self) {
        self.items_delivered += 1;
        self.last_delivery_at = Some(Utc::now());
    }
}

/// Point-in-time view of a cursor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CursorStats {
    /// Next position to deliver.
    pub index: u64,

    /// Highest settled index, or -1.
    pub frontier: i64,

    /// Fetches currently in flight.
    pub in_flight: usize,

    /// Slots currently buffered (pending and settled).
    pub buffered: usize,

    /// Failures recorded but not yet delivered.
    pub pending_failures: usize,

    /// Total fetches launched.
    pub fetches_launched: u64,

    /// Fetches that returned a value.
    pub fetches_succeeded: u64,

    /// Fetches that failed.
    pub fetches_failed: u64,

    /// Items handed to the consumer, failed ones included.
    pub items_delivered: u64,

    /// Highest in-flight count observed.
    pub max_in_flight: usize,

    /// Highest buffer occupancy observed.
    pub max_buffered: usize,

    /// When the cursor was created.
    pub created_at: DateTime<Utc>,

    /// When the most recent item was delivered.
    pub last_delivery_at: Option<DateTime<Utc>>,
}

impl CursorStats {
    /// Time from creation to the most recent delivery.
    pub fn duration(&self) -> Option<Duration> {
        self.last_delivery_at.map(|last| last - self.created_at)
    }

    /// Delivered items per second over [`duration`](Self::duration).
    pub fn delivery_rate(&self) -> Option<f64> {
        let millis = self.duration()?.num_milliseconds();
        if millis <= 0 {
            return None;
        }
        Some(self.items_delivered as f64 / (millis as f64 / 1000.0))
    }
}
