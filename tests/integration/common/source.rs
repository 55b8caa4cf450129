//! Random-latency test source.

use async_trait::async_trait;
use parking_lot::Mutex;
use pc_cursor::{Fetched, StreamingCursor};
use pc_error::{FetchError, Result};
use pc_traits::IndexFetcher;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Fetcher that returns the index after a random delay.
///
/// Tracks the number of concurrently running fetches and every index it was
/// asked for.
pub struct DelayedFetcher {
    max_delay_ms: u64,
    fail_at: HashSet<u64>,
    rng: Mutex<StdRng>,
    running: AtomicUsize,
    peak_running: AtomicUsize,
    requested: Mutex<Vec<u64>>,
}

impl DelayedFetcher {
    pub fn new(max_delay_ms: u64, seed: u64) -> Self {
        Self {
            max_delay_ms,
            fail_at: HashSet::new(),
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            running: AtomicUsize::new(0),
            peak_running: AtomicUsize::new(0),
            requested: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_at(mut self, indices: &[u64]) -> Self {
        self.fail_at.extend(indices.iter().copied());
        self
    }

    /// Highest number of fetches observed running at once.
    pub fn peak_running(&self) -> usize {
        self.peak_running.load(Ordering::SeqCst)
    }

    /// Number of fetches started so far.
    pub fn fetch_count(&self) -> usize {
        self.requested.lock().len()
    }

    /// Indices fetched more than once.
    pub fn duplicates(&self) -> Vec<u64> {
        let mut seen = HashSet::new();
        let mut dups: Vec<u64> = self
            .requested
            .lock()
            .iter()
            .filter(|i| !seen.insert(**i))
            .copied()
            .collect();
        dups.sort_unstable();
        dups.dedup();
        dups
    }
}

#[async_trait]
impl IndexFetcher<u64> for DelayedFetcher {
    async fn fetch(&self, index: u64) -> Result<u64> {
        self.requested.lock().push(index);
        let running = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_running.fetch_max(running, Ordering::SeqCst);

        let delay = self.rng.lock().gen_range(0..=self.max_delay_ms);
        tokio::time::sleep(Duration::from_millis(delay)).await;

        self.running.fetch_sub(1, Ordering::SeqCst);
        if self.fail_at.contains(&index) {
            return Err(FetchError::Source(format!("no item at {}", index)).into());
        }
        Ok(index)
    }
}

/// Drain a cursor with the `has_next` / `next` protocol.
pub async fn drain(cursor: &StreamingCursor<u64>) -> Vec<Fetched<u64>> {
    let mut items = Vec::new();
    while cursor.has_next() {
        match cursor.next().await {
            Some(item) => items.push(item),
            None => break,
        }
    }
    items
}
