//! Simulated high-latency source.

use async_trait::async_trait;
use parking_lot::Mutex;
use pc_error::{FetchError, Result};
use pc_traits::IndexFetcher;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use std::time::Duration;
use tracing::debug;

/// Source whose items are their own indices, each delivered after a random
/// delay.
pub struct SimulatedFetcher {
    min_latency: Duration,
    max_latency: Duration,
    fail_at: HashSet<u64>,
    rng: Mutex<StdRng>,
}

impl SimulatedFetcher {
    /// Create a source with latencies drawn from `min_latency..=max_latency`.
    pub fn new(min_latency: Duration, max_latency: Duration, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            min_latency,
            max_latency,
            fail_at: HashSet::new(),
            rng: Mutex::new(rng),
        }
    }

    /// Make fetches of the given indices fail.
    pub fn with_failures(mut self, indices: impl IntoIterator<Item = u64>) -> Self {
        self.fail_at.extend(indices);
        self
    }

    fn next_latency(&self) -> Duration {
        let min = self.min_latency.as_millis() as u64;
        let max = self.max_latency.as_millis() as u64;
        if max <= min {
            return self.min_latency;
        }
        Duration::from_millis(self.rng.lock().gen_range(min..=max))
    }
}

#[async_trait]
impl IndexFetcher<u64> for SimulatedFetcher {
    async fn fetch(&self, index: u64) -> Result<u64> {
        let latency = self.next_latency();
        debug!(index, latency_ms = latency.as_millis() as u64, "Fetching");
        tokio::time::sleep(latency).await;

        if self.fail_at.contains(&index) {
            return Err(FetchError::Source(format!("injected failure at index {}", index)).into());
        }
        Ok(index)
    }
}
