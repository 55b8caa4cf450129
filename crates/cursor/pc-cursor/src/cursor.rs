//! Consumer-facing sequential cursor.

use crate::config::{CursorConfig, ResetPolicy};
use crate::scheduler::{Claim, Scheduler};
use crate::slot::Fetched;
use crate::stats::CursorStats;
use futures::Stream;
use parking_lot::RwLock;
use pc_error::Result;
use pc_traits::{IdentityFetcher, IndexFetcher, NoopResetHook, ResetHook};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, trace};

/// Lifecycle phase of a cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorPhase {
    /// Constructed or just reset.
    Idle,

    /// Iteration has started.
    Active,

    /// Every index has been delivered.
    Exhausted,
}

/// Sequential cursor over an index-addressed source with read-ahead.
///
/// Items `0..max_index` are delivered strictly in order. Behind the consumer,
/// up to `max_concurrency` fetches run at once and up to `buffer_size`
/// results are held until their turn comes.
///
/// `has_next` and `next` spawn work on the tokio runtime and must be called
/// from within one.
pub struct StreamingCursor<T> {
    scheduler: Arc<Scheduler<T>>,

    /// Serializes consumers so each `next` gets its own position.
    consumer: Mutex<()>,

    reset_hook: RwLock<Arc<dyn ResetHook>>,
}

impl<T> StreamingCursor<T>
where
    T: From<u64> + Clone + Send + Sync + 'static,
{
    /// Create a cursor whose items are the indices themselves.
    ///
    /// Configure a real source with [`set_fetcher`](Self::set_fetcher)
    /// before iterating.
    pub fn new(config: CursorConfig) -> Self {
        Self::with_fetcher(config, Arc::new(IdentityFetcher))
    }
}

impl<T> Default for StreamingCursor<T>
where
    T: From<u64> + Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new(CursorConfig::default())
    }
}

impl<T> StreamingCursor<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a cursor over `fetcher`.
    pub fn with_fetcher(config: CursorConfig, fetcher: Arc<dyn IndexFetcher<T>>) -> Self {
        Self {
            scheduler: Arc::new(Scheduler::new(config, fetcher)),
            consumer: Mutex::new(()),
            reset_hook: RwLock::new(Arc::new(NoopResetHook)),
        }
    }

    /// Set the reset hook, builder style.
    pub fn with_reset_hook(self, hook: Arc<dyn ResetHook>) -> Self {
        self.set_reset_hook(hook);
        self
    }

    /// Check whether another item remains, priming read-ahead as a side
    /// effect.
    ///
    /// Does not wait for anything; readiness of the next item is a
    /// [`next`](Self::next) concern.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn has_next(&self) -> bool {
        let (more, start) = {
            let mut state = self.scheduler.lock();
            let max_index = state.config.max_index;
            let more = state.index < max_index;
            if more {
                state.active = true;
            }

            let behind_end = i64::try_from(max_index).map_or(true, |max| state.frontier < max);
            let start = if more && behind_end {
                if state.is_admitted(state.index) {
                    Some(u64::try_from(state.frontier + 1).unwrap_or(0))
                } else {
                    Some(state.index)
                }
            } else {
                None
            };
            (more, start)
        };

        if let Some(start) = start {
            self.scheduler.spawn_advance(start);
        }
        more
    }

    /// Deliver the item at the current index.
    ///
    /// Waits until that index has been fetched, launching the fetch on demand
    /// if read-ahead skipped it. Returns `None` once the cursor is exhausted.
    /// A failed fetch is returned as [`Fetched::Failed`] and iteration
    /// continues with the next index.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub async fn next(&self) -> Option<Fetched<T>> {
        let _turn = self.consumer.lock().await;

        let (index, value) = loop {
            let mut changes = self.scheduler.subscribe();
            match self.scheduler.claim() {
                Claim::Exhausted => return None,
                Claim::Settled(index, value) => break (index, value),
                Claim::Pending(index, slot) => break (index, slot.settled(index).await),
                Claim::Blocked(index) => {
                    trace!(index, "Waiting for capacity");
                    // The sender lives as long as the scheduler
                    let _ = changes.changed().await;
                }
            }
        };

        self.scheduler.consume(index);
        self.scheduler.spawn_advance(index + 1);
        Some(value)
    }

    /// Rewind to index 0 and run the reset hook.
    ///
    /// In-flight fetches are not cancelled. Buffered slots are kept unless the
    /// configured [`ResetPolicy`] is `Purge`; kept slots are reused when the
    /// cursor reaches their index again.
    pub async fn reset(&self) -> Result<()> {
        let _turn = self.consumer.lock().await;

        let purge = self.scheduler.lock().config.reset_policy == ResetPolicy::Purge;
        self.scheduler.rewind(purge);

        let hook = self.reset_hook.read().clone();
        hook.on_reset().await?;
        debug!("Cursor reset");
        Ok(())
    }

    /// Drop every buffered slot and recorded failure.
    ///
    /// Fetches already in flight run to completion but their results are
    /// discarded.
    pub fn purge(&self) {
        self.scheduler.purge();
    }

    /// Drain every remaining item.
    pub async fn collect_remaining(&self) -> Vec<Fetched<T>> {
        let mut items = Vec::new();
        while self.has_next() {
            match self.next().await {
                Some(item) => items.push(item),
                None => break,
            }
        }
        items
    }

    /// Turn the cursor into a stream of its remaining items.
    pub fn into_stream(self) -> impl Stream<Item = Fetched<T>> + Send {
        futures::stream::unfold(self, |cursor| async move {
            if !cursor.has_next() {
                return None;
            }
            let item = cursor.next().await?;
            Some((item, cursor))
        })
    }

    /// Get statistics about the cursor state.
    pub fn stats(&self) -> CursorStats {
        self.scheduler.stats()
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> CursorPhase {
        let state = self.scheduler.lock();
        if state.index >= state.config.max_index {
            CursorPhase::Exhausted
        } else if state.active {
            CursorPhase::Active
        } else {
            CursorPhase::Idle
        }
    }

    /// Next position to deliver.
    pub fn index(&self) -> u64 {
        self.scheduler.lock().index
    }

    /// Highest settled index, or -1.
    pub fn frontier(&self) -> i64 {
        self.scheduler.lock().frontier
    }

    /// Fetches currently in flight.
    pub fn in_flight(&self) -> usize {
        self.scheduler.lock().in_flight
    }

    /// Slots currently buffered.
    pub fn buffered(&self) -> usize {
        self.scheduler.lock().buffer.len()
    }

    /// Copy of the current configuration.
    pub fn config(&self) -> CursorConfig {
        self.scheduler.lock().config.clone()
    }

    /// Set the exclusive upper bound of the sequence.
    pub fn set_max_index(&self, max_index: u64) {
        self.scheduler.lock().config.max_index = max_index;
    }

    /// Set the maximum number of in-flight fetches.
    pub fn set_max_concurrency(&self, max_concurrency: usize) {
        self.scheduler.lock().config.max_concurrency = max_concurrency;
    }

    /// Set the maximum number of buffered slots.
    pub fn set_buffer_size(&self, buffer_size: usize) {
        self.scheduler.lock().config.buffer_size = buffer_size;
    }

    /// Enable or disable dispatch logging.
    pub fn set_debug_mode(&self, debug_mode: bool) {
        self.scheduler.lock().config.debug_mode = debug_mode;
    }

    /// Set the reset policy.
    pub fn set_reset_policy(&self, policy: ResetPolicy) {
        self.scheduler.lock().config.reset_policy = policy;
    }

    /// Replace the source. Only fetches launched afterwards use it.
    pub fn set_fetcher(&self, fetcher: Arc<dyn IndexFetcher<T>>) {
        self.scheduler.lock().fetcher = fetcher;
    }

    /// Replace the reset hook.
    pub fn set_reset_hook(&self, hook: Arc<dyn ResetHook>) {
        *self.reset_hook.write() = hook;
    }
}
