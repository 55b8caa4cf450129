//! Admission and fan-out scheduling for read-ahead fetches.
//!
//! There is no background loop. The scheduler runs when the consumer asks
//! for the next item and when a fetch settles; each of those events admits
//! whatever the concurrency and occupancy limits allow and walks the
//! read-ahead window forward.
//!
//! All shared state sits behind one mutex. The admission check and the
//! reservation of the slot happen in the same critical section, so two
//! concurrent probes can never launch the same index, and the in-flight and
//! occupancy limits hold on a multi-threaded runtime.

use crate::buffer::OrderedBuffer;
use crate::config::CursorConfig;
use crate::slot::{Fetched, Slot};
use crate::stats::{Counters, CursorStats};
use futures::FutureExt;
use parking_lot::{Mutex, MutexGuard};
use pc_error::FetchError;
use pc_traits::IndexFetcher;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, trace};

/// Mutable cursor state shared between the consumer and fetch tasks.
pub(crate) struct CursorState<T> {
    pub(crate) config: CursorConfig,

    /// Next position to deliver.
    pub(crate) index: u64,

    /// Highest settled index, -1 before anything settles.
    pub(crate) frontier: i64,

    /// Fetches launched and not yet settled.
    pub(crate) in_flight: usize,

    /// Admitted slots by index.
    pub(crate) buffer: OrderedBuffer<Slot<T>>,

    /// Failed indices the consumer has not reached yet.
    ///
    /// A failed slot leaves the buffer as soon as it settles. The failure is
    /// kept here until delivered and counts toward occupancy meanwhile.
    pub(crate) failures: HashMap<u64, Arc<FetchError>>,

    pub(crate) fetcher: Arc<dyn IndexFetcher<T>>,

    /// Set by the first `has_next`/`next`, cleared by reset.
    pub(crate) active: bool,

    next_launch_id: u64,

    pub(crate) counters: Counters,
}

impl<T> CursorState<T> {
    /// Whether `index` is admitted (pending, settled, or failed).
    pub(crate) fn is_admitted(&self, index: u64) -> bool {
        self.buffer.contains_key(index) || self.failures.contains_key(&index)
    }

    /// Results held for the consumer: buffered slots plus undelivered
    /// failures.
    pub(crate) fn occupancy(&self) -> usize {
        self.buffer.len() + self.failures.len()
    }

    fn is_saturated(&self) -> bool {
        self.in_flight >= self.config.max_concurrency
            || self.occupancy() >= self.config.buffer_size
    }

    /// Admission check.
    ///
    /// Indices ahead of the cursor leave one slot free while the cursor's own
    /// index is unadmitted. Without that headroom a skipped index could end
    /// up surrounded by a full buffer of later results that can never be
    /// delivered, since in bounded mode only delivery frees a slot.
    ///
    /// Undelivered failures count toward occupancy. Otherwise each failure
    /// ahead of the cursor would let one more slot in than `buffer_size`
    /// allows.
    fn admits(&self, index: u64) -> bool {
        if index >= self.config.max_index || index < self.index || self.is_admitted(index) {
            return false;
        }
        if self.in_flight >= self.config.max_concurrency {
            return false;
        }

        let headroom = usize::from(
            index != self.index
                && self.index < self.config.max_index
                && !self.is_admitted(self.index),
        );
        self.occupancy() + headroom < self.config.buffer_size
    }

    /// Drop the read-ahead furthest from the cursor until the cursor's own
    /// index fits in the buffer.
    ///
    /// Only needed after a rewind or a smaller `buffer_size`: while iterating,
    /// the headroom in [`admits`](Self::admits) keeps a slot free. Dropped
    /// pending fetches keep running and their results are discarded.
    fn make_room(&mut self) -> usize {
        let mut dropped = 0;
        while self.index < self.config.max_index
            && !self.is_admitted(self.index)
            && self.occupancy() >= self.config.buffer_size
        {
            let furthest_slot = self.buffer.keys().max();
            let furthest_failure = self.failures.keys().copied().max();
            match (furthest_slot, furthest_failure) {
                (Some(slot), Some(failure)) if failure > slot => {
                    self.failures.remove(&failure);
                }
                (Some(slot), _) => {
                    self.buffer.remove(slot);
                }
                (None, Some(failure)) => {
                    self.failures.remove(&failure);
                }
                (None, None) => break,
            }
            dropped += 1;
        }
        dropped
    }

    /// Record `index` as settled.
    fn advance_frontier(&mut self, index: u64) {
        let index = i64::try_from(index).unwrap_or(i64::MAX);
        self.frontier = self.frontier.max(index);
    }
}

/// Outcome of the consumer trying to take its current index.
pub(crate) enum Claim<T> {
    /// Nothing left to deliver.
    Exhausted,

    /// The index already failed.
    Settled(u64, Fetched<T>),

    /// A slot exists (possibly just launched); wait on it.
    Pending(u64, Slot<T>),

    /// The slot is missing and no capacity is free yet.
    Blocked(u64),
}

/// A reserved slot whose fetch has not been spawned yet.
struct Launch<T> {
    index: u64,
    launch_id: u64,
    tx: watch::Sender<Option<Fetched<T>>>,
    fetcher: Arc<dyn IndexFetcher<T>>,
}

/// Shared scheduler behind a cursor.
pub(crate) struct Scheduler<T> {
    state: Mutex<CursorState<T>>,

    /// Bumped on every settlement, delivery and purge.
    changes: watch::Sender<u64>,
}

impl<T> Scheduler<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(config: CursorConfig, fetcher: Arc<dyn IndexFetcher<T>>) -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            state: Mutex::new(CursorState {
                config,
                index: 0,
                frontier: -1,
                in_flight: 0,
                buffer: OrderedBuffer::new(),
                failures: HashMap::new(),
                fetcher,
                active: false,
                next_launch_id: 0,
                counters: Counters::new(),
            }),
            changes,
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, CursorState<T>> {
        self.state.lock()
    }

    /// Receiver that observes the next state change after this call.
    pub(crate) fn subscribe(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }

    fn notify(&self) {
        self.changes.send_modify(|version| *version = version.wrapping_add(1));
    }

    fn is_saturated(&self) -> bool {
        self.lock().is_saturated()
    }

    /// Plain probe: launch `index` if admission allows, otherwise do nothing.
    ///
    /// Returns whether a fetch was launched.
    pub(crate) fn probe(self: &Arc<Self>, index: u64) -> bool {
        let launch = {
            let mut state = self.lock();
            if !state.admits(index) {
                return false;
            }
            Self::reserve(&mut state, index)
        };
        self.spawn_fetch(launch);
        true
    }

    /// Claim the slot for the cursor's current index, launching it if it is
    /// missing and capacity allows.
    pub(crate) fn claim(self: &Arc<Self>) -> Claim<T> {
        let (claim, launch) = {
            let mut state = self.lock();
            state.active = true;
            let index = state.index;

            if index >= state.config.max_index {
                return Claim::Exhausted;
            }
            if let Some(err) = state.failures.get(&index) {
                return Claim::Settled(index, Fetched::Failed(err.clone()));
            }
            if let Some(slot) = state.buffer.get(index) {
                return Claim::Pending(index, slot.clone());
            }
            if !state.admits(index) {
                if state.in_flight >= state.config.max_concurrency {
                    return Claim::Blocked(index);
                }
                let dropped = state.make_room();
                if dropped == 0 || !state.admits(index) {
                    return Claim::Blocked(index);
                }
                debug!(index, dropped, "Dropped read-ahead to admit cursor index");
            }

            let launch = Self::reserve(&mut state, index);
            let slot = Slot {
                launch_id: launch.launch_id,
                rx: launch.tx.subscribe(),
            };
            (Claim::Pending(index, slot), launch)
        };

        debug!(index = launch.index, "Launched fetch on demand");
        self.spawn_fetch(launch);
        claim
    }

    /// Record delivery of `index` and move the cursor past it.
    pub(crate) fn consume(&self, index: u64) {
        {
            let mut state = self.lock();
            state.failures.remove(&index);
            if state.config.is_bounded() {
                state.buffer.remove(index);
            }
            state.index = state.index.max(index + 1);
            state.counters.record_delivery();
            trace!(
                index,
                buffered = state.buffer.len(),
                in_flight = state.in_flight,
                "Delivered item"
            );
        }
        self.notify();
    }

    /// Reinitialize the position, optionally dropping buffered slots.
    pub(crate) fn rewind(&self, purge: bool) {
        {
            let mut state = self.lock();
            state.index = 0;
            state.frontier = -1;
            state.active = false;
            let dropped = if purge {
                Self::purge_locked(&mut state);
                0
            } else {
                state.make_room()
            };
            debug!(
                dropped,
                buffered = state.buffer.len(),
                in_flight = state.in_flight,
                purge,
                "Cursor rewound"
            );
        }
        self.notify();
    }

    /// Drop every buffered slot and recorded failure.
    ///
    /// In-flight fetches keep running. Their results are discarded on
    /// settlement because their slots are gone.
    pub(crate) fn purge(&self) {
        {
            let mut state = self.lock();
            Self::purge_locked(&mut state);
        }
        self.notify();
    }

    fn purge_locked(state: &mut CursorState<T>) {
        let dropped = state.buffer.len() + state.failures.len();
        state.buffer.clear();
        state.failures.clear();
        debug!(dropped, in_flight = state.in_flight, "Purged buffer");
    }

    pub(crate) fn stats(&self) -> CursorStats {
        let state = self.lock();
        let counters = &state.counters;
        CursorStats {
            index: state.index,
            frontier: state.frontier,
            in_flight: state.in_flight,
            buffered: state.buffer.len(),
            pending_failures: state.failures.len(),
            fetches_launched: counters.fetches_launched,
            fetches_succeeded: counters.fetches_succeeded,
            fetches_failed: counters.fetches_failed,
            items_delivered: counters.items_delivered,
            max_in_flight: counters.max_in_flight,
            max_buffered: counters.max_buffered,
            created_at: counters.created_at,
            last_delivery_at: counters.last_delivery_at,
        }
    }

    /// Insert a pending slot for `index` and count it as in flight.
    ///
    /// Must be called in the same critical section as the admission check.
    fn reserve(state: &mut CursorState<T>, index: u64) -> Launch<T> {
        state.in_flight += 1;
        let launch_id = state.next_launch_id;
        state.next_launch_id += 1;

        let (tx, rx) = watch::channel(None);
        state.buffer.set(index, Slot { launch_id, rx });

        let (in_flight, buffered) = (state.in_flight, state.occupancy());
        state.counters.record_launch(in_flight, buffered);

        if state.config.debug_mode {
            info!(index, in_flight, buffered, "Dispatching fetch");
        } else {
            trace!(index, in_flight, buffered, "Dispatching fetch");
        }

        Launch {
            index,
            launch_id,
            tx,
            fetcher: state.fetcher.clone(),
        }
    }

    fn spawn_fetch(self: &Arc<Self>, launch: Launch<T>) {
        let scheduler = Arc::clone(self);
        tokio::spawn(async move {
            let Launch {
                index,
                launch_id,
                tx,
                fetcher,
            } = launch;

            let outcome = match AssertUnwindSafe(fetcher.fetch(index)).catch_unwind().await {
                Ok(Ok(value)) => Fetched::Ready(value),
                Ok(Err(err)) => {
                    error!(index, error = %err, "Fetch failed");
                    Fetched::failed(index, err)
                }
                Err(_) => {
                    error!(index, "Fetch panicked");
                    Fetched::Failed(Arc::new(FetchError::Abandoned(index)))
                }
            };

            scheduler.settle(index, launch_id, outcome, tx);
            scheduler.advance(index + 1).await;
        });
    }

    /// Bookkeeping once a fetch finishes, successfully or not.
    fn settle(
        &self,
        index: u64,
        launch_id: u64,
        outcome: Fetched<T>,
        tx: watch::Sender<Option<Fetched<T>>>,
    ) {
        {
            let mut state = self.lock();
            state.in_flight = state.in_flight.saturating_sub(1);
            state.advance_frontier(index);

            let owns_slot = state
                .buffer
                .get(index)
                .is_some_and(|slot| slot.launch_id == launch_id);

            match &outcome {
                Fetched::Ready(_) => state.counters.fetches_succeeded += 1,
                Fetched::Failed(err) => {
                    state.counters.fetches_failed += 1;
                    if owns_slot {
                        state.buffer.remove(index);
                        if index >= state.index {
                            state.failures.insert(index, err.clone());
                        }
                    }
                }
            }

            trace!(
                index,
                in_flight = state.in_flight,
                frontier = state.frontier,
                owns_slot,
                "Fetch settled"
            );

            // Published under the lock so the failure record and the slot
            // removal are visible together.
            tx.send_replace(Some(outcome));
        }
        self.notify();
    }

    /// Spawn an advance pass from `index`.
    pub(crate) fn spawn_advance(self: &Arc<Self>, index: u64) {
        tokio::spawn(Arc::clone(self).advance(index));
    }

    /// Admission plus fan-out starting at `index`.
    ///
    /// The launch at `index` itself is skipped if admission rejects it, but
    /// the walk still runs. Each pass probes up to `max_concurrency`
    /// candidates after the start, pausing between attempts, then repeats
    /// from just past the frontier while capacity remains and the previous
    /// pass launched something.
    pub(crate) async fn advance(self: Arc<Self>, index: u64) {
        let mut start = index;
        loop {
            let mut launched = self.probe(start);
            if self.is_saturated() {
                return;
            }

            let (window, pacing, max_index) = self.walk_params();
            for candidate in start.saturating_add(1)..=start.saturating_add(window) {
                if candidate >= max_index {
                    break;
                }
                if self.is_saturated() {
                    continue;
                }
                launched |= self.probe(candidate);
                tokio::time::sleep(pacing).await;
            }

            if !launched || self.is_saturated() {
                return;
            }

            let next = {
                let state = self.lock();
                let past_frontier = u64::try_from(state.frontier + 1).unwrap_or(0);
                past_frontier.max(start + 1)
            };
            if next >= max_index {
                return;
            }
            start = next;
        }
    }

    fn walk_params(&self) -> (u64, Duration, u64) {
        let state = self.lock();
        (
            state.config.max_concurrency as u64,
            state.config.fanout_pacing,
            state.config.max_index,
        )
    }
}
