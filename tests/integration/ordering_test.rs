//! In-order delivery under random latency.
//!
//! These tests verify that items come out strictly in index order while the
//! concurrency and occupancy limits hold.

use crate::common::{DelayedFetcher, drain};
use futures::StreamExt;
use pc_cursor::{CursorConfig, CursorPhase, Fetched, StreamingCursor};
use std::sync::Arc;
use std::time::Duration;

fn config(max_index: u64, max_concurrency: usize, buffer_size: usize) -> CursorConfig {
    CursorConfig::new()
        .with_max_index(max_index)
        .with_max_concurrency(max_concurrency)
        .with_buffer_size(buffer_size)
        .with_fanout_pacing(Duration::from_millis(1))
}

fn values(items: &[Fetched<u64>]) -> Vec<Option<u64>> {
    items.iter().map(|item| item.value().copied()).collect()
}

#[tokio::test]
async fn test_drain_in_order_with_random_delay() {
    let fetcher = Arc::new(DelayedFetcher::new(20, 1));
    let cursor = StreamingCursor::with_fetcher(config(10, 5, 5), fetcher.clone());

    let items = drain(&cursor).await;

    let expected: Vec<Option<u64>> = (0..10).map(Some).collect();
    assert_eq!(values(&items), expected);
    assert!(fetcher.peak_running() <= 5);

    let stats = cursor.stats();
    assert!(stats.max_in_flight <= 5);
    assert!(stats.max_buffered <= 5);
    assert_eq!(stats.items_delivered, 10);
    assert!(fetcher.duplicates().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_limits_hold_throughout_drain() {
    let fetcher = Arc::new(DelayedFetcher::new(10, 2));
    let cursor = Arc::new(StreamingCursor::with_fetcher(
        config(60, 4, 6),
        fetcher.clone(),
    ));

    // Sample the live counters while the consumer drains
    let sampler = {
        let cursor = cursor.clone();
        tokio::spawn(async move {
            let mut peak_in_flight = 0;
            let mut peak_buffered = 0;
            while cursor.phase() != CursorPhase::Exhausted {
                let stats = cursor.stats();
                peak_in_flight = peak_in_flight.max(stats.in_flight);
                peak_buffered = peak_buffered.max(stats.buffered + stats.pending_failures);
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
            (peak_in_flight, peak_buffered)
        })
    };

    let items = drain(&cursor).await;
    let (peak_in_flight, peak_buffered) = sampler.await.unwrap();

    let expected: Vec<Option<u64>> = (0..60).map(Some).collect();
    assert_eq!(values(&items), expected);
    assert!(peak_in_flight <= 4);
    assert!(peak_buffered <= 6);
    assert!(fetcher.peak_running() <= 4);
    assert!(cursor.stats().max_buffered <= 6);
}

#[tokio::test]
async fn test_single_item_sequence() {
    let fetcher = Arc::new(DelayedFetcher::new(5, 3));
    let cursor = StreamingCursor::with_fetcher(config(1, 5, 5), fetcher);

    assert!(cursor.has_next());
    let item = cursor.next().await.unwrap();
    assert_eq!(item.value(), Some(&0));
    assert!(!cursor.has_next());
    assert!(!cursor.has_next());
    assert!(cursor.next().await.is_none());
}

#[tokio::test]
async fn test_failure_keeps_its_position() {
    let fetcher = Arc::new(DelayedFetcher::new(10, 4).failing_at(&[3]));
    let cursor = StreamingCursor::with_fetcher(config(10, 5, 5), fetcher);

    let items = drain(&cursor).await;

    assert_eq!(items.len(), 10);
    for (index, item) in items.iter().enumerate() {
        if index == 3 {
            assert!(item.is_failed());
            assert!(item.error().unwrap().to_string().contains("no item at 3"));
        } else {
            assert_eq!(item.value(), Some(&(index as u64)));
        }
    }

    let stats = cursor.stats();
    assert_eq!(stats.fetches_failed, 1);
    assert_eq!(stats.pending_failures, 0);
}

#[tokio::test]
async fn test_consecutive_failures() {
    let fetcher = Arc::new(DelayedFetcher::new(5, 5).failing_at(&[0, 1, 2, 7]));
    let cursor = StreamingCursor::with_fetcher(config(12, 3, 4), fetcher);

    let items = drain(&cursor).await;

    let failed: Vec<usize> = items
        .iter()
        .enumerate()
        .filter(|(_, item)| item.is_failed())
        .map(|(index, _)| index)
        .collect();
    assert_eq!(items.len(), 12);
    assert_eq!(failed, vec![0, 1, 2, 7]);
}

#[tokio::test]
async fn test_exhausted_cursor_stays_exhausted() {
    let fetcher = Arc::new(DelayedFetcher::new(2, 6));
    let cursor = StreamingCursor::with_fetcher(config(5, 2, 2), fetcher.clone());

    drain(&cursor).await;
    let fetched = fetcher.fetch_count();

    for _ in 0..3 {
        assert!(!cursor.has_next());
        assert!(cursor.next().await.is_none());
    }
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(cursor.phase(), CursorPhase::Exhausted);
    assert_eq!(fetcher.fetch_count(), fetched);
}

#[tokio::test]
async fn test_buffer_larger_than_sequence() {
    let fetcher = Arc::new(DelayedFetcher::new(5, 7));
    let cursor = StreamingCursor::with_fetcher(config(8, 8, 32), fetcher.clone());

    let items = drain(&cursor).await;

    assert_eq!(items.len(), 8);
    assert_eq!(fetcher.fetch_count(), 8);
    // Unbounded mode keeps every slot
    assert_eq!(cursor.buffered(), 8);
}

#[tokio::test]
async fn test_stream_matches_cursor_protocol() {
    let fetcher = Arc::new(DelayedFetcher::new(5, 8).failing_at(&[2]));
    let cursor = StreamingCursor::with_fetcher(config(6, 2, 3), fetcher);

    let items: Vec<Fetched<u64>> = cursor.into_stream().collect().await;

    assert_eq!(
        values(&items),
        vec![Some(0), Some(1), None, Some(3), Some(4), Some(5)]
    );
}

#[tokio::test]
async fn test_concurrency_of_one() {
    let fetcher = Arc::new(DelayedFetcher::new(3, 9));
    let cursor = StreamingCursor::with_fetcher(config(15, 1, 1), fetcher.clone());

    let items = drain(&cursor).await;

    let expected: Vec<Option<u64>> = (0..15).map(Some).collect();
    assert_eq!(values(&items), expected);
    assert_eq!(fetcher.peak_running(), 1);
    assert_eq!(cursor.stats().max_buffered, 1);
}
