//! Reset and reuse across passes.

use crate::common::{DelayedFetcher, drain};
use pc_cursor::{CursorConfig, CursorPhase, ResetPolicy, StreamingCursor};
use pc_error::CursorError;
use pc_traits::FnResetHook;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

fn config(max_index: u64, buffer_size: usize) -> CursorConfig {
    CursorConfig::new()
        .with_max_index(max_index)
        .with_max_concurrency(4)
        .with_buffer_size(buffer_size)
        .with_fanout_pacing(Duration::from_millis(1))
}

#[tokio::test]
async fn test_second_pass_reuses_unbounded_buffer() {
    let fetcher = Arc::new(DelayedFetcher::new(5, 11));
    let cursor = StreamingCursor::with_fetcher(config(10, 10), fetcher.clone());

    let first = drain(&cursor).await;
    cursor.reset().await.unwrap();
    assert_eq!(cursor.phase(), CursorPhase::Idle);
    let second = drain(&cursor).await;

    assert_eq!(first.len(), 10);
    assert_eq!(second.len(), 10);
    for (a, b) in first.iter().zip(&second) {
        assert_eq!(a.value(), b.value());
    }
    assert_eq!(fetcher.fetch_count(), 10);
}

#[tokio::test]
async fn test_second_pass_refetches_in_bounded_mode() {
    let fetcher = Arc::new(DelayedFetcher::new(5, 12));
    let cursor = StreamingCursor::with_fetcher(config(10, 3), fetcher.clone());

    drain(&cursor).await;
    cursor.reset().await.unwrap();
    let second = drain(&cursor).await;

    let values: Vec<u64> = second.iter().filter_map(|item| item.value().copied()).collect();
    assert_eq!(values, (0..10).collect::<Vec<_>>());
    assert_eq!(fetcher.fetch_count(), 20);
}

#[tokio::test]
async fn test_failed_index_is_refetched_after_reset() {
    let fetcher = Arc::new(DelayedFetcher::new(5, 13).failing_at(&[4]));
    let cursor = StreamingCursor::with_fetcher(config(6, 6), fetcher.clone());

    drain(&cursor).await;
    cursor.reset().await.unwrap();
    let second = drain(&cursor).await;

    assert!(second[4].is_failed());
    assert_eq!(fetcher.fetch_count(), 7);
}

#[tokio::test]
async fn test_purge_reset_mid_iteration() {
    let fetcher = Arc::new(DelayedFetcher::new(5, 14));
    let cursor = StreamingCursor::with_fetcher(
        config(12, 4).with_reset_policy(ResetPolicy::Purge),
        fetcher,
    );

    for expected in 0..5 {
        assert!(cursor.has_next());
        assert_eq!(cursor.next().await.unwrap().value(), Some(&expected));
    }

    cursor.reset().await.unwrap();
    assert_eq!(cursor.index(), 0);

    let items = drain(&cursor).await;
    let values: Vec<u64> = items.iter().filter_map(|item| item.value().copied()).collect();
    assert_eq!(values, (0..12).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_retain_reset_mid_iteration_in_bounded_mode() {
    let fetcher = Arc::new(DelayedFetcher::new(5, 16));
    let cursor = StreamingCursor::with_fetcher(config(10, 3), fetcher);
    assert_eq!(cursor.config().reset_policy, ResetPolicy::Retain);

    for expected in 0..2 {
        assert!(cursor.has_next());
        assert_eq!(cursor.next().await.unwrap().value(), Some(&expected));
    }
    tokio::time::sleep(Duration::from_millis(30)).await;

    cursor.reset().await.unwrap();

    let items = tokio::time::timeout(Duration::from_secs(5), drain(&cursor))
        .await
        .expect("cursor stalled after reset");
    let values: Vec<u64> = items.iter().filter_map(|item| item.value().copied()).collect();
    assert_eq!(values, (0..10).collect::<Vec<_>>());
    assert!(cursor.stats().max_buffered <= 3);
}

#[tokio::test]
async fn test_reset_hook_runs_each_reset() {
    let calls = Arc::new(AtomicUsize::new(0));
    let hook = {
        let calls = calls.clone();
        FnResetHook::new(move || {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, CursorError>(())
            }
        })
    };

    let fetcher = Arc::new(DelayedFetcher::new(2, 15));
    let cursor = StreamingCursor::with_fetcher(config(3, 3), fetcher)
        .with_reset_hook(Arc::new(hook));

    for _ in 0..3 {
        drain(&cursor).await;
        cursor.reset().await.unwrap();
    }

    assert_eq!(calls.load(Ordering::SeqCst), 3);
}
