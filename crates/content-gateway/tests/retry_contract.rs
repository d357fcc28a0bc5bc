//! Behavioral contract of `RetryingFetcher`.
//!
//! Time is paused so backoff sleeps are observable as exact virtual
//! durations instead of wall-clock waits.

use std::sync::Arc;
use std::time::Duration;

use content_gateway::fakes::{MemoryContentStore, ScriptedSource};
use content_gateway::{ContentSink, FetchError, FetchOptions, RetryingFetcher};
use tokio::time::Instant;

fn options(max_retries: u32, backoff_ms: u64) -> FetchOptions {
    FetchOptions {
        max_retries,
        backoff_ms,
        is_query_package: false,
    }
}

#[tokio::test(start_paused = true)]
async fn always_failing_source_is_tried_exactly_max_retries_times() {
    let source = Arc::new(ScriptedSource::always_failing());
    let fetcher = RetryingFetcher::new(source.clone());

    let err = fetcher.fetch("QmDown", &options(3, 2_000)).await.unwrap_err();

    assert_eq!(source.calls(), 3);
    match err {
        FetchError::Exhausted {
            id,
            attempts,
            last_cause,
        } => {
            assert_eq!(id, "QmDown");
            assert_eq!(attempts, 3);
            assert!(last_cause.contains("503"), "last cause: {last_cause}");
        }
        other => panic!("expected Exhausted, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn fails_twice_then_succeeds_on_third_attempt_with_two_sleeps() {
    let source = Arc::new(ScriptedSource::succeed_after(2, b"payload".to_vec()));
    let fetcher = RetryingFetcher::new(source.clone());

    let start = Instant::now();
    let bytes = fetcher.fetch("QmFlaky", &options(3, 2_000)).await.unwrap();
    let elapsed = start.elapsed();

    assert_eq!(bytes, b"payload");
    assert_eq!(source.calls(), 3);
    // Two fixed backoff sleeps, no exponential growth.
    assert!(elapsed >= Duration::from_millis(4_000), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_millis(6_000), "elapsed {elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn first_attempt_success_does_not_sleep() {
    let source = Arc::new(ScriptedSource::succeed_after(0, b"ok".to_vec()));
    let fetcher = RetryingFetcher::new(source.clone());

    let start = Instant::now();
    let response = fetcher
        .fetch_response("QmFast", &FetchOptions::default())
        .await
        .unwrap();

    assert_eq!(response.bytes, b"ok");
    assert_eq!(
        response.content_type.as_deref(),
        Some("application/octet-stream")
    );
    assert_eq!(source.calls(), 1);
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn query_package_dereferences_only_first_identifier() {
    let source = Arc::new(ScriptedSource::succeed_after(0, b"archive".to_vec()));
    let fetcher = RetryingFetcher::new(source.clone());

    fetcher
        .fetch("QmPackage,QmJustification2,QmJustification3", &FetchOptions::query_package())
        .await
        .unwrap();

    assert_eq!(source.requested(), vec!["QmPackage".to_string()]);
}

#[tokio::test]
async fn zero_retries_still_makes_one_attempt() {
    let source = Arc::new(ScriptedSource::always_failing());
    let fetcher = RetryingFetcher::new(source.clone());

    let err = fetcher.fetch("QmOnce", &options(0, 10)).await.unwrap_err();

    assert_eq!(source.calls(), 1);
    assert!(matches!(err, FetchError::Exhausted { attempts: 1, .. }));
}

#[tokio::test]
async fn blank_identifier_fails_without_contacting_source() {
    let source = Arc::new(ScriptedSource::always_failing());
    let fetcher = RetryingFetcher::new(source.clone());

    let err = fetcher.fetch("   ", &options(3, 10)).await.unwrap_err();

    assert!(matches!(err, FetchError::EmptyIdentifier));
    assert_eq!(source.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn repeated_fetches_of_same_identifier_are_safe() {
    let store = Arc::new(MemoryContentStore::new());
    let id = store.put("doc.txt", b"stable content").await.unwrap();
    let fetcher = RetryingFetcher::new(store.clone());

    let first = fetcher.fetch(&id, &FetchOptions::default()).await.unwrap();
    let second = fetcher.fetch(&id, &FetchOptions::default()).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(store.len(), 1);
}
