//! Race controller scenarios.
//!
//! Every test runs with paused time: sleeps and the timeout timer advance
//! virtual time only, so the arm that wins is decided by the schedule alone.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use content_gateway::fakes::MemoryContentStore;
use content_gateway::{
    ContentResponse, ContentSource, FetchOptions, GatewayResult, RetryingFetcher,
};
use oracle_ledger::fakes::{FinalizeBehavior, ScriptedLedger};
use oracle_ledger::{EvaluationRecord, RequestId};
use querypack_core::{
    EvaluationOutcome, EvaluationRaceController, EvaluationRequest, RaceConfig, RaceError,
};
use tokio::time::Instant;

const JUSTIFICATION: &str = r#"{"scores":[{"outcome":"Yes","score":0.8},{"outcome":"No","score":0.2}],"justification":"strong evidence","timestamp":"2024-05-01T12:00:00Z"}"#;

/// 20s response window + 10s safety margin: the timer fires at t = 30s.
fn config() -> RaceConfig {
    RaceConfig {
        response_timeout_secs: Some(20),
        ..RaceConfig::default()
    }
}

fn request() -> EvaluationRequest {
    EvaluationRequest::new("QmPackage", RequestId::new("0xfeed"))
}

fn store_with_justification() -> Arc<MemoryContentStore> {
    let store = Arc::new(MemoryContentStore::new());
    store.insert("QmJustification", JUSTIFICATION);
    store
}

fn assert_elapsed_secs(start: Instant, secs: u64) {
    let elapsed = start.elapsed();
    assert!(
        elapsed >= Duration::from_secs(secs) && elapsed < Duration::from_secs(secs + 1),
        "elapsed {elapsed:?}, expected ~{secs}s"
    );
}

fn controller(
    ledger: Arc<ScriptedLedger>,
    source: Arc<dyn ContentSource>,
    config: RaceConfig,
) -> EvaluationRaceController {
    EvaluationRaceController::new(ledger, RetryingFetcher::new(source), config)
}

#[tokio::test(start_paused = true)]
async fn poll_wins_without_finalize() {
    // Answered on the third poll (t = 10s), well before the timer.
    let ledger = Arc::new(
        ScriptedLedger::new(300)
            .answered_on_poll(3, EvaluationRecord::answered(vec![8, 2], "QmJustification")),
    );
    let controller = controller(ledger.clone(), store_with_justification(), config());

    let start = Instant::now();
    let outcome = controller.resolve(request()).await.unwrap();

    assert_eq!(ledger.finalize_calls(), 0);
    assert_eq!(ledger.poll_calls(), 3);
    assert_elapsed_secs(start, 10);
    match outcome {
        EvaluationOutcome::Fulfilled(f) => {
            assert!(!f.is_partial());
            assert_eq!(f.result.outcome_labels, vec!["Yes", "No"]);
            assert_eq!(f.result.outcome_scores, vec![0.8, 0.2]);
            assert_eq!(f.result.justification_text, "strong evidence");
            assert_eq!(f.record.likelihoods, vec![8, 2]);
        }
        other => panic!("expected Fulfilled, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn timer_wins_with_exactly_one_finalize() {
    let ledger = Arc::new(ScriptedLedger::new(300));
    let controller = controller(ledger.clone(), store_with_justification(), config());

    let outcome = controller.resolve(request()).await.unwrap();

    assert_eq!(ledger.finalize_calls(), 1);
    assert_eq!(ledger.finalized(), vec![RequestId::new("0xfeed")]);
    match outcome {
        EvaluationOutcome::TimedOut(t) => {
            assert_eq!(t.request, request());
            let receipt = t.receipt.expect("our finalize confirmed");
            assert!(receipt.tx_hash.starts_with("0x"));
        }
        other => panic!("expected TimedOut, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn response_window_read_from_ledger_when_not_configured() {
    // Ledger window 40s + 10s margin: finalize at t = 50s.
    let ledger = Arc::new(ScriptedLedger::new(40));
    let controller = controller(ledger.clone(), store_with_justification(), RaceConfig::default());

    let start = Instant::now();
    let outcome = controller.resolve(request()).await.unwrap();

    assert!(matches!(outcome, EvaluationOutcome::TimedOut(_)));
    assert_elapsed_secs(start, 50);
}

#[tokio::test(start_paused = true)]
async fn already_fulfilled_revert_defers_to_polling() {
    // Finalize at t = 30s reverts; the answer shows up on poll 8 (t = 35s).
    let ledger = Arc::new(
        ScriptedLedger::new(300)
            .answered_on_poll(8, EvaluationRecord::answered(vec![1, 9], "QmJustification"))
            .with_finalize(FinalizeBehavior::Revert("Request already fulfilled".into())),
    );
    let controller = controller(ledger.clone(), store_with_justification(), config());

    let outcome = controller.resolve(request()).await.unwrap();

    assert!(outcome.is_fulfilled(), "got {outcome:?}");
    assert_eq!(ledger.finalize_calls(), 1);
    assert!(ledger.finalized().is_empty());
}

#[tokio::test(start_paused = true)]
async fn finalized_elsewhere_revert_times_out_immediately() {
    let ledger = Arc::new(
        ScriptedLedger::new(300)
            .with_finalize(FinalizeBehavior::Revert("Request already finalized".into())),
    );
    let controller = controller(ledger.clone(), store_with_justification(), config());

    let start = Instant::now();
    let outcome = controller.resolve(request()).await.unwrap();

    match outcome {
        EvaluationOutcome::TimedOut(t) => {
            assert_eq!(t.request, request());
            assert!(t.receipt.is_none());
        }
        other => panic!("expected TimedOut, got {other:?}"),
    }
    assert_eq!(ledger.finalize_calls(), 1);
    assert!(ledger.finalized().is_empty());
    assert_elapsed_secs(start, 30);
}

#[tokio::test(start_paused = true)]
async fn genuine_revert_is_surfaced() {
    let ledger = Arc::new(
        ScriptedLedger::new(300)
            .with_finalize(FinalizeBehavior::Revert("Timeout not reached".into())),
    );
    let controller = controller(ledger.clone(), store_with_justification(), config());

    match controller.resolve(request()).await {
        Err(RaceError::FinalizeFailed { request_id, source }) => {
            assert_eq!(request_id, RequestId::new("0xfeed"));
            assert_eq!(source.revert_reason(), Some("Timeout not reached"));
        }
        other => panic!("expected FinalizeFailed, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn transaction_failure_is_surfaced() {
    let ledger = Arc::new(
        ScriptedLedger::new(300).with_finalize(FinalizeBehavior::Fail("nonce too low".into())),
    );
    let controller = controller(ledger, store_with_justification(), config());

    assert!(matches!(
        controller.resolve(request()).await,
        Err(RaceError::FinalizeFailed { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn transient_poll_errors_are_swallowed() {
    let ledger = Arc::new(
        ScriptedLedger::new(300)
            .with_transient_errors(2)
            .answered_on_poll(3, EvaluationRecord::answered(vec![5, 5], "QmJustification")),
    );
    let controller = controller(ledger.clone(), store_with_justification(), config());

    let outcome = controller.resolve(request()).await.unwrap();

    assert!(outcome.is_fulfilled());
    assert_eq!(ledger.poll_calls(), 3);
    assert_eq!(ledger.finalize_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn justification_failure_yields_partial_result() {
    let ledger = Arc::new(
        ScriptedLedger::new(300)
            .answered_on_poll(1, EvaluationRecord::answered(vec![600, 400], "QmMissing")),
    );
    let empty_store: Arc<dyn ContentSource> = Arc::new(MemoryContentStore::new());
    let controller = controller(ledger.clone(), empty_store, config());

    match controller.resolve(request()).await.unwrap() {
        EvaluationOutcome::Fulfilled(f) => {
            assert!(f.is_partial());
            assert_eq!(f.result.outcome_scores, vec![600.0, 400.0]);
            assert!(f
                .result
                .justification_text
                .starts_with("Error loading justification:"));
            assert!(f.justification_error.unwrap().contains("QmMissing"));
        }
        other => panic!("expected Fulfilled, got {other:?}"),
    }
    assert_eq!(ledger.finalize_calls(), 0);
}

/// Source that takes a long time to answer.
struct SlowSource {
    delay: Duration,
    payload: &'static str,
    calls: AtomicU32,
}

#[async_trait]
impl ContentSource for SlowSource {
    async fn get(&self, _id: &str) -> GatewayResult<ContentResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Ok(ContentResponse::new(self.payload.as_bytes().to_vec()))
    }
}

#[tokio::test(start_paused = true)]
async fn timer_firing_during_slow_fetch_is_superseded() {
    // Answered at t = 25s; the fetch takes 60s, so the timer (t = 30s)
    // fires while the poll arm is still fetching.
    let ledger = Arc::new(
        ScriptedLedger::new(300)
            .answered_on_poll(6, EvaluationRecord::answered(vec![1, 1], "QmSlow")),
    );
    let source = Arc::new(SlowSource {
        delay: Duration::from_secs(60),
        payload: "slow but sure",
        calls: AtomicU32::new(0),
    });
    let controller = controller(ledger.clone(), source.clone(), config());

    let outcome = controller.resolve(request()).await.unwrap();

    assert_eq!(ledger.finalize_calls(), 0);
    assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    match outcome {
        EvaluationOutcome::Fulfilled(f) => {
            assert_eq!(f.result.justification_text, "slow but sure");
            assert_eq!(f.result.outcome_scores, vec![1.0, 1.0]);
        }
        other => panic!("expected Fulfilled, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn poll_exhaustion_then_timeout_finalize() {
    let ledger = Arc::new(ScriptedLedger::new(300));
    let config = RaceConfig {
        max_poll_attempts: 2,
        ..config()
    };
    let controller = controller(ledger.clone(), store_with_justification(), config);

    let start = Instant::now();
    let outcome = controller.resolve(request()).await.unwrap();

    assert!(matches!(outcome, EvaluationOutcome::TimedOut(_)));
    assert_eq!(ledger.poll_calls(), 2);
    assert_elapsed_secs(start, 30);
}

#[tokio::test(start_paused = true)]
async fn poll_exhaustion_with_unanswered_revert_is_an_error() {
    let ledger = Arc::new(
        ScriptedLedger::new(300)
            .with_finalize(FinalizeBehavior::Revert("Request already fulfilled".into())),
    );
    let config = RaceConfig {
        max_poll_attempts: 2,
        ..config()
    };
    let controller = controller(ledger.clone(), store_with_justification(), config);

    match controller.resolve(request()).await {
        Err(RaceError::PollExhausted { attempts, .. }) => assert_eq!(attempts, 2),
        other => panic!("expected PollExhausted, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn poll_exhaustion_then_already_answered_reads_record() {
    // Two polls miss; finalize reverts as already answered; the settling
    // read (third call) sees the record.
    let ledger = Arc::new(
        ScriptedLedger::new(300)
            .answered_on_poll(3, EvaluationRecord::answered(vec![3, 7], "QmJustification"))
            .with_finalize(FinalizeBehavior::Revert("Request already fulfilled".into())),
    );
    let config = RaceConfig {
        max_poll_attempts: 2,
        ..config()
    };
    let controller = controller(ledger.clone(), store_with_justification(), config);

    let outcome = controller.resolve(request()).await.unwrap();

    assert!(outcome.is_fulfilled());
    assert_eq!(ledger.poll_calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn already_answered_revert_then_exhaustion_reads_record() {
    // Finalize reverts at t = 30s; polls run to t = 35s and miss; the
    // settling read (ninth call) sees the record.
    let ledger = Arc::new(
        ScriptedLedger::new(300)
            .answered_on_poll(9, EvaluationRecord::answered(vec![3, 7], "QmJustification"))
            .with_finalize(FinalizeBehavior::Revert("Request already fulfilled".into())),
    );
    let config = RaceConfig {
        max_poll_attempts: 8,
        ..config()
    };
    let controller = controller(ledger.clone(), store_with_justification(), config);

    let start = Instant::now();
    let outcome = controller.resolve(request()).await.unwrap();

    assert!(outcome.is_fulfilled(), "got {outcome:?}");
    assert_eq!(ledger.poll_calls(), 9);
    assert_eq!(ledger.finalize_calls(), 1);
    assert_elapsed_secs(start, 35);
}

#[tokio::test(start_paused = true)]
async fn comma_joined_justification_is_fanned_out() {
    let store = Arc::new(MemoryContentStore::new());
    store.insert("QmPage1", "Part one of the reasoning.");
    store.insert("QmPage2", JUSTIFICATION);
    let ledger = Arc::new(
        ScriptedLedger::new(300)
            .answered_on_poll(1, EvaluationRecord::answered(vec![8, 2], "QmPage1, QmPage2")),
    );
    let controller = controller(ledger, store, config());

    match controller.resolve(request()).await.unwrap() {
        EvaluationOutcome::Fulfilled(f) => {
            assert!(!f.is_partial());
            assert_eq!(
                f.result.justification_text,
                "Part one of the reasoning.\n\nstrong evidence"
            );
            assert_eq!(f.result.outcome_labels, vec!["Yes", "No"]);
            assert_eq!(f.result.timestamp.as_deref(), Some("2024-05-01T12:00:00Z"));
        }
        other => panic!("expected Fulfilled, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn justification_fetch_honors_retry_options() {
    let ledger = Arc::new(
        ScriptedLedger::new(300)
            .answered_on_poll(1, EvaluationRecord::answered(vec![1, 2], "QmMissing")),
    );
    let config = RaceConfig {
        justification: FetchOptions {
            max_retries: 1,
            backoff_ms: 10,
            is_query_package: false,
        },
        ..config()
    };
    let controller = controller(ledger, Arc::new(MemoryContentStore::new()), config);

    let start = Instant::now();
    let outcome = controller.resolve(request()).await.unwrap();

    assert!(matches!(outcome, EvaluationOutcome::Fulfilled(ref f) if f.is_partial()));
    assert_eq!(start.elapsed(), Duration::ZERO);
}
