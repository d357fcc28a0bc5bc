//! Race controller.
//!
//! Both arms are futures polled by one `select!` loop in the caller's task.
//! The poll arm sets `settled` the moment it sees an answered record; the
//! timeout arm checks it after its sleep and before submitting finalize.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use content_gateway::{FetchError, RetryingFetcher};
use oracle_ledger::{
    EvaluationLedger, EvaluationRecord, FinalizeReceipt, LedgerError, RequestId, RevertClassifier,
    RevertKind,
};
use tracing::{debug, warn, Instrument};
use uuid::Uuid;

use super::{
    EvaluationOutcome, EvaluationRequest, FulfilledEvaluation, RaceConfig, RaceError, RaceResult,
    TimedOutEvaluation,
};
use crate::obs;
use crate::result::{EvaluationResult, ResultParser};

enum PollOutcome {
    Fulfilled(FulfilledEvaluation),
    Exhausted { attempts: u32 },
}

enum TimeoutOutcome {
    Finalized(FinalizeReceipt),
    /// Timer fired after polling had already settled the request.
    Superseded,
    /// Finalize reverted because the request was answered first.
    AlreadyResolved,
    /// Finalize reverted because another caller timed the request out first.
    AlreadyFinalized,
    Failed(LedgerError),
}

/// Drives one evaluation request to `Fulfilled` or `TimedOut`.
pub struct EvaluationRaceController {
    ledger: Arc<dyn EvaluationLedger>,
    fetcher: RetryingFetcher,
    parser: ResultParser,
    classifier: RevertClassifier,
    config: RaceConfig,
}

impl EvaluationRaceController {
    pub fn new(ledger: Arc<dyn EvaluationLedger>, fetcher: RetryingFetcher, config: RaceConfig) -> Self {
        Self {
            ledger,
            fetcher,
            parser: ResultParser::new(),
            classifier: RevertClassifier::default(),
            config,
        }
    }

    /// Resolve `request` to exactly one terminal outcome.
    ///
    /// # Errors
    ///
    /// - `RaceError::ResponseWindow`: no configured window and the ledger
    ///   could not report one.
    /// - `RaceError::FinalizeFailed`: finalize failed for a reason other than
    ///   the request being answered already.
    /// - `RaceError::PollExhausted`: finalize reported the request answered
    ///   but no answered record could be read before polling gave up.
    pub async fn resolve(&self, request: EvaluationRequest) -> RaceResult<EvaluationOutcome> {
        let span = obs::evaluation_span(request.request_id.as_str(), Uuid::new_v4());
        self.race(request).instrument(span).await
    }

    async fn race(&self, request: EvaluationRequest) -> RaceResult<EvaluationOutcome> {
        let window = self.response_window().await?;
        debug!(window_ms = window.as_millis() as u64, "timeout armed");

        let settled = AtomicBool::new(false);
        let poll = self.poll_arm(&request, &settled);
        let timeout = self.timeout_arm(&request.request_id, window, &settled);
        tokio::pin!(poll, timeout);

        let mut exhausted: Option<u32> = None;
        let mut timeout_done = false;

        loop {
            tokio::select! {
                polled = &mut poll, if exhausted.is_none() => match polled {
                    PollOutcome::Fulfilled(fulfilled) => {
                        return Ok(EvaluationOutcome::Fulfilled(fulfilled));
                    }
                    PollOutcome::Exhausted { attempts } => {
                        // Still looping after the timeout arm means finalize
                        // reported the request answered.
                        if timeout_done {
                            return self.settle_after_exhaustion(&request, attempts).await;
                        }
                        debug!(attempts, "polling exhausted, waiting on timeout finalize");
                        exhausted = Some(attempts);
                    }
                },
                armed = &mut timeout, if !timeout_done => {
                    timeout_done = true;
                    match armed {
                        TimeoutOutcome::Finalized(receipt) => {
                            obs::emit_timed_out(request.request_id.as_str(), &receipt.tx_hash);
                            return Ok(EvaluationOutcome::TimedOut(TimedOutEvaluation {
                                request: request.clone(),
                                receipt: Some(receipt),
                            }));
                        }
                        TimeoutOutcome::AlreadyFinalized => {
                            return Ok(EvaluationOutcome::TimedOut(TimedOutEvaluation {
                                request: request.clone(),
                                receipt: None,
                            }));
                        }
                        TimeoutOutcome::Failed(source) => {
                            return Err(RaceError::FinalizeFailed {
                                request_id: request.request_id.clone(),
                                source,
                            });
                        }
                        TimeoutOutcome::AlreadyResolved | TimeoutOutcome::Superseded => {
                            if let Some(attempts) = exhausted {
                                return self.settle_after_exhaustion(&request, attempts).await;
                            }
                        }
                    }
                }
                else => {
                    return Err(self.exhausted(&request, exhausted.unwrap_or(0)));
                }
            }
        }
    }

    async fn response_window(&self) -> RaceResult<Duration> {
        let secs = match self.config.response_timeout_secs {
            Some(secs) => secs,
            None => self
                .ledger
                .response_timeout_seconds()
                .await
                .map_err(RaceError::ResponseWindow)?,
        };
        Ok(Duration::from_secs(secs) + Duration::from_millis(self.config.safety_margin_ms))
    }

    async fn poll_arm(&self, request: &EvaluationRequest, settled: &AtomicBool) -> PollOutcome {
        let id = request.request_id.as_str();
        let attempts = self.config.max_poll_attempts.max(1);
        let interval = Duration::from_millis(self.config.poll_interval_ms);

        for attempt in 1..=attempts {
            match self.ledger.get_evaluation(&request.request_id).await {
                Ok(record) if record.is_answered() => {
                    settled.store(true, Ordering::SeqCst);
                    obs::emit_poll_attempt(id, attempt, true);
                    return PollOutcome::Fulfilled(self.collect(request, record).await);
                }
                Ok(_) => obs::emit_poll_attempt(id, attempt, false),
                Err(err) => obs::emit_poll_error(id, attempt, &err),
            }
            if attempt < attempts {
                tokio::time::sleep(interval).await;
            }
        }
        PollOutcome::Exhausted { attempts }
    }

    async fn timeout_arm(
        &self,
        request_id: &RequestId,
        window: Duration,
        settled: &AtomicBool,
    ) -> TimeoutOutcome {
        tokio::time::sleep(window).await;

        if settled.load(Ordering::SeqCst) {
            obs::emit_finalize_superseded(request_id.as_str());
            return TimeoutOutcome::Superseded;
        }

        match self.ledger.finalize_evaluation_timeout(request_id).await {
            Ok(receipt) => {
                settled.store(true, Ordering::SeqCst);
                TimeoutOutcome::Finalized(receipt)
            }
            Err(err) => {
                let kind = err
                    .revert_reason()
                    .map(|reason| (reason, self.classifier.classify(reason)));
                match kind {
                    Some((reason, RevertKind::AlreadyResolved)) => {
                        obs::emit_finalize_already_resolved(request_id.as_str(), reason);
                        TimeoutOutcome::AlreadyResolved
                    }
                    Some((reason, RevertKind::AlreadyFinalized)) => {
                        settled.store(true, Ordering::SeqCst);
                        obs::emit_finalized_elsewhere(request_id.as_str(), reason);
                        TimeoutOutcome::AlreadyFinalized
                    }
                    _ => TimeoutOutcome::Failed(err),
                }
            }
        }
    }

    /// Polling gave up but finalize says the request is answered: read once more.
    async fn settle_after_exhaustion(
        &self,
        request: &EvaluationRequest,
        attempts: u32,
    ) -> RaceResult<EvaluationOutcome> {
        match self.ledger.get_evaluation(&request.request_id).await {
            Ok(record) if record.is_answered() => Ok(EvaluationOutcome::Fulfilled(
                self.collect(request, record).await,
            )),
            Ok(_) => Err(self.exhausted(request, attempts)),
            Err(err) => {
                obs::emit_poll_error(request.request_id.as_str(), attempts + 1, &err);
                Err(self.exhausted(request, attempts))
            }
        }
    }

    fn exhausted(&self, request: &EvaluationRequest, attempts: u32) -> RaceError {
        RaceError::PollExhausted {
            request_id: request.request_id.clone(),
            attempts,
        }
    }

    async fn collect(&self, request: &EvaluationRequest, record: EvaluationRecord) -> FulfilledEvaluation {
        let (result, justification_error) =
            match self.fetch_justification(&record.justification_cid).await {
                Ok(result) => (result.with_fallback_scores(&record.likelihoods), None),
                Err(err) => {
                    warn!(
                        justification = %record.justification_cid,
                        error = %err,
                        "justification unavailable, returning ledger scores only"
                    );
                    (
                        EvaluationResult::placeholder(&err).with_fallback_scores(&record.likelihoods),
                        Some(err.to_string()),
                    )
                }
            };

        obs::emit_fulfilled(
            request.request_id.as_str(),
            result.outcome_scores.len(),
            justification_error.is_some(),
        );

        FulfilledEvaluation {
            request: request.clone(),
            record,
            result,
            justification_error,
        }
    }

    /// Fetch every page of a possibly comma-joined justification id, in order.
    async fn fetch_justification(&self, cid: &str) -> Result<EvaluationResult, FetchError> {
        let ids: Vec<&str> = cid
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .collect();
        if ids.is_empty() {
            return Err(FetchError::EmptyIdentifier);
        }

        let mut pages = Vec::with_capacity(ids.len());
        for id in ids {
            let bytes = self.fetcher.fetch(id, &self.config.justification).await?;
            pages.push(self.parser.parse(&bytes));
        }
        Ok(merge_pages(pages))
    }
}

/// Join page texts with a blank line; the first page with scores supplies
/// scores and labels, the first with a timestamp supplies the timestamp.
fn merge_pages(pages: Vec<EvaluationResult>) -> EvaluationResult {
    let mut merged = EvaluationResult::default();
    let mut texts = Vec::with_capacity(pages.len());

    for page in pages {
        if merged.outcome_scores.is_empty() && !page.outcome_scores.is_empty() {
            merged.outcome_scores = page.outcome_scores;
            merged.outcome_labels = page.outcome_labels;
        }
        if merged.timestamp.is_none() {
            merged.timestamp = page.timestamp;
        }
        texts.push(page.justification_text);
    }

    merged.justification_text = texts.join("\n\n");
    merged
}
