//! Evaluation retrieval: racing ledger polling against the timeout finalize.

mod controller;
mod error;

use content_gateway::FetchOptions;
use oracle_ledger::{EvaluationRecord, FinalizeReceipt, RequestId};
use serde::{Deserialize, Serialize};

use crate::result::EvaluationResult;

pub use controller::EvaluationRaceController;
pub use error::{RaceError, RaceResult};

/// A confirmed evaluation request: the package CID and the chain-assigned id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationRequest {
    pub cid: String,
    pub request_id: RequestId,
}

impl EvaluationRequest {
    pub fn new(cid: impl Into<String>, request_id: RequestId) -> Self {
        Self {
            cid: cid.into(),
            request_id,
        }
    }
}

/// Race timing and justification fetch settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaceConfig {
    pub poll_interval_ms: u64,
    pub max_poll_attempts: u32,
    /// Added to the response window before the finalize is submitted.
    pub safety_margin_ms: u64,
    /// Overrides the ledger's response window when set.
    pub response_timeout_secs: Option<u64>,
    pub justification: FetchOptions,
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 5_000,
            max_poll_attempts: 60,
            safety_margin_ms: 10_000,
            response_timeout_secs: None,
            justification: FetchOptions::default(),
        }
    }
}

/// The oracle answered the request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FulfilledEvaluation {
    pub request: EvaluationRequest,
    pub record: EvaluationRecord,
    pub result: EvaluationResult,
    /// Set when the justification could not be retrieved; `result` then holds
    /// ledger scores and a placeholder text.
    pub justification_error: Option<String>,
}

impl FulfilledEvaluation {
    pub fn is_partial(&self) -> bool {
        self.justification_error.is_some()
    }
}

/// The window elapsed and the request was finalized as timed out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimedOutEvaluation {
    pub request: EvaluationRequest,
    /// `None` when another caller's finalize landed first.
    pub receipt: Option<FinalizeReceipt>,
}

/// Terminal state of one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EvaluationOutcome {
    Fulfilled(FulfilledEvaluation),
    TimedOut(TimedOutEvaluation),
}

impl EvaluationOutcome {
    pub fn request(&self) -> &EvaluationRequest {
        match self {
            EvaluationOutcome::Fulfilled(f) => &f.request,
            EvaluationOutcome::TimedOut(t) => &t.request,
        }
    }

    pub fn is_fulfilled(&self) -> bool {
        matches!(self, EvaluationOutcome::Fulfilled(_))
    }
}
