//! Ledger trait and the records it exchanges.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::LedgerResult;

/// Chain-assigned identifier of an evaluation request (opaque, usually a
/// 0x-prefixed bytes32).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn new(id: impl Into<String>) -> Self {
        RequestId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Evaluation record as stored by the contract:
/// `(likelihoods, justificationCID, exists)`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationRecord {
    pub likelihoods: Vec<u64>,
    #[serde(rename = "justificationCID")]
    pub justification_cid: String,
    pub exists: bool,
}

impl EvaluationRecord {
    /// Record for a request the oracle has not answered yet.
    pub fn pending() -> Self {
        Self::default()
    }

    /// Record carrying an oracle answer.
    pub fn answered(likelihoods: Vec<u64>, justification_cid: impl Into<String>) -> Self {
        Self {
            likelihoods,
            justification_cid: justification_cid.into(),
            exists: true,
        }
    }

    /// True once the record exists and carries a non-empty score vector.
    pub fn is_answered(&self) -> bool {
        self.exists && !self.likelihoods.is_empty()
    }
}

/// Confirmation of a timeout finalize transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizeReceipt {
    pub tx_hash: String,
}

/// Evaluation contract interface.
///
/// Implementations are stateless capability handles: they must be usable
/// from both race arms concurrently.
///
/// Guarantees expected from the contract:
/// - `get_evaluation` never mutates state and may be re-issued freely.
/// - A finalize for a request that is already answered or already finalized
///   reverts; it never corrupts the stored result.
#[async_trait]
pub trait EvaluationLedger: Send + Sync {
    /// Read the evaluation record for `request_id`.
    async fn get_evaluation(&self, request_id: &RequestId) -> LedgerResult<EvaluationRecord>;

    /// Contractual response window, in seconds.
    async fn response_timeout_seconds(&self) -> LedgerResult<u64>;

    /// Submit the timeout finalize for `request_id` and wait for confirmation.
    async fn finalize_evaluation_timeout(
        &self,
        request_id: &RequestId,
    ) -> LedgerResult<FinalizeReceipt>;
}
