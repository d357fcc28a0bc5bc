//! Scripted ledger (testing only)
//!
//! `ScriptedLedger` answers a request after a configured number of polls,
//! can inject transient RPC failures, and records every finalize call so
//! tests can assert on call counts.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::ledger::{EvaluationLedger, EvaluationRecord, FinalizeReceipt, RequestId};
use crate::{LedgerError, LedgerResult};

/// What `finalize_evaluation_timeout` does when called.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinalizeBehavior {
    /// Confirm with a synthetic transaction hash.
    Confirm,
    /// Revert with the given reason.
    Revert(String),
    /// Fail before confirmation (e.g. nonce or gas error).
    Fail(String),
}

/// Deterministic in-memory ledger.
#[derive(Debug)]
pub struct ScriptedLedger {
    response_timeout_secs: u64,
    answer: Option<(u32, EvaluationRecord)>,
    transient_errors: u32,
    finalize: FinalizeBehavior,
    poll_calls: AtomicU32,
    finalize_calls: AtomicU32,
    finalized: Mutex<Vec<RequestId>>,
}

impl ScriptedLedger {
    /// Ledger with the given response window that never answers and
    /// confirms finalize calls.
    pub fn new(response_timeout_secs: u64) -> Self {
        Self {
            response_timeout_secs,
            answer: None,
            transient_errors: 0,
            finalize: FinalizeBehavior::Confirm,
            poll_calls: AtomicU32::new(0),
            finalize_calls: AtomicU32::new(0),
            finalized: Mutex::new(Vec::new()),
        }
    }

    /// Return `record` from the `poll`-th `get_evaluation` call (1-based) onward.
    pub fn answered_on_poll(mut self, poll: u32, record: EvaluationRecord) -> Self {
        self.answer = Some((poll, record));
        self
    }

    /// Fail the first `count` `get_evaluation` calls with an RPC error.
    pub fn with_transient_errors(mut self, count: u32) -> Self {
        self.transient_errors = count;
        self
    }

    pub fn with_finalize(mut self, behavior: FinalizeBehavior) -> Self {
        self.finalize = behavior;
        self
    }

    /// Number of `get_evaluation` calls observed so far.
    pub fn poll_calls(&self) -> u32 {
        self.poll_calls.load(Ordering::SeqCst)
    }

    /// Number of finalize submissions observed so far.
    pub fn finalize_calls(&self) -> u32 {
        self.finalize_calls.load(Ordering::SeqCst)
    }

    /// Requests that were successfully finalized.
    pub fn finalized(&self) -> Vec<RequestId> {
        self.finalized.lock().unwrap().clone()
    }
}

#[async_trait]
impl EvaluationLedger for ScriptedLedger {
    async fn get_evaluation(&self, request_id: &RequestId) -> LedgerResult<EvaluationRecord> {
        let call = self.poll_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call <= self.transient_errors {
            return Err(LedgerError::Rpc(format!(
                "connection reset while reading {request_id}"
            )));
        }
        match &self.answer {
            Some((from, record)) if call >= *from => Ok(record.clone()),
            _ => Ok(EvaluationRecord::pending()),
        }
    }

    async fn response_timeout_seconds(&self) -> LedgerResult<u64> {
        Ok(self.response_timeout_secs)
    }

    async fn finalize_evaluation_timeout(
        &self,
        request_id: &RequestId,
    ) -> LedgerResult<FinalizeReceipt> {
        let n = self.finalize_calls.fetch_add(1, Ordering::SeqCst) + 1;
        match &self.finalize {
            FinalizeBehavior::Confirm => {
                self.finalized.lock().unwrap().push(request_id.clone());
                Ok(FinalizeReceipt {
                    tx_hash: format!("0x{:064x}", n),
                })
            }
            FinalizeBehavior::Revert(reason) => Err(LedgerError::Reverted {
                reason: reason.clone(),
            }),
            FinalizeBehavior::Fail(message) => Err(LedgerError::Transaction(message.clone())),
        }
    }
}
