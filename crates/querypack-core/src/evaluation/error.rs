//! Error types for evaluation retrieval

use oracle_ledger::{LedgerError, RequestId};
use thiserror::Error;

/// Ways an evaluation race can end without a terminal outcome
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RaceError {
    /// Polling gave up and the timeout finalize did not confirm either
    #[error("request {request_id} still pending after {attempts} polls")]
    PollExhausted { request_id: RequestId, attempts: u32 },

    /// Finalize failed for a reason other than "already answered"
    #[error("timeout finalize for {request_id} failed: {source}")]
    FinalizeFailed {
        request_id: RequestId,
        #[source]
        source: LedgerError,
    },

    /// The contractual response window could not be read
    #[error("could not read response window: {0}")]
    ResponseWindow(#[source] LedgerError),
}

pub type RaceResult<T> = std::result::Result<T, RaceError>;
