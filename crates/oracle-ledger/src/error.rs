//! Error types for oracle-ledger

use thiserror::Error;

/// Errors returned by an [`crate::EvaluationLedger`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// RPC transport or node failure; usually transient
    #[error("ledger RPC failed: {0}")]
    Rpc(String),

    /// Transaction was mined but reverted
    #[error("transaction reverted: {reason}")]
    Reverted { reason: String },

    /// Transaction could not be submitted or confirmed
    #[error("transaction failed: {0}")]
    Transaction(String),
}

impl LedgerError {
    /// Revert reason, if this error is a revert.
    pub fn revert_reason(&self) -> Option<&str> {
        match self {
            LedgerError::Reverted { reason } => Some(reason),
            _ => None,
        }
    }
}
