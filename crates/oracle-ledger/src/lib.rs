//! Oracle-Ledger: the on-chain evaluation contract as seen by querypack
//!
//! The evaluation contract is an external collaborator. This crate pins down
//! the slice of it the retrieval state machine needs: reading the evaluation
//! record for a request, reading the response window, and submitting the
//! one-shot timeout finalize.
//!
//! ## Key Components
//!
//! - `EvaluationLedger`: async, backend-agnostic ledger interface
//! - `RevertClassifier`: tells "already answered" and "already timed out" reverts from real failures
//! - `fakes::ScriptedLedger`: deterministic ledger for tests

mod error;
pub mod fakes;
pub mod ledger;
pub mod revert;

pub use error::LedgerError;
pub use ledger::{EvaluationLedger, EvaluationRecord, FinalizeReceipt, RequestId};
pub use revert::{RevertClassifier, RevertKind};

/// Result type for ledger operations
pub type LedgerResult<T> = std::result::Result<T, LedgerError>;
