//! Structured observability hooks for package and evaluation lifecycle events.
//!
//! This module provides:
//! - An evaluation-scoped tracing span (`evaluation_span`), attached to the
//!   race controller with `tracing::Instrument`
//! - Emission functions for package and evaluation lifecycle events
//!
//! Events are emitted at `info!` level unless noted. For JSON output, set
//! `QPACK_LOG_FORMAT=json`.

use tracing::{debug, info, warn, Span};
use uuid::Uuid;

/// Span covering one race-controller invocation.
pub fn evaluation_span(request_id: &str, invocation_id: Uuid) -> Span {
    tracing::info_span!(
        "querypack.evaluation",
        request_id = %request_id,
        invocation_id = %invocation_id,
    )
}

pub fn emit_package_assembled(entries: usize, additional: usize, support: usize) {
    info!(
        event = "package.assembled",
        entries = entries,
        additional = additional,
        support = support,
    );
}

/// Debug level: one line per ledger read.
pub fn emit_poll_attempt(request_id: &str, attempt: u32, answered: bool) {
    debug!(
        event = "evaluation.poll",
        request_id = %request_id,
        attempt = attempt,
        answered = answered,
    );
}

/// Warn level: a swallowed ledger read failure.
pub fn emit_poll_error(request_id: &str, attempt: u32, error: &dyn std::fmt::Display) {
    warn!(
        event = "evaluation.poll_error",
        request_id = %request_id,
        attempt = attempt,
        error = %error,
    );
}

pub fn emit_fulfilled(request_id: &str, scores: usize, partial: bool) {
    info!(
        event = "evaluation.fulfilled",
        request_id = %request_id,
        scores = scores,
        partial = partial,
    );
}

pub fn emit_timed_out(request_id: &str, tx_hash: &str) {
    info!(event = "evaluation.timed_out", request_id = %request_id, tx_hash = %tx_hash);
}

/// The timer fired after polling had already settled the request.
pub fn emit_finalize_superseded(request_id: &str) {
    info!(event = "evaluation.finalize_superseded", request_id = %request_id);
}

/// Finalize reverted because the request was answered in the meantime.
pub fn emit_finalize_already_resolved(request_id: &str, reason: &str) {
    info!(
        event = "evaluation.finalize_already_resolved",
        request_id = %request_id,
        reason = %reason,
    );
}

/// Finalize reverted because another caller already timed the request out.
pub fn emit_finalized_elsewhere(request_id: &str, reason: &str) {
    info!(
        event = "evaluation.finalized_elsewhere",
        request_id = %request_id,
        reason = %reason,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_emit_inside_evaluation_span() {
        let _entered = evaluation_span("0xabc", Uuid::new_v4()).entered();
        emit_poll_attempt("0xabc", 1, false);
        emit_finalized_elsewhere("0xabc", "Request already finalized");
    }
}
