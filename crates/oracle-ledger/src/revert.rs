//! Revert-reason classification for the timeout finalize call.
//!
//! A finalize that reverts because the oracle answered in the meantime is
//! the expected losing side of the race, not a failure. A finalize that
//! reverts because another caller already timed the request out is terminal
//! the other way: no answer will ever arrive.

use regex::RegexSet;

/// Patterns (case-insensitive) that mark a revert as "request already answered".
pub const ALREADY_RESOLVED_PATTERNS: &[&str] = &[
    r"(?i)already\s+(fulfilled|answered|responded|completed?|resolved)",
    r"(?i)(request|evaluation|aggregation)\s+(is\s+)?(not\s+pending|no\s+longer\s+pending|completed|fulfilled)",
    r"(?i)response\s+already\s+received",
];

/// Patterns (case-insensitive) that mark a revert as "request already timed out".
pub const ALREADY_FINALIZED_PATTERNS: &[&str] = &[
    r"(?i)already\s+(finali[sz]ed|timed[\s_-]*out|expired)",
    r"(?i)(request|evaluation)\s+(has\s+)?(timed[\s_-]*out|expired)",
];

/// How a finalize revert should be treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevertKind {
    /// The oracle answered before our finalize landed.
    AlreadyResolved,
    /// Someone else's timeout finalize landed first.
    AlreadyFinalized,
    /// Any other revert.
    Genuine,
}

/// Classifies revert reasons by message.
#[derive(Debug, Clone)]
pub struct RevertClassifier {
    already_resolved: RegexSet,
    already_finalized: RegexSet,
}

impl RevertClassifier {
    /// Build a classifier from custom pattern sets.
    pub fn new<R, F, S>(already_resolved: R, already_finalized: F) -> Result<Self, regex::Error>
    where
        R: IntoIterator<Item = S>,
        F: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(Self {
            already_resolved: RegexSet::new(already_resolved)?,
            already_finalized: RegexSet::new(already_finalized)?,
        })
    }

    /// Finalized patterns win when a reason matches both sets.
    pub fn classify(&self, reason: &str) -> RevertKind {
        if self.already_finalized.is_match(reason) {
            RevertKind::AlreadyFinalized
        } else if self.already_resolved.is_match(reason) {
            RevertKind::AlreadyResolved
        } else {
            RevertKind::Genuine
        }
    }
}

impl Default for RevertClassifier {
    fn default() -> Self {
        Self::new(ALREADY_RESOLVED_PATTERNS, ALREADY_FINALIZED_PATTERNS)
            .expect("built-in revert patterns compile")
    }
}
