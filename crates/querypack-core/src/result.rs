//! Parsing fetched justification content into an [`EvaluationResult`].
//!
//! Plain text is a valid terminal form, so parsing never fails.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// Text used when the fetched body is empty.
pub const EMPTY_JUSTIFICATION: &str = "(empty justification)";

/// Scores, labels and justification for one evaluation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResult {
    /// Index-aligned with `outcome_labels` when those are present.
    pub outcome_scores: Vec<f64>,
    /// Label override; empty means "use the caller's labels".
    pub outcome_labels: Vec<String>,
    pub justification_text: String,
    /// ISO-8601, exactly as received.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl EvaluationResult {
    /// Result standing in for a justification that could not be retrieved.
    pub fn placeholder(error: impl std::fmt::Display) -> Self {
        Self {
            justification_text: format!("Error loading justification: {error}"),
            ..Self::default()
        }
    }

    /// Use ledger likelihoods as scores when the content carried none.
    pub fn with_fallback_scores(mut self, likelihoods: &[u64]) -> Self {
        if self.outcome_scores.is_empty() {
            self.outcome_scores = likelihoods.iter().map(|&l| l as f64).collect();
        }
        self
    }

    /// Labels to display: the parsed override, else `caller_labels`.
    pub fn labels_or(&self, caller_labels: &[String]) -> Vec<String> {
        if self.outcome_labels.is_empty() {
            caller_labels.to_vec()
        } else {
            self.outcome_labels.clone()
        }
    }

    /// The timestamp as a UTC instant, if present and RFC 3339.
    pub fn timestamp_utc(&self) -> Option<DateTime<Utc>> {
        self.timestamp
            .as_deref()
            .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ResultParser;

impl ResultParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, bytes: &[u8]) -> EvaluationResult {
        let text = String::from_utf8_lossy(bytes);
        if text.trim().is_empty() {
            return EvaluationResult {
                justification_text: EMPTY_JUSTIFICATION.to_string(),
                ..EvaluationResult::default()
            };
        }

        match serde_json::from_str::<Value>(&text) {
            Err(_) => EvaluationResult {
                justification_text: text.into_owned(),
                ..EvaluationResult::default()
            },
            Ok(Value::String(s)) => EvaluationResult {
                justification_text: s,
                ..EvaluationResult::default()
            },
            Ok(Value::Object(map)) => parse_object(&map),
            Ok(other) => EvaluationResult {
                justification_text: pretty(&other),
                ..EvaluationResult::default()
            },
        }
    }
}

fn parse_object(map: &serde_json::Map<String, Value>) -> EvaluationResult {
    let mut result = EvaluationResult::default();

    if let Some(scores) = map.get("scores").and_then(Value::as_array) {
        for (index, item) in scores.iter().enumerate() {
            let outcome = item.get("outcome").and_then(Value::as_str);
            let score = item.get("score").and_then(Value::as_f64);
            match (outcome, score) {
                (Some(outcome), Some(score)) => {
                    result.outcome_labels.push(outcome.to_string());
                    result.outcome_scores.push(score);
                }
                _ => warn!(index, "skipping malformed score entry"),
            }
        }
    }

    result.timestamp = match map.get("timestamp") {
        Some(Value::String(ts)) => Some(ts.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    };

    result.justification_text = match map.get("justification").and_then(Value::as_str) {
        Some(text) if !text.is_empty() => text.to_string(),
        _ => pretty(&Value::Object(map.clone())),
    };

    result
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
