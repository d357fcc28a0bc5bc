//! Bounded-retry content fetch with fixed backoff.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::source::{ContentResponse, ContentSource};
use crate::FetchError;

/// Options for a single [`RetryingFetcher::fetch`] call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FetchOptions {
    /// Total attempts, including the first one.
    pub max_retries: u32,
    /// Fixed delay between attempts (milliseconds).
    pub backoff_ms: u64,
    /// Dereference only the first id of a comma-joined list.
    pub is_query_package: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_ms: 2_000,
            is_query_package: false,
        }
    }
}

impl FetchOptions {
    pub fn query_package() -> Self {
        Self {
            is_query_package: true,
            ..Self::default()
        }
    }
}

/// Fetches content through a [`ContentSource`], retrying failed attempts.
///
/// Attempts are strictly sequential. The fetcher holds no per-call state, so
/// one instance can serve concurrent callers.
#[derive(Clone)]
pub struct RetryingFetcher {
    source: Arc<dyn ContentSource>,
}

impl RetryingFetcher {
    pub fn new(source: Arc<dyn ContentSource>) -> Self {
        Self { source }
    }

    /// Fetch the bytes for `id`.
    ///
    /// # Errors
    ///
    /// - `FetchError::EmptyIdentifier`: `id` (or its first list element) is blank.
    /// - `FetchError::Exhausted`: every attempt failed; names `id` and the last cause.
    pub async fn fetch(&self, id: &str, options: &FetchOptions) -> Result<Vec<u8>, FetchError> {
        self.fetch_response(id, options).await.map(|r| r.bytes)
    }

    /// Like [`fetch`](Self::fetch) but keeps the reported content type.
    pub async fn fetch_response(
        &self,
        id: &str,
        options: &FetchOptions,
    ) -> Result<ContentResponse, FetchError> {
        let target = resolve_target(id, options.is_query_package);
        if target.is_empty() {
            return Err(FetchError::EmptyIdentifier);
        }

        let max_attempts = options.max_retries.max(1);
        let backoff = Duration::from_millis(options.backoff_ms);
        let mut last_cause = String::new();

        for attempt in 1..=max_attempts {
            match self.source.get(target).await {
                Ok(response) => {
                    debug!(id = %target, attempt, bytes = response.bytes.len(), "content fetched");
                    return Ok(response);
                }
                Err(e) => {
                    warn!(id = %target, attempt, max_attempts, error = %e, "content fetch attempt failed");
                    last_cause = e.to_string();
                    if attempt < max_attempts {
                        tokio::time::sleep(backoff).await;
                    }
                }
            }
        }

        Err(FetchError::Exhausted {
            id: target.to_string(),
            attempts: max_attempts,
            last_cause,
        })
    }
}

/// Pick the identifier to dereference.
///
/// Query packages may be published as a comma-joined list; only the first
/// entry is fetched and the rest are left to the caller.
fn resolve_target(id: &str, is_query_package: bool) -> &str {
    if is_query_package {
        id.split(',').next().unwrap_or("").trim()
    } else {
        id.trim()
    }
}
