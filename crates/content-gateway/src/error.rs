//! Error types for content-gateway

use thiserror::Error;

/// Errors from a single content-store round trip
#[derive(Error, Debug)]
pub enum GatewayError {
    /// The gateway answered with a non-success status
    #[error("gateway returned HTTP {status} for {id}")]
    Status { id: String, status: u16 },

    /// Connection, TLS or timeout failure before a response arrived
    #[error("transport error fetching {id}: {message}")]
    Transport { id: String, message: String },

    /// Content is not held by this store
    #[error("content not found: {id}")]
    NotFound { id: String },

    /// Identifier cannot address this store
    #[error("invalid content identifier: {id}")]
    InvalidIdentifier { id: String },

    /// HTTP client could not be constructed
    #[error("gateway client setup failed: {0}")]
    Client(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors surfaced by [`crate::RetryingFetcher`]
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("content identifier must not be empty")]
    EmptyIdentifier,

    /// Every attempt failed; carries the last underlying cause.
    #[error("failed to fetch {id} after {attempts} attempt(s): {last_cause}")]
    Exhausted {
        id: String,
        attempts: u32,
        last_cause: String,
    },
}
