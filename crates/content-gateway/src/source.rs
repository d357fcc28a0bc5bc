//! Fetch/upload primitives shared by every content store.
//!
//! The pinning service and gateway are external collaborators; the rest of
//! the workspace sees them only through these two traits.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::{GatewayError, GatewayResult};

/// Content digest (SHA-256 hex string) used as the identifier by local stores.
///
/// The inner field is private so the string is always 64 lowercase hex chars.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentDigest(String);

impl ContentDigest {
    /// Compute the SHA-256 digest of the given bytes.
    pub fn from_bytes(data: &[u8]) -> Self {
        use sha2::Digest;
        let mut hasher = Sha256::new();
        hasher.update(data);
        ContentDigest(hex::encode(hasher.finalize()))
    }

    /// Return the full hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short form (first 12 hex chars).
    pub fn short(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }
}

impl std::str::FromStr for ContentDigest {
    type Err = GatewayError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.len() != 64 || !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(GatewayError::InvalidIdentifier { id: s.to_string() });
        }
        Ok(ContentDigest(s.to_ascii_lowercase()))
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Raw bytes returned by a content store, with the reported media type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentResponse {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

impl ContentResponse {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            content_type: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// Read side of a content-addressed store.
///
/// Implementations perform exactly one attempt per call; retrying is the
/// job of [`crate::RetryingFetcher`]. Calls must not mutate remote state.
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn get(&self, id: &str) -> GatewayResult<ContentResponse>;
}

/// Write side of a content-addressed store.
#[async_trait]
pub trait ContentSink: Send + Sync {
    /// Store `data` under a display `name` and return its content identifier.
    async fn put(&self, name: &str, data: &[u8]) -> GatewayResult<String>;
}
