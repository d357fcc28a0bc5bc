//! HTTP content gateway client
//!
//! Dereferences content identifiers through an IPFS-style path gateway.
//! Uploading goes through a pinning service the caller wires in separately,
//! so this client implements only [`ContentSource`].

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::source::{ContentResponse, ContentSource};
use crate::{GatewayError, GatewayResult};

/// Gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Gateway base URL, without the `/ipfs` suffix
    pub gateway_url: String,
    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,
    /// Bearer token for dedicated gateways (optional for public ones)
    pub token: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        GatewayConfig {
            gateway_url: std::env::var("QPACK_GATEWAY_URL")
                .unwrap_or_else(|_| "https://ipfs.io".to_string()),
            timeout_ms: std::env::var("QPACK_GATEWAY_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30_000),
            token: std::env::var("QPACK_GATEWAY_TOKEN").ok(),
        }
    }
}

impl GatewayConfig {
    /// Create a new config from environment variables
    pub fn from_env() -> Self {
        Self::default()
    }

    /// Create config for a specific gateway
    pub fn new(gateway_url: &str) -> Self {
        GatewayConfig {
            gateway_url: gateway_url.to_string(),
            timeout_ms: 30_000,
            token: None,
        }
    }

    /// Set authentication token
    pub fn with_token(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }

    /// URL that dereferences `cid` on this gateway.
    pub fn content_url(&self, cid: &str) -> String {
        format!("{}/ipfs/{}", self.gateway_url.trim_end_matches('/'), cid)
    }
}

/// Gateway client for content fetches
pub struct HttpGateway {
    config: GatewayConfig,
    http_client: reqwest::Client,
}

impl HttpGateway {
    /// Create a new gateway client
    pub fn new(config: GatewayConfig) -> GatewayResult<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("querypack-content-gateway/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| GatewayError::Client(e.to_string()))?;

        Ok(HttpGateway {
            config,
            http_client,
        })
    }

    /// Create client from environment variables
    pub fn from_env() -> GatewayResult<Self> {
        Self::new(GatewayConfig::from_env())
    }
}

#[async_trait]
impl ContentSource for HttpGateway {
    async fn get(&self, id: &str) -> GatewayResult<ContentResponse> {
        let url = self.config.content_url(id);
        debug!(url = %url, "fetching content from gateway");

        let mut request = self.http_client.get(&url);
        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| GatewayError::Transport {
            id: id.to_string(),
            message: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Status {
                id: id.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let bytes = response.bytes().await.map_err(|e| GatewayError::Transport {
            id: id.to_string(),
            message: e.to_string(),
        })?;

        Ok(ContentResponse {
            bytes: bytes.to_vec(),
            content_type,
        })
    }
}
