//! Content-Gateway: content-addressed store access for querypack
//!
//! Query packages and evaluation justifications live in a content-addressed
//! store. This crate is the only place that talks to one.
//!
//! ## Key Components
//!
//! - `ContentSource` / `ContentSink`: fetch and upload primitives
//! - `HttpGateway`: IPFS-style HTTP gateway client (`GET {base}/ipfs/{cid}`)
//! - `FsContentStore`: sharded on-disk store addressed by SHA-256
//! - `RetryingFetcher`: bounded, fixed-backoff fetch over any `ContentSource`
//! - `fakes`: in-memory and scripted sources for tests

mod error;
pub mod fakes;
pub mod fs;
pub mod http;
pub mod retry;
pub mod source;

pub use error::{FetchError, GatewayError};
pub use fs::FsContentStore;
pub use http::{GatewayConfig, HttpGateway};
pub use retry::{FetchOptions, RetryingFetcher};
pub use source::{ContentDigest, ContentResponse, ContentSink, ContentSource};

/// Result type for single content-store operations
pub type GatewayResult<T> = std::result::Result<T, GatewayError>;
