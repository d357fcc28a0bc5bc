//! In-memory fakes for the content traits (testing only)
//!
//! Provides `MemoryContentStore`, which satisfies both traits like a real
//! store, and `ScriptedSource`, which fails a configured number of times
//! and counts every call.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::source::{ContentDigest, ContentResponse, ContentSink, ContentSource};
use crate::{GatewayError, GatewayResult};

// ---------------------------------------------------------------------------
// MemoryContentStore
// ---------------------------------------------------------------------------

/// In-memory content-addressed store backed by a `HashMap<id, bytes>`.
///
/// `put` addresses by SHA-256; `insert` registers bytes under any id, which
/// lets tests use CID-shaped identifiers.
#[derive(Debug, Default)]
pub struct MemoryContentStore {
    store: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `data` under an arbitrary identifier.
    pub fn insert(&self, id: impl Into<String>, data: impl Into<Vec<u8>>) {
        self.store.lock().unwrap().insert(id.into(), data.into());
    }

    pub fn len(&self) -> usize {
        self.store.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ContentSource for MemoryContentStore {
    async fn get(&self, id: &str) -> GatewayResult<ContentResponse> {
        let store = self.store.lock().unwrap();
        store
            .get(id)
            .cloned()
            .map(ContentResponse::new)
            .ok_or_else(|| GatewayError::NotFound { id: id.to_string() })
    }
}

#[async_trait]
impl ContentSink for MemoryContentStore {
    async fn put(&self, _name: &str, data: &[u8]) -> GatewayResult<String> {
        let digest = ContentDigest::from_bytes(data);
        let mut store = self.store.lock().unwrap();
        store.insert(digest.to_string(), data.to_vec());
        Ok(digest.to_string())
    }
}

// ---------------------------------------------------------------------------
// ScriptedSource
// ---------------------------------------------------------------------------

/// Source that fails its first `failures` calls with HTTP 503, then serves
/// `payload` for every id. `None` payload means it never succeeds.
#[derive(Debug)]
pub struct ScriptedSource {
    failures: u32,
    payload: Option<Vec<u8>>,
    calls: AtomicU32,
    requested: Mutex<Vec<String>>,
}

impl ScriptedSource {
    /// Fail `failures` times, then succeed with `payload`.
    pub fn succeed_after(failures: u32, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            failures,
            payload: Some(payload.into()),
            calls: AtomicU32::new(0),
            requested: Mutex::new(Vec::new()),
        }
    }

    /// Fail on every call.
    pub fn always_failing() -> Self {
        Self {
            failures: u32::MAX,
            payload: None,
            calls: AtomicU32::new(0),
            requested: Mutex::new(Vec::new()),
        }
    }

    /// Number of `get` calls observed so far.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Identifiers requested, in call order.
    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContentSource for ScriptedSource {
    async fn get(&self, id: &str) -> GatewayResult<ContentResponse> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        self.requested.lock().unwrap().push(id.to_string());
        match &self.payload {
            Some(payload) if n >= self.failures => Ok(ContentResponse::new(payload.clone())
                .with_content_type("application/octet-stream")),
            _ => Err(GatewayError::Status {
                id: id.to_string(),
                status: 503,
            }),
        }
    }
}
