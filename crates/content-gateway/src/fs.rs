use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::NamedTempFile;

use crate::source::{ContentDigest, ContentResponse, ContentSink, ContentSource};
use crate::{GatewayError, GatewayResult};

/// Filesystem-backed content-addressed store with git-style 2-char sharding.
///
/// Layout: `<root>/objects/<first 2 hex chars>/<remaining hex chars>`
///
/// Identifiers are SHA-256 hex digests, so a package published here can be
/// handed to any reader that shares the directory. Reads and writes run on
/// the blocking thread pool.
#[derive(Clone)]
pub struct FsContentStore {
    objects_dir: Arc<PathBuf>,
}

impl FsContentStore {
    /// Create a new `FsContentStore` rooted at `root`. Creates `root/objects/` if needed.
    pub fn new(root: impl AsRef<Path>) -> GatewayResult<Self> {
        let objects_dir = root.as_ref().join("objects");
        fs::create_dir_all(&objects_dir)?;
        Ok(Self {
            objects_dir: Arc::new(objects_dir),
        })
    }

    /// Check whether `digest` exists without reading the blob.
    pub fn contains(&self, digest: &ContentDigest) -> bool {
        shard_path(&self.objects_dir, digest).exists()
    }

    /// Run blocking filesystem work off the async executor.
    async fn blocking<T, F>(&self, work: F) -> GatewayResult<T>
    where
        F: FnOnce(&Path) -> GatewayResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let objects_dir = Arc::clone(&self.objects_dir);
        tokio::task::spawn_blocking(move || work(&objects_dir))
            .await
            .map_err(|e| GatewayError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?
    }
}

fn shard_path(objects_dir: &Path, digest: &ContentDigest) -> PathBuf {
    let (shard, rest) = digest.as_str().split_at(2);
    objects_dir.join(shard).join(rest)
}

fn store_blob(objects_dir: &Path, data: &[u8]) -> GatewayResult<ContentDigest> {
    let digest = ContentDigest::from_bytes(data);
    let path = shard_path(objects_dir, &digest);
    if path.exists() {
        return Ok(digest);
    }

    let shard_dir = path.parent().unwrap_or(objects_dir);
    fs::create_dir_all(shard_dir)?;

    // Same-directory temp file so the rename stays atomic.
    let mut tmp = NamedTempFile::new_in(shard_dir)?;
    tmp.write_all(data)?;
    tmp.persist(&path).map_err(|e| e.error)?;
    Ok(digest)
}

fn load_blob(objects_dir: &Path, digest: &ContentDigest) -> GatewayResult<Vec<u8>> {
    match fs::read(shard_path(objects_dir, digest)) {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(GatewayError::NotFound {
            id: digest.to_string(),
        }),
        Err(e) => Err(GatewayError::Io(e)),
    }
}

#[async_trait]
impl ContentSource for FsContentStore {
    async fn get(&self, id: &str) -> GatewayResult<ContentResponse> {
        let digest: ContentDigest = id.trim().parse()?;
        let bytes = self.blocking(move |dir| load_blob(dir, &digest)).await?;
        Ok(ContentResponse::new(bytes))
    }
}

#[async_trait]
impl ContentSink for FsContentStore {
    async fn put(&self, name: &str, data: &[u8]) -> GatewayResult<String> {
        let owned = data.to_vec();
        let digest = self.blocking(move |dir| store_blob(dir, &owned)).await?;
        tracing::debug!(name = %name, digest = %digest.short(), bytes = data.len(), "stored blob");
        Ok(digest.to_string())
    }
}
