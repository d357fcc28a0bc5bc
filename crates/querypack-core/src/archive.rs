//! Archive codec: a zstd-compressed tar container of named blobs.
//!
//! The codec knows one reserved entry, `manifest.json`, and nothing else
//! about package semantics. Entry names are written verbatim; names the tar
//! path encoder would rewrite (and so could collide) are rejected up front.

use std::collections::HashSet;
use std::io::Read;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::manifest::Manifest;

/// Reserved entry holding the package manifest.
pub const MANIFEST_ENTRY: &str = "manifest.json";

/// A named blob inside an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl ArchiveEntry {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

/// Errors produced by the archive codec.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("corrupt archive: {reason}")]
    Corrupt { reason: String },

    #[error("invalid entry name {name:?}: {reason}")]
    InvalidEntryName { name: String, reason: &'static str },

    #[error("duplicate entry name: {name}")]
    DuplicateEntry { name: String },

    #[error("entry name manifest.json is reserved for the manifest")]
    ReservedEntryName,

    #[error("manifest encoding failed: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ArchiveError {
    fn corrupt(reason: impl std::fmt::Display) -> Self {
        ArchiveError::Corrupt {
            reason: reason.to_string(),
        }
    }
}

/// Codec settings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CodecConfig {
    /// zstd compression level (1–22).
    pub compression_level: i32,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            compression_level: 3,
        }
    }
}

/// Creates and extracts package containers.
///
/// Stateless apart from its configuration; construct one per call site or
/// share it freely.
#[derive(Debug, Clone, Default)]
pub struct ArchiveCodec {
    config: CodecConfig,
}

impl ArchiveCodec {
    pub fn new(config: CodecConfig) -> Self {
        Self { config }
    }

    /// Serialize `manifest` as `manifest.json` followed by `files`, in order.
    ///
    /// Output is deterministic for a given input and compression level
    /// (fixed mtime, owner and mode), but callers should compare logical
    /// contents, not container bytes.
    ///
    /// # Errors
    ///
    /// - `ArchiveError::InvalidEntryName`: a name is empty, absolute, or has
    ///   empty, `.` or `..` segments.
    /// - `ArchiveError::ReservedEntryName`: a file is named `manifest.json`.
    /// - `ArchiveError::DuplicateEntry`: two files share a name.
    pub fn create(&self, files: &[ArchiveEntry], manifest: &Manifest) -> Result<Vec<u8>, ArchiveError> {
        let mut seen = HashSet::with_capacity(files.len());
        for file in files {
            validate_entry_name(&file.name)?;
            if file.name == MANIFEST_ENTRY {
                return Err(ArchiveError::ReservedEntryName);
            }
            if !seen.insert(file.name.as_str()) {
                return Err(ArchiveError::DuplicateEntry {
                    name: file.name.clone(),
                });
            }
        }

        let manifest_json = manifest.to_json_bytes()?;

        let mut builder = tar::Builder::new(Vec::new());
        append_entry(&mut builder, MANIFEST_ENTRY, &manifest_json)?;
        for file in files {
            append_entry(&mut builder, &file.name, &file.bytes)?;
        }
        let tar_bytes = builder.into_inner()?;

        let compressed = zstd::stream::encode_all(tar_bytes.as_slice(), self.config.compression_level)?;
        tracing::debug!(
            entries = files.len() + 1,
            tar_bytes = tar_bytes.len(),
            compressed_bytes = compressed.len(),
            "archive created"
        );
        Ok(compressed)
    }

    /// Return every non-directory entry of the container, in archive order.
    ///
    /// # Errors
    ///
    /// - `ArchiveError::Corrupt`: the bytes are empty, not zstd, truncated,
    ///   or not a tar stream, or an entry holds fewer bytes than its header
    ///   declares.
    /// - `ArchiveError::DuplicateEntry`: two entries share a name.
    pub fn extract(&self, container: &[u8]) -> Result<Vec<ArchiveEntry>, ArchiveError> {
        if container.is_empty() {
            return Err(ArchiveError::corrupt("empty container"));
        }

        let tar_bytes = zstd::stream::decode_all(container)
            .map_err(|e| ArchiveError::corrupt(format!("decompression failed: {e}")))?;

        let mut archive = tar::Archive::new(tar_bytes.as_slice());
        let entries = archive.entries().map_err(ArchiveError::corrupt)?;

        let mut out = Vec::new();
        let mut seen = HashSet::new();
        for entry in entries {
            let mut entry = entry.map_err(ArchiveError::corrupt)?;
            if !entry.header().entry_type().is_file() {
                continue;
            }

            let name = {
                let path = entry.path().map_err(ArchiveError::corrupt)?;
                path.to_str()
                    .ok_or_else(|| ArchiveError::corrupt("entry name is not valid UTF-8"))?
                    .to_string()
            };

            if !seen.insert(name.clone()) {
                return Err(ArchiveError::DuplicateEntry { name });
            }

            // The declared size is untrusted; never allocate past the stream.
            let declared = entry.size();
            let mut bytes = Vec::with_capacity(declared.min(tar_bytes.len() as u64) as usize);
            entry.read_to_end(&mut bytes).map_err(ArchiveError::corrupt)?;
            if bytes.len() as u64 != declared {
                return Err(ArchiveError::corrupt(format!(
                    "entry {name} is truncated: declared {declared} bytes, found {}",
                    bytes.len()
                )));
            }
            out.push(ArchiveEntry { name, bytes });
        }

        Ok(out)
    }
}

fn append_entry(
    builder: &mut tar::Builder<Vec<u8>>,
    name: &str,
    bytes: &[u8],
) -> Result<(), ArchiveError> {
    let mut header = tar::Header::new_gnu();
    header.set_entry_type(tar::EntryType::Regular);
    header.set_size(bytes.len() as u64);
    header.set_mode(0o644);
    header.set_mtime(0);
    header.set_uid(0);
    header.set_gid(0);
    builder.append_data(&mut header, name, bytes)?;
    Ok(())
}

pub(crate) fn validate_entry_name(name: &str) -> Result<(), ArchiveError> {
    let invalid = |reason| ArchiveError::InvalidEntryName {
        name: name.to_string(),
        reason,
    };

    if name.is_empty() {
        return Err(invalid("name is empty"));
    }
    if name.contains('\\') || name.contains('\0') {
        return Err(invalid("backslash and NUL are not allowed"));
    }
    for segment in name.split('/') {
        match segment {
            "" => return Err(invalid("absolute path or empty path segment")),
            "." | ".." => return Err(invalid("relative path segments are not allowed")),
            _ => {}
        }
    }
    Ok(())
}
