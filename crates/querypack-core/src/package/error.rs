//! Error types for package assembly and reading

use thiserror::Error;

use crate::archive::ArchiveError;
use crate::manifest::ManifestError;

/// Errors raised while assembling or reading a query package
#[derive(Error, Debug)]
pub enum PackageError {
    /// Container could not be created or opened
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// Manifest failed to parse or validate
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// Two supporting files or external refs share a name
    #[error("duplicate package entry name: {name}")]
    DuplicateName { name: String },

    /// A supporting file uses a name the package format reserves
    #[error("entry name {name:?} is reserved")]
    ReservedName { name: String },

    #[error("supporting file or external reference has an empty name")]
    EmptyName,

    /// External reference without a usable content identifier
    #[error("external reference {name:?} is invalid: {reason}")]
    InvalidReference { name: String, reason: &'static str },

    #[error("archive has no manifest.json entry")]
    MissingManifest,

    /// Manifest names a file the archive does not contain
    #[error("manifest references missing entry: {name}")]
    MissingReferent { name: String },

    /// Hash-addressed primary documents are not resolved by the reader
    #[error("primary document is hash-addressed ({hash}); only bundled primaries are supported")]
    UnsupportedPrimaryReference { hash: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
