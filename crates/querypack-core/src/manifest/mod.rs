//! Manifest schema for query packages.
//!
//! The manifest is the only structured entry of an archive. Fields the
//! validator must be able to report as missing are `Option`s, so parsing is
//! lenient and [`ManifestValidator`] owns every structural rule.

pub mod validation;

use serde::{Deserialize, Serialize};

pub use validation::{ManifestError, ManifestValidator, WEIGHT_TOLERANCE};

/// Version written by this implementation.
pub const MANIFEST_VERSION: &str = "1.0";

/// Root descriptor of a query package.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary: Option<PrimaryRef>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jury_parameters: Option<JuryParameters>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additional: Vec<AdditionalEntry>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub support: Vec<SupportEntry>,
}

impl Manifest {
    /// Parse manifest JSON.
    pub fn from_json(bytes: &[u8]) -> Result<Self, ManifestError> {
        serde_json::from_slice(bytes).map_err(|e| ManifestError::Malformed {
            reason: e.to_string(),
        })
    }

    /// Pretty-printed JSON, as stored in `manifest.json`.
    pub fn to_json_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
    }
}

/// Where the primary document lives: a local archive entry or a remote hash.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

/// Resolved form of a [`PrimaryRef`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimarySource<'a> {
    File(&'a str),
    Hash(&'a str),
}

impl PrimaryRef {
    pub fn file(filename: impl Into<String>) -> Self {
        Self {
            filename: Some(filename.into()),
            hash: None,
        }
    }

    pub fn hash(hash: impl Into<String>) -> Self {
        Self {
            filename: None,
            hash: Some(hash.into()),
        }
    }

    /// The single source this reference points at. Blank strings count as
    /// unset.
    ///
    /// # Errors
    ///
    /// `AmbiguousPrimary` when both fields are set, `UnresolvedPrimary` when
    /// neither is.
    pub fn resolve(&self) -> Result<PrimarySource<'_>, ManifestError> {
        match (non_blank(&self.filename), non_blank(&self.hash)) {
            (Some(file), None) => Ok(PrimarySource::File(file)),
            (None, Some(hash)) => Ok(PrimarySource::Hash(hash)),
            (Some(_), Some(_)) => Err(ManifestError::AmbiguousPrimary),
            (None, None) => Err(ManifestError::UnresolvedPrimary),
        }
    }
}

/// Jury configuration. Keys keep the contract's SCREAMING_CASE spelling.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JuryParameters {
    #[serde(rename = "NUMBER_OF_OUTCOMES", default, skip_serializing_if = "Option::is_none")]
    pub number_of_outcomes: Option<u32>,

    #[serde(rename = "AI_NODES", default, skip_serializing_if = "Option::is_none")]
    pub ai_nodes: Option<Vec<JuryNode>>,

    #[serde(rename = "ITERATIONS", default, skip_serializing_if = "Option::is_none")]
    pub iterations: Option<u32>,
}

impl JuryParameters {
    pub fn new(number_of_outcomes: u32, ai_nodes: Vec<JuryNode>, iterations: u32) -> Self {
        Self {
            number_of_outcomes: Some(number_of_outcomes),
            ai_nodes: Some(ai_nodes),
            iterations: Some(iterations),
        }
    }
}

/// One model seat on the jury.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JuryNode {
    #[serde(rename = "AI_PROVIDER")]
    pub provider: String,
    #[serde(rename = "AI_MODEL")]
    pub model: String,
    #[serde(rename = "NO_COUNTS")]
    pub count: u32,
    #[serde(rename = "WEIGHT")]
    pub weight: f64,
}

impl JuryNode {
    pub fn new(provider: impl Into<String>, model: impl Into<String>, count: u32, weight: f64) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            count,
            weight,
        }
    }
}

impl Default for JuryNode {
    /// Single-seat jury used when a package carries no jury parameters.
    fn default() -> Self {
        Self::new("OpenAI", "gpt-4o", 1, 1.0)
    }
}

/// A file bundled in the archive (`filename`) or referenced remotely (`hash`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdditionalEntry {
    pub name: String,
    #[serde(rename = "type", default)]
    pub media_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(default)]
    pub description: String,
}

impl AdditionalEntry {
    /// Archive entry name, when the bytes are bundled locally.
    pub fn local_filename(&self) -> Option<&str> {
        non_blank(&self.filename)
    }

    pub fn remote_hash(&self) -> Option<&str> {
        non_blank(&self.hash)
    }
}

/// Pure external reference; no bytes in the archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportEntry {
    pub hash: String,
}

impl SupportEntry {
    pub fn new(hash: impl Into<String>) -> Self {
        Self { hash: hash.into() }
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.trim().is_empty())
}
