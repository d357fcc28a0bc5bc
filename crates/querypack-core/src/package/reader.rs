//! Turns an extracted file set back into typed package details.

use std::collections::HashSet;

use serde::Serialize;

use crate::archive::{ArchiveCodec, ArchiveEntry, MANIFEST_ENTRY};
use crate::manifest::{
    AdditionalEntry, JuryNode, Manifest, ManifestError, ManifestValidator, PrimarySource,
    SupportEntry,
};
use crate::package::{PackageError, PackageResult, PrimaryDecode, PrimaryDocument, PrimaryFormat};

/// Outcome count assumed when the manifest carries no jury parameters.
pub const DEFAULT_OUTCOME_COUNT: u32 = 2;
/// Iteration count assumed when the manifest carries no jury parameters.
pub const DEFAULT_ITERATIONS: u32 = 1;

/// Everything a consumer needs from a package.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackageDetails {
    pub query: String,
    pub outcome_count: u32,
    pub iterations: u32,
    pub jury_nodes: Vec<JuryNode>,
    pub additional: Vec<AdditionalEntry>,
    pub support: Vec<SupportEntry>,
    pub primary: PrimaryDocument,
    pub primary_format: PrimaryFormat,
    pub manifest: Manifest,
}

#[derive(Debug, Clone, Default)]
pub struct PackageReader {
    validator: ManifestValidator,
    codec: ArchiveCodec,
}

impl PackageReader {
    pub fn new(validator: ManifestValidator, codec: ArchiveCodec) -> Self {
        Self { validator, codec }
    }

    /// Decode and validate an extracted file set.
    ///
    /// # Errors
    ///
    /// - `DuplicateName`: two entries share a name.
    /// - `MissingManifest`: no `manifest.json` entry.
    /// - `Manifest`: the manifest is malformed or fails validation.
    /// - `UnsupportedPrimaryReference`: the primary is hash-addressed.
    /// - `MissingReferent`: the primary or a bundled additional file is absent.
    pub fn read(&self, files: &[ArchiveEntry]) -> PackageResult<PackageDetails> {
        let mut seen = HashSet::with_capacity(files.len());
        if let Some(dup) = files.iter().find(|f| !seen.insert(f.name.as_str())) {
            return Err(PackageError::DuplicateName {
                name: dup.name.clone(),
            });
        }

        let manifest_entry = find(files, MANIFEST_ENTRY).ok_or(PackageError::MissingManifest)?;
        let manifest = Manifest::from_json(&manifest_entry.bytes)?;
        self.validator.validate(&manifest)?;

        let source = manifest
            .primary
            .as_ref()
            .ok_or(ManifestError::MissingField { field: "primary" })?
            .resolve()?;

        let decoded = match source {
            PrimarySource::Hash(hash) => {
                return Err(PackageError::UnsupportedPrimaryReference {
                    hash: hash.to_string(),
                })
            }
            PrimarySource::File(name) => {
                let entry = find(files, name).ok_or_else(|| PackageError::MissingReferent {
                    name: name.to_string(),
                })?;
                PrimaryDecode::decode(&entry.bytes)
            }
        };

        for entry in &manifest.additional {
            if let Some(filename) = entry.local_filename() {
                if find(files, filename).is_none() {
                    return Err(PackageError::MissingReferent {
                        name: filename.to_string(),
                    });
                }
            }
        }

        let jury = manifest.jury_parameters.clone().unwrap_or_default();
        let primary_format = decoded.format();
        let primary = decoded.into_document();

        tracing::debug!(
            format = ?primary_format,
            additional = manifest.additional.len(),
            support = manifest.support.len(),
            "package read"
        );

        Ok(PackageDetails {
            query: primary.query.clone(),
            outcome_count: jury.number_of_outcomes.unwrap_or(DEFAULT_OUTCOME_COUNT),
            iterations: jury.iterations.unwrap_or(DEFAULT_ITERATIONS),
            jury_nodes: jury
                .ai_nodes
                .unwrap_or_else(|| vec![JuryNode::default()]),
            additional: manifest.additional.clone(),
            support: manifest.support.clone(),
            primary,
            primary_format,
            manifest,
        })
    }

    /// Extract `container` and read the result.
    pub fn read_archive(&self, container: &[u8]) -> PackageResult<PackageDetails> {
        let files = self.codec.extract(container)?;
        self.read(&files)
    }
}

fn find<'a>(files: &'a [ArchiveEntry], name: &str) -> Option<&'a ArchiveEntry> {
    files.iter().find(|f| f.name == name)
}
