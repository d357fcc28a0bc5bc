//! Builds a manifest and file set from a primary document, supporting files
//! and external references. Pure: no I/O.

use std::collections::HashSet;
use std::path::Path;

use content_gateway::ContentDigest;
use serde::{Deserialize, Serialize};

use crate::archive::{self, ArchiveCodec, ArchiveEntry, MANIFEST_ENTRY};
use crate::manifest::{
    AdditionalEntry, JuryParameters, Manifest, ManifestValidator, PrimaryRef, SupportEntry,
    MANIFEST_VERSION,
};
use crate::obs;
use crate::package::{PackageError, PackageResult, PrimaryDocument, PRIMARY_ENTRY};

/// Media type recorded for hash-addressed additional entries.
pub const EXTERNAL_REF_TYPE: &str = "ipfs/cid";

/// A file whose bytes travel inside the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupportingFile {
    pub name: String,
    pub bytes: Vec<u8>,
    pub description: String,
    /// Guessed from the name's extension when unset.
    pub media_type: Option<String>,
}

impl SupportingFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
            description: description.into(),
            media_type: None,
        }
    }

    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }
}

/// A document that stays in the content store; only its CID is recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalRef {
    pub cid: String,
    pub name: String,
    pub description: String,
}

impl ExternalRef {
    pub fn new(cid: impl Into<String>, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            cid: cid.into(),
            name: name.into(),
            description: description.into(),
        }
    }
}

/// Everything the assembler needs for one package.
#[derive(Debug, Clone, Default)]
pub struct PackageRequest {
    pub primary: PrimaryDocument,
    pub files: Vec<SupportingFile>,
    pub external_refs: Vec<ExternalRef>,
    pub support: Vec<String>,
    pub jury: Option<JuryParameters>,
}

impl PackageRequest {
    pub fn new(primary: PrimaryDocument) -> Self {
        Self {
            primary,
            ..Self::default()
        }
    }

    pub fn with_file(mut self, file: SupportingFile) -> Self {
        self.files.push(file);
        self
    }

    pub fn with_external_ref(mut self, reference: ExternalRef) -> Self {
        self.external_refs.push(reference);
        self
    }

    /// Add a pure `support` hash.
    pub fn with_support(mut self, hash: impl Into<String>) -> Self {
        self.support.push(hash.into());
        self
    }

    pub fn with_jury(mut self, jury: JuryParameters) -> Self {
        self.jury = Some(jury);
        self
    }
}

/// Output of [`PackageAssembler::assemble`]: the manifest plus the archive
/// entries it describes (primary document first).
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledPackage {
    pub manifest: Manifest,
    pub files: Vec<ArchiveEntry>,
}

/// A packed archive ready for upload.
#[derive(Debug, Clone)]
pub struct PackageArchive {
    pub bytes: Vec<u8>,
    pub digest: ContentDigest,
    pub manifest: Manifest,
}

#[derive(Debug, Clone, Default)]
pub struct PackageAssembler {
    validator: ManifestValidator,
    codec: ArchiveCodec,
}

impl PackageAssembler {
    pub fn new(validator: ManifestValidator, codec: ArchiveCodec) -> Self {
        Self { validator, codec }
    }

    /// Compose the manifest and file set for `request`.
    ///
    /// Names must be unique across supporting files and external refs; the
    /// first collision fails the whole call before anything is built.
    pub fn assemble(&self, request: PackageRequest) -> PackageResult<AssembledPackage> {
        let PackageRequest {
            mut primary,
            files,
            external_refs,
            support,
            jury,
        } = request;

        let mut seen = HashSet::new();
        for file in &files {
            check_name(&file.name, &mut seen)?;
            if file.name == MANIFEST_ENTRY || file.name == PRIMARY_ENTRY {
                return Err(PackageError::ReservedName {
                    name: file.name.clone(),
                });
            }
            archive::validate_entry_name(&file.name)?;
        }
        for reference in &external_refs {
            check_name(&reference.name, &mut seen)?;
            if reference.cid.trim().is_empty() {
                return Err(PackageError::InvalidReference {
                    name: reference.name.clone(),
                    reason: "cid is empty",
                });
            }
        }

        let mut additional = Vec::with_capacity(files.len() + external_refs.len());
        for file in &files {
            additional.push(AdditionalEntry {
                name: file.name.clone(),
                media_type: file
                    .media_type
                    .clone()
                    .unwrap_or_else(|| guess_media_type(&file.name).to_string()),
                filename: Some(file.name.clone()),
                hash: None,
                description: file.description.clone(),
            });
        }
        for reference in external_refs {
            additional.push(AdditionalEntry {
                name: reference.name,
                media_type: EXTERNAL_REF_TYPE.to_string(),
                filename: None,
                hash: Some(reference.cid.trim().to_string()),
                description: reference.description,
            });
        }

        for entry in &additional {
            if !primary.references.contains(&entry.name) {
                primary.references.push(entry.name.clone());
            }
        }

        let manifest = Manifest {
            version: Some(MANIFEST_VERSION.to_string()),
            primary: Some(PrimaryRef::file(PRIMARY_ENTRY)),
            jury_parameters: jury,
            additional,
            support: support.into_iter().map(SupportEntry::new).collect(),
        };
        self.validator.validate(&manifest)?;

        let mut entries = Vec::with_capacity(files.len() + 1);
        entries.push(ArchiveEntry::new(
            PRIMARY_ENTRY,
            serde_json::to_vec_pretty(&primary)?,
        ));
        entries.extend(
            files
                .into_iter()
                .map(|file| ArchiveEntry::new(file.name, file.bytes)),
        );

        obs::emit_package_assembled(
            entries.len(),
            manifest.additional.len(),
            manifest.support.len(),
        );

        Ok(AssembledPackage {
            manifest,
            files: entries,
        })
    }

    /// Assemble and encode in one step.
    pub fn build_archive(&self, request: PackageRequest) -> PackageResult<PackageArchive> {
        let AssembledPackage { manifest, files } = self.assemble(request)?;
        let bytes = self.codec.create(&files, &manifest)?;
        let digest = ContentDigest::from_bytes(&bytes);
        Ok(PackageArchive {
            bytes,
            digest,
            manifest,
        })
    }
}

fn check_name<'a>(name: &'a str, seen: &mut HashSet<&'a str>) -> PackageResult<()> {
    if name.trim().is_empty() {
        return Err(PackageError::EmptyName);
    }
    if !seen.insert(name) {
        return Err(PackageError::DuplicateName {
            name: name.to_string(),
        });
    }
    Ok(())
}

/// Best-effort media type from a file extension.
pub fn guess_media_type(name: &str) -> &'static str {
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("json") => "application/json",
        Some("txt") | Some("log") => "text/plain",
        Some("md") => "text/markdown",
        Some("csv") => "text/csv",
        Some("html") | Some("htm") => "text/html",
        Some("pdf") => "application/pdf",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}
