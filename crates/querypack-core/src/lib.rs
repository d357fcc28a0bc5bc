//! querypack-core: query package protocol and evaluation retrieval
//!
//! A query package is a zstd-compressed tar archive holding a
//! `manifest.json`, a primary document (the question and its outcome labels)
//! and any bundled supporting files. Once a package has been submitted and
//! the on-chain request confirmed, the evaluation race controller waits for
//! the oracle's answer or forces the request into its timed-out state.
//!
//! ## Key Components
//!
//! - `ArchiveCodec`: container create/extract, no package semantics
//! - `ManifestValidator`: structural invariants of the manifest
//! - `PackageAssembler` / `PackageReader`: package build and decode
//! - `ResultParser`: justification bytes to `EvaluationResult`
//! - `EvaluationRaceController`: ledger polling raced against timeout finalize

pub mod archive;
pub mod evaluation;
pub mod manifest;
pub mod obs;
pub mod package;
pub mod result;
pub mod telemetry;

pub use archive::{ArchiveCodec, ArchiveEntry, ArchiveError, CodecConfig, MANIFEST_ENTRY};
pub use evaluation::{
    EvaluationOutcome, EvaluationRaceController, EvaluationRequest, FulfilledEvaluation,
    RaceConfig, RaceError, RaceResult, TimedOutEvaluation,
};
pub use manifest::{
    AdditionalEntry, JuryNode, JuryParameters, Manifest, ManifestError, ManifestValidator,
    PrimaryRef, PrimarySource, SupportEntry, MANIFEST_VERSION,
};
pub use obs::{
    emit_finalize_already_resolved, emit_finalize_superseded, emit_finalized_elsewhere,
    emit_fulfilled, emit_package_assembled, emit_poll_attempt, emit_poll_error, emit_timed_out,
    evaluation_span,
};
pub use package::{
    AssembledPackage, ExternalRef, PackageArchive, PackageAssembler, PackageDetails, PackageError,
    PackageReader, PackageRequest, PackageResult, PrimaryDecode, PrimaryDocument, PrimaryFormat,
    SupportingFile, PRIMARY_ENTRY,
};
pub use result::{EvaluationResult, ResultParser};
pub use telemetry::{init_tracing, LogFormat};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
