//! Query packages: assembling a question into an archive and reading it back.

mod assembler;
mod error;
mod primary;
mod reader;

pub use assembler::{
    guess_media_type, AssembledPackage, ExternalRef, PackageArchive, PackageAssembler,
    PackageRequest, SupportingFile, EXTERNAL_REF_TYPE,
};
pub use error::PackageError;
pub use primary::{PrimaryDecode, PrimaryDocument, PrimaryFormat};
pub use reader::{PackageDetails, PackageReader, DEFAULT_ITERATIONS, DEFAULT_OUTCOME_COUNT};

/// Archive entry holding the primary document.
pub const PRIMARY_ENTRY: &str = "primary_query.json";

pub type PackageResult<T> = std::result::Result<T, PackageError>;
