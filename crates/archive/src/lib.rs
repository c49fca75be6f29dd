//! Versioned shader archive.
//!
//! An archive is a zip file holding a reserved `_manifest.json` entry
//! followed by one JSON-encoded `CompiledArtifact` per output name, in
//! lexicographic order. Timestamps, permissions and compression settings are
//! fixed so packaging the same artifacts twice yields identical bytes.
//!
//! Types:
//!
//! - `ArchiveManifest` records format version, tool, stage, dialects and
//!   entry count; loaders check it before trusting any entry.
//! - `ShaderArchive` opens and validates an archive for reading.
//!
//! Functions:
//!
//! - `package` / `package_to_path` write an archive, optionally running the
//!   `compact` pass over every artifact first.
pub mod compact;
mod manifest;
mod package;
mod reader;

use std::path::PathBuf;

use buildconfig::Dialect;
use scheduler::PoolError;
use thiserror::Error;

pub use manifest::{ArchiveManifest, ManifestInfo, FORMAT_VERSION, MANIFEST_ENTRY};
pub use package::{package, package_to_path, PackageOptions};
pub use reader::ShaderArchive;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("archive validation failed: {0:?}")]
    InvalidManifest(Vec<String>),

    #[error("artifact stored under '{key}' is named '{output}'")]
    NameMismatch { key: String, output: String },

    #[error("artifact '{output}' targets {found:?}, expected {expected:?}")]
    DialectMismatch {
        output: String,
        expected: Vec<Dialect>,
        found: Vec<Dialect>,
    },

    #[error("archive has no entry '{0}'")]
    MissingEntry(String),

    #[error("failed to compact '{output}': {reason}")]
    Compaction { output: String, reason: String },

    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Stream(#[from] std::io::Error),

    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),

    #[error("failed to encode or decode archive entry: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Pool(#[from] PoolError),
}
