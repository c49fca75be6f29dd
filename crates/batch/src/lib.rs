//! Batch assembly for one pipeline stage.
//!
//! Types:
//!
//! - `AuxiliaryKey` identifies shared and fixed helper programs; its output
//!   name depends on the key alone.
//! - `Batch` / `BatchEntry` hold the ordered, duplicate-free work list.
//! - `SourceGenerator` is the seam to the program text generator and
//!   `ShaderUnit` a batch entry with its text resolved.
//!
//! Functions:
//!
//! - `build_batch` / `stage_batch` turn cases into a batch, collapsing shared
//!   auxiliaries and failing on duplicate primary names.
//! - `write_descriptor` / `parse_descriptor` handle the line-oriented batch
//!   descriptor consumed by batch compilation.
//! - `program::split` / `program::compose` handle the two-stage program text.
mod auxiliary;
mod builder;
mod descriptor_file;
mod generator;
pub mod program;

use std::path::PathBuf;

use capability::OutputName;
use thiserror::Error;

pub use auxiliary::AuxiliaryKey;
pub use builder::{build_batch, stage_batch, Batch, BatchEntry, EntrySource, SOURCE_EXTENSION};
pub use descriptor_file::{
    parse_descriptor, read_descriptor_file, write_descriptor, write_descriptor_file,
    DescriptorLine,
};
pub use generator::{write_sources, ShaderUnit, SourceGenerator};

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("duplicate output '{output}' produced by {first} and {second}")]
    DuplicateOutput {
        output: OutputName,
        first: String,
        second: String,
    },

    #[error("batch descriptor line {line}: {reason}")]
    Malformed { line: usize, reason: String },

    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
