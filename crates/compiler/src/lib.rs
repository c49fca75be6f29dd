//! Compiler collaborators and the parallel batch compile driver.
//!
//! Types:
//!
//! - `ShaderCompiler` is the seam to a shading-language compiler: program
//!   text plus a dialect set in, per-dialect stage outputs or a
//!   `CompilerFault` out.
//! - `NagaCompiler` validates through naga and re-emits GLSL/WGSL;
//!   `PassthroughCompiler` only re-targets the `#version` directive.
//! - `CompiledArtifact`, `CompileError` and `CompileReport` describe what a
//!   compile call produced.
//!
//! Functions:
//!
//! - `BatchCompiler::compile_batch` resolves batch sources and compiles them
//!   on a bounded worker pool with a per-unit timeout.
//! - `backend_for` maps the configured backend onto an implementation.
mod artifact;
mod driver;
mod naga_backend;
mod passthrough;

use std::collections::BTreeSet;
use std::sync::Arc;

use batch::program::ProgramError;
use buildconfig::{CompilerBackend, Dialect};

pub use artifact::{
    source_digest, ArtifactMetadata, CompileError, CompileErrorKind, CompileReport,
    CompiledArtifact, ProgramOutput, SourcePosition, TargetOutputs,
};
pub use driver::{BatchCompiler, CompileUnit, DriverError};
pub use naga_backend::NagaCompiler;
pub use passthrough::PassthroughCompiler;

/// Why a compiler could not produce outputs for a unit.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompilerFault {
    /// The source is wrong; reported against the unit and its siblings keep
    /// compiling.
    #[error("{position}: {message}")]
    Rejected {
        position: SourcePosition,
        message: String,
    },
    /// The compiler itself cannot run; aborts the whole compile call.
    #[error("compiler unavailable: {0}")]
    Unavailable(String),
}

pub trait ShaderCompiler: Send + Sync {
    /// Recorded in artifact metadata.
    fn name(&self) -> &'static str;

    /// Compiles one program for every dialect in `dialects`, failing the
    /// whole call on the first dialect that cannot be produced.
    fn compile(
        &self,
        source: &str,
        dialects: &BTreeSet<Dialect>,
    ) -> Result<TargetOutputs, CompilerFault>;
}

pub fn backend_for(backend: CompilerBackend) -> Arc<dyn ShaderCompiler> {
    match backend {
        CompilerBackend::Naga => Arc::new(NagaCompiler),
        CompilerBackend::Passthrough => Arc::new(PassthroughCompiler),
    }
}

pub(crate) fn program_fault(error: ProgramError) -> CompilerFault {
    let line = match &error {
        ProgramError::UnknownStage { line, .. }
        | ProgramError::DuplicateStage { line, .. }
        | ProgramError::OutOfOrder { line }
        | ProgramError::Preamble { line } => *line,
        ProgramError::MissingStage(_) => 1,
    };
    CompilerFault::Rejected {
        position: SourcePosition::new(u32::try_from(line).unwrap_or(u32::MAX), 1),
        message: error.to_string(),
    }
}
