use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use buildconfig::Dialect;
use capability::OutputName;
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

/// One-based position inside a program file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourcePosition {
    pub line: u32,
    pub column: u32,
}

impl SourcePosition {
    pub const START: SourcePosition = SourcePosition { line: 1, column: 1 };

    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Emitted text of one program for one dialect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramOutput {
    pub vertex: String,
    pub fragment: String,
}

pub type TargetOutputs = BTreeMap<Dialect, ProgramOutput>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    pub source_file: String,
    /// Lowercase hex SHA-1 of the program source.
    pub source_sha1: String,
    pub compiler: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledArtifact {
    pub output: OutputName,
    pub targets: TargetOutputs,
    pub metadata: ArtifactMetadata,
}

pub fn source_digest(source: &str) -> String {
    format!("{:x}", Sha1::digest(source.as_bytes()))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileErrorKind {
    /// The compiler rejected the source.
    Rejected {
        position: SourcePosition,
        message: String,
    },
    Timeout { limit: Duration },
    /// Never started because the run was shut down.
    Cancelled,
    /// The compiler panicked while handling the unit.
    Crashed { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileError {
    pub file: String,
    pub output: OutputName,
    pub kind: CompileErrorKind,
}

impl CompileError {
    pub fn is_timeout(&self) -> bool {
        matches!(self.kind, CompileErrorKind::Timeout { .. })
    }

    pub fn position(&self) -> Option<SourcePosition> {
        match &self.kind {
            CompileErrorKind::Rejected { position, .. } => Some(*position),
            _ => None,
        }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            CompileErrorKind::Rejected { position, message } => {
                write!(f, "{}: {position}: {message}", self.file)
            }
            CompileErrorKind::Timeout { limit } => write!(
                f,
                "{}: -: compilation of {} timed out after {}",
                self.file,
                self.output,
                humanize(*limit)
            ),
            CompileErrorKind::Cancelled => {
                write!(f, "{}: -: compilation of {} was cancelled", self.file, self.output)
            }
            CompileErrorKind::Crashed { message } => {
                write!(f, "{}: -: compiler crashed: {message}", self.file)
            }
        }
    }
}

impl std::error::Error for CompileError {}

fn humanize(limit: Duration) -> String {
    humantime::format_duration(limit).to_string()
}

/// Everything a compile call produced. Every submitted unit appears exactly
/// once, either in `artifacts` or in `errors`.
#[derive(Debug, Default)]
pub struct CompileReport {
    pub artifacts: BTreeMap<OutputName, CompiledArtifact>,
    /// Sorted by output name.
    pub errors: Vec<CompileError>,
}

impl CompileReport {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn total(&self) -> usize {
        self.artifacts.len() + self.errors.len()
    }

    pub fn timeouts(&self) -> impl Iterator<Item = &CompileError> {
        self.errors.iter().filter(|error| error.is_timeout())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn error(kind: CompileErrorKind) -> CompileError {
        CompileError {
            file: "shaders.aux.copy.glsl".to_string(),
            output: OutputName::auxiliary("copy"),
            kind,
        }
    }

    #[test]
    fn rejected_errors_read_file_position_message() {
        let err = error(CompileErrorKind::Rejected {
            position: SourcePosition::new(12, 5),
            message: "unknown identifier 'albedo'".to_string(),
        });
        assert_eq!(
            err.to_string(),
            "shaders.aux.copy.glsl: 12:5: unknown identifier 'albedo'"
        );
    }

    #[test]
    fn timeouts_are_distinguishable() {
        let err = error(CompileErrorKind::Timeout {
            limit: Duration::from_secs(60),
        });
        assert!(err.is_timeout());
        assert_eq!(err.position(), None);
        assert!(err.to_string().contains("timed out after 1m"));
    }

    #[test]
    fn digest_is_lowercase_hex() {
        assert_eq!(
            source_digest("abc"),
            "a9993e364706816aba3e25717850c26c9cd0d89d"
        );
    }

    #[test]
    fn artifact_serializes_with_dialect_keys() {
        let mut targets = TargetOutputs::new();
        targets.insert(
            Dialect::GlslEs300,
            ProgramOutput {
                vertex: "v".to_string(),
                fragment: "f".to_string(),
            },
        );
        let artifact = CompiledArtifact {
            output: OutputName::auxiliary("empty"),
            targets,
            metadata: ArtifactMetadata {
                source_file: "shaders.aux.empty.glsl".to_string(),
                source_sha1: source_digest(""),
                compiler: "passthrough".to_string(),
            },
        };
        let json = serde_json::to_value(&artifact).unwrap();
        assert_eq!(json["output"], "shaders.aux.empty.prog");
        assert_eq!(json["targets"]["glsles300"]["fragment"], "f");
        let back: CompiledArtifact = serde_json::from_value(json).unwrap();
        assert_eq!(back, artifact);
    }
}
