//! Two-stage program text. A unit carries its vertex and fragment stages in
//! one file, each introduced by a marker line:
//!
//! ```text
//! //@stage vertex
//! ...
//! //@stage fragment
//! ...
//! ```
//!
//! `split` hands each stage to a compiler together with the program line its
//! first line sits on, so diagnostics can be reported against the file the
//! user actually sees.
use std::fmt;

use thiserror::Error;

pub const STAGE_MARKER: &str = "//@stage";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProgramStage {
    Vertex,
    Fragment,
}

impl ProgramStage {
    pub const ALL: [ProgramStage; 2] = [Self::Vertex, Self::Fragment];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Vertex => "vertex",
            Self::Fragment => "fragment",
        }
    }

    fn from_marker(rest: &str) -> Option<Self> {
        match rest.trim() {
            "vertex" => Some(Self::Vertex),
            "fragment" => Some(Self::Fragment),
            _ => None,
        }
    }
}

impl fmt::Display for ProgramStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProgramError {
    #[error("line {line}: unknown stage marker '{marker}'")]
    UnknownStage { line: usize, marker: String },

    #[error("line {line}: {stage} stage declared twice")]
    DuplicateStage { line: usize, stage: ProgramStage },

    #[error("line {line}: fragment stage must follow the vertex stage")]
    OutOfOrder { line: usize },

    #[error("line {line}: source text before the first stage marker")]
    Preamble { line: usize },

    #[error("missing {0} stage")]
    MissingStage(ProgramStage),
}

/// Source of one stage, borrowed from the program text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageSource<'a> {
    pub stage: ProgramStage,
    pub text: &'a str,
    /// Number of program lines preceding `text`; add it to a stage-relative
    /// line number to get the program line.
    pub line_offset: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Program<'a> {
    pub vertex: StageSource<'a>,
    pub fragment: StageSource<'a>,
}

impl<'a> Program<'a> {
    pub fn stage(&self, stage: ProgramStage) -> &StageSource<'a> {
        match stage {
            ProgramStage::Vertex => &self.vertex,
            ProgramStage::Fragment => &self.fragment,
        }
    }
}

/// Joins two stage sources into program text.
pub fn compose(vertex: &str, fragment: &str) -> String {
    let mut out = String::with_capacity(vertex.len() + fragment.len() + 48);
    for (stage, body) in [
        (ProgramStage::Vertex, vertex),
        (ProgramStage::Fragment, fragment),
    ] {
        out.push_str(STAGE_MARKER);
        out.push(' ');
        out.push_str(stage.as_str());
        out.push('\n');
        out.push_str(body);
        if !body.ends_with('\n') {
            out.push('\n');
        }
    }
    out
}

pub fn split(text: &str) -> Result<Program<'_>, ProgramError> {
    // (stage, marker byte offset, body byte offset, marker line)
    let mut starts: Vec<(ProgramStage, usize, usize, usize)> = Vec::with_capacity(2);
    let mut offset = 0usize;

    for (index, line) in text.split_inclusive('\n').enumerate() {
        let number = index + 1;
        let trimmed = line.trim();
        if let Some(rest) = trimmed.strip_prefix(STAGE_MARKER) {
            let stage = ProgramStage::from_marker(rest).ok_or_else(|| {
                ProgramError::UnknownStage {
                    line: number,
                    marker: rest.trim().to_string(),
                }
            })?;
            if starts.iter().any(|(seen, ..)| *seen == stage) {
                return Err(ProgramError::DuplicateStage {
                    line: number,
                    stage,
                });
            }
            if stage == ProgramStage::Fragment && starts.is_empty() {
                return Err(ProgramError::OutOfOrder { line: number });
            }
            starts.push((stage, offset, offset + line.len(), number));
        } else if starts.is_empty() && !trimmed.is_empty() {
            return Err(ProgramError::Preamble { line: number });
        }
        offset += line.len();
    }

    let (vertex_body, vertex_line, fragment_marker, fragment_body, fragment_line) =
        match starts.as_slice() {
            [(_, _, vertex_body, vertex_line), (_, marker, body, line)] => {
                (*vertex_body, *vertex_line, *marker, *body, *line)
            }
            [_] => return Err(ProgramError::MissingStage(ProgramStage::Fragment)),
            _ => return Err(ProgramError::MissingStage(ProgramStage::Vertex)),
        };

    Ok(Program {
        vertex: StageSource {
            stage: ProgramStage::Vertex,
            text: &text[vertex_body..fragment_marker],
            line_offset: vertex_line,
        },
        fragment: StageSource {
            stage: ProgramStage::Fragment,
            text: &text[fragment_body..],
            line_offset: fragment_line,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composed_program_splits_back() {
        let text = compose("void main() {}", "void main() {}\n");
        let program = split(&text).unwrap();
        assert_eq!(program.vertex.text, "void main() {}\n");
        assert_eq!(program.fragment.text, "void main() {}\n");
        assert_eq!(program.vertex.line_offset, 1);
        assert_eq!(program.fragment.line_offset, 3);
    }

    #[test]
    fn line_offsets_account_for_leading_blank_lines() {
        let text = "\n\n//@stage vertex\na\nb\n//@stage fragment\nc\n";
        let program = split(text).unwrap();
        assert_eq!(program.vertex.line_offset, 3);
        assert_eq!(program.fragment.line_offset, 6);
        assert_eq!(program.stage(ProgramStage::Fragment).text, "c\n");
    }

    #[test]
    fn rejects_malformed_programs() {
        assert_eq!(
            split("//@stage vertex\n"),
            Err(ProgramError::MissingStage(ProgramStage::Fragment))
        );
        assert_eq!(
            split(""),
            Err(ProgramError::MissingStage(ProgramStage::Vertex))
        );
        assert_eq!(
            split("//@stage fragment\n//@stage vertex\n"),
            Err(ProgramError::OutOfOrder { line: 1 })
        );
        assert_eq!(
            split("//@stage vertex\n//@stage vertex\n"),
            Err(ProgramError::DuplicateStage {
                line: 2,
                stage: ProgramStage::Vertex
            })
        );
        assert!(matches!(
            split("//@stage geometry\n"),
            Err(ProgramError::UnknownStage { line: 1, .. })
        ));
        assert_eq!(
            split("#version 330\n//@stage vertex\n//@stage fragment\n"),
            Err(ProgramError::Preamble { line: 1 })
        );
    }
}
