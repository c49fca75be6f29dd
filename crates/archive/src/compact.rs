//! Size reduction for emitted shader text.
//!
//! `minify` removes comments and redundant whitespace. Preprocessor
//! directives keep a line of their own, and a space survives wherever
//! dropping it would fuse two tokens (`a - -b` becomes `a- -b`, never
//! `a--b`).
use compiler::{CompiledArtifact, ProgramOutput};
use scheduler::{PoolConfig, TaskOutcome, TaskPool};
use tracing::debug;

use crate::ArchiveError;

pub fn minify(source: &str) -> String {
    let stripped = strip_comments(source);
    let mut out = String::with_capacity(stripped.len());
    let mut continuation = false;

    for raw in stripped.lines() {
        let line = raw.trim();
        if continuation {
            out.push_str(line);
            out.push('\n');
            continuation = line.ends_with('\\');
            continue;
        }
        if line.is_empty() {
            continue;
        }
        if line.starts_with('#') {
            if !out.is_empty() && !out.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(&line.split_whitespace().collect::<Vec<_>>().join(" "));
            out.push('\n');
            continuation = line.ends_with('\\');
            continue;
        }

        let mut pending_space = true;
        for c in line.chars() {
            if c.is_whitespace() {
                pending_space = true;
                continue;
            }
            if pending_space {
                if let Some(prev) = out.chars().next_back() {
                    if needs_space(prev, c) {
                        out.push(' ');
                    }
                }
            }
            out.push(c);
            pending_space = false;
        }
    }

    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
    out
}

fn strip_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '/' {
            match chars.peek() {
                Some('/') => {
                    while chars.peek().is_some_and(|next| *next != '\n') {
                        chars.next();
                    }
                    out.push(' ');
                    continue;
                }
                Some('*') => {
                    chars.next();
                    let mut spans_lines = false;
                    let mut prev = '\0';
                    for next in chars.by_ref() {
                        if prev == '*' && next == '/' {
                            break;
                        }
                        spans_lines |= next == '\n';
                        prev = next;
                    }
                    out.push(if spans_lines { '\n' } else { ' ' });
                    continue;
                }
                _ => {}
            }
        }
        out.push(c);
    }
    out
}

fn is_word(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '.'
}

fn is_operator(c: char) -> bool {
    matches!(
        c,
        '+' | '-' | '*' | '/' | '%' | '<' | '>' | '=' | '!' | '&' | '|' | '^' | '~' | '?' | ':'
    )
}

fn needs_space(prev: char, next: char) -> bool {
    if prev == '\n' {
        return false;
    }
    (is_word(prev) && is_word(next)) || (is_operator(prev) && is_operator(next))
}

pub fn compact_artifact(mut artifact: CompiledArtifact) -> CompiledArtifact {
    for output in artifact.targets.values_mut() {
        *output = ProgramOutput {
            vertex: minify(&output.vertex),
            fragment: minify(&output.fragment),
        };
    }
    artifact
}

/// Compacts every artifact on a pool of `workers` threads, keeping input
/// order.
pub fn compact_all(
    artifacts: Vec<CompiledArtifact>,
    workers: usize,
) -> Result<Vec<CompiledArtifact>, ArchiveError> {
    let names: Vec<String> = artifacts.iter().map(|a| a.output.to_string()).collect();
    let pool = TaskPool::new(PoolConfig::new(workers.max(1), None).named("compact"))?;
    let outcomes = pool.run(artifacts, compact_artifact)?;

    let mut compacted = Vec::with_capacity(outcomes.len());
    for (name, outcome) in names.into_iter().zip(outcomes) {
        match outcome {
            TaskOutcome::Completed(artifact) => compacted.push(artifact),
            TaskOutcome::Panicked { message } => {
                return Err(ArchiveError::Compaction {
                    output: name,
                    reason: message,
                })
            }
            TaskOutcome::TimedOut { .. } | TaskOutcome::Cancelled => {
                return Err(ArchiveError::Compaction {
                    output: name,
                    reason: "did not run to completion".to_string(),
                })
            }
        }
    }
    debug!(count = compacted.len(), "compacted artifacts");
    Ok(compacted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_comments_and_whitespace() {
        let source = "// header\nfloat  x = 1.0; /* inline */\n\n  vec3 y = vec3( x );\n";
        assert_eq!(minify(source), "float x=1.0;vec3 y=vec3(x);\n");
    }

    #[test]
    fn keeps_directives_on_their_own_lines() {
        let source = "#version 330 core\nprecision  highp float;\n#define  SCALE   2.0\nfloat s = SCALE;\n";
        assert_eq!(
            minify(source),
            "#version 330 core\nprecision highp float;\n#define SCALE 2.0\nfloat s=SCALE;\n"
        );
    }

    #[test]
    fn never_fuses_operators() {
        assert_eq!(minify("a = b - -c;"), "a=b- -c;\n");
        assert_eq!(minify("a = b + +c;"), "a=b+ +c;\n");
        assert_eq!(minify("x = y / *p;"), "x=y/ *p;\n");
    }

    #[test]
    fn multi_line_block_comment_ends_a_directive() {
        let source = "#define A 1 /* first\nsecond */ float b = A;\n";
        assert_eq!(minify(source), "#define A 1\nfloat b=A;\n");
    }

    #[test]
    fn minify_is_idempotent() {
        let source = "#version 300 es\nvoid main() {\n  gl_Position = vec4(0.0 - -1.0);\n}\n";
        let once = minify(source);
        assert_eq!(minify(&once), once);
    }

    #[test]
    fn empty_input_stays_empty() {
        assert_eq!(minify(""), "");
        assert_eq!(minify("// only a comment\n"), "");
    }
}
