use std::collections::BTreeSet;

use batch::program::{self, StageSource};
use buildconfig::Dialect;

use crate::artifact::{ProgramOutput, SourcePosition, TargetOutputs};
use crate::{program_fault, CompilerFault, ShaderCompiler};

/// Re-targets each stage to the requested GLSL version without looking at
/// the code. The stage's own `#version` line is dropped and a `#line`
/// directive keeps downstream diagnostics pointing at the program file.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughCompiler;

impl ShaderCompiler for PassthroughCompiler {
    fn name(&self) -> &'static str {
        "passthrough"
    }

    fn compile(
        &self,
        source: &str,
        dialects: &BTreeSet<Dialect>,
    ) -> Result<TargetOutputs, CompilerFault> {
        let program = program::split(source).map_err(program_fault)?;
        let mut outputs = TargetOutputs::new();
        for &dialect in dialects {
            let Some(directive) = dialect.version_directive() else {
                return Err(CompilerFault::Rejected {
                    position: SourcePosition::START,
                    message: format!("the passthrough compiler cannot emit {dialect}"),
                });
            };
            outputs.insert(
                dialect,
                ProgramOutput {
                    vertex: retarget(&program.vertex, directive, dialect),
                    fragment: retarget(&program.fragment, directive, dialect),
                },
            );
        }
        Ok(outputs)
    }
}

fn retarget(stage: &StageSource<'_>, directive: &str, dialect: Dialect) -> String {
    let mut out = String::with_capacity(stage.text.len() + 64);
    out.push_str(directive);
    out.push('\n');
    if dialect == Dialect::GlslEs300 {
        out.push_str("precision highp float;\n");
    }

    let mut first_line = stage.line_offset + 1;
    let mut body = stage.text;
    if let Some((head, rest)) = body.split_once('\n') {
        if head.trim_start().starts_with("#version") {
            body = rest;
            first_line += 1;
        }
    } else if body.trim_start().starts_with("#version") {
        body = "";
    }

    out.push_str(&format!("#line {first_line}\n"));
    out.push_str(body);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROGRAM: &str = "//@stage vertex\n#version 450\nvoid main() {}\n//@stage fragment\nvoid main() {}\n";

    #[test]
    fn rewrites_version_per_dialect() {
        let dialects = BTreeSet::from([Dialect::Glsl330, Dialect::GlslEs300]);
        let outputs = PassthroughCompiler.compile(PROGRAM, &dialects).unwrap();

        let desktop = &outputs[&Dialect::Glsl330];
        assert_eq!(desktop.vertex, "#version 330 core\n#line 3\nvoid main() {}\n");
        assert_eq!(desktop.fragment, "#version 330 core\n#line 5\nvoid main() {}\n");

        let embedded = &outputs[&Dialect::GlslEs300];
        assert!(embedded.fragment.starts_with("#version 300 es\nprecision highp float;\n"));
    }

    #[test]
    fn rejects_wgsl() {
        let dialects = BTreeSet::from([Dialect::Wgsl]);
        let fault = PassthroughCompiler.compile(PROGRAM, &dialects).unwrap_err();
        assert!(matches!(fault, CompilerFault::Rejected { .. }));
    }

    #[test]
    fn reports_program_structure_errors() {
        let dialects = BTreeSet::from([Dialect::Glsl450]);
        let fault = PassthroughCompiler
            .compile("//@stage vertex\nvoid main() {}\n", &dialects)
            .unwrap_err();
        match fault {
            CompilerFault::Rejected { message, .. } => {
                assert!(message.contains("fragment"), "{message}");
            }
            other => panic!("unexpected fault: {other:?}"),
        }
    }
}
