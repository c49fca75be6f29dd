use std::collections::BTreeSet;

use batch::program::{self, StageSource};
use buildconfig::Dialect;
use naga::back::{glsl, wgsl};
use naga::front::glsl as glsl_in;
use naga::valid::{Capabilities, ModuleInfo, ValidationFlags, Validator};
use naga::{Module, ShaderStage, SourceLocation};

use crate::artifact::{ProgramOutput, SourcePosition, TargetOutputs};
use crate::{program_fault, CompilerFault, ShaderCompiler};

/// Parses both stages with naga's GLSL front end, validates them and writes
/// them back out in every requested dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct NagaCompiler;

struct ValidStage<'a> {
    source: &'a StageSource<'a>,
    stage: ShaderStage,
    module: Module,
    info: ModuleInfo,
}

impl ShaderCompiler for NagaCompiler {
    fn name(&self) -> &'static str {
        "naga"
    }

    fn compile(
        &self,
        source: &str,
        dialects: &BTreeSet<Dialect>,
    ) -> Result<TargetOutputs, CompilerFault> {
        let program = program::split(source).map_err(program_fault)?;
        let vertex = validate_stage(&program.vertex, ShaderStage::Vertex)?;
        let fragment = validate_stage(&program.fragment, ShaderStage::Fragment)?;

        let mut outputs = TargetOutputs::new();
        for &dialect in dialects {
            outputs.insert(
                dialect,
                ProgramOutput {
                    vertex: emit(&vertex, dialect)?,
                    fragment: emit(&fragment, dialect)?,
                },
            );
        }
        Ok(outputs)
    }
}

fn validate_stage<'a>(
    source: &'a StageSource<'a>,
    stage: ShaderStage,
) -> Result<ValidStage<'a>, CompilerFault> {
    let mut frontend = glsl_in::Frontend::default();
    let options = glsl_in::Options::from(stage);
    let module = frontend.parse(&options, source.text).map_err(|parse| {
        let first = parse.errors.first();
        CompilerFault::Rejected {
            position: first
                .map(|error| program_position(source, Some(error.meta.location(source.text))))
                .unwrap_or_else(|| program_position(source, None)),
            message: first
                .map(|error| error.kind.to_string())
                .unwrap_or_else(|| format!("{} stage failed to parse", source.stage)),
        }
    })?;

    let info = Validator::new(ValidationFlags::all(), Capabilities::all())
        .validate(&module)
        .map_err(|error| CompilerFault::Rejected {
            position: program_position(source, error.location(source.text)),
            message: error.as_inner().to_string(),
        })?;

    Ok(ValidStage {
        source,
        stage,
        module,
        info,
    })
}

fn emit(stage: &ValidStage<'_>, dialect: Dialect) -> Result<String, CompilerFault> {
    let rejected = |message: String| CompilerFault::Rejected {
        position: program_position(stage.source, None),
        message: format!("{} stage cannot be written as {dialect}: {message}", stage.source.stage),
    };

    let version = match dialect {
        Dialect::Glsl330 => glsl::Version::Desktop(330),
        Dialect::Glsl410 => glsl::Version::Desktop(410),
        Dialect::Glsl450 => glsl::Version::Desktop(450),
        Dialect::GlslEs300 => glsl::Version::Embedded {
            version: 300,
            is_webgl: false,
        },
        Dialect::Wgsl => {
            return wgsl::write_string(&stage.module, &stage.info, wgsl::WriterFlags::empty())
                .map_err(|err| rejected(err.to_string()));
        }
    };

    let options = glsl::Options {
        version,
        ..glsl::Options::default()
    };
    let pipeline = glsl::PipelineOptions {
        shader_stage: stage.stage,
        entry_point: "main".to_string(),
        multiview: None,
    };
    let mut out = String::new();
    {
        let mut writer = glsl::Writer::new(
            &mut out,
            &stage.module,
            &stage.info,
            &options,
            &pipeline,
            naga::proc::BoundsCheckPolicies::default(),
        )
        .map_err(|err| rejected(err.to_string()))?;
        writer.write().map_err(|err| rejected(err.to_string()))?;
    }
    Ok(out)
}

/// Maps a stage-relative naga location onto the program file.
fn program_position(source: &StageSource<'_>, location: Option<SourceLocation>) -> SourcePosition {
    let (line, column) = location
        .map(|loc| (loc.line_number.max(1), loc.line_position.max(1)))
        .unwrap_or((1, 1));
    let offset = u32::try_from(source.line_offset).unwrap_or(u32::MAX);
    SourcePosition::new(line.saturating_add(offset), column)
}
