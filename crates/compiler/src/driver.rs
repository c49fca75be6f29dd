use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use batch::{Batch, ShaderUnit, SourceGenerator};
use buildconfig::Dialect;
use capability::OutputName;
use scheduler::{PoolConfig, PoolError, PoolRun, ShutdownHandle, TaskOutcome, TaskPool};
use tracing::{debug, error, info};

use crate::artifact::{
    source_digest, ArtifactMetadata, CompileError, CompileErrorKind, CompileReport,
    CompiledArtifact,
};
use crate::{CompilerFault, ShaderCompiler};

#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("compiler '{compiler}' unavailable while compiling {file}: {reason}")]
    CompilerUnavailable {
        compiler: String,
        file: String,
        reason: String,
    },

    #[error("output '{0}' submitted more than once")]
    DuplicateUnit(OutputName),

    #[error("no target dialects requested")]
    NoDialects,

    #[error(transparent)]
    Pool(#[from] PoolError),
}

/// One program ready for compilation.
#[derive(Debug, Clone)]
pub struct CompileUnit {
    /// Source identifier reported in diagnostics.
    pub file: String,
    pub output: OutputName,
    pub source: Arc<str>,
}

impl From<ShaderUnit> for CompileUnit {
    fn from(unit: ShaderUnit) -> Self {
        Self {
            file: unit.identifier,
            output: unit.output,
            source: Arc::from(unit.source),
        }
    }
}

/// Compiles units on a bounded worker pool. A rejected unit never stops its
/// siblings; an unavailable compiler aborts the call.
pub struct BatchCompiler {
    compiler: Arc<dyn ShaderCompiler>,
    dialects: Arc<BTreeSet<Dialect>>,
    pool: TaskPool,
}

impl BatchCompiler {
    pub fn new(
        compiler: Arc<dyn ShaderCompiler>,
        dialects: BTreeSet<Dialect>,
        workers: usize,
        timeout: Option<Duration>,
    ) -> Result<Self, DriverError> {
        if dialects.is_empty() {
            return Err(DriverError::NoDialects);
        }
        let pool = TaskPool::new(PoolConfig::new(workers, timeout).named("compile"))?;
        Ok(Self {
            compiler,
            dialects: Arc::new(dialects),
            pool,
        })
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.pool.shutdown_handle()
    }

    /// Resolves every batch entry's source through `generator` and compiles
    /// the result.
    pub fn compile_batch(
        &self,
        batch: &Batch,
        generator: &dyn SourceGenerator,
    ) -> Result<CompileReport, DriverError> {
        let units = batch.units(generator).into_iter().map(CompileUnit::from);
        self.compile_units(units.collect())
    }

    pub fn compile_units(&self, units: Vec<CompileUnit>) -> Result<CompileReport, DriverError> {
        let mut seen = BTreeSet::new();
        for unit in &units {
            if !seen.insert(&unit.output) {
                return Err(DriverError::DuplicateUnit(unit.output.clone()));
            }
        }

        let identities: Vec<(String, OutputName)> = units
            .iter()
            .map(|unit| (unit.file.clone(), unit.output.clone()))
            .collect();
        let started = Instant::now();
        info!(
            compiler = self.compiler.name(),
            units = units.len(),
            dialects = self.dialects.len(),
            workers = self.pool.config().workers,
            "compiling batch"
        );

        let compiler = Arc::clone(&self.compiler);
        let dialects = Arc::clone(&self.dialects);
        let run = self.pool.run_until(
            units,
            move |unit: CompileUnit| compile_one(compiler.as_ref(), &dialects, unit),
            |result| matches!(result, Err(CompilerFault::Unavailable(_))),
        )?;

        let outcomes = match run {
            PoolRun::Finished(outcomes) => outcomes,
            PoolRun::Aborted { index, output } => {
                let reason = match output {
                    Err(CompilerFault::Unavailable(reason)) => reason,
                    _ => "aborted".to_string(),
                };
                let (file, _) = &identities[index];
                error!(%file, %reason, "compiler unavailable; aborting batch");
                return Err(DriverError::CompilerUnavailable {
                    compiler: self.compiler.name().to_string(),
                    file: file.clone(),
                    reason,
                });
            }
        };

        let mut report = CompileReport::default();
        for ((file, output), outcome) in identities.into_iter().zip(outcomes) {
            let kind = match outcome {
                TaskOutcome::Completed(Ok(artifact)) => {
                    report.artifacts.insert(output, artifact);
                    continue;
                }
                TaskOutcome::Completed(Err(CompilerFault::Rejected { position, message })) => {
                    CompileErrorKind::Rejected { position, message }
                }
                TaskOutcome::Completed(Err(CompilerFault::Unavailable(reason))) => {
                    CompileErrorKind::Crashed { message: reason }
                }
                TaskOutcome::TimedOut { limit } => CompileErrorKind::Timeout { limit },
                TaskOutcome::Cancelled => CompileErrorKind::Cancelled,
                TaskOutcome::Panicked { message } => CompileErrorKind::Crashed { message },
            };
            let error = CompileError { file, output, kind };
            debug!(%error, "unit failed");
            report.errors.push(error);
        }
        report.errors.sort_by(|a, b| a.output.cmp(&b.output));

        info!(
            artifacts = report.artifacts.len(),
            errors = report.errors.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "batch compiled"
        );
        Ok(report)
    }
}

fn compile_one(
    compiler: &dyn ShaderCompiler,
    dialects: &BTreeSet<Dialect>,
    unit: CompileUnit,
) -> Result<CompiledArtifact, CompilerFault> {
    debug!(file = %unit.file, "compiling unit");
    let targets = compiler.compile(&unit.source, dialects)?;
    Ok(CompiledArtifact {
        metadata: ArtifactMetadata {
            source_file: unit.file,
            source_sha1: source_digest(&unit.source),
            compiler: compiler.name().to_string(),
        },
        output: unit.output,
        targets,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::OnceLock;
    use std::thread;

    use crate::artifact::{ProgramOutput, SourcePosition, TargetOutputs};
    use crate::PassthroughCompiler;

    /// Echoes the source into every dialect; sleeps on `slow`, rejects
    /// `broken` and reports itself unavailable on `offline`.
    struct Scripted;

    impl ShaderCompiler for Scripted {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn compile(
            &self,
            source: &str,
            dialects: &BTreeSet<Dialect>,
        ) -> Result<TargetOutputs, CompilerFault> {
            match source {
                "slow" => thread::sleep(Duration::from_secs(2)),
                "broken" => {
                    return Err(CompilerFault::Rejected {
                        position: SourcePosition::new(3, 7),
                        message: "syntax error".to_string(),
                    })
                }
                "offline" => return Err(CompilerFault::Unavailable("no device".to_string())),
                _ => {}
            }
            Ok(dialects
                .iter()
                .map(|dialect| {
                    let text = source.to_string();
                    (
                        *dialect,
                        ProgramOutput {
                            vertex: text.clone(),
                            fragment: text,
                        },
                    )
                })
                .collect())
        }
    }

    fn unit(code: &str, source: &str) -> CompileUnit {
        let output = OutputName::auxiliary(code);
        CompileUnit {
            file: format!("{}.glsl", output.stem()),
            output,
            source: Arc::from(source),
        }
    }

    fn driver(timeout: Option<Duration>) -> BatchCompiler {
        BatchCompiler::new(
            Arc::new(Scripted),
            BTreeSet::from([Dialect::Glsl330]),
            2,
            timeout,
        )
        .unwrap()
    }

    #[test]
    fn every_unit_is_accounted_for() {
        let units = vec![unit("a", "ok"), unit("b", "broken"), unit("c", "ok")];
        let report = driver(None).compile_units(units).unwrap();
        assert_eq!(report.total(), 3);
        assert_eq!(report.artifacts.len(), 2);
        assert_eq!(report.errors.len(), 1);
        let error = &report.errors[0];
        assert_eq!(error.output.as_str(), "shaders.aux.b.prog");
        assert_eq!(error.to_string(), "shaders.aux.b.glsl: 3:7: syntax error");
    }

    #[test]
    fn slow_unit_times_out_while_others_complete() {
        let units = vec![
            unit("a", "ok"),
            unit("b", "slow"),
            unit("c", "ok"),
            unit("d", "ok"),
        ];
        let report = driver(Some(Duration::from_millis(200)))
            .compile_units(units)
            .unwrap();
        assert_eq!(report.artifacts.len(), 3);
        let timeouts: Vec<_> = report.timeouts().collect();
        assert_eq!(timeouts.len(), 1);
        assert_eq!(timeouts[0].output.as_str(), "shaders.aux.b.prog");
    }

    /// Requests shutdown of its own driver while compiling the first unit.
    struct StopsAfterFirst {
        handle: Arc<OnceLock<ShutdownHandle>>,
    }

    impl ShaderCompiler for StopsAfterFirst {
        fn name(&self) -> &'static str {
            "stops-after-first"
        }

        fn compile(
            &self,
            source: &str,
            dialects: &BTreeSet<Dialect>,
        ) -> Result<TargetOutputs, CompilerFault> {
            if let Some(handle) = self.handle.get() {
                handle.request();
            }
            Scripted.compile(source, dialects)
        }
    }

    #[test]
    fn shutdown_cancels_queued_units() {
        let handle = Arc::new(OnceLock::new());
        let compiler = BatchCompiler::new(
            Arc::new(StopsAfterFirst {
                handle: Arc::clone(&handle),
            }),
            BTreeSet::from([Dialect::Glsl330]),
            1,
            None,
        )
        .unwrap();
        handle.set(compiler.shutdown_handle()).unwrap();

        let units = vec![unit("a", "ok"), unit("b", "ok"), unit("c", "ok")];
        let report = compiler.compile_units(units).unwrap();
        assert_eq!(report.total(), 3);
        assert_eq!(report.artifacts.len(), 1);
        assert!(report.artifacts.contains_key(&OutputName::auxiliary("a")));
        let cancelled: Vec<&str> = report
            .errors
            .iter()
            .filter(|error| error.kind == CompileErrorKind::Cancelled)
            .map(|error| error.output.as_str())
            .collect();
        assert_eq!(cancelled, vec!["shaders.aux.b.prog", "shaders.aux.c.prog"]);
    }

    #[test]
    fn unavailable_compiler_aborts_the_call() {
        let units = vec![unit("a", "offline"), unit("b", "ok")];
        let err = BatchCompiler::new(
            Arc::new(Scripted),
            BTreeSet::from([Dialect::Glsl330]),
            1,
            None,
        )
        .unwrap()
        .compile_units(units)
        .unwrap_err();
        assert!(matches!(err, DriverError::CompilerUnavailable { .. }));
    }

    #[test]
    fn duplicate_outputs_are_refused() {
        let units = vec![unit("a", "ok"), unit("a", "ok")];
        assert!(matches!(
            driver(None).compile_units(units),
            Err(DriverError::DuplicateUnit(_))
        ));
    }

    #[test]
    fn artifacts_carry_source_metadata() {
        let report = driver(None).compile_units(vec![unit("a", "ok")]).unwrap();
        let artifact = &report.artifacts[&OutputName::auxiliary("a")];
        assert_eq!(artifact.metadata.source_file, "shaders.aux.a.glsl");
        assert_eq!(artifact.metadata.source_sha1, source_digest("ok"));
        assert_eq!(artifact.metadata.compiler, "scripted");
        assert_eq!(artifact.targets[&Dialect::Glsl330].vertex, "ok");
    }

    #[test]
    fn compiles_a_whole_stage_batch() {
        use batch::{stage_batch, AuxiliaryKey, SourceGenerator};
        use capability::{code_of, Case, Stage};
        use std::borrow::Cow;

        struct Minimal;

        impl SourceGenerator for Minimal {
            fn generate(&self, _stage: Stage, case: &Case) -> String {
                batch::program::compose(
                    &format!("// {}\nvoid main() {{}}", code_of(case)),
                    "void main() {}",
                )
            }

            fn auxiliary(&self, _key: AuxiliaryKey) -> Cow<'static, str> {
                Cow::Borrowed("//@stage vertex\nvoid main() {}\n//@stage fragment\nvoid main() {}\n")
            }
        }

        let batch = stage_batch(Stage::Shadow).unwrap();
        let compiler = BatchCompiler::new(
            Arc::new(PassthroughCompiler),
            BTreeSet::from([Dialect::Glsl330, Dialect::GlslEs300]),
            4,
            Some(Duration::from_secs(30)),
        )
        .unwrap();
        let report = compiler.compile_batch(&batch, &Minimal).unwrap();
        assert!(report.is_success(), "{:?}", report.errors);
        assert_eq!(report.artifacts.len(), batch.len());
    }
}
