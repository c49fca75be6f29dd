use std::borrow::Cow;
use std::fs;
use std::path::Path;

use capability::{Case, OutputName, Stage};
use tracing::debug;

use crate::auxiliary::AuxiliaryKey;
use crate::builder::{Batch, EntrySource};
use crate::BatchError;

/// Produces program text for batch entries. Implementations must be pure:
/// equal inputs give equal text and no I/O happens.
pub trait SourceGenerator: Send + Sync {
    fn generate(&self, stage: Stage, case: &Case) -> String;

    fn auxiliary(&self, key: AuxiliaryKey) -> Cow<'static, str>;
}

/// A batch entry with its source text resolved.
#[derive(Debug, Clone)]
pub struct ShaderUnit {
    pub identifier: String,
    pub output: OutputName,
    pub source: String,
    pub origin: EntrySource,
}

impl Batch {
    /// Resolves every entry's source, in batch order.
    pub fn units(&self, generator: &dyn SourceGenerator) -> Vec<ShaderUnit> {
        let stage = self.stage();
        self.entries()
            .iter()
            .map(|entry| {
                let source = match &entry.source {
                    EntrySource::Case(case) => generator.generate(stage, case),
                    EntrySource::Auxiliary(key) => generator.auxiliary(*key).into_owned(),
                };
                ShaderUnit {
                    identifier: entry.identifier.clone(),
                    output: entry.output.clone(),
                    source,
                    origin: entry.source,
                }
            })
            .collect()
    }
}

/// Writes each unit's source to `<dir>/<identifier>`, creating `dir`.
pub fn write_sources(dir: &Path, units: &[ShaderUnit]) -> Result<(), BatchError> {
    fs::create_dir_all(dir).map_err(|source| BatchError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    for unit in units {
        let path = dir.join(&unit.identifier);
        fs::write(&path, &unit.source).map_err(|source| BatchError::Io { path, source })?;
    }
    debug!(dir = %dir.display(), count = units.len(), "wrote shader sources");
    Ok(())
}
