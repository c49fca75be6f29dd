use std::fs;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use capability::OutputName;
use compiler::CompiledArtifact;
use tracing::debug;
use zip::ZipArchive;

use crate::manifest::{ArchiveManifest, MANIFEST_ENTRY};
use crate::ArchiveError;

/// A validated archive. Construction checks the manifest, the entry count,
/// entry ordering and entry names before any artifact is exposed.
pub struct ShaderArchive<R: Read + Seek> {
    zip: ZipArchive<R>,
    manifest: ArchiveManifest,
    names: Vec<OutputName>,
}

impl ShaderArchive<BufReader<fs::File>> {
    pub fn open(path: &Path) -> Result<Self, ArchiveError> {
        let file = fs::File::open(path).map_err(|source| ArchiveError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(BufReader::new(file))
    }
}

impl<R: Read + Seek> ShaderArchive<R> {
    pub fn from_reader(reader: R) -> Result<Self, ArchiveError> {
        let mut zip = ZipArchive::new(reader)?;

        let mut entries = Vec::with_capacity(zip.len());
        for index in 0..zip.len() {
            entries.push(zip.by_index(index)?.name().to_string());
        }

        if entries.first().map(String::as_str) != Some(MANIFEST_ENTRY) {
            return Err(ArchiveError::InvalidManifest(vec![format!(
                "first entry must be '{MANIFEST_ENTRY}'"
            )]));
        }

        let mut raw = String::new();
        zip.by_name(MANIFEST_ENTRY)?.read_to_string(&mut raw)?;
        let manifest: ArchiveManifest = serde_json::from_str(&raw)?;

        let mut issues = manifest.validate();
        let artifact_entries = &entries[1..];
        if manifest.entry_count != artifact_entries.len() {
            issues.push(format!(
                "manifest lists {} entries but the archive holds {}",
                manifest.entry_count,
                artifact_entries.len()
            ));
        }
        if let Some(pair) = artifact_entries.windows(2).find(|pair| pair[0] >= pair[1]) {
            issues.push(format!(
                "entries out of order: '{}' before '{}'",
                pair[0], pair[1]
            ));
        }
        let mut names = Vec::with_capacity(artifact_entries.len());
        for entry in artifact_entries {
            match OutputName::parse(entry) {
                Ok(name) => names.push(name),
                Err(err) => issues.push(err.to_string()),
            }
        }
        if !issues.is_empty() {
            return Err(ArchiveError::InvalidManifest(issues));
        }

        debug!(entries = names.len(), stage = %manifest.stage, "opened archive");
        Ok(Self {
            zip,
            manifest,
            names,
        })
    }

    pub fn manifest(&self) -> &ArchiveManifest {
        &self.manifest
    }

    /// Artifact names in archive order.
    pub fn names(&self) -> &[OutputName] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn contains(&self, name: &OutputName) -> bool {
        self.names.binary_search(name).is_ok()
    }

    pub fn artifact(&mut self, name: &OutputName) -> Result<CompiledArtifact, ArchiveError> {
        if !self.contains(name) {
            return Err(ArchiveError::MissingEntry(name.to_string()));
        }
        let mut raw = String::new();
        self.zip.by_name(name.as_str())?.read_to_string(&mut raw)?;
        let artifact: CompiledArtifact = serde_json::from_str(&raw)?;
        if &artifact.output != name {
            return Err(ArchiveError::NameMismatch {
                key: name.to_string(),
                output: artifact.output.to_string(),
            });
        }
        Ok(artifact)
    }
}
