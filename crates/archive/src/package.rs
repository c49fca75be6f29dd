use std::collections::BTreeMap;
use std::fs;
use std::io::{Seek, Write};
use std::path::Path;

use capability::OutputName;
use compiler::CompiledArtifact;
use tracing::{debug, info};
use zip::write::FileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use crate::compact::compact_all;
use crate::manifest::{ArchiveManifest, ManifestInfo, MANIFEST_ENTRY};
use crate::ArchiveError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackageOptions {
    pub compact: bool,
    /// Threads used by the compaction pass.
    pub workers: usize,
}

impl Default for PackageOptions {
    fn default() -> Self {
        Self {
            compact: true,
            workers: 1,
        }
    }
}

/// Entry options shared by every file: fixed timestamp, fixed mode and a
/// fixed compression method, so equal input gives equal bytes.
fn entry_options() -> FileOptions {
    FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default())
        .unix_permissions(0o644)
}

/// Writes `artifacts` plus a manifest into a zip archive. The manifest comes
/// first and artifact entries follow in lexicographic name order.
pub fn package<W: Write + Seek>(
    artifacts: &BTreeMap<OutputName, CompiledArtifact>,
    info: &ManifestInfo,
    out: W,
    options: &PackageOptions,
) -> Result<ArchiveManifest, ArchiveError> {
    if info.dialects.is_empty() {
        return Err(ArchiveError::InvalidManifest(vec![
            "dialects must not be empty".to_string(),
        ]));
    }

    for (name, artifact) in artifacts {
        if name != &artifact.output {
            return Err(ArchiveError::NameMismatch {
                key: name.to_string(),
                output: artifact.output.to_string(),
            });
        }
        let found: Vec<_> = artifact.targets.keys().copied().collect();
        let expected: Vec<_> = info.dialects.iter().copied().collect();
        if found != expected {
            return Err(ArchiveError::DialectMismatch {
                output: name.to_string(),
                expected,
                found,
            });
        }
    }

    let ordered: Vec<CompiledArtifact> = artifacts.values().cloned().collect();
    let ordered = if options.compact {
        compact_all(ordered, options.workers)?
    } else {
        ordered
    };

    let manifest = ArchiveManifest::new(info, ordered.len(), options.compact);
    let issues = manifest.validate();
    if !issues.is_empty() {
        return Err(ArchiveError::InvalidManifest(issues));
    }

    let mut zip = ZipWriter::new(out);
    zip.start_file(MANIFEST_ENTRY, entry_options())?;
    zip.write_all(&serde_json::to_vec_pretty(&manifest)?)?;

    for artifact in &ordered {
        zip.start_file(artifact.output.as_str(), entry_options())?;
        zip.write_all(&serde_json::to_vec_pretty(artifact)?)?;
    }
    zip.finish()?.flush()?;

    debug!(
        entries = manifest.entry_count,
        compacted = manifest.compacted,
        "archive written"
    );
    Ok(manifest)
}

/// Packages into `path`, replacing it only once the archive is complete.
pub fn package_to_path(
    artifacts: &BTreeMap<OutputName, CompiledArtifact>,
    info: &ManifestInfo,
    path: &Path,
    options: &PackageOptions,
) -> Result<ArchiveManifest, ArchiveError> {
    let io_err = |path: &Path, source| ArchiveError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| io_err(parent, source))?;
    }

    let mut partial = path.as_os_str().to_owned();
    partial.push(".partial");
    let partial = Path::new(&partial).to_path_buf();

    let file = fs::File::create(&partial).map_err(|source| io_err(&partial, source))?;
    let result = package(artifacts, info, std::io::BufWriter::new(file), options);
    let manifest = match result {
        Ok(manifest) => manifest,
        Err(err) => {
            let _ = fs::remove_file(&partial);
            return Err(err);
        }
    };
    fs::rename(&partial, path).map_err(|source| io_err(path, source))?;

    info!(
        path = %path.display(),
        entries = manifest.entry_count,
        "packaged archive"
    );
    Ok(manifest)
}
