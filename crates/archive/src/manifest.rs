use std::collections::BTreeSet;

use buildconfig::Dialect;
use serde::{Deserialize, Serialize};

/// Version of the archive layout; bumped on any incompatible change.
pub const FORMAT_VERSION: u32 = 1;
/// Reserved manifest entry. Sorts ahead of every `shaders.` entry.
pub const MANIFEST_ENTRY: &str = "_manifest.json";

/// Caller-supplied generation metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestInfo {
    pub tool: String,
    pub stage: String,
    pub dialects: BTreeSet<Dialect>,
    /// Seconds since the Unix epoch.
    pub generated_at: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveManifest {
    pub format_version: u32,
    pub tool: String,
    pub stage: String,
    pub dialects: Vec<Dialect>,
    /// Artifact entries, excluding the manifest itself.
    pub entry_count: usize,
    pub generated_at: u64,
    pub compacted: bool,
}

impl ArchiveManifest {
    pub fn new(info: &ManifestInfo, entry_count: usize, compacted: bool) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            tool: info.tool.clone(),
            stage: info.stage.clone(),
            dialects: info.dialects.iter().copied().collect(),
            entry_count,
            generated_at: info.generated_at,
            compacted,
        }
    }

    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.format_version != FORMAT_VERSION {
            issues.push(format!(
                "format_version {} is not supported (expected {FORMAT_VERSION})",
                self.format_version
            ));
        }

        if self.tool.trim().is_empty() {
            issues.push("tool must not be empty".to_string());
        }

        if self.stage.trim().is_empty() {
            issues.push("stage must not be empty".to_string());
        }

        if self.dialects.is_empty() {
            issues.push("dialects must not be empty".to_string());
        }

        let unique: BTreeSet<_> = self.dialects.iter().collect();
        if unique.len() != self.dialects.len() {
            issues.push("dialects must not repeat".to_string());
        }

        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info() -> ManifestInfo {
        ManifestInfo {
            tool: "shadergen 0.1.0".to_string(),
            stage: "shadow".to_string(),
            dialects: BTreeSet::from([Dialect::GlslEs300, Dialect::Glsl330]),
            generated_at: 0,
        }
    }

    #[test]
    fn manifest_lists_dialects_in_order() {
        let manifest = ArchiveManifest::new(&info(), 3, true);
        assert_eq!(manifest.dialects, vec![Dialect::Glsl330, Dialect::GlslEs300]);
        assert!(manifest.validate().is_empty());
    }

    #[test]
    fn reports_every_issue() {
        let mut manifest = ArchiveManifest::new(&info(), 0, false);
        manifest.format_version = 9;
        manifest.tool.clear();
        manifest.dialects = vec![Dialect::Wgsl, Dialect::Wgsl];
        assert_eq!(manifest.validate().len(), 3);
    }

    #[test]
    fn manifest_entry_sorts_first() {
        assert!(MANIFEST_ENTRY < "shaders.aux.copy.prog");
    }
}
