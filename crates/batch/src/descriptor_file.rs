//! Line-oriented batch descriptor: one `<identifier> : <output-name>` per
//! line. Blank lines and `#` comments are ignored on read.
use std::collections::BTreeSet;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

use capability::OutputName;

use crate::builder::Batch;
use crate::BatchError;

const SEPARATOR: &str = " : ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorLine {
    pub identifier: String,
    pub output: OutputName,
}

pub fn write_descriptor<W: Write>(batch: &Batch, mut out: W) -> io::Result<()> {
    for entry in batch.entries() {
        writeln!(out, "{}{SEPARATOR}{}", entry.identifier, entry.output)?;
    }
    out.flush()
}

pub fn write_descriptor_file(batch: &Batch, path: &Path) -> Result<(), BatchError> {
    let io_err = |source| BatchError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    let file = fs::File::create(path).map_err(io_err)?;
    write_descriptor(batch, io::BufWriter::new(file)).map_err(io_err)
}

pub fn parse_descriptor(text: &str) -> Result<Vec<DescriptorLine>, BatchError> {
    let mut lines = Vec::new();
    let mut seen = BTreeSet::new();
    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let malformed = |reason: String| BatchError::Malformed { line, reason };
        let (identifier, output) = trimmed
            .split_once(':')
            .ok_or_else(|| malformed("expected '<identifier> : <output-name>'".to_string()))?;
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Err(malformed("empty identifier".to_string()));
        }
        if identifier.contains(['/', '\\']) || identifier.starts_with('.') {
            return Err(malformed(format!(
                "identifier '{identifier}' must be a plain file name"
            )));
        }
        let output = OutputName::parse(output.trim()).map_err(|err| malformed(err.to_string()))?;
        if !seen.insert(output.clone()) {
            return Err(malformed(format!("output '{output}' listed twice")));
        }
        lines.push(DescriptorLine {
            identifier: identifier.to_string(),
            output,
        });
    }
    Ok(lines)
}

pub fn read_descriptor_file(path: &Path) -> Result<Vec<DescriptorLine>, BatchError> {
    let text = fs::read_to_string(path).map_err(|source| BatchError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_descriptor(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::stage_batch;
    use capability::Stage;

    #[test]
    fn written_descriptor_reads_back() {
        let batch = stage_batch(Stage::ForwardTranslucentRefractive).unwrap();
        let mut buffer = Vec::new();
        write_descriptor(&batch, &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text
            .lines()
            .any(|line| line == "shaders.aux.copy.glsl : shaders.aux.copy.prog"));

        let parsed = parse_descriptor(&text).unwrap();
        assert_eq!(parsed.len(), batch.len());
        for (line, entry) in parsed.iter().zip(batch.entries()) {
            assert_eq!(line.identifier, entry.identifier);
            assert_eq!(line.output, entry.output);
        }
    }

    #[test]
    fn skips_comments_and_blank_lines() {
        let text = "# header\n\nempty.glsl : shaders.aux.empty.prog\n";
        let parsed = parse_descriptor(text).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].identifier, "empty.glsl");
    }

    #[test]
    fn reports_line_of_malformed_entry() {
        let text = "a.glsl : shaders.aux.a.prog\nno separator here\n";
        match parse_descriptor(text).unwrap_err() {
            BatchError::Malformed { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_bad_names_and_paths() {
        assert!(parse_descriptor("a.glsl : other.a.prog").is_err());
        assert!(parse_descriptor("../a.glsl : shaders.aux.a.prog").is_err());
        assert!(parse_descriptor(" : shaders.aux.a.prog").is_err());
        let twice = "a.glsl : shaders.aux.a.prog\nb.glsl : shaders.aux.a.prog\n";
        assert!(parse_descriptor(twice).is_err());
    }

    #[test]
    fn descriptor_file_is_created_with_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("batch.txt");
        let batch = stage_batch(Stage::Shadow).unwrap();
        write_descriptor_file(&batch, &path).unwrap();
        let parsed = read_descriptor_file(&path).unwrap();
        assert_eq!(parsed.len(), batch.len());
    }
}
