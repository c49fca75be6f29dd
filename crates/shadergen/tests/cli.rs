use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

fn shadergen(config: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_shadergen"))
        .env("SHADERGEN_CONFIG", config)
        .env("SOURCE_DATE_EPOCH", "1700000000")
        .env("RUST_LOG", "warn")
        .args(args)
        .output()
        .expect("failed to run shadergen")
}

fn write_config(root: &Path) -> std::path::PathBuf {
    let path = root.join("shadergen.toml");
    fs::write(
        &path,
        "version = 1\nworkers = 2\ntimeout = \"30s\"\ncompiler = \"passthrough\"\n",
    )
    .unwrap();
    path
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn build_writes_descriptor_sources_and_archive() {
    let root = TempDir::new().unwrap();
    let config = write_config(root.path());
    let batch = root.path().join("shadow.batch");
    let sources = root.path().join("src");
    let archive = root.path().join("shadow.zip");

    let output = shadergen(
        &config,
        &[
            "build",
            "shadow",
            path_str(&batch),
            path_str(&sources),
            path_str(&archive),
        ],
    );
    assert!(
        output.status.success(),
        "{}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("packaged 8 programs for shadow"), "{stdout}");

    let descriptor = fs::read_to_string(&batch).unwrap();
    assert_eq!(descriptor.lines().count(), 8);
    assert!(descriptor.contains("shaders.aux.variance_blur.prog"));
    assert_eq!(fs::read_dir(&sources).unwrap().count(), 8);
    assert!(archive.exists());

    let inspect = shadergen(&config, &["inspect", path_str(&archive)]);
    assert!(inspect.status.success());
    let summary = String::from_utf8_lossy(&inspect.stdout);
    assert!(summary.contains("stage:     shadow"), "{summary}");
    assert!(summary.contains("entries:   8"), "{summary}");
    assert!(summary.contains("compiler=passthrough"), "{summary}");
}

#[test]
fn builds_are_reproducible() {
    let root = TempDir::new().unwrap();
    let config = write_config(root.path());
    let sources = root.path().join("src");
    let first = root.path().join("first.zip");
    let second = root.path().join("second.zip");

    for archive in [&first, &second] {
        let output = shadergen(
            &config,
            &[
                "build",
                "deferred-light",
                path_str(&sources),
                path_str(archive),
            ],
        );
        assert!(
            output.status.success(),
            "{}",
            String::from_utf8_lossy(&output.stderr)
        );
    }
    assert_eq!(fs::read(&first).unwrap(), fs::read(&second).unwrap());
}

#[test]
fn compile_batch_reports_broken_sources() {
    let root = TempDir::new().unwrap();
    let config = write_config(root.path());
    let batch = root.path().join("light.batch");
    let sources = root.path().join("src");
    let archive = root.path().join("light.zip");

    let built = shadergen(
        &config,
        &[
            "build",
            "deferred-light",
            path_str(&batch),
            path_str(&sources),
            path_str(&archive),
        ],
    );
    assert!(built.status.success());

    let broken = sources.join("shaders.aux.copy.glsl");
    let text = fs::read_to_string(&broken).unwrap();
    fs::write(&broken, text.replace("//@stage fragment", "// fragment")).unwrap();

    let rebuilt = root.path().join("rebuilt.zip");
    let output = shadergen(
        &config,
        &[
            "compile-batch",
            path_str(&batch),
            path_str(&sources),
            path_str(&rebuilt),
            "--stage",
            "deferred-light",
        ],
    );
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("compile error: shaders.aux.copy.glsl: 1:1: missing fragment stage"),
        "{stderr}"
    );
    assert!(!rebuilt.exists());
}

#[test]
fn list_prints_primary_names() {
    let root = TempDir::new().unwrap();
    let config = write_config(root.path());
    let output = shadergen(&config, &["list", "deferred-light", "--primaries"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let names: Vec<&str> = stdout.lines().collect();
    assert_eq!(names.len(), 5);
    assert!(names
        .iter()
        .all(|name| name.starts_with("shaders.deferred.light.")));
}

#[test]
fn rejects_invalid_configuration() {
    let root = TempDir::new().unwrap();
    let config = root.path().join("bad.toml");
    fs::write(&config, "version = 1\nworkers = 0\n").unwrap();
    let output = shadergen(
        &config,
        &[
            "build",
            "shadow",
            path_str(&root.path().join("src")),
            path_str(&root.path().join("out.zip")),
        ],
    );
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("workers must be at least 1"), "{stderr}");
}
