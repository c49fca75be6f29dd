use std::env;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{bail, Context, Result};
use archive::{package_to_path, ManifestInfo, PackageOptions, ShaderArchive};
use batch::{read_descriptor_file, stage_batch, write_descriptor_file, write_sources};
use buildconfig::BuildConfig;
use capability::Stage;
use compiler::{backend_for, BatchCompiler, CompileUnit};
use glslgen::GlslGenerator;
use tracing_subscriber::EnvFilter;

use crate::cli::{BuildArgs, BuildOptions, CompileBatchArgs, InspectArgs, ListArgs};
use crate::paths;

const ENV_SOURCE_DATE_EPOCH: &str = "SOURCE_DATE_EPOCH";

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Loads the configuration file (if any) and applies command-line
/// overrides on top of it.
pub fn load_config(options: &BuildOptions) -> Result<BuildConfig> {
    let mut config = match paths::resolve_config(options.config.as_deref()) {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading configuration");
            BuildConfig::load(&path)
                .with_context(|| format!("failed to load configuration {}", path.display()))?
        }
        None => BuildConfig::default(),
    };

    if let Some(workers) = options.workers {
        config.workers = Some(workers);
    }
    if let Some(timeout) = options.timeout {
        config.timeout = timeout;
    }
    if !options.dialects.is_empty() {
        config.dialects = options.dialects.clone();
    }
    if let Some(compiler) = options.compiler {
        config.compiler = compiler;
    }
    if options.no_compact {
        config.compact = false;
    }
    config
        .validate()
        .context("invalid build configuration")?;
    Ok(config)
}

pub fn build(args: BuildArgs) -> Result<()> {
    let (batch_file, source_dir, archive) = match args.paths.as_slice() {
        [source_dir, archive] => (None, source_dir, archive),
        [batch_file, source_dir, archive] => (Some(batch_file), source_dir, archive),
        other => bail!("expected 2 or 3 paths, got {}", other.len()),
    };
    let config = load_config(&args.options)?;

    let batch = stage_batch(args.stage)
        .with_context(|| format!("failed to assemble batch for {}", args.stage))?;
    tracing::info!(
        stage = %args.stage,
        primaries = batch.primaries().count(),
        auxiliaries = batch.auxiliaries().count(),
        "assembled batch"
    );

    if let Some(path) = batch_file {
        write_descriptor_file(&batch, path)
            .with_context(|| format!("failed to write batch descriptor {}", path.display()))?;
    }
    let units = batch.units(&GlslGenerator);
    write_sources(source_dir, &units)
        .with_context(|| format!("failed to write sources to {}", source_dir.display()))?;

    let units = units.into_iter().map(CompileUnit::from).collect();
    compile_and_package(args.stage, units, archive, &config)
}

pub fn compile_batch(args: CompileBatchArgs) -> Result<()> {
    let config = load_config(&args.options)?;
    let lines = read_descriptor_file(&args.batch_file).with_context(|| {
        format!(
            "failed to read batch descriptor {}",
            args.batch_file.display()
        )
    })?;

    let mut units = Vec::with_capacity(lines.len());
    for line in lines {
        let path = args.source_dir.join(&line.identifier);
        let source = fs::read_to_string(&path)
            .with_context(|| format!("failed to read source {}", path.display()))?;
        units.push(CompileUnit {
            file: line.identifier,
            output: line.output,
            source: Arc::from(source),
        });
    }
    tracing::info!(
        batch = %args.batch_file.display(),
        units = units.len(),
        "loaded batch descriptor"
    );

    compile_and_package(args.stage, units, &args.archive, &config)
}

fn compile_and_package(
    stage: Stage,
    units: Vec<CompileUnit>,
    archive: &Path,
    config: &BuildConfig,
) -> Result<()> {
    let workers = config.worker_count();
    let compiler = BatchCompiler::new(
        backend_for(config.compiler),
        config.dialect_set(),
        workers,
        Some(config.timeout),
    )
    .context("failed to start compile workers")?;
    let report = compiler
        .compile_units(units)
        .with_context(|| format!("failed to compile {stage}"))?;

    if !report.is_success() {
        for error in &report.errors {
            eprintln!("compile error: {error}");
        }
        bail!(
            "{} of {} units failed to compile",
            report.errors.len(),
            report.total()
        );
    }

    let info = ManifestInfo {
        tool: format!("shadergen {}", env!("CARGO_PKG_VERSION")),
        stage: stage.code().to_string(),
        dialects: config.dialect_set(),
        generated_at: generated_at()?,
    };
    let options = PackageOptions {
        compact: config.compact,
        workers,
    };
    let manifest = package_to_path(&report.artifacts, &info, archive, &options)
        .with_context(|| format!("failed to package {}", archive.display()))?;

    println!(
        "packaged {} programs for {stage} into {}",
        manifest.entry_count,
        archive.display()
    );
    Ok(())
}

/// Archive timestamp: `SOURCE_DATE_EPOCH` when set, otherwise now.
fn generated_at() -> Result<u64> {
    match env::var(ENV_SOURCE_DATE_EPOCH) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{ENV_SOURCE_DATE_EPOCH} is not an integer: '{raw}'")),
        Err(_) => Ok(SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .context("system clock is before the Unix epoch")?
            .as_secs()),
    }
}

pub fn list(args: ListArgs) -> Result<()> {
    let batch = stage_batch(args.stage)
        .with_context(|| format!("failed to assemble batch for {}", args.stage))?;
    for entry in batch.entries() {
        if args.primaries && entry.is_auxiliary() {
            continue;
        }
        println!("{}", entry.output);
    }
    Ok(())
}

pub fn inspect(args: InspectArgs) -> Result<()> {
    let mut archive = ShaderArchive::open(&args.archive)
        .with_context(|| format!("invalid archive {}", args.archive.display()))?;
    let manifest = archive.manifest().clone();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&manifest)?);
        return Ok(());
    }

    let dialects: Vec<&str> = manifest.dialects.iter().map(|d| d.as_str()).collect();
    println!("Archive: {}", args.archive.display());
    println!("  format:    {}", manifest.format_version);
    println!("  tool:      {}", manifest.tool);
    println!("  stage:     {}", manifest.stage);
    println!("  dialects:  {}", dialects.join(", "));
    println!("  entries:   {}", manifest.entry_count);
    println!("  compacted: {}", manifest.compacted);
    for name in archive.names().to_vec() {
        let artifact = archive
            .artifact(&name)
            .with_context(|| format!("failed to read {name}"))?;
        println!(
            "  {:<56} compiler={} sha1={}",
            name, artifact.metadata.compiler, artifact.metadata.source_sha1
        );
    }
    Ok(())
}
