use std::path::PathBuf;
use std::time::Duration;

use buildconfig::{CompilerBackend, Dialect};
use capability::Stage;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "shadergen",
    author,
    version,
    about = "Shader variant generator, batch compiler and packager"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Enumerate a stage, generate its sources, compile them and package an archive.
    Build(BuildArgs),
    /// Compile the sources listed in an existing batch descriptor.
    CompileBatch(CompileBatchArgs),
    /// Print the output names of a stage's batch.
    List(ListArgs),
    /// Validate an archive and summarise its contents.
    Inspect(InspectArgs),
}

#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Pipeline stage (e.g. `forward-opaque-lit`, `shadow`).
    #[arg(value_name = "STAGE", value_parser = parse_stage)]
    pub stage: Stage,

    /// `[BATCH_FILE] SOURCE_DIR ARCHIVE`; with three paths the batch
    /// descriptor is written as well.
    #[arg(value_name = "PATH", num_args = 2..=3, required = true)]
    pub paths: Vec<PathBuf>,

    #[command(flatten)]
    pub options: BuildOptions,
}

#[derive(Args, Debug)]
pub struct CompileBatchArgs {
    #[arg(value_name = "BATCH_FILE")]
    pub batch_file: PathBuf,

    /// Directory holding the sources named in the descriptor.
    #[arg(value_name = "SOURCE_DIR")]
    pub source_dir: PathBuf,

    #[arg(value_name = "ARCHIVE")]
    pub archive: PathBuf,

    /// Stage recorded in the archive manifest.
    #[arg(long, value_name = "STAGE", value_parser = parse_stage)]
    pub stage: Stage,

    #[command(flatten)]
    pub options: BuildOptions,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    #[arg(value_name = "STAGE", value_parser = parse_stage)]
    pub stage: Stage,

    /// Only print primary (per-case) outputs.
    #[arg(long)]
    pub primaries: bool,
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    #[arg(value_name = "ARCHIVE")]
    pub archive: PathBuf,

    /// Print the manifest as JSON instead of a summary.
    #[arg(long)]
    pub json: bool,
}

/// Settings shared by every command that compiles. Flags override the
/// configuration file.
#[derive(Args, Debug, Clone, Default)]
pub struct BuildOptions {
    /// Configuration file (TOML).
    #[arg(long, value_name = "FILE", env = "SHADERGEN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Compile worker threads.
    #[arg(long, value_name = "N")]
    pub workers: Option<usize>,

    /// Per-unit compile timeout (e.g. `30s`, `2m`).
    #[arg(long, value_name = "DURATION", value_parser = buildconfig::parse_duration)]
    pub timeout: Option<Duration>,

    /// Target dialect; repeat or comma-separate for several.
    #[arg(long = "dialect", value_name = "DIALECT", value_delimiter = ',')]
    pub dialects: Vec<Dialect>,

    /// Compiler backend: `naga` or `passthrough`.
    #[arg(long, value_name = "BACKEND")]
    pub compiler: Option<CompilerBackend>,

    /// Store emitted text as-is instead of compacting it.
    #[arg(long)]
    pub no_compact: bool,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_stage(value: &str) -> Result<Stage, String> {
    let normalized = value.trim().to_ascii_lowercase();
    Stage::from_code(&normalized).ok_or_else(|| {
        let known: Vec<&str> = Stage::ALL.iter().map(|stage| stage.code()).collect();
        format!("unknown stage '{value}'; expected one of {}", known.join(", "))
    })
}
