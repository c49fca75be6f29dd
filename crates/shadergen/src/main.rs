mod cli;
mod paths;
mod run;

use anyhow::Result;
use cli::Command;

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing();

    match cli.command {
        Command::Build(args) => run::build(args),
        Command::CompileBatch(args) => run::compile_batch(args),
        Command::List(args) => run::list(args),
        Command::Inspect(args) => run::inspect(args),
    }
}
