use std::process::ExitCode;

use clap::{Parser, Subcommand};
use generate::HangarGenerator;
use resolution::{Solve, Sweep};
use tracing_subscriber::EnvFilter;

mod error;
mod generate;
mod instance;
mod resolution;
mod tables;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct HangarTools {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate a random instance as JSON
    Generate(HangarGenerator),
    /// Decide acceptance, placement and roll times for one instance
    Solve(Solve),
    /// Solve an instance once per scaling factor of a penalty family
    Sweep(Sweep),
}

fn enable_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    enable_tracing();
    let cli = HangarTools::parse();
    let result = match cli.command {
        Command::Generate(generate) => generate.generate(),
        Command::Solve(solve) => solve.solve(),
        Command::Sweep(sweep) => sweep.sweep(),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
