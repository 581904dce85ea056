
mod cli;
mod commands;

use anyhow::Result;
use canopy::AnalysisConfig;
use cli::{Cli, Commands};
use commands::{batch, health, spacing};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

pub fn run() -> Result<()> {
    use clap::Parser;

    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match &cli.command {
        Commands::Health(args) => health::run(&cli, args),
        Commands::Spacing(args) => spacing::run(&cli, args),
        Commands::Batch(args) => batch::run(&cli, args),
    }
}

/// INFO by default, DEBUG with -v, TRACE with -vv.
fn setup_logging(verbose: u8) -> Result<()> {
    let level = match verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

/// Configuration from `--config`, or the defaults.
pub(crate) fn load_config(cli: &Cli) -> Result<AnalysisConfig> {
    match &cli.config {
        Some(path) => AnalysisConfig::from_path(path),
        None => Ok(AnalysisConfig::default()),
    }
}

fn main() -> Result<()> { run() }
