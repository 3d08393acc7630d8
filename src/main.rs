use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

/// CloudFormation synthesizer for the Safe API service and its delivery pipeline
#[derive(Parser)]
#[command(name = "stackforge")]
#[command(version)]
#[command(about = "Synthesizes the Safe API service and delivery pipeline stacks", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory the templates and manifest are written to
    #[arg(short, long, value_name = "DIR", default_value = "dist")]
    out: PathBuf,

    /// Log level: trace, debug, info, warn, error
    #[arg(short = 'v', long, value_name = "LEVEL")]
    log_level: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Step 1: Logging first, so configuration problems are visible
    stackforge::init::init_tracing(cli.log_level.as_deref());

    // Step 2: Load configuration (file if given, environment overrides on top)
    let config =
        stackforge_config::load(cli.config.as_deref()).context("Failed to load configuration")?;

    // Step 3: Declare and synthesize both stacks
    let assembly = stackforge::compose(&config)?;

    // Step 4: Write the templates plus the assembly manifest
    assembly
        .write_to(&cli.out)
        .with_context(|| format!("Failed to write assembly to {}", cli.out.display()))?;

    Ok(())
}
