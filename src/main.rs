//! mpc-stretch CLI
//!
//! Command-line front end for the time-stretch engine.

use anyhow::Context;
use clap::Parser;
use log::info;
use tracing_subscriber::EnvFilter;

use mpc_stretch::cli::{commands, Cli, Commands};
use mpc_stretch::config::EngineConfig;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("mpc-stretch v{}", env!("CARGO_PKG_VERSION"));

    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => EngineConfig::default(),
    };

    match cli.command {
        Some(cmd) => handle_command(cmd, &config),
        None => {
            println!("mpc-stretch v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for available commands");
            Ok(())
        }
    }
}

fn handle_command(cmd: Commands, config: &EngineConfig) -> anyhow::Result<()> {
    match cmd {
        Commands::Stretch {
            input,
            output,
            args,
        } => commands::stretch_file(&input, &output, &args, config)
            .with_context(|| format!("failed to stretch {}", input.display())),
        Commands::Batch {
            input_dir,
            output_dir,
            args,
        } => {
            let summary = commands::batch(&input_dir, &output_dir, &args, config)?;
            if !summary.failed.is_empty() {
                anyhow::bail!("{} file(s) failed", summary.failed.len());
            }
            Ok(())
        }
        Commands::Algorithms { json } => Ok(commands::list_algorithms(json)?),
        Commands::Analyze { path, json } => commands::analyze(&path, json)
            .with_context(|| format!("failed to analyze {}", path.display())),
    }
}
