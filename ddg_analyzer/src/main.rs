use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use ddg_analyzer::config::AnalysisConfig;
use ddg_analyzer::pipeline::{run_significance, run_thresholds, run_transitions};

#[derive(Parser, Debug)]
#[command(name = "ddg-analyzer")]
#[command(version)]
#[command(
    about = "Per-protein ddG significance and residue-class transition analysis",
    long_about = None
)]
struct Cli {
    /// JSON configuration file; unspecified fields keep their defaults
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory holding the merged input tables (overrides the config)
    #[arg(long, value_name = "DIR")]
    base_dir: Option<PathBuf>,

    /// Skip PNG heatmap rendering
    #[arg(long)]
    no_heatmaps: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Estimate per-protein thresholds from the reference set only
    Thresholds,
    /// Thresholds plus classification of the query set
    Significance,
    /// Residue-class transition matrices for every configured dataset
    Transitions,
    /// Significance and transitions
    All,
}

fn load_config(cli: &Cli) -> anyhow::Result<AnalysisConfig> {
    let mut config = match &cli.config {
        Some(path) => AnalysisConfig::from_json_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => AnalysisConfig::default(),
    };
    if let Some(dir) = &cli.base_dir {
        config.base_dir = dir.clone();
    }
    if cli.no_heatmaps {
        config.render_heatmaps = false;
    }
    config.validate()?;
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let command = cli.command.unwrap_or(Command::All);
    info!("Starting {:?} run in {}", command, config.base_dir.display());

    let mut failures = 0;

    if command == Command::Thresholds {
        run_thresholds(&config)?;
        return Ok(());
    }

    if matches!(command, Command::Significance | Command::All) {
        if let Err(e) = run_significance(&config) {
            error!("Significance analysis failed: {}", e);
            failures += 1;
        }
    }

    if matches!(command, Command::Transitions | Command::All) {
        match run_transitions(&config) {
            Ok(run) => failures += run.failed.len(),
            Err(e) => {
                error!("Transition analysis failed: {}", e);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        bail!("{failures} analysis step(s) failed");
    }
    info!("Analysis finished");
    Ok(())
}
