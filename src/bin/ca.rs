//! CA - Comparative Analysis CLI
//!
//! Command-line interface for batch ordination and enrichment analysis.

use clap::{Parser, Subcommand};
use comparative_analysis::error::Result;
use comparative_analysis::pipeline::{run_batch, AnalysisConfig, AnalysisStatus, FailurePolicy};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Comparative analysis of class-partitioned abundance profiles
#[derive(Parser)]
#[command(name = "ca")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every analysis of a YAML configuration file
    Run {
        /// Path to batch configuration YAML
        #[arg(short, long)]
        config: PathBuf,

        /// Override the configured output directory
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Record failed analyses and keep going
        #[arg(long)]
        keep_going: bool,
    },

    /// Write an example configuration file
    Example {
        /// Output path for the YAML file
        #[arg(short, long, default_value = "analysis.yaml")]
        output: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            config,
            output,
            keep_going,
        } => cmd_run(&config, output, keep_going),
        Commands::Example { output } => cmd_example(&output),
    };

    if let Err(e) = result {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

/// Run a batch from configuration
fn cmd_run(config_path: &Path, output: Option<PathBuf>, keep_going: bool) -> Result<()> {
    tracing::info!(path = ?config_path, "loading configuration");
    let mut config = AnalysisConfig::from_file(config_path)?;
    if let Some(dir) = output {
        config.output_directory = dir;
    }
    if keep_going {
        config.failure_policy = FailurePolicy::SkipAndContinue;
    }

    tracing::info!(
        title = %config.title,
        analyses = config.analyses.len(),
        output = ?config.output_directory,
        "running batch"
    );
    let report = run_batch(&config)?;

    for outcome in &report.outcomes {
        match &outcome.status {
            AnalysisStatus::Completed { files } => {
                tracing::info!(analysis = %outcome.name, files = files.len(), "completed")
            }
            AnalysisStatus::Failed { error } => {
                tracing::warn!(analysis = %outcome.name, "{}", error)
            }
        }
    }

    if report.n_failed() > 0 {
        tracing::warn!(
            "{} of {} analyses failed",
            report.n_failed(),
            report.outcomes.len()
        );
    }

    Ok(())
}

/// Write an example configuration
fn cmd_example(output_path: &Path) -> Result<()> {
    let yaml = AnalysisConfig::example().to_yaml()?;

    std::fs::write(output_path, &yaml)?;
    tracing::info!(path = ?output_path, "wrote example configuration");
    println!("{}", yaml);

    Ok(())
}
