use ccsweep_runner::{
    config::{parse_skews, ConfigErrors, SweepConfig},
    pipeline,
    workspace::Workspace,
};
use clap::Parser;
use std::{path::PathBuf, process::exit};
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Parameter-sweep pipeline for epoch-based concurrency-control
/// engines: builds one artifact per compile-time config, runs every
/// experiment cell for a fixed trial count and aggregates the results
/// for plotting.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Workload type token (X: write-only, A: 50:50, B: 5:95)
    workload: Option<String>,
    /// Records in the benchmark table
    records: Option<u64>,
    /// Worker thread count handed to the engine
    threads: Option<u32>,
    /// Duration of one trial in seconds
    seconds: Option<u64>,
    /// Comma separated skew values, e.g. 0.0,0.5,0.99
    skews: Option<String>,
    /// Operations per transaction
    reps: Option<u32>,

    /// Load sweep and settings from a YAML file instead of the default
    /// sweep
    #[arg(
        long,
        conflicts_with_all = ["workload", "records", "threads", "seconds", "skews", "reps"]
    )]
    config: Option<PathBuf>,
    /// Trials per experiment cell
    #[arg(long)]
    trials: Option<u32>,
    /// External command the grouped datasets are handed to
    #[arg(long)]
    plot_command: Option<PathBuf>,
    /// Base directory of the engine checkout
    #[arg(long, default_value = ".")]
    base_dir: PathBuf,
}

fn load_config(cli: &Cli) -> Result<SweepConfig, ConfigErrors> {
    let mut config = match &cli.config {
        Some(path) => SweepConfig::from_yaml(path)?,
        None => SweepConfig::default(),
    };

    if let Some(workload) = &cli.workload {
        config.sweep.workloads = vec![workload.clone()];
    }
    if let Some(records) = cli.records {
        config.sweep.records = vec![records];
    }
    if let Some(threads) = cli.threads {
        config.sweep.threads = vec![threads];
    }
    if let Some(seconds) = cli.seconds {
        config.settings.seconds = seconds;
    }
    if let Some(raw) = &cli.skews {
        config.sweep.skews = parse_skews(raw)?;
    }
    if let Some(reps) = cli.reps {
        config.sweep.reps = vec![reps];
    }
    if let Some(trials) = cli.trials {
        config.settings.trials_per_cell = trials;
    }
    if let Some(command) = &cli.plot_command {
        config.settings.plot_command = Some(command.clone());
    }

    Ok(config)
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(error) => {
            error!("Invalid sweep configuration: {error}");
            exit(1);
        }
    };

    let workspace = Workspace::new(&cli.base_dir);

    if let Err(error) = pipeline::run(&workspace, &config) {
        error!("Error. Stopping: {error}");
        exit(1);
    }
}
