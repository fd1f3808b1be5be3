use crate::{build, config::SweepConfig, harness, matrix, workspace::Workspace};
use ccsweep_analysis::{self as analysis, AggregateError, Normalization};
use std::{
    io,
    process::{Command, ExitStatus},
};
use thiserror::Error;
use tracing::{error, info};

/// Fatal pipeline outcomes. Every variant aborts the run where it is
/// detected; partial artifacts stay on disk for inspection.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Toolchain configure step failed for {title} ({status})")]
    Configure { title: String, status: ExitStatus },
    #[error("Toolchain compile step failed for {title} ({status})")]
    Compile { title: String, status: ExitStatus },
    #[error("Trial {trial} of {title} failed ({status})")]
    Trial {
        title: String,
        trial: u32,
        status: ExitStatus,
    },
    #[error("Aggregation failed")]
    Aggregate(#[from] AggregateError),
    #[error("Result file selection glob was invalid")]
    InvalidGlob(#[from] globset::Error),
    #[error("Pipeline i/o failed")]
    Io(#[from] io::Error),
}

/// Drive one full run: matrix generation, build, execution,
/// aggregation, plot handoff. Phases run strictly one after another
/// and the first failure ends the run; there is no partial-success
/// outcome.
pub fn run(workspace: &Workspace, config: &SweepConfig) -> Result<(), PipelineError> {
    let cells = matrix::cells(&config.sweep);
    let builds = matrix::distinct_builds(&cells);
    info!(
        cells = cells.len(),
        builds = builds.len(),
        "Generated experiment matrix"
    );

    info!("Building");
    build::build_all(workspace, &config.settings, &builds)?;

    info!("Running");
    harness::run_all(workspace, &config.settings, &cells)?;

    info!("Aggregating");
    let grouped = analysis::aggregate(
        &workspace.res_dir(),
        Normalization {
            reference_threads: config.settings.reference_threads,
            trials_per_cell: config.settings.trials_per_cell,
        },
    )?;
    workspace.prepare_plots()?;
    let datasets = analysis::write_grouped(&workspace.plots_dir(), &grouped)?;

    hand_off(workspace, config, datasets.len())?;

    info!("Done");
    Ok(())
}

/// Hand the grouped datasets to the external plot collaborator.
///
/// Plotting is outside the pipeline's failure semantics: the datasets
/// are already on disk, so a failing plot command is reported but does
/// not unwind the run.
fn hand_off(
    workspace: &Workspace,
    config: &SweepConfig,
    datasets: usize,
) -> Result<(), PipelineError> {
    let plots = workspace.plots_dir();

    match &config.settings.plot_command {
        Some(command) => {
            info!(?command, datasets, "Handing grouped datasets to plot driver");
            let status = Command::new(command)
                .arg(&config.settings.varying)
                .arg(&plots)
                .status()?;

            if !status.success() {
                error!(%status, "Plot driver failed, grouped datasets remain in {}", plots.display());
            }
        }
        None => info!(
            datasets,
            "No plot command configured, grouped datasets written to {}",
            plots.display()
        ),
    }

    Ok(())
}
