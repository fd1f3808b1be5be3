use crate::{
    config::{ExperimentCell, Settings},
    pipeline::PipelineError,
    workspace::Workspace,
};
use ccsweep_analysis::{AggregateError, HEADER_FILE, RESULT_FILE};
use chrono::Local;
use globset::Glob;
use std::{
    fs::{self, File},
    path::Path,
    process::{Command, Stdio},
};
use tracing::{debug, info};

/// combined raw dataset with the declared header prepended
pub const CONCAT_FILE: &str = "concat.csv";

/// Run every cell for the configured trial count, strictly in matrix
/// order, then concatenate the per-run measurement files into the
/// combined dataset.
///
/// A nonzero artifact exit aborts the whole pipeline at once. There is
/// no retry and no skip-and-continue; the combined dataset is only
/// written after every trial of every cell has succeeded.
pub fn run_all(
    workspace: &Workspace,
    settings: &Settings,
    cells: &[ExperimentCell],
) -> Result<(), PipelineError> {
    workspace.prepare_run()?;

    for cell in cells {
        let title = cell.build.title();
        let argv = cell.run.argv(settings.seconds, &cell.build.protocol);
        info!("[{title}: {}]", argv.join(" "));

        for trial in 0..settings.trials_per_cell {
            run_trial(workspace, &title, &argv, trial)?;
        }
    }

    concat_results(workspace)
}

/// One timed execution of a compiled artifact.
///
/// Console output goes to a timestamp-named log so trials from cells
/// run in the same window never collide; the measurement row itself is
/// appended by the artifact to the shared result files.
fn run_trial(
    workspace: &Workspace,
    title: &str,
    argv: &[String],
    trial: u32,
) -> Result<(), PipelineError> {
    info!("Trial:{trial}");

    let stamp = Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string();
    let log_path = workspace.trial_log_dir().join(stamp);
    let log = File::create(&log_path)?;

    // the artifact path is resolved in the child after it enters the
    // bin directory, so it is addressed relative to there
    let status = Command::new(Path::new(".").join(title))
        .current_dir(workspace.bin_dir())
        .args(argv)
        .arg(trial.to_string())
        .stdout(Stdio::from(log.try_clone()?))
        .stderr(Stdio::from(log))
        .status()?;

    if !status.success() {
        return Err(PipelineError::Trial {
            title: title.to_string(),
            trial,
            status,
        });
    }

    Ok(())
}

/// Concatenate every per-run measurement file into the combined raw
/// dataset, then prepend the declared header into a second combined
/// file for consumers that want a self-describing csv.
fn concat_results(workspace: &Workspace) -> Result<(), PipelineError> {
    let res = workspace.res_dir();
    let matcher = Glob::new("*.csv")?.compile_matcher();

    let mut inputs: Vec<_> = fs::read_dir(&res)?
        .filter_map(Result::ok)
        .filter(|entry| {
            let name = entry.file_name();
            // the combined outputs of a previous run are not inputs
            matcher.is_match(&name) && name != RESULT_FILE && name != CONCAT_FILE
        })
        .map(|entry| entry.path())
        .collect();
    inputs.sort();

    debug!(files = inputs.len(), "Concatenating measurement files");

    let mut rows = Vec::new();
    for path in &inputs {
        rows.extend_from_slice(&fs::read(path)?);
    }
    fs::write(res.join(RESULT_FILE), &rows)?;

    let header_path = res.join(HEADER_FILE);
    let mut combined = fs::read(&header_path).map_err(|source| AggregateError::MissingArtifact {
        path: header_path,
        source,
    })?;
    combined.extend_from_slice(&rows);
    fs::write(res.join(CONCAT_FILE), combined)?;

    Ok(())
}
