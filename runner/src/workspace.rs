use std::{
    fs, io,
    path::{Path, PathBuf},
};

/// On-disk layout shared by every pipeline phase.
///
/// All paths hang off the engine checkout's base directory and are
/// handed to the phases explicitly; no phase mutates the process
/// working directory. External processes get their cwd set per
/// invocation instead.
#[derive(Debug, Clone)]
pub struct Workspace {
    base: PathBuf,
}

impl Workspace {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// engine checkout root, the toolchain's source directory
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// toolchain cwd
    pub fn build_dir(&self) -> PathBuf {
        self.base.join("build")
    }

    /// configure and compile logs
    pub fn log_dir(&self) -> PathBuf {
        self.build_dir().join("log")
    }

    /// compiled artifacts, one per build title
    pub fn bin_dir(&self) -> PathBuf {
        self.build_dir().join("bin")
    }

    pub fn artifact(&self, title: &str) -> PathBuf {
        self.bin_dir().join(title)
    }

    /// per-run measurement files, schema artifacts and combined datasets
    pub fn res_dir(&self) -> PathBuf {
        self.bin_dir().join("res")
    }

    /// captured trial output, one file per trial
    pub fn trial_log_dir(&self) -> PathBuf {
        self.res_dir().join("tmp")
    }

    /// grouped datasets for the plot collaborator
    pub fn plots_dir(&self) -> PathBuf {
        self.res_dir().join("plots")
    }

    pub fn prepare_build(&self) -> io::Result<()> {
        fs::create_dir_all(self.log_dir())
    }

    pub fn prepare_run(&self) -> io::Result<()> {
        fs::create_dir_all(self.trial_log_dir())
    }

    pub fn prepare_plots(&self) -> io::Result<()> {
        fs::create_dir_all(self.plots_dir())
    }
}
