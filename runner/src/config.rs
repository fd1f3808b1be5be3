use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    path::{Path, PathBuf},
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigErrors {
    #[error("Failed to read sweep config file")]
    ReadConfig(#[from] std::io::Error),
    #[error("Failed to parse sweep config file")]
    ParseConfig(#[from] serde_yaml::Error),
    #[error("Skew list entry is not a float: {0}")]
    InvalidSkew(String),
}

/// Compile-time parameters selecting one engine artifact.
///
/// Two values compare equal exactly when they select the same artifact,
/// so the set of distinct `BuildConfig`s in a matrix is the set of
/// required builds.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq, Hash)]
#[serde(deny_unknown_fields)]
pub struct BuildConfig {
    pub protocol: String,
    pub payload: u32,
    pub buffer_slots: u32,
    pub txs_in_epoch: u32,
    pub batch_bitmap_update: bool,
}

impl BuildConfig {
    /// Encode this config as the build target name, also used as the
    /// prefix of its result files.
    ///
    /// The encoding is injective: the four numeric fields have exactly
    /// one decimal rendering each and sit at fixed `_`-separated
    /// positions, and the protocol name is the remainder after the
    /// fourth separator. Equal configs always render to the same title
    /// and distinct configs never collide.
    pub fn title(&self) -> String {
        format!(
            "ycsb{}_{}_{}_{}_{}",
            self.payload,
            self.buffer_slots,
            self.txs_in_epoch,
            u8::from(self.batch_bitmap_update),
            self.protocol
        )
    }

    /// Toolchain log name. Keyed on the payload/buffer-slot pair, the
    /// scheme the engine's build system uses for its own logs.
    pub fn log_name(&self, step: &str) -> String {
        format!(
            "{step}_PAYLOAD_SIZE{}_MAX_SLOTS_OF_PER_CORE_BUFFER{}.log",
            self.payload, self.buffer_slots
        )
    }
}

/// Runtime parameters handed to an already built artifact.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    pub workload: String,
    pub records: u64,
    pub threads: u32,
    pub skew: f64,
    pub reps: u32,
}

impl RunConfig {
    /// Positional argument block of a trial invocation, without the
    /// trailing trial index.
    pub fn argv(&self, seconds: u64, protocol: &str) -> Vec<String> {
        vec![
            seconds.to_string(),
            protocol.to_string(),
            self.workload.clone(),
            self.records.to_string(),
            self.threads.to_string(),
            self.skew.to_string(),
            self.reps.to_string(),
        ]
    }
}

/// One unit of work: which artifact to run, with which runtime
/// parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct ExperimentCell {
    pub build: BuildConfig,
    pub run: RunConfig,
}

/// The swept parameter space. Every field is one dimension of the
/// matrix; an empty dimension yields an empty matrix.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SweepSpec {
    #[serde(default = "SweepSpec::default_protocols")]
    pub protocols: Vec<String>,
    #[serde(default = "SweepSpec::default_payloads")]
    pub payloads: Vec<u32>,
    #[serde(default = "SweepSpec::default_buffer_slots")]
    pub buffer_slots: Vec<u32>,
    #[serde(default = "SweepSpec::default_txs_in_epoch")]
    pub txs_in_epoch: Vec<u32>,
    #[serde(default = "SweepSpec::default_batch_bitmap_updates")]
    pub batch_bitmap_updates: Vec<bool>,
    // X: write-only, A: 50:50, B: 5:95
    #[serde(default = "SweepSpec::default_workloads")]
    pub workloads: Vec<String>,
    #[serde(default = "SweepSpec::default_records")]
    pub records: Vec<u64>,
    #[serde(default = "SweepSpec::default_threads")]
    pub threads: Vec<u32>,
    #[serde(default = "SweepSpec::default_skews")]
    pub skews: Vec<f64>,
    #[serde(default = "SweepSpec::default_reps")]
    pub reps: Vec<u32>,
}

impl SweepSpec {
    fn default_protocols() -> Vec<String> {
        vec!["caracal".to_string(), "serval".to_string()]
    }

    fn default_payloads() -> Vec<u32> {
        vec![4]
    }

    fn default_buffer_slots() -> Vec<u32> {
        vec![4]
    }

    fn default_txs_in_epoch() -> Vec<u32> {
        vec![4096]
    }

    fn default_batch_bitmap_updates() -> Vec<bool> {
        vec![false]
    }

    fn default_workloads() -> Vec<String> {
        vec!["X".to_string()]
    }

    fn default_records() -> Vec<u64> {
        vec![10_000_000]
    }

    fn default_threads() -> Vec<u32> {
        vec![64]
    }

    fn default_skews() -> Vec<f64> {
        vec![0.0, 0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 0.99, 0.999]
    }

    fn default_reps() -> Vec<u32> {
        vec![10]
    }
}

impl Default for SweepSpec {
    fn default() -> Self {
        Self {
            protocols: Self::default_protocols(),
            payloads: Self::default_payloads(),
            buffer_slots: Self::default_buffer_slots(),
            txs_in_epoch: Self::default_txs_in_epoch(),
            batch_bitmap_updates: Self::default_batch_bitmap_updates(),
            workloads: Self::default_workloads(),
            records: Self::default_records(),
            threads: Self::default_threads(),
            skews: Self::default_skews(),
            reps: Self::default_reps(),
        }
    }
}

/// Pipeline-wide knobs that are not sweep dimensions.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// duration of a single trial in seconds
    #[serde(default = "Settings::default_seconds")]
    pub seconds: u64,
    /// trials executed per experiment cell
    #[serde(default = "Settings::default_trials_per_cell")]
    pub trials_per_cell: u32,
    /// label of the swept dimension, handed to the plot collaborator
    #[serde(default = "Settings::default_varying")]
    pub varying: String,
    #[serde(default = "Settings::default_build_profile")]
    pub build_profile: String,
    /// fixed reference core count used as the normalization divisor
    #[serde(default = "Settings::default_reference_threads")]
    pub reference_threads: u32,
    #[serde(default = "Settings::default_cmake")]
    pub cmake: PathBuf,
    #[serde(default = "Settings::default_make")]
    pub make: PathBuf,
    /// external command the grouped datasets are handed to
    #[serde(default)]
    pub plot_command: Option<PathBuf>,
}

impl Settings {
    const fn default_seconds() -> u64 {
        1
    }

    const fn default_trials_per_cell() -> u32 {
        10
    }

    fn default_varying() -> String {
        "contention".to_string()
    }

    fn default_build_profile() -> String {
        "Release".to_string()
    }

    const fn default_reference_threads() -> u32 {
        64
    }

    fn default_cmake() -> PathBuf {
        PathBuf::from("cmake")
    }

    fn default_make() -> PathBuf {
        PathBuf::from("make")
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            seconds: Self::default_seconds(),
            trials_per_cell: Self::default_trials_per_cell(),
            varying: Self::default_varying(),
            build_profile: Self::default_build_profile(),
            reference_threads: Self::default_reference_threads(),
            cmake: Self::default_cmake(),
            make: Self::default_make(),
            plot_command: None,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct SweepConfig {
    #[serde(default)]
    pub sweep: SweepSpec,
    #[serde(default)]
    pub settings: Settings,
}

impl SweepConfig {
    pub fn from_yaml(path: &Path) -> Result<Self, ConfigErrors> {
        Ok(serde_yaml::from_reader(File::open(path)?)?)
    }
}

/// Parse the comma separated skew list of the CLI surface.
pub fn parse_skews(raw: &str) -> Result<Vec<f64>, ConfigErrors> {
    raw.split(',')
        .map(|entry| {
            entry
                .trim()
                .parse()
                .map_err(|_| ConfigErrors::InvalidSkew(entry.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn build(protocol: &str, payload: u32, slots: u32, epoch: u32, bitmap: bool) -> BuildConfig {
        BuildConfig {
            protocol: protocol.to_string(),
            payload,
            buffer_slots: slots,
            txs_in_epoch: epoch,
            batch_bitmap_update: bitmap,
        }
    }

    #[test]
    fn title_is_stable() {
        let config = build("caracal", 4, 4, 4096, false);

        assert_eq!(config.title(), "ycsb4_4_4096_0_caracal");
        assert_eq!(config.title(), config.clone().title());
    }

    #[test]
    fn titles_never_collide() {
        let mut titles = BTreeSet::new();
        let mut count = 0;

        for protocol in ["caracal", "serval"] {
            for payload in [4, 44] {
                for slots in [1, 4] {
                    for epoch in [512, 4096] {
                        for bitmap in [false, true] {
                            titles.insert(build(protocol, payload, slots, epoch, bitmap).title());
                            count += 1;
                        }
                    }
                }
            }
        }

        assert_eq!(titles.len(), count);
    }

    #[test]
    fn argv_matches_invocation_contract() {
        let run = RunConfig {
            workload: "X".to_string(),
            records: 10_000_000,
            threads: 64,
            skew: 0.99,
            reps: 10,
        };

        assert_eq!(
            run.argv(1, "serval"),
            ["1", "serval", "X", "10000000", "64", "0.99", "10"]
        );
    }

    #[test]
    fn skew_list_parses() {
        assert_eq!(parse_skews("0.0,0.5,0.99").unwrap(), vec![0.0, 0.5, 0.99]);
        assert!(matches!(
            parse_skews("0.0,high"),
            Err(ConfigErrors::InvalidSkew(entry)) if entry == "high"
        ));
    }

    #[test]
    fn yaml_config_fills_defaults() {
        let config: SweepConfig =
            serde_yaml::from_str("sweep:\n  skews: [0.0, 0.9]\nsettings:\n  trials_per_cell: 3\n")
                .unwrap();

        assert_eq!(config.sweep.skews, vec![0.0, 0.9]);
        assert_eq!(config.sweep.protocols, vec!["caracal", "serval"]);
        assert_eq!(config.settings.trials_per_cell, 3);
        assert_eq!(config.settings.reference_threads, 64);
    }
}
