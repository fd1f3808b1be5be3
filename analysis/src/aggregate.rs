use crate::schema::Schema;
use std::{
    collections::BTreeMap,
    fs::File,
    io,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::{debug, info};

/// combined raw dataset, headerless rows appended by the engine
pub const RESULT_FILE: &str = "result.csv";
/// identifying column the datasets are partitioned by
pub const PROTOCOL_COLUMN: &str = "protocol";

/// Measurement columns rescaled to per-thread, per-trial averages
/// after grouping. Every other measurement column stays a raw sum.
pub const NORMALIZED_COLUMNS: [&str; 8] = [
    "TotalTime",
    "InitializationTime",
    "FinalizeInitializationTime",
    "ExecutionTime",
    "WaitInInitialization",
    "WaitInExecution",
    "PerfLeader",
    "PerfMember",
];

#[derive(Error, Debug)]
pub enum AggregateError {
    #[error("Required artifact {} is missing or unreadable", path.display())]
    MissingArtifact {
        path: PathBuf,
        source: io::Error,
    },
    #[error("Schema artifact {} declares no columns", path.display())]
    EmptySchema { path: PathBuf },
    #[error("Identifying column {column} is not declared in the header")]
    UnknownIdentifyingColumn { column: String },
    #[error("Header declares no {column} column")]
    MissingColumn { column: String },
    #[error("Row {line} has {found} columns, the header declares {expected}")]
    ColumnCount {
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("Row {line} column {column} is not numeric: {value}")]
    BadMeasurement {
        line: usize,
        column: String,
        value: String,
    },
    #[error("Failed to read the combined dataset")]
    Csv(#[from] csv::Error),
    #[error("Failed to write a grouped dataset")]
    Io(#[from] io::Error),
}

/// Divisors applied to the designated measurement columns after
/// grouping.
///
/// The thread divisor is a fixed reference core count, not the row's
/// own thread field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalization {
    pub reference_threads: u32,
    pub trials_per_cell: u32,
}

impl Normalization {
    fn divisor(&self) -> f64 {
        f64::from(self.reference_threads) * f64::from(self.trials_per_cell)
    }
}

/// One grouped row: identifying values, then summed (and partially
/// normalized) measurements.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupedRow {
    pub key: Vec<String>,
    pub measurements: Vec<f64>,
}

/// Grouped dataset of one protocol, ready for the plot collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupedDataset {
    pub protocol: String,
    /// identifying columns first, measurement columns after
    pub columns: Vec<String>,
    pub rows: Vec<GroupedRow>,
}

/// Read the combined dataset against the declared schema, partition by
/// protocol, group by the identifying columns and sum every
/// measurement column, then normalize the designated columns.
///
/// Identifying values are carried through untouched; rows of different
/// keys are never mixed into one group.
pub fn aggregate(
    res_dir: &Path,
    normalization: Normalization,
) -> Result<BTreeMap<String, GroupedDataset>, AggregateError> {
    let schema = Schema::load(res_dir)?;

    let key_indices: Vec<usize> = schema
        .key_columns()
        .map(|column| schema.index_of(column))
        .collect::<Result<_, _>>()?;
    let measurement_indices: Vec<usize> = schema
        .columns
        .iter()
        .enumerate()
        .filter(|(_, column)| !schema.is_identifying(column))
        .map(|(index, _)| index)
        .collect();
    let protocol_index = schema.index_of(PROTOCOL_COLUMN)?;

    let path = res_dir.join(RESULT_FILE);
    let file = File::open(&path).map_err(|source| AggregateError::MissingArtifact {
        path: path.clone(),
        source,
    })?;
    // field counts are validated against the declared header below, not
    // against the first record
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(file);

    // protocol -> identifying key -> summed measurements
    let mut partitions: BTreeMap<String, BTreeMap<Vec<String>, Vec<f64>>> = BTreeMap::new();
    let mut rows = 0usize;

    for (index, record) in reader.records().enumerate() {
        let record = record?;
        let line = index + 1;

        if record.len() != schema.columns.len() {
            return Err(AggregateError::ColumnCount {
                line,
                expected: schema.columns.len(),
                found: record.len(),
            });
        }

        let key: Vec<String> = key_indices.iter().map(|&i| record[i].to_string()).collect();
        let sums = partitions
            .entry(record[protocol_index].to_string())
            .or_default()
            .entry(key)
            .or_insert_with(|| vec![0.0; measurement_indices.len()]);

        for (slot, &column) in measurement_indices.iter().enumerate() {
            let raw = record[column].trim();
            let value: f64 = raw.parse().map_err(|_| AggregateError::BadMeasurement {
                line,
                column: schema.columns[column].clone(),
                value: raw.to_string(),
            })?;
            sums[slot] += value;
        }

        rows += 1;
    }

    info!(rows, protocols = partitions.len(), "Loaded combined dataset");

    let columns: Vec<String> = schema
        .key_columns()
        .cloned()
        .chain(
            measurement_indices
                .iter()
                .map(|&index| schema.columns[index].clone()),
        )
        .collect();
    let normalized_slots: Vec<usize> = measurement_indices
        .iter()
        .enumerate()
        .filter(|(_, &column)| NORMALIZED_COLUMNS.contains(&schema.columns[column].as_str()))
        .map(|(slot, _)| slot)
        .collect();
    let divisor = normalization.divisor();

    Ok(partitions
        .into_iter()
        .map(|(protocol, groups)| {
            let rows = groups
                .into_iter()
                .map(|(key, mut measurements)| {
                    for &slot in &normalized_slots {
                        measurements[slot] /= divisor;
                    }
                    GroupedRow { key, measurements }
                })
                .collect();

            let dataset = GroupedDataset {
                protocol: protocol.clone(),
                columns: columns.clone(),
                rows,
            };

            (protocol, dataset)
        })
        .collect())
}

/// Write one csv per protocol into the plot input directory, header
/// row included.
pub fn write_grouped(
    plots_dir: &Path,
    grouped: &BTreeMap<String, GroupedDataset>,
) -> Result<Vec<PathBuf>, AggregateError> {
    let mut written = Vec::with_capacity(grouped.len());

    for (protocol, dataset) in grouped {
        let path = plots_dir.join(format!("{protocol}.csv"));
        let mut writer = csv::Writer::from_path(&path)?;

        writer.write_record(&dataset.columns)?;
        for row in &dataset.rows {
            let record: Vec<String> = row
                .key
                .iter()
                .cloned()
                .chain(row.measurements.iter().map(|value| value.to_string()))
                .collect();
            writer.write_record(&record)?;
        }
        writer.flush()?;

        debug!(path = ?path, rows = dataset.rows.len(), "Wrote grouped dataset");
        written.push(path);
    }

    Ok(written)
}
