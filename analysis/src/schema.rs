use crate::aggregate::AggregateError;
use std::{fs::File, path::Path};

pub const HEADER_FILE: &str = "header";
pub const COMPILE_PARAMS_FILE: &str = "compile_params";
pub const RUNTIME_PARAMS_FILE: &str = "runtime_params";

/// Declared column layout of the combined dataset.
///
/// Three artifacts sit next to the results: the full header, the
/// subset of columns identifying a build config and the subset
/// identifying a run config. Each is a single csv header line.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    pub columns: Vec<String>,
    pub compile_params: Vec<String>,
    pub runtime_params: Vec<String>,
}

impl Schema {
    pub fn load(res_dir: &Path) -> Result<Self, AggregateError> {
        let columns = read_columns(&res_dir.join(HEADER_FILE))?;
        let compile_params = read_columns(&res_dir.join(COMPILE_PARAMS_FILE))?;
        let runtime_params = read_columns(&res_dir.join(RUNTIME_PARAMS_FILE))?;

        let schema = Self {
            columns,
            compile_params,
            runtime_params,
        };

        for column in schema.key_columns() {
            if !schema.columns.contains(column) {
                return Err(AggregateError::UnknownIdentifyingColumn {
                    column: column.clone(),
                });
            }
        }

        Ok(schema)
    }

    /// identifying columns in grouping order, build side before run side
    pub fn key_columns(&self) -> impl Iterator<Item = &String> {
        self.compile_params.iter().chain(self.runtime_params.iter())
    }

    pub fn is_identifying(&self, column: &str) -> bool {
        self.compile_params.iter().any(|name| name == column)
            || self.runtime_params.iter().any(|name| name == column)
    }

    pub fn index_of(&self, column: &str) -> Result<usize, AggregateError> {
        self.columns
            .iter()
            .position(|name| name == column)
            .ok_or_else(|| AggregateError::MissingColumn {
                column: column.to_string(),
            })
    }
}

fn read_columns(path: &Path) -> Result<Vec<String>, AggregateError> {
    let file = File::open(path).map_err(|source| AggregateError::MissingArtifact {
        path: path.to_path_buf(),
        source,
    })?;

    let mut reader = csv::Reader::from_reader(file);
    let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

    if columns.is_empty() || columns.iter().all(|column| column.is_empty()) {
        return Err(AggregateError::EmptySchema {
            path: path.to_path_buf(),
        });
    }

    Ok(columns)
}
