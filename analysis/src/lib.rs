//! Aggregation of raw benchmark trial rows into per-protocol grouped
//! datasets for the plot collaborator.

mod aggregate;
mod schema;

pub use aggregate::{
    aggregate, write_grouped, AggregateError, GroupedDataset, GroupedRow, Normalization,
    NORMALIZED_COLUMNS, PROTOCOL_COLUMN, RESULT_FILE,
};
pub use schema::{Schema, COMPILE_PARAMS_FILE, HEADER_FILE, RUNTIME_PARAMS_FILE};
