//! Error types for each pipeline stage.
//!
//! Every stage returns its own error enum so callers can tell which stage
//! failed and which file or column caused it. [`PipelineError`] wraps them for
//! the configured runner and adds the name of the failing step.

use std::path::PathBuf;

use thiserror::Error;

/// Violations of the [`Dataset`](crate::dataset::Dataset) shape invariants.
#[derive(Debug, Error, PartialEq)]
pub enum DatasetError {
    #[error("Column '{0}' appears more than once")]
    DuplicateColumn(String),

    #[error("Row {row} has {found} cell(s) but the dataset has {expected} column(s)")]
    RowWidth {
        row: usize,
        expected: usize,
        found: usize,
    },
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Opening input file {path:?}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Input file {path:?} is empty; a header row is required")]
    MissingHeader { path: PathBuf },

    #[error("Reading line {line} of {path:?}")]
    Read {
        path: PathBuf,
        line: u64,
        #[source]
        source: csv::Error,
    },

    #[error("Line {line} of {path:?} has {found} field(s) but the header has {expected}")]
    RowShape {
        path: PathBuf,
        line: u64,
        expected: usize,
        found: usize,
    },

    #[error("Line {line} of {path:?} is not valid {encoding}")]
    Decode {
        path: PathBuf,
        line: u64,
        encoding: &'static str,
    },

    #[error("Header of {path:?} is invalid")]
    Header {
        path: PathBuf,
        #[source]
        source: DatasetError,
    },
}

#[derive(Debug, Error)]
pub enum ReshapeError {
    #[error("Column '{0}' not found for melt")]
    UnknownColumn(String),

    #[error("Column '{0}' cannot be both an identifier and a value column")]
    OverlappingColumn(String),

    #[error("Category label '{label}' is not numeric after stripping {strip} character(s)")]
    CategoryNotNumeric { label: String, strip: usize },

    #[error("Pivot found more than one value for category '{category}' in the same group")]
    DuplicateCell { category: String },

    #[error(transparent)]
    Dataset(#[from] DatasetError),
}

#[derive(Debug, Error)]
pub enum DeriveError {
    #[error("Column '{column}' not found in {side} dataset")]
    UnknownColumn { column: String, side: &'static str },

    #[error("Column '{0}' is not numeric")]
    NotNumeric(String),

    #[error("Join key lists must be non-empty and of equal length (left {left}, right {right})")]
    KeyArity { left: usize, right: usize },

    #[error(transparent)]
    Dataset(#[from] DatasetError),
}

#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("Column '{0}' not found for aggregation")]
    UnknownColumn(String),

    #[error(transparent)]
    Dataset(#[from] DatasetError),
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Column '{0}' not found for export")]
    UnknownColumn(String),

    #[error("Column '{column}' holds non-numeric value '{value}' at row {row}")]
    NotNumeric {
        column: String,
        row: usize,
        value: String,
    },

    #[error("Writing {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Writing CSV to {path:?}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Serializing series for {path:?}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Reading pipeline file {path:?}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parsing pipeline file {path:?}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Dataset name '{0}' is defined more than once")]
    DuplicateName(String),

    #[error("Step '{step}' refers to unknown dataset '{input}'")]
    UnknownInput { step: String, input: String },

    #[error("Output refers to unknown dataset '{0}'")]
    UnknownOutput(String),

    #[error("Source '{source_name}' has an invalid delimiter: {message}")]
    Delimiter {
        source_name: String,
        message: String,
    },

    #[error("Unknown encoding '{0}'")]
    Encoding(String),

    #[error("Output for dataset '{dataset}' is invalid: {message}")]
    InvalidOutput { dataset: String, message: String },
}

/// Failure of a configured pipeline run, tagged with the step that failed.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Ingesting source '{step}'")]
    Ingest {
        step: String,
        #[source]
        source: IngestError,
    },

    #[error("Reshaping in step '{step}'")]
    Reshape {
        step: String,
        #[source]
        source: ReshapeError,
    },

    #[error("Deriving in step '{step}'")]
    Derive {
        step: String,
        #[source]
        source: DeriveError,
    },

    #[error("Aggregating in step '{step}'")]
    Aggregate {
        step: String,
        #[source]
        source: AggregateError,
    },

    #[error("Exporting dataset '{dataset}'")]
    Export {
        dataset: String,
        #[source]
        source: ExportError,
    },
}
