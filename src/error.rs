// src/error.rs

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("source not found: {}", path.display())]
    SourceNotFound { path: PathBuf },

    #[error("unsupported source type: {}", .0.display())]
    UnsupportedSource(PathBuf),

    #[error("source is missing required columns: {}", missing.join(", "))]
    SchemaMismatch { missing: Vec<String> },

    #[error("invalid invoice date {value:?} at row {row}")]
    InvalidDate { row: usize, value: String },

    #[error("invalid {column} value {value:?} at row {row}")]
    InvalidValue {
        row: usize,
        column: String,
        value: String,
    },

    #[error("{column} total overflows at row {row}")]
    Overflow { row: usize, column: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("spreadsheet read error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
