use arrow::error::ArrowError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SeverityQlError {
    #[error("failed to read command file {path}: {source}")]
    ReadInput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    WriteOutput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("entry store error: {0}")]
    Store(#[from] ArrowError),

    #[error("failed to serialize run stats: {0}")]
    Stats(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SeverityQlError>;
