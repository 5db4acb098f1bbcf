use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading prices, fitting models or rendering reports.
#[derive(Error, Debug)]
pub enum ForecastError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed delimited input: {0}")]
    Csv(#[from] csv::Error),

    #[error("required price columns missing: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("no usable price rows remain after cleaning")]
    EmptyDataset,

    #[error("need at least {needed} samples, got {available}")]
    InsufficientSamples { needed: usize, available: usize },

    #[error("invalid train/test split: {0}")]
    InvalidSplit(String),

    #[error("cannot build {folds} folds from {samples} samples")]
    InvalidFolds { folds: usize, samples: usize },

    #[error("invalid neighbor grid: {0}")]
    InvalidGrid(String),

    #[error("invalid distance metric: {0}")]
    InvalidMetric(String),

    #[error("no neighbor count in the grid fits the folds (largest allowed k = {largest_k_allowed})")]
    NoFeasibleCandidate { largest_k_allowed: usize },

    #[error("length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("model used before fit")]
    NotFitted,

    #[error("report serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("chart rendering failed: {0}")]
    Chart(String),
}

pub type Result<T> = std::result::Result<T, ForecastError>;
