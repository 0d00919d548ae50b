//! Error types for the Superstore training pipeline

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, SuperstoreError>;

/// Main error type for the pipeline
#[derive(Error, Debug)]
pub enum SuperstoreError {
    /// A requested target or hard-required column is absent from the dataset
    #[error("Missing column: '{0}'")]
    MissingColumn(String),

    /// Classification requested on a target that is not binary 0/1
    #[error("Invalid target '{column}': {reason}")]
    InvalidTarget { column: String, reason: String },

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl From<polars::error::PolarsError> for SuperstoreError {
    fn from(err: polars::error::PolarsError) -> Self {
        SuperstoreError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for SuperstoreError {
    fn from(err: serde_json::Error) -> Self {
        SuperstoreError::SerializationError(err.to_string())
    }
}

impl From<bincode::Error> for SuperstoreError {
    fn from(err: bincode::Error) -> Self {
        SuperstoreError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for SuperstoreError {
    fn from(err: ndarray::ShapeError) -> Self {
        SuperstoreError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}

/// Non-fatal data-quality conditions.
///
/// These never abort a run. They are logged where detected and collected on
/// the [`Dataset`](crate::data::Dataset) or the training outcome so callers
/// can inspect what was recovered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DataWarning {
    /// A temporal value matched neither the strict nor any lenient format and
    /// was recorded as missing.
    UnparseableDate {
        column: String,
        row: usize,
        value: String,
    },
    /// The evaluation partition of a classification run holds a single class,
    /// so the F-score is computed against a degenerate label set.
    DegenerateSplit { label: f64 },
}

impl std::fmt::Display for DataWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataWarning::UnparseableDate { column, row, value } => {
                write!(f, "unparseable date '{}' in column '{}' at row {}", value, column, row)
            }
            DataWarning::DegenerateSplit { label } => {
                write!(f, "evaluation partition contains only class {}", label)
            }
        }
    }
}
