//! Error types for the comparative-analysis library.

use thiserror::Error;

/// Main error type for the library.
#[derive(Error, Debug)]
pub enum CaError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid abundance value '{value}' at row {row}, column {col}")]
    InvalidValue {
        value: String,
        row: usize,
        col: usize,
    },

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Sample ID mismatch: {0}")]
    SampleMismatch(String),

    #[error("No metadata label '{0}' found")]
    MissingColumn(String),

    #[error("Sample '{sample}' has no value for metadata label '{column}'")]
    MissingLabelValue { sample: String, column: String },

    #[error("Class '{0}' appears more than once after applying class names")]
    DuplicateClass(String),

    #[error("Distance metric '{0}' is not supported")]
    UnsupportedMetric(String),

    #[error("Enrichment test '{0}' is not supported")]
    UnsupportedTest(String),

    #[error("Correction method '{0}' is not supported")]
    UnsupportedCorrection(String),

    #[error("Invalid number of loadings: {0} (must be between 0 and 4)")]
    InvalidLoadingCount(usize),

    #[error("Invalid filter operator '{0}'")]
    InvalidOperator(String),

    #[error("Empty data: {0}")]
    EmptyData(String),

    #[error("Numerical error: {0}")]
    Numerical(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Profile has already been normalized")]
    AlreadyNormalized,

    #[error("Pipeline error: {0}")]
    Pipeline(String),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, CaError>;
