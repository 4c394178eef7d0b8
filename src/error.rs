//! Error types for the strain-sampling library.

use thiserror::Error;

/// Main error type for the library.
#[derive(Error, Debug)]
pub enum SamplingError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid count value '{value}' at line {line}")]
    InvalidCount { value: String, line: usize },

    #[error("Duplicate observation for subject '{subject}' visit '{visit}'")]
    DuplicateObservation { subject: String, visit: String },

    #[error("Empty data: {0}")]
    EmptyData(String),

    #[error("Numerical error: {0}")]
    Numerical(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Plot rendering error: {0}")]
    Plot(String),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, SamplingError>;
