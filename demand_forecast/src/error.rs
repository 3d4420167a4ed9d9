//! Error types for the demand_forecast crate

use polars::prelude::PolarsError;
use thiserror::Error;

/// Custom error types for the demand_forecast crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// History too short, or too sparse, to build a fully-defined feature row
    /// at forecast start
    ///
    /// `undefined` lists the feature columns left undefined by unknown sales
    /// when the history is long enough; it is empty when the history is short.
    #[error(
        "Insufficient history: need at least {required} observations, have {available}{}",
        undefined_suffix(.undefined)
    )]
    InsufficientHistory {
        required: usize,
        available: usize,
        undefined: Vec<String>,
    },

    /// Computed features do not match what the model manifest asks for
    #[error("Feature mismatch: {0}")]
    FeatureMismatch(String),

    /// Malformed identifiers, dates or horizons, rejected before computing anything
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A predictor was handed an absent feature value it cannot use
    #[error("Undefined feature: {0}")]
    UndefinedFeature(String),

    /// Error related to data validation or processing
    #[error("Data error: {0}")]
    DataError(String),

    /// Error from an invalid configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Error from feature math
    #[error("Math error: {0}")]
    MathError(#[from] demand_math::MathError),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from reading or writing CSV
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// Error from reading or writing JSON
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Error from Polars operations
    #[error("Polars error: {0}")]
    PolarsError(String),
}

fn undefined_suffix(undefined: &[String]) -> String {
    if undefined.is_empty() {
        String::new()
    } else {
        format!(
            ", but unknown sales leave [{}] undefined at forecast start",
            undefined.join(", ")
        )
    }
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl From<PolarsError> for ForecastError {
    fn from(err: PolarsError) -> Self {
        ForecastError::PolarsError(err.to_string())
    }
}
