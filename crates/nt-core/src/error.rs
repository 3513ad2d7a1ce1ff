//! Error types for the nostalgia/turnout analysis

use thiserror::Error;

/// Analysis error type
#[derive(Error, Debug)]
pub enum Error {
    /// A required or requested column is absent from the input table
    #[error("Missing column: {0}")]
    MissingColumn(String),

    /// A NaN was found where a finite value is required (feature matrix or target)
    #[error("Missing value: {0}")]
    MissingValue(String),

    /// Input is degenerate for the requested statistic (zero variance,
    /// too few distinct values, too few observations)
    #[error("Degenerate input: {0}")]
    DegenerateInput(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Computation error
    #[error("Computation error: {0}")]
    Computation(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
