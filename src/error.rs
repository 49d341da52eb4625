//! Error types for the anofox-preprocess library.

use thiserror::Error;

/// Result type alias for preprocessing operations.
pub type Result<T> = std::result::Result<T, PreprocessError>;

/// Errors that can occur while detrending or searching for anomalies.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PreprocessError {
    /// Input data is empty.
    #[error("empty input data")]
    EmptyData,

    /// Insufficient data points for the operation.
    #[error("insufficient data: need at least {needed}, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Dimension mismatch between data structures.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// The index cannot be interpreted as ordered timestamps.
    #[error("invalid timestamp index: {0}")]
    InvalidTimestamp(String),

    /// Transform or estimator used before it was fitted.
    #[error("transform must be fitted before use")]
    NotFitted,

    /// Missing values detected when not allowed.
    #[error("missing values detected in data")]
    MissingValues,

    /// Column name not present in a frame.
    #[error("column not found: {0}")]
    ColumnNotFound(String),

    /// Segment identifier not present in a dataset.
    #[error("segment not found: {0}")]
    SegmentNotFound(String),

    /// Index out of bounds.
    #[error("index out of bounds: {index} (size: {size})")]
    IndexOutOfBounds { index: usize, size: usize },

    /// Frequency inference failed.
    #[error("could not infer frequency: {0}")]
    FrequencyInference(String),

    /// Computation error (e.g., numerical issues).
    #[error("computation error: {0}")]
    ComputationError(String),
}
