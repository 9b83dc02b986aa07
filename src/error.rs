//! Error type shared by every fallible operation in the crate.

use crate::network::NetworkShape;
use crate::training_set::TrainingSetDimensions;
use thiserror::Error;

/// Errors raised while building, feeding, training or persisting networks.
#[derive(Debug, Error)]
pub enum BackpropError {
    /// A buffer could not be allocated (or the tracker's byte limit was hit).
    #[error("allocation of {bytes} bytes failed")]
    Allocation { bytes: usize },

    /// Byte input handed to a network or trainer has the wrong length.
    #[error("input size mismatch: expected {expected} bytes, got {actual}")]
    InputSize { expected: usize, actual: usize },

    /// Two networks (or a network and a file) do not share the same shape.
    #[error("network shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch {
        expected: NetworkShape,
        actual: NetworkShape,
    },

    /// Training set dimensions do not fit the destination.
    #[error("training set dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        expected: TrainingSetDimensions,
        actual: TrainingSetDimensions,
    },

    /// A network shape violates the layer chaining invariants.
    #[error("invalid network shape: {0}")]
    InvalidShape(String),

    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// Text input did not match the expected token.
    #[error("parse error at offset {offset}: expected {expected}")]
    Parse { expected: String, offset: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, BackpropError>;
