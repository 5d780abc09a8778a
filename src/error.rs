use thiserror::Error;

/// Errors returned by the KNN index.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum KnnError {
    /// Empty id, empty vector, `k == 0`, or similar caller mistakes.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// Rejected at construction time only.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl KnnError {
    pub(crate) fn invalid_input(msg: impl Into<String>) -> Self {
        KnnError::InvalidInput(msg.into())
    }
}

/// A specialized Result type for KNN index operations.
pub type Result<T> = std::result::Result<T, KnnError>;
