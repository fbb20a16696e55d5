//! Error types for projection setup.

use thiserror::Error;

/// Errors raised while constructing a projection.
#[derive(Error, Debug)]
pub enum ProjectionError {
    /// Parameters produce a degenerate cone.
    #[error("invalid projection parameters: {0}")]
    InvalidParameters(String),
}

/// Result type for projection operations.
pub type Result<T> = std::result::Result<T, ProjectionError>;
