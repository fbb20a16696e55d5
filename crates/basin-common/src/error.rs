//! Error types for shared grid and CRS definitions.

use thiserror::Error;

/// Result type alias using GridError.
pub type GridResult<T> = Result<T, GridError>;

/// Errors raised while building or interpreting grid descriptors.
#[derive(Debug, Error)]
pub enum GridError {
    #[error("Unsupported CRS: {0}")]
    UnsupportedCrs(String),

    #[error("Invalid CRS parameters: {0}")]
    InvalidCrs(String),

    #[error("Singular cell transform: {0}")]
    SingularTransform(String),

    #[error("Invalid grid shape: {cols}x{rows}")]
    InvalidShape { cols: u32, rows: u32 },

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Invalid date window: start {start} must be before end {end}")]
    InvalidWindow { start: String, end: String },
}
