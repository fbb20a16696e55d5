//! Error types for footprint extraction.

use thiserror::Error;

/// Errors that can occur while extracting native-grid footprints.
#[derive(Error, Debug)]
pub enum FootprintError {
    /// The raster source has no frames inside the requested window.
    #[error("raster source '{product}' has no frames in {window}")]
    EmptySource { product: String, window: String },

    /// The configured band selector is not offered by the source.
    #[error("raster source '{product}' has no band '{band}' (available: {available:?})")]
    UnknownBand {
        product: String,
        band: String,
        available: Vec<String>,
    },

    /// Invalid pipeline or product configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Grid descriptor error.
    #[error(transparent)]
    Grid(#[from] basin_common::GridError),

    /// Projection setup error.
    #[error(transparent)]
    Projection(#[from] projection::ProjectionError),

    /// A coordinate could not be carried between frames.
    #[error("reprojection failed: {0}")]
    Reprojection(String),

    /// Vectorization exceeded its cell budget and best-effort mode is off.
    #[error("vectorization needs {requested} cells but the budget is {max_cells}")]
    BudgetExceeded { requested: u64, max_cells: u64 },

    /// Two distinct cells produced the same identity, or a footprint does
    /// not map back onto its own cell.
    #[error("identity invariant violated: {0}")]
    IdentityCollision(String),

    /// Failed to read or decode a raster frame.
    #[error("raster read failed: {0}")]
    Raster(String),

    /// Malformed basin boundary input.
    #[error("invalid basin geometry: {0}")]
    Basin(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FootprintError {
    /// Create an InvalidConfig error.
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a Raster error.
    pub fn raster(msg: impl Into<String>) -> Self {
        Self::Raster(msg.into())
    }

    /// Create a Basin error.
    pub fn basin(msg: impl Into<String>) -> Self {
        Self::Basin(msg.into())
    }

    /// Create an IdentityCollision error.
    pub fn identity(msg: impl Into<String>) -> Self {
        Self::IdentityCollision(msg.into())
    }

    /// Whether this error is raised by configuration checks before any
    /// geometry work starts.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::EmptySource { .. } | Self::UnknownBand { .. } | Self::InvalidConfig(_)
        )
    }
}

/// Result type for footprint operations.
pub type Result<T> = std::result::Result<T, FootprintError>;
