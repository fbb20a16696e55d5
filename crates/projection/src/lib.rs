//! Coordinate reference system transformations.
//!
//! Implements map projections from scratch without external dependencies.

pub mod albers;
mod conic;
pub mod error;
pub mod lambert;
pub mod transform;

pub use albers::AlbersEqualArea;
pub use error::{ProjectionError, Result};
pub use lambert::LambertConformal;
pub use transform::{Projector, Transformer};
