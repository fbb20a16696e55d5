//! Common types shared across the basin pixel extraction crates.

pub mod bbox;
pub mod crs;
pub mod error;
pub mod grid;
pub mod time;

pub use bbox::BoundingBox;
pub use crs::{ConicParams, Crs, CrsCode, CrsSpec, Ellipsoid};
pub use error::{GridError, GridResult};
pub use grid::{CellWindow, GeoTransform, NativeGrid, PixelKey};
pub use time::{parse_date, DateWindow};
