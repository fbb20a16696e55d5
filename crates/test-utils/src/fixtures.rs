//! Common test fixtures for basin-pixels tests.
//!
//! This module provides pre-defined grids and basin boundaries that mirror
//! the shapes of the real inputs at a size tests can reason about.

/// Native grid descriptors for testing.
pub mod grid {
    use basin_common::{CrsCode, GeoTransform, NativeGrid};

    /// 3x3 grid of unit cells in the equal-area frame, upper-left corner at
    /// (0, 3). Cell (c, r) covers `[c, c+1] x [2-r, 3-r]`.
    pub fn unit_grid_3x3() -> NativeGrid {
        NativeGrid::new(
            CrsCode::Epsg5070.definition(),
            GeoTransform::north_up(0.0, 3.0, 1.0, 1.0),
            3,
            3,
        )
        .expect("valid unit grid")
    }

    /// Square grid of `size` x `size` one-kilometre cells in the equal-area
    /// frame with its upper-left corner at `(origin_x, origin_y)`.
    pub fn km_grid(origin_x: f64, origin_y: f64, size: u32) -> NativeGrid {
        NativeGrid::new(
            CrsCode::Epsg5070.definition(),
            GeoTransform::north_up(origin_x, origin_y, 1000.0, 1000.0),
            size,
            size,
        )
        .expect("valid km grid")
    }

    /// gridMET-like 1/24 degree geographic grid over north-west Arkansas,
    /// 24 x 24 cells from (-94.5, 36.5).
    pub fn gridmet_like() -> NativeGrid {
        NativeGrid::new(
            CrsCode::Epsg4326.definition(),
            GeoTransform::north_up(-94.5, 36.5, 1.0 / 24.0, 1.0 / 24.0),
            24,
            24,
        )
        .expect("valid gridMET-like grid")
    }

    /// Daymet-like 1 km Lambert grid of 60 x 60 cells around the same area.
    pub fn daymet_like() -> NativeGrid {
        NativeGrid::new(
            CrsCode::DaymetLcc.definition(),
            GeoTransform::north_up(460_000.0, -600_000.0, 1000.0, 1000.0),
            60,
            60,
        )
        .expect("valid Daymet-like grid")
    }
}

/// Basin boundaries for testing.
pub mod basin {
    use geo::{polygon, MultiPolygon};

    /// Axis-aligned rectangle as a one-part multipolygon.
    pub fn rect(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> MultiPolygon<f64> {
        MultiPolygon(vec![polygon![
            (x: min_x, y: min_y),
            (x: max_x, y: min_y),
            (x: max_x, y: max_y),
            (x: min_x, y: max_y),
            (x: min_x, y: min_y),
        ]])
    }

    /// A basin reaching past the upper-left corner of [`super::grid::unit_grid_3x3`]
    /// that covers exactly the top-left 1.5 x 1.5 of the grid.
    pub fn unit_top_left() -> MultiPolygon<f64> {
        rect(-1.0, 1.5, 1.5, 4.0)
    }

    /// A basin far away from every fixture grid.
    pub fn unit_far_away() -> MultiPolygon<f64> {
        rect(100.0, 100.0, 101.0, 101.0)
    }

    /// Irregular lon/lat watershed inside [`super::grid::gridmet_like`].
    pub fn lon_lat_west() -> MultiPolygon<f64> {
        MultiPolygon(vec![polygon![
            (x: -94.30, y: 35.70),
            (x: -93.95, y: 35.72),
            (x: -93.90, y: 36.02),
            (x: -94.10, y: 36.15),
            (x: -94.32, y: 36.05),
            (x: -94.30, y: 35.70),
        ]])
    }

    /// Second lon/lat watershed east of [`lon_lat_west`], sharing no area with it.
    pub fn lon_lat_east() -> MultiPolygon<f64> {
        MultiPolygon(vec![polygon![
            (x: -93.85, y: 35.95),
            (x: -93.62, y: 35.98),
            (x: -93.60, y: 36.30),
            (x: -93.80, y: 36.33),
            (x: -93.85, y: 35.95),
        ]])
    }
}

/// Common time values for testing.
pub mod time {
    /// First day of the reference window
    pub const WINDOW_START: &str = "2017-01-01";

    /// Exclusive end of the reference window
    pub const WINDOW_END: &str = "2017-01-04";
}
