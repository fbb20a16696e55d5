//! Native grid discovery.

use chrono::NaiveDate;
use tracing::info;

use basin_common::{DateWindow, NativeGrid};

use crate::error::{FootprintError, Result};
use crate::raster::RasterSource;

/// A product's native grid and the frames it applies to.
#[derive(Debug, Clone)]
pub struct ResolvedGrid {
    pub grid: NativeGrid,
    /// Days with a frame inside the window, ascending
    pub dates: Vec<NaiveDate>,
}

/// Reads the native grid from the first frame of a product's window.
pub struct GridResolver;

impl GridResolver {
    /// Resolve the grid of `band` over `window`.
    ///
    /// # Returns
    /// * `Err(FootprintError::UnknownBand)` if the source does not offer `band`
    /// * `Err(FootprintError::EmptySource)` if no frame falls inside `window`
    pub fn resolve(source: &dyn RasterSource, band: &str, window: &DateWindow) -> Result<ResolvedGrid> {
        if !source.bands().iter().any(|b| b == band) {
            return Err(source.unknown_band(band));
        }

        let dates: Vec<NaiveDate> = source
            .dates(band)
            .into_iter()
            .filter(|d| window.contains(*d))
            .collect();
        let first = *dates.first().ok_or_else(|| FootprintError::EmptySource {
            product: source.product().to_string(),
            window: window.to_string(),
        })?;

        let grid = source.grid(band, first)?;
        info!(
            product = %source.product(),
            band = %band,
            crs = %grid.crs,
            transform = ?grid.transform.to_gdal(),
            nominal_scale_m = grid.nominal_scale,
            cols = grid.cols,
            rows = grid.rows,
            frames = dates.len(),
            window_days = window.num_days(),
            "Resolved native grid"
        );

        Ok(ResolvedGrid { grid, dates })
    }
}
