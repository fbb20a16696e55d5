//! Raster source trait and implementations.

mod ascii;
mod memory;

pub use ascii::AsciiGridSource;
pub use memory::InMemoryRaster;

use std::sync::Arc;

use chrono::NaiveDate;

use basin_common::{NativeGrid, PixelKey};

use crate::error::{FootprintError, Result};

/// Trait for accessing a product's daily frames.
///
/// This trait abstracts over where the frames live (files on disk, memory)
/// and exposes the one capability the pipeline needs: the native grid of a
/// frame and point sampling of its values.
pub trait RasterSource: Send + Sync {
    /// Product name, e.g. `DAYMET`.
    fn product(&self) -> &str;

    /// Band selectors offered by this source.
    fn bands(&self) -> Vec<String>;

    /// Days with a frame for `band`, ascending.
    fn dates(&self, band: &str) -> Vec<NaiveDate>;

    /// Load one day's frame.
    ///
    /// # Returns
    /// * `Err(FootprintError::UnknownBand)` if the band does not exist
    /// * `Err(FootprintError::Raster)` if the day has no frame or it cannot be read
    fn frame(&self, band: &str, date: NaiveDate) -> Result<Arc<Frame>>;

    /// Native grid of one day's frame.
    fn grid(&self, band: &str, date: NaiveDate) -> Result<NativeGrid> {
        Ok(self.frame(band, date)?.grid.clone())
    }

    /// Error for a band this source does not offer.
    fn unknown_band(&self, band: &str) -> FootprintError {
        FootprintError::UnknownBand {
            product: self.product().to_string(),
            band: band.to_string(),
            available: self.bands(),
        }
    }
}

/// One day of one band on its native grid.
#[derive(Debug, Clone)]
pub struct Frame {
    pub date: NaiveDate,
    pub grid: NativeGrid,
    /// Row-major values, row 0 first
    values: Vec<f32>,
    nodata: Option<f32>,
}

impl Frame {
    /// Create a frame; `values` must hold one entry per grid cell.
    pub fn new(
        date: NaiveDate,
        grid: NativeGrid,
        values: Vec<f32>,
        nodata: Option<f32>,
    ) -> Result<Self> {
        let expected = grid.cols as usize * grid.rows as usize;
        if values.len() != expected {
            return Err(FootprintError::raster(format!(
                "frame for {} has {} values, grid {}x{} needs {}",
                date,
                values.len(),
                grid.cols,
                grid.rows,
                expected
            )));
        }
        Ok(Self {
            date,
            grid,
            values,
            nodata,
        })
    }

    /// Value of one cell; `None` for nodata, NaN or out-of-grid keys.
    pub fn value(&self, key: PixelKey) -> Option<f64> {
        if key.col >= self.grid.cols || key.row >= self.grid.rows {
            return None;
        }
        let idx = key.row as usize * self.grid.cols as usize + key.col as usize;
        let v = *self.values.get(idx)?;
        if v.is_nan() || self.nodata.is_some_and(|nd| v == nd) {
            return None;
        }
        Some(v as f64)
    }

    /// Value of the cell containing a native-frame point.
    pub fn sample_point(&self, x: f64, y: f64) -> Option<f64> {
        self.grid.cell_at(x, y).and_then(|key| self.value(key))
    }
}
