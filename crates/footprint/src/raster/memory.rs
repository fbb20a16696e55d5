//! Raster source held entirely in memory.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;

use super::{Frame, RasterSource};
use crate::error::{FootprintError, Result};

/// Frames keyed by band and day. Used for tests and for callers that
/// already decoded their rasters.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRaster {
    product: String,
    bands: BTreeMap<String, BTreeMap<NaiveDate, Arc<Frame>>>,
}

impl InMemoryRaster {
    pub fn new(product: impl Into<String>) -> Self {
        Self {
            product: product.into(),
            bands: BTreeMap::new(),
        }
    }

    /// Add a frame under `band`, replacing any frame for the same day.
    pub fn with_frame(mut self, band: &str, frame: Frame) -> Self {
        self.insert(band, frame);
        self
    }

    pub fn insert(&mut self, band: &str, frame: Frame) {
        self.bands
            .entry(band.to_string())
            .or_default()
            .insert(frame.date, Arc::new(frame));
    }
}

impl RasterSource for InMemoryRaster {
    fn product(&self) -> &str {
        &self.product
    }

    fn bands(&self) -> Vec<String> {
        self.bands.keys().cloned().collect()
    }

    fn dates(&self, band: &str) -> Vec<NaiveDate> {
        self.bands
            .get(band)
            .map(|frames| frames.keys().copied().collect())
            .unwrap_or_default()
    }

    fn frame(&self, band: &str, date: NaiveDate) -> Result<Arc<Frame>> {
        let frames = self.bands.get(band).ok_or_else(|| self.unknown_band(band))?;
        frames.get(&date).cloned().ok_or_else(|| {
            FootprintError::raster(format!("{} has no '{}' frame for {}", self.product, band, date))
        })
    }
}
