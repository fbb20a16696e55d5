//! Stable pixel identities.

use std::collections::HashMap;

use geo::Polygon;

use basin_common::{Crs, CrsCode, NativeGrid, PixelKey};

use crate::engine::GeometryEngine;
use crate::error::{FootprintError, Result};
use crate::types::PixelFootprint;

/// Identity of one footprint, derived from its own geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelIdentity {
    pub key: PixelKey,
    pub pixel_id: String,
    /// Centroid in the native frame
    pub centroid: (f64, f64),
    pub center_lon: f64,
    pub center_lat: f64,
}

/// `<PRODUCT>_c<col>_r<row>`.
pub fn pixel_id(product: &str, key: PixelKey) -> String {
    format!("{}_{}", product, key)
}

/// Maps footprint centroids back onto native cells.
pub struct PixelIndexAssigner<'a, E: GeometryEngine> {
    engine: &'a E,
    grid: &'a NativeGrid,
    product: &'a str,
    geographic: Crs,
}

impl<'a, E: GeometryEngine> PixelIndexAssigner<'a, E> {
    pub fn new(engine: &'a E, grid: &'a NativeGrid, product: &'a str) -> Self {
        Self {
            engine,
            grid,
            product,
            geographic: CrsCode::Epsg4326.definition(),
        }
    }

    /// Identity of the footprint vectorized from `label`.
    ///
    /// The centroid's cell must be the labeled cell; anything else means the
    /// footprint does not describe the cell it claims to.
    pub fn assign(&self, label: u64, geometry: &Polygon<f64>) -> Result<PixelIdentity> {
        let expected = PixelKey::from_label(label);
        let centroid = self.engine.centroid(geometry).ok_or_else(|| {
            FootprintError::identity(format!("footprint of cell {} has no centroid", expected))
        })?;

        let key = self.grid.cell_at(centroid.x, centroid.y).ok_or_else(|| {
            FootprintError::identity(format!(
                "centroid ({}, {}) of cell {} falls outside the grid",
                centroid.x, centroid.y, expected
            ))
        })?;
        if key != expected {
            return Err(FootprintError::identity(format!(
                "centroid of labeled cell {} falls in cell {}",
                expected, key
            )));
        }

        let center = self
            .engine
            .reproject_point(centroid, &self.grid.crs, &self.geographic)?;

        Ok(PixelIdentity {
            key,
            pixel_id: pixel_id(self.product, key),
            centroid: (centroid.x, centroid.y),
            center_lon: center.x,
            center_lat: center.y,
        })
    }
}

/// Fail when two footprints share an identity.
pub fn ensure_unique(footprints: &[PixelFootprint]) -> Result<()> {
    let mut seen: HashMap<&str, PixelKey> = HashMap::with_capacity(footprints.len());
    for fp in footprints {
        if let Some(previous) = seen.insert(&fp.pixel_id, fp.key) {
            return Err(FootprintError::identity(format!(
                "pixel id {} assigned to cells {} and {}",
                fp.pixel_id, previous, fp.key
            )));
        }
    }
    Ok(())
}
