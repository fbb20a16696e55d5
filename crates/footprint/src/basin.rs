//! Basin boundaries.

use std::fs;
use std::path::Path;

use geo::{BooleanOps, BoundingRect, MultiPolygon};
use tracing::info;

use basin_common::{BoundingBox, Crs, CrsCode};

use crate::error::{FootprintError, Result};
use crate::geojson::read_polygons;

/// A named watershed boundary.
#[derive(Debug, Clone)]
pub struct Basin {
    pub name: String,
    pub geometry: MultiPolygon<f64>,
}

impl Basin {
    /// Create a basin; overlapping parts are dissolved into one area.
    pub fn new(name: impl Into<String>, geometry: MultiPolygon<f64>) -> Result<Self> {
        let name = name.into();
        if geometry.0.is_empty() {
            return Err(FootprintError::basin(format!("basin {} has no polygons", name)));
        }
        Ok(Self {
            name,
            geometry: dissolve(geometry),
        })
    }

    /// Load a basin from a GeoJSON file.
    pub fn from_geojson_file(name: impl Into<String>, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let basin = Self::new(name, read_polygons(&text)?)?;
        info!(
            basin = %basin.name,
            path = %path.display(),
            parts = basin.geometry.0.len(),
            "Loaded basin boundary"
        );
        Ok(basin)
    }

    /// Envelope in the basin's own coordinates.
    pub fn bounds(&self) -> Option<BoundingBox> {
        self.geometry
            .bounding_rect()
            .map(|r| BoundingBox::new(r.min().x, r.min().y, r.max().x, r.max().y))
    }
}

/// The two basins every footprint is measured against, in one CRS.
#[derive(Debug, Clone)]
pub struct BasinSet {
    pub ca: Basin,
    pub ar: Basin,
    pub crs: Crs,
    union: MultiPolygon<f64>,
}

impl BasinSet {
    /// Basins in geographic lon/lat, as GeoJSON delivers them.
    pub fn new(ca: Basin, ar: Basin) -> Self {
        Self::in_crs(ca, ar, CrsCode::Epsg4326.definition())
    }

    /// Basins already expressed in `crs`.
    pub fn in_crs(ca: Basin, ar: Basin, crs: Crs) -> Self {
        let union = ca.geometry.union(&ar.geometry);
        Self { ca, ar, crs, union }
    }

    /// Geometric union of both basins.
    pub fn union(&self) -> &MultiPolygon<f64> {
        &self.union
    }

    /// Envelope of both basins.
    pub fn bounds(&self) -> Option<BoundingBox> {
        match (self.ca.bounds(), self.ar.bounds()) {
            (Some(a), Some(b)) => Some(a.union(&b)),
            (a, b) => a.or(b),
        }
    }
}

fn dissolve(geometry: MultiPolygon<f64>) -> MultiPolygon<f64> {
    if geometry.0.len() <= 1 {
        return geometry;
    }
    geometry
        .0
        .into_iter()
        .map(|p| MultiPolygon(vec![p]))
        .reduce(|acc, next| acc.union(&next))
        .unwrap_or_else(|| MultiPolygon(Vec::new()))
}
