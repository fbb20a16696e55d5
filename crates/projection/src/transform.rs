//! Point transformations between supported frames.
//!
//! Every frame is reached through geographic lon/lat. Datum shifts between
//! NAD83 and WGS84 (below two meters over CONUS) are not modelled.

use basin_common::Crs;

use crate::albers::AlbersEqualArea;
use crate::error::Result;
use crate::lambert::LambertConformal;

/// Projection math for one CRS.
#[derive(Debug, Clone)]
pub enum Projector {
    /// Longitude/latitude passthrough
    Geographic,
    Lambert(LambertConformal),
    Albers(AlbersEqualArea),
}

impl Projector {
    /// Build the projection for a CRS definition.
    pub fn new(crs: &Crs) -> Result<Self> {
        Ok(match crs {
            Crs::Geographic { .. } => Projector::Geographic,
            Crs::LambertConformal(p) => Projector::Lambert(LambertConformal::new(p)?),
            Crs::AlbersEqualArea(p) => Projector::Albers(AlbersEqualArea::new(p)?),
        })
    }

    /// Geographic (lon, lat degrees) to this frame.
    pub fn forward(&self, lon: f64, lat: f64) -> Option<(f64, f64)> {
        match self {
            Projector::Geographic => Some((lon, lat)),
            Projector::Lambert(p) => p.forward(lon, lat),
            Projector::Albers(p) => p.forward(lon, lat),
        }
    }

    /// This frame to geographic (lon, lat degrees).
    pub fn inverse(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        match self {
            Projector::Geographic => Some((x, y)),
            Projector::Lambert(p) => p.inverse(x, y),
            Projector::Albers(p) => p.inverse(x, y),
        }
    }
}

/// Transforms points from one CRS to another.
#[derive(Debug, Clone)]
pub struct Transformer {
    source: Projector,
    target: Projector,
    identity: bool,
}

impl Transformer {
    pub fn new(source: &Crs, target: &Crs) -> Result<Self> {
        Ok(Self {
            source: Projector::new(source)?,
            target: Projector::new(target)?,
            identity: source == target,
        })
    }

    /// Whether source and target are the same frame.
    pub fn is_identity(&self) -> bool {
        self.identity
    }

    /// Transform one point; `None` when it falls outside either projection's domain.
    pub fn transform(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        if self.identity {
            return Some((x, y));
        }
        let (lon, lat) = self.source.inverse(x, y)?;
        self.target.forward(lon, lat)
    }
}
