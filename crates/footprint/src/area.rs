//! Cell areas and basin overlaps in the equal-area frame.

use geo::{MultiPolygon, Polygon};

use basin_common::Crs;

use crate::basin::BasinSet;
use crate::engine::GeometryEngine;
use crate::error::Result;
use crate::types::BasinAreas;

/// Measures each footprint against both basins. Basins are carried into the
/// equal-area frame once, when the calculator is built.
pub struct AreaFractionCalculator<'a, E: GeometryEngine> {
    engine: &'a E,
    native: Crs,
    equal_area: Crs,
    ca: MultiPolygon<f64>,
    ar: MultiPolygon<f64>,
}

impl<'a, E: GeometryEngine> AreaFractionCalculator<'a, E> {
    pub fn new(engine: &'a E, basins: &BasinSet, native: Crs, equal_area: Crs) -> Result<Self> {
        Ok(Self {
            engine,
            native,
            equal_area,
            ca: engine.reproject(&basins.ca.geometry, &basins.crs, &equal_area)?,
            ar: engine.reproject(&basins.ar.geometry, &basins.crs, &equal_area)?,
        })
    }

    /// Cell area and basin overlaps of one native-frame footprint.
    ///
    /// Overlaps are clamped to the cell area so fractions never exceed 1.
    pub fn compute(&self, footprint: &Polygon<f64>) -> Result<BasinAreas> {
        let cell = self.engine.reproject(
            &MultiPolygon(vec![footprint.clone()]),
            &self.native,
            &self.equal_area,
        )?;
        let area_m2 = self.engine.area(&cell);
        let overlap = |basin: &MultiPolygon<f64>| {
            self.engine
                .intersection_area(&cell, basin)
                .clamp(0.0, area_m2)
        };
        Ok(BasinAreas {
            area_m2,
            area_ca: overlap(&self.ca),
            area_ar: overlap(&self.ar),
        })
    }
}
