//! Exact cell footprints over the basins' region of interest.

use geo::{BoundingRect, Coord, LineString, MultiPolygon, Polygon};
use tracing::{debug, info};

use basin_common::{BoundingBox, Crs, NativeGrid};

use crate::basin::BasinSet;
use crate::config::VectorizeOptions;
use crate::engine::{GeometryEngine, LabelField, Vectorization};
use crate::error::Result;

/// Segments per envelope side before the engine's own densification.
const ENVELOPE_SEGMENTS: usize = 8;

/// Produces one polygon per native cell touching the region of interest by
/// labeling every cell with its unique identity and vectorizing the labels.
pub struct FootprintBuilder<'a, E: GeometryEngine> {
    engine: &'a E,
    options: VectorizeOptions,
}

impl<'a, E: GeometryEngine> FootprintBuilder<'a, E> {
    pub fn new(engine: &'a E, options: VectorizeOptions) -> Self {
        Self { engine, options }
    }

    /// Envelope of the basins' union, grown by `buffer_m` true meters in the
    /// equal-area frame, then carried into the grid's frame and clipped to
    /// the grid. `None` when the region misses the grid.
    pub fn region_of_interest(
        &self,
        basins: &BasinSet,
        grid: &NativeGrid,
        equal_area: &Crs,
        buffer_m: f64,
    ) -> Result<Option<BoundingBox>> {
        let union = self.engine.reproject(basins.union(), &basins.crs, equal_area)?;
        let Some(envelope) = bounds(&union) else {
            return Ok(None);
        };
        let buffered = envelope.expand(buffer_m);

        let ring: LineString<f64> = buffered
            .boundary_points(ENVELOPE_SEGMENTS)
            .into_iter()
            .map(|(x, y)| Coord { x, y })
            .collect::<Vec<_>>()
            .into();
        let region = MultiPolygon(vec![Polygon::new(ring, Vec::new())]);
        let native = self.engine.reproject(&region, equal_area, &grid.crs)?;

        let clipped = bounds(&native).and_then(|b| b.intersection(&grid.extent()));
        debug!(
            envelope = ?envelope,
            buffer_m = buffer_m,
            native = ?clipped,
            "Computed region of interest"
        );
        Ok(clipped)
    }

    /// Vectorize every cell of `grid` whose footprint can touch `region`.
    pub fn build(&self, grid: &NativeGrid, region: &BoundingBox) -> Result<Vectorization> {
        let Some(window) = grid.window_covering(region) else {
            return Ok(Vectorization::empty());
        };

        let field = LabelField::from_fn(grid, window, |key| {
            BoundingBox::from_points(grid.cell_corners(key))
                .filter(|cell| cell.intersects(region))
                .map(|_| key.label())
        });

        info!(
            window = ?window,
            cells = field.labeled_cells(),
            tile_size = self.options.tile_size,
            "Vectorizing native cells"
        );
        self.engine.vectorize_labels(&field, &self.options)
    }
}

fn bounds(geometry: &MultiPolygon<f64>) -> Option<BoundingBox> {
    geometry
        .bounding_rect()
        .map(|r| BoundingBox::new(r.min().x, r.min().y, r.max().x, r.max().y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basin::Basin;
    use crate::engine::PlanarEngine;
    use basin_common::{CrsCode, GeoTransform, PixelKey};
    use geo::{polygon, Area};

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> MultiPolygon<f64> {
        MultiPolygon(vec![polygon![
            (x: x0, y: y0), (x: x1, y: y0), (x: x1, y: y1), (x: x0, y: y1), (x: x0, y: y0),
        ]])
    }

    fn km_grid() -> NativeGrid {
        NativeGrid::new(
            CrsCode::Epsg5070.definition(),
            GeoTransform::north_up(0.0, 20_000.0, 1000.0, 1000.0),
            20,
            20,
        )
        .unwrap()
    }

    fn basins() -> BasinSet {
        let aea = CrsCode::Epsg5070.definition();
        BasinSet::in_crs(
            Basin::new("CA", rect(8_000.0, 8_000.0, 9_000.0, 9_000.0)).unwrap(),
            Basin::new("AR", rect(10_000.0, 10_000.0, 11_000.0, 11_000.0)).unwrap(),
            aea,
        )
    }

    #[test]
    fn test_region_is_buffered_envelope() {
        let engine = PlanarEngine::new(1.0);
        let builder = FootprintBuilder::new(&engine, VectorizeOptions::default());
        let grid = km_grid();
        let region = builder
            .region_of_interest(&basins(), &grid, &CrsCode::Epsg5070.definition(), 2_000.0)
            .unwrap()
            .unwrap();
        assert_eq!(region, BoundingBox::new(6_000.0, 6_000.0, 13_000.0, 13_000.0));
    }

    #[test]
    fn test_region_outside_grid_is_none() {
        let engine = PlanarEngine::new(1.0);
        let builder = FootprintBuilder::new(&engine, VectorizeOptions::default());
        let aea = CrsCode::Epsg5070.definition();
        let far = BasinSet::in_crs(
            Basin::new("CA", rect(1e6, 1e6, 1.1e6, 1.1e6)).unwrap(),
            Basin::new("AR", rect(1e6, 1e6, 1.1e6, 1.1e6)).unwrap(),
            aea,
        );
        assert!(builder
            .region_of_interest(&far, &km_grid(), &aea, 8_000.0)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_build_yields_one_square_per_cell() {
        let engine = PlanarEngine::new(1.0);
        let builder = FootprintBuilder::new(&engine, VectorizeOptions::default());
        let grid = km_grid();
        let region = BoundingBox::new(6_000.0, 6_000.0, 13_000.0, 13_000.0);
        let out = builder.build(&grid, &region).unwrap();

        assert_eq!(out.polygons.len(), 49);
        assert!(!out.coverage.is_truncated());
        for labeled in &out.polygons {
            let key = PixelKey::from_label(labeled.label);
            assert!((6..13).contains(&key.col) && (7..14).contains(&key.row), "{}", key);
            assert!((labeled.geometry.unsigned_area() - 1e6).abs() < 1e-6);
        }
    }
}
