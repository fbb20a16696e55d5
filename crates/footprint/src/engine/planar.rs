//! Planar geometry engine backed by `geo` and the workspace projections.

use std::collections::BTreeMap;

use geo::{Area, BooleanOps, BoundingRect, Centroid, Coord, LineString, MultiPolygon, Polygon};
use rayon::prelude::*;
use tracing::{debug, warn};

use basin_common::Crs;
use projection::Transformer;

use super::{vectorize, Coverage, GeometryEngine, LabelField, LabeledPolygon, Vectorization};
use crate::config::VectorizeOptions;
use crate::error::{FootprintError, Result};

/// Meters per degree of arc on the WGS84 equator.
const METERS_PER_DEGREE: f64 = 111_319.49;

/// Maximum edge bisection depth during densification.
const MAX_DEPTH: u32 = 16;

/// Geometry engine working on planar coordinates of each frame.
#[derive(Debug, Clone, Copy)]
pub struct PlanarEngine {
    tolerance_m: f64,
}

impl PlanarEngine {
    pub fn new(tolerance_m: f64) -> Self {
        Self { tolerance_m }
    }

    /// The tolerance expressed in the units of `crs`.
    fn tolerance_in(&self, crs: &Crs) -> f64 {
        if crs.is_geographic() {
            self.tolerance_m / METERS_PER_DEGREE
        } else {
            self.tolerance_m
        }
    }
}

impl GeometryEngine for PlanarEngine {
    fn tolerance(&self) -> f64 {
        self.tolerance_m
    }

    fn reproject(&self, geometry: &MultiPolygon<f64>, from: &Crs, to: &Crs) -> Result<MultiPolygon<f64>> {
        let densifier = Densifier {
            transformer: Transformer::new(from, to)?,
            tolerance: self.tolerance_in(to),
        };
        if densifier.transformer.is_identity() {
            return Ok(geometry.clone());
        }

        let polygons = geometry
            .0
            .iter()
            .map(|polygon| {
                let exterior = densifier.ring(polygon.exterior())?;
                let interiors = polygon
                    .interiors()
                    .iter()
                    .map(|ring| densifier.ring(ring))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Polygon::new(exterior, interiors))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(MultiPolygon(polygons))
    }

    fn reproject_point(&self, point: Coord<f64>, from: &Crs, to: &Crs) -> Result<Coord<f64>> {
        project(&Transformer::new(from, to)?, point)
    }

    fn area(&self, geometry: &MultiPolygon<f64>) -> f64 {
        geometry.unsigned_area()
    }

    fn intersection_area(&self, a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> f64 {
        let (Some(ra), Some(rb)) = (a.bounding_rect(), b.bounding_rect()) else {
            return 0.0;
        };
        let disjoint = ra.max().x <= rb.min().x
            || rb.max().x <= ra.min().x
            || ra.max().y <= rb.min().y
            || rb.max().y <= ra.min().y;
        if disjoint {
            return 0.0;
        }
        a.intersection(b).unsigned_area()
    }

    fn centroid(&self, geometry: &Polygon<f64>) -> Option<Coord<f64>> {
        geometry.centroid().map(|p| p.0)
    }

    fn vectorize_labels(&self, field: &LabelField<'_>, options: &VectorizeOptions) -> Result<Vectorization> {
        let window = field.window();
        let requested = window.len();
        let mut tiles = window.tiles(options.tile_size);

        let coverage = if requested > options.max_cells {
            if !options.best_effort {
                return Err(FootprintError::BudgetExceeded {
                    requested,
                    max_cells: options.max_cells,
                });
            }
            let mut processed = 0u64;
            let keep = tiles
                .iter()
                .take_while(|tile| {
                    let fits = processed + tile.len() <= options.max_cells;
                    if fits {
                        processed += tile.len();
                    }
                    fits
                })
                .count();
            tiles.truncate(keep);
            warn!(
                requested = requested,
                processed = processed,
                max_cells = options.max_cells,
                "Vectorization budget exceeded, coverage is partial"
            );
            Coverage::Truncated {
                requested,
                processed,
            }
        } else {
            Coverage::Complete { cells: requested }
        };

        let traced: Vec<_> = tiles
            .par_iter()
            .map(|tile| vectorize::trace_tile(field, *tile))
            .collect();

        let mut by_label: BTreeMap<u64, Vec<Polygon<f64>>> = BTreeMap::new();
        for (label, parts) in traced.into_iter().flatten() {
            by_label.entry(label).or_default().extend(parts);
        }

        let polygons: Vec<LabeledPolygon> = by_label
            .into_iter()
            .map(|(label, parts)| LabeledPolygon {
                label,
                geometry: merge_parts(parts),
            })
            .collect();

        debug!(
            tiles = tiles.len(),
            labels = polygons.len(),
            cells = coverage.processed(),
            "Vectorized label field"
        );

        Ok(Vectorization { polygons, coverage })
    }
}

/// Union of the pieces of one label that were traced in different tiles.
fn merge_parts(parts: Vec<Polygon<f64>>) -> MultiPolygon<f64> {
    if parts.len() <= 1 {
        return MultiPolygon(parts);
    }
    parts
        .into_iter()
        .map(|p| MultiPolygon(vec![p]))
        .reduce(|acc, next| acc.union(&next))
        .unwrap_or_else(|| MultiPolygon(Vec::new()))
}

fn project(transformer: &Transformer, point: Coord<f64>) -> Result<Coord<f64>> {
    transformer
        .transform(point.x, point.y)
        .map(|(x, y)| Coord { x, y })
        .ok_or_else(|| {
            FootprintError::Reprojection(format!(
                "({}, {}) is outside the projection domain",
                point.x, point.y
            ))
        })
}

/// Perpendicular distance from `p` to the line through `a` and `b`.
fn distance_to_chord(p: Coord<f64>, a: Coord<f64>, b: Coord<f64>) -> f64 {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let len = dx.hypot(dy);
    if len == 0.0 {
        return (p.x - a.x).hypot(p.y - a.y);
    }
    (dx * (p.y - a.y) - dy * (p.x - a.x)).abs() / len
}

/// Reprojects rings, bisecting each source edge until the projected
/// midpoint lies within `tolerance` of the projected chord.
struct Densifier {
    transformer: Transformer,
    tolerance: f64,
}

impl Densifier {
    fn ring(&self, ring: &LineString<f64>) -> Result<LineString<f64>> {
        let mut out = Vec::with_capacity(ring.0.len());
        for line in ring.lines() {
            let a = project(&self.transformer, line.start)?;
            let b = project(&self.transformer, line.end)?;
            out.push(a);
            self.subdivide((line.start, a), (line.end, b), 0, &mut out)?;
        }
        if let Some(first) = out.first().copied() {
            out.push(first);
        }
        Ok(LineString::from(out))
    }

    /// Push the interior vertices needed between `a` and `b`; each pair is
    /// (source point, projected point).
    fn subdivide(
        &self,
        a: (Coord<f64>, Coord<f64>),
        b: (Coord<f64>, Coord<f64>),
        depth: u32,
        out: &mut Vec<Coord<f64>>,
    ) -> Result<()> {
        if depth >= MAX_DEPTH {
            return Ok(());
        }
        let source_mid = Coord {
            x: (a.0.x + b.0.x) / 2.0,
            y: (a.0.y + b.0.y) / 2.0,
        };
        let mid = project(&self.transformer, source_mid)?;
        if distance_to_chord(mid, a.1, b.1) <= self.tolerance {
            return Ok(());
        }
        self.subdivide(a, (source_mid, mid), depth + 1, out)?;
        out.push(mid);
        self.subdivide((source_mid, mid), b, depth + 1, out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use basin_common::{CrsCode, GeoTransform, NativeGrid};
    use geo::polygon;

    fn degree_cell() -> MultiPolygon<f64> {
        MultiPolygon(vec![polygon![
            (x: -94.0, y: 36.0),
            (x: -93.0, y: 36.0),
            (x: -93.0, y: 37.0),
            (x: -94.0, y: 37.0),
            (x: -94.0, y: 36.0),
        ]])
    }

    fn square(min: f64, max: f64) -> MultiPolygon<f64> {
        MultiPolygon(vec![polygon![
            (x: min, y: min),
            (x: max, y: min),
            (x: max, y: max),
            (x: min, y: max),
            (x: min, y: min),
        ]])
    }

    #[test]
    fn test_intersection_area_of_offset_squares() {
        let engine = PlanarEngine::new(1.0);
        assert!((engine.intersection_area(&square(0.0, 2.0), &square(1.0, 3.0)) - 1.0).abs() < 1e-9);
        assert_eq!(engine.intersection_area(&square(0.0, 1.0), &square(5.0, 6.0)), 0.0);
    }

    #[test]
    fn test_touching_squares_have_zero_overlap() {
        let engine = PlanarEngine::new(1.0);
        assert!(engine.intersection_area(&square(0.0, 1.0), &square(1.0, 2.0)).abs() < 1e-12);
    }

    #[test]
    fn test_reproject_identity_is_unchanged() {
        let engine = PlanarEngine::new(1.0);
        let aea = CrsCode::Epsg5070.definition();
        let geom = square(0.0, 1000.0);
        assert_eq!(engine.reproject(&geom, &aea, &aea).unwrap(), geom);
    }

    #[test]
    fn test_reprojected_degree_cell_densifies_curved_edges() {
        let engine = PlanarEngine::new(1.0);
        let geo_crs = CrsCode::Epsg4326.definition();
        let aea = CrsCode::Epsg5070.definition();
        let cell = degree_cell();
        let projected = engine.reproject(&cell, &geo_crs, &aea).unwrap();
        // parallels are arcs in the conic frame
        assert!(projected.0[0].exterior().0.len() > 5);

        let back = engine.reproject(&projected, &aea, &geo_crs).unwrap();
        let first = back.0[0].exterior().0[0];
        assert!((first.x + 94.0).abs() < 1e-8 && (first.y - 36.0).abs() < 1e-8);
    }

    #[test]
    fn test_tighter_tolerance_adds_vertices() {
        let geo_crs = CrsCode::Epsg4326.definition();
        let aea = CrsCode::Epsg5070.definition();
        let cell = degree_cell();
        let coarse = PlanarEngine::new(100.0).reproject(&cell, &geo_crs, &aea).unwrap();
        let fine = PlanarEngine::new(0.01).reproject(&cell, &geo_crs, &aea).unwrap();
        assert!(fine.0[0].exterior().0.len() > coarse.0[0].exterior().0.len());
    }

    #[test]
    fn test_centroid_of_cell_is_center() {
        let engine = PlanarEngine::new(1.0);
        let c = engine.centroid(&square(2.0, 4.0).0[0]).unwrap();
        assert!((c.x - 3.0).abs() < 1e-12 && (c.y - 3.0).abs() < 1e-12);
    }

    fn field_grid() -> NativeGrid {
        NativeGrid::new(
            CrsCode::Epsg5070.definition(),
            GeoTransform::north_up(0.0, 5.0, 1.0, 1.0),
            5,
            5,
        )
        .unwrap()
    }

    #[test]
    fn test_vectorize_merges_labels_across_tiles() {
        let grid = field_grid();
        let field = LabelField::from_fn(&grid, grid.full_window(), |_| Some(1));
        let options = VectorizeOptions {
            tile_size: 2,
            ..VectorizeOptions::default()
        };
        let out = PlanarEngine::new(1.0).vectorize_labels(&field, &options).unwrap();
        assert_eq!(out.polygons.len(), 1);
        assert!((out.polygons[0].geometry.unsigned_area() - 25.0).abs() < 1e-9);
        assert_eq!(out.coverage, Coverage::Complete { cells: 25 });
    }

    #[test]
    fn test_vectorize_budget_best_effort_truncates() {
        let grid = field_grid();
        let field = LabelField::from_fn(&grid, grid.full_window(), |k| Some(k.label()));
        let options = VectorizeOptions {
            tile_size: 2,
            max_cells: 10,
            best_effort: true,
        };
        let out = PlanarEngine::new(1.0).vectorize_labels(&field, &options).unwrap();
        assert_eq!(
            out.coverage,
            Coverage::Truncated {
                requested: 25,
                processed: 10
            }
        );
        // first tile row: 2x2, 2x2 and 1x2 cells
        assert_eq!(out.polygons.len(), 10);
    }

    #[test]
    fn test_vectorize_budget_strict_fails() {
        let grid = field_grid();
        let field = LabelField::from_fn(&grid, grid.full_window(), |k| Some(k.label()));
        let options = VectorizeOptions {
            tile_size: 2,
            max_cells: 10,
            best_effort: false,
        };
        let err = PlanarEngine::new(1.0).vectorize_labels(&field, &options).unwrap_err();
        assert!(matches!(err, FootprintError::BudgetExceeded { requested: 25, max_cells: 10 }));
    }
}
