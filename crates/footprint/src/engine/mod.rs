//! Geometry engine trait and the planar implementation.
//!
//! Every geometric primitive the pipeline needs goes through
//! [`GeometryEngine`]: reprojection, area, overlay, centroid and label
//! vectorization, all honoring one error tolerance in meters.

mod planar;
mod vectorize;

pub use planar::PlanarEngine;

use geo::{Coord, MultiPolygon, Polygon};

use basin_common::{CellWindow, Crs, NativeGrid, PixelKey};

use crate::config::VectorizeOptions;
use crate::error::Result;

/// Geometry capabilities consumed by the pipeline.
pub trait GeometryEngine: Send + Sync {
    /// Maximum geometric error, in meters.
    fn tolerance(&self) -> f64;

    /// Carry polygons between frames. Edges are densified so the result
    /// stays within the tolerance of the true curved boundary.
    fn reproject(&self, geometry: &MultiPolygon<f64>, from: &Crs, to: &Crs) -> Result<MultiPolygon<f64>>;

    /// Carry one point between frames.
    fn reproject_point(&self, point: Coord<f64>, from: &Crs, to: &Crs) -> Result<Coord<f64>>;

    /// Planar area; meaningful in square meters only in an equal-area frame.
    fn area(&self, geometry: &MultiPolygon<f64>) -> f64;

    /// Planar area of the intersection of two geometries in the same frame.
    fn intersection_area(&self, a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> f64;

    /// Area-weighted centroid.
    fn centroid(&self, geometry: &Polygon<f64>) -> Option<Coord<f64>>;

    /// Turn every labeled region of `field` into polygons in the field's
    /// map frame, one entry per label.
    fn vectorize_labels(&self, field: &LabelField<'_>, options: &VectorizeOptions) -> Result<Vectorization>;
}

/// Integer labels over a window of a native grid; `None` marks cells that
/// are not vectorized.
#[derive(Debug, Clone)]
pub struct LabelField<'g> {
    grid: &'g NativeGrid,
    window: CellWindow,
    labels: Vec<Option<u64>>,
}

impl<'g> LabelField<'g> {
    /// Label each cell of `window` with `label`.
    pub fn from_fn(grid: &'g NativeGrid, window: CellWindow, label: impl Fn(PixelKey) -> Option<u64>) -> Self {
        let labels = window.keys().map(label).collect();
        Self { grid, window, labels }
    }

    pub fn grid(&self) -> &NativeGrid {
        self.grid
    }

    pub fn window(&self) -> CellWindow {
        self.window
    }

    /// Label at a grid cell; `None` outside the window.
    pub fn label(&self, key: PixelKey) -> Option<u64> {
        if !self.window.contains(key) {
            return None;
        }
        let idx = (key.row - self.window.row_start) as usize * self.window.cols as usize
            + (key.col - self.window.col_start) as usize;
        self.labels.get(idx).copied().flatten()
    }

    /// Number of labeled cells.
    pub fn labeled_cells(&self) -> usize {
        self.labels.iter().filter(|l| l.is_some()).count()
    }
}

/// Polygons of one label.
#[derive(Debug, Clone)]
pub struct LabeledPolygon {
    pub label: u64,
    pub geometry: MultiPolygon<f64>,
}

/// How much of the requested field was vectorized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coverage {
    /// Every requested cell was vectorized.
    Complete { cells: u64 },
    /// The cell budget cut vectorization short.
    Truncated { requested: u64, processed: u64 },
}

impl Coverage {
    pub fn is_truncated(&self) -> bool {
        matches!(self, Coverage::Truncated { .. })
    }

    /// Cells actually vectorized.
    pub fn processed(&self) -> u64 {
        match *self {
            Coverage::Complete { cells } => cells,
            Coverage::Truncated { processed, .. } => processed,
        }
    }
}

/// Result of label vectorization, ordered by label.
#[derive(Debug, Clone)]
pub struct Vectorization {
    pub polygons: Vec<LabeledPolygon>,
    pub coverage: Coverage,
}

impl Vectorization {
    pub fn empty() -> Self {
        Self {
            polygons: Vec::new(),
            coverage: Coverage::Complete { cells: 0 },
        }
    }
}
