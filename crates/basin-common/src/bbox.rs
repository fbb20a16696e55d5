//! Bounding box types and operations.

use serde::{Deserialize, Serialize};

/// An axis-aligned envelope in a geographic or projected frame.
///
/// For geographic CRS, coordinates are in degrees.
/// For projected CRS (EPSG:5070, Daymet LCC), coordinates are in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// Create a new bounding box from corner coordinates.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Smallest box enclosing every point, or `None` for an empty iterator
    /// or when any coordinate is not finite.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let mut bbox: Option<BoundingBox> = None;
        for (x, y) in points {
            if !x.is_finite() || !y.is_finite() {
                return None;
            }
            bbox = Some(match bbox {
                None => BoundingBox::new(x, y, x, y),
                Some(b) => BoundingBox::new(b.min_x.min(x), b.min_y.min(y), b.max_x.max(x), b.max_y.max(y)),
            });
        }
        bbox
    }

    /// Check if this bbox intersects another with a positive-area overlap.
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min_x < other.max_x
            && self.max_x > other.min_x
            && self.min_y < other.max_y
            && self.max_y > other.min_y
    }

    /// Compute the intersection of two bounding boxes.
    pub fn intersection(&self, other: &BoundingBox) -> Option<BoundingBox> {
        if !self.intersects(other) {
            return None;
        }

        Some(BoundingBox {
            min_x: self.min_x.max(other.min_x),
            min_y: self.min_y.max(other.min_y),
            max_x: self.max_x.min(other.max_x),
            max_y: self.max_y.min(other.max_y),
        })
    }

    /// Smallest box covering both boxes.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    /// Grow the box by `distance` on every side (coordinate units).
    pub fn expand(&self, distance: f64) -> BoundingBox {
        BoundingBox {
            min_x: self.min_x - distance,
            min_y: self.min_y - distance,
            max_x: self.max_x + distance,
            max_y: self.max_y + distance,
        }
    }

    /// Points along the boundary, `per_edge` segments per side, counter-clockwise
    /// from the lower-left corner. Used to carry an envelope through a
    /// non-linear projection without losing its bulging edges.
    pub fn boundary_points(&self, per_edge: usize) -> Vec<(f64, f64)> {
        let n = per_edge.max(1);
        let corners = [
            (self.min_x, self.min_y),
            (self.max_x, self.min_y),
            (self.max_x, self.max_y),
            (self.min_x, self.max_y),
        ];
        let mut points = Vec::with_capacity(n * 4);
        for k in 0..4 {
            let (x0, y0) = corners[k];
            let (x1, y1) = corners[(k + 1) % 4];
            for s in 0..n {
                let t = s as f64 / n as f64;
                points.push((x0 + (x1 - x0) * t, y0 + (y1 - y0) * t));
            }
        }
        points
    }
}
