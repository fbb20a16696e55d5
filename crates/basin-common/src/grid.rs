//! Native raster grid descriptors.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;

use crate::bbox::BoundingBox;
use crate::crs::Crs;
use crate::error::{GridError, GridResult};

/// Six-term affine cell transform in GDAL order.
///
/// ```text
/// x = origin_x + col * pixel_width  + row * row_rotation
/// y = origin_y + col * col_rotation + row * pixel_height
/// ```
///
/// `(col, row)` are continuous pixel coordinates: the upper-left corner of
/// cell `(c, r)` sits at `(c, r)` and its center at `(c + 0.5, r + 0.5)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub pixel_width: f64,
    #[serde(default)]
    pub row_rotation: f64,
    pub origin_y: f64,
    #[serde(default)]
    pub col_rotation: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    /// North-up transform anchored at the upper-left corner. `dx` and `dy`
    /// are positive cell sizes; rows advance southwards.
    pub fn north_up(origin_x: f64, origin_y: f64, dx: f64, dy: f64) -> Self {
        Self {
            origin_x,
            pixel_width: dx,
            row_rotation: 0.0,
            origin_y,
            col_rotation: 0.0,
            pixel_height: -dy,
        }
    }

    /// Build from the six GDAL coefficients.
    pub fn from_gdal(gt: [f64; 6]) -> Self {
        Self {
            origin_x: gt[0],
            pixel_width: gt[1],
            row_rotation: gt[2],
            origin_y: gt[3],
            col_rotation: gt[4],
            pixel_height: gt[5],
        }
    }

    /// The six GDAL coefficients.
    pub fn to_gdal(&self) -> [f64; 6] {
        [
            self.origin_x,
            self.pixel_width,
            self.row_rotation,
            self.origin_y,
            self.col_rotation,
            self.pixel_height,
        ]
    }

    /// Determinant of the linear part; signed cell area in map units.
    pub fn determinant(&self) -> f64 {
        self.pixel_width * self.pixel_height - self.row_rotation * self.col_rotation
    }

    /// Pixel coordinates to map coordinates.
    pub fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.origin_x + col * self.pixel_width + row * self.row_rotation,
            self.origin_y + col * self.col_rotation + row * self.pixel_height,
        )
    }

    /// Map coordinates to continuous pixel coordinates.
    ///
    /// Returns `None` when the transform is singular.
    pub fn invert(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let det = self.determinant();
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        let dx = x - self.origin_x;
        let dy = y - self.origin_y;
        let col = (self.pixel_height * dx - self.row_rotation * dy) / det;
        let row = (-self.col_rotation * dx + self.pixel_width * dy) / det;
        Some((col, row))
    }
}

/// Composite identity of one native cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PixelKey {
    pub col: u32,
    pub row: u32,
}

impl PixelKey {
    pub fn new(col: u32, row: u32) -> Self {
        Self { col, row }
    }

    /// Collision-free 64-bit label: column in the high half, row in the low half.
    pub fn label(&self) -> u64 {
        ((self.col as u64) << 32) | self.row as u64
    }

    /// Inverse of [`PixelKey::label`].
    pub fn from_label(label: u64) -> Self {
        Self {
            col: (label >> 32) as u32,
            row: (label & 0xFFFF_FFFF) as u32,
        }
    }
}

impl fmt::Display for PixelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}_r{}", self.col, self.row)
    }
}

/// A rectangular block of cells in pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellWindow {
    pub col_start: u32,
    pub row_start: u32,
    pub cols: u32,
    pub rows: u32,
}

impl CellWindow {
    pub fn new(col_start: u32, row_start: u32, cols: u32, rows: u32) -> Self {
        Self {
            col_start,
            row_start,
            cols,
            rows,
        }
    }

    /// Number of cells in the window.
    pub fn len(&self) -> u64 {
        self.cols as u64 * self.rows as u64
    }

    pub fn is_empty(&self) -> bool {
        self.cols == 0 || self.rows == 0
    }

    /// Exclusive end column.
    pub fn col_end(&self) -> u32 {
        self.col_start + self.cols
    }

    /// Exclusive end row.
    pub fn row_end(&self) -> u32 {
        self.row_start + self.rows
    }

    pub fn contains(&self, key: PixelKey) -> bool {
        key.col >= self.col_start
            && key.col < self.col_end()
            && key.row >= self.row_start
            && key.row < self.row_end()
    }

    /// Cells in row-major order.
    pub fn keys(&self) -> impl Iterator<Item = PixelKey> + '_ {
        (self.row_start..self.row_end())
            .flat_map(move |row| (self.col_start..self.col_end()).map(move |col| PixelKey::new(col, row)))
    }

    /// Split into row-major tiles of at most `tile_size` x `tile_size` cells.
    pub fn tiles(&self, tile_size: u32) -> Vec<CellWindow> {
        let step = tile_size.max(1);
        let mut tiles = Vec::new();
        let mut row = self.row_start;
        while row < self.row_end() {
            let rows = step.min(self.row_end() - row);
            let mut col = self.col_start;
            while col < self.col_end() {
                let cols = step.min(self.col_end() - col);
                tiles.push(CellWindow::new(col, row, cols, rows));
                col += cols;
            }
            row += rows;
        }
        tiles
    }
}

/// Immutable descriptor of a product's native raster grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NativeGrid {
    pub crs: Crs,
    pub transform: GeoTransform,
    pub cols: u32,
    pub rows: u32,
    /// Nominal linear cell size in meters
    pub nominal_scale: f64,
}

impl NativeGrid {
    /// Create a grid descriptor; the nominal scale is derived from the
    /// transform and CRS.
    pub fn new(crs: Crs, transform: GeoTransform, cols: u32, rows: u32) -> GridResult<Self> {
        if cols == 0 || rows == 0 {
            return Err(GridError::InvalidShape { cols, rows });
        }
        let det = transform.determinant();
        if det == 0.0 || !det.is_finite() {
            return Err(GridError::SingularTransform(format!("{:?}", transform.to_gdal())));
        }
        let nominal_scale = nominal_scale(&crs, &transform);
        Ok(Self {
            crs,
            transform,
            cols,
            rows,
            nominal_scale,
        })
    }

    /// The whole grid as a cell window.
    pub fn full_window(&self) -> CellWindow {
        CellWindow::new(0, 0, self.cols, self.rows)
    }

    /// Continuous pixel coordinates of a map point.
    pub fn pixel_coordinates(&self, x: f64, y: f64) -> (f64, f64) {
        // Constructor rejects singular transforms.
        self.transform.invert(x, y).unwrap_or((f64::NAN, f64::NAN))
    }

    /// The cell containing a map point, by flooring its pixel coordinates.
    pub fn cell_at(&self, x: f64, y: f64) -> Option<PixelKey> {
        let (col, row) = self.pixel_coordinates(x, y);
        let (col, row) = (col.floor(), row.floor());
        if !col.is_finite() || !row.is_finite() {
            return None;
        }
        if col < 0.0 || row < 0.0 || col >= self.cols as f64 || row >= self.rows as f64 {
            return None;
        }
        Some(PixelKey::new(col as u32, row as u32))
    }

    /// Corners of a cell in map coordinates: upper-left, upper-right,
    /// lower-right, lower-left in pixel space.
    pub fn cell_corners(&self, key: PixelKey) -> [(f64, f64); 4] {
        let c = key.col as f64;
        let r = key.row as f64;
        [
            self.transform.apply(c, r),
            self.transform.apply(c + 1.0, r),
            self.transform.apply(c + 1.0, r + 1.0),
            self.transform.apply(c, r + 1.0),
        ]
    }

    /// Center of a cell in map coordinates.
    pub fn cell_center(&self, key: PixelKey) -> (f64, f64) {
        self.transform.apply(key.col as f64 + 0.5, key.row as f64 + 0.5)
    }

    /// Envelope of the full grid in map coordinates.
    pub fn extent(&self) -> BoundingBox {
        let (c, r) = (self.cols as f64, self.rows as f64);
        let corners = [
            self.transform.apply(0.0, 0.0),
            self.transform.apply(c, 0.0),
            self.transform.apply(c, r),
            self.transform.apply(0.0, r),
        ];
        let xs = corners.iter().map(|p| p.0);
        let ys = corners.iter().map(|p| p.1);
        BoundingBox::new(
            xs.clone().fold(f64::INFINITY, f64::min),
            ys.clone().fold(f64::INFINITY, f64::min),
            xs.fold(f64::NEG_INFINITY, f64::max),
            ys.fold(f64::NEG_INFINITY, f64::max),
        )
    }

    /// Cells whose footprint can intersect `bbox` (map coordinates), clamped
    /// to the grid. `None` when the box misses the grid entirely.
    pub fn window_covering(&self, bbox: &BoundingBox) -> Option<CellWindow> {
        let corners = [
            self.pixel_coordinates(bbox.min_x, bbox.min_y),
            self.pixel_coordinates(bbox.max_x, bbox.min_y),
            self.pixel_coordinates(bbox.max_x, bbox.max_y),
            self.pixel_coordinates(bbox.min_x, bbox.max_y),
        ];
        let pixel_box = BoundingBox::from_points(corners)?;

        let col_start = pixel_box.min_x.floor().max(0.0);
        let row_start = pixel_box.min_y.floor().max(0.0);
        let col_end = pixel_box.max_x.ceil().min(self.cols as f64);
        let row_end = pixel_box.max_y.ceil().min(self.rows as f64);

        if col_end <= col_start || row_end <= row_start {
            return None;
        }

        Some(CellWindow::new(
            col_start as u32,
            row_start as u32,
            (col_end - col_start) as u32,
            (row_end - row_start) as u32,
        ))
    }
}

/// Linear size of one cell step along a row, in meters.
///
/// For geographic grids the angular size is converted at the equator, which
/// matches how nominal scales are reported for lon/lat products.
fn nominal_scale(crs: &Crs, transform: &GeoTransform) -> f64 {
    let step = transform.pixel_width.hypot(transform.col_rotation);
    match crs {
        Crs::Geographic { ellipsoid } => step * PI / 180.0 * ellipsoid.semi_major(),
        _ => step,
    }
}
