//! Configuration for footprint extraction.

use std::path::PathBuf;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use basin_common::{parse_date, Crs, CrsCode, CrsSpec, DateWindow};

use crate::error::{FootprintError, Result};
use crate::raster::{AsciiGridSource, RasterSource};

/// Configuration shared by every product run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// First day of the window (inclusive).
    pub start: NaiveDate,

    /// Last day of the window (exclusive).
    pub end: NaiveDate,

    /// Buffer around the basins' envelope, in meters.
    pub buffer_m: f64,

    /// A footprint is kept when either basin overlap exceeds this, in m².
    pub min_area_m2: f64,

    /// Maximum geometric error allowed in reprojection and overlay, in meters.
    pub tolerance_m: f64,

    /// Frame in which every area is measured.
    pub equal_area_crs: CrsSpec,

    /// Worker threads for vectorization, overlay and daily sampling.
    pub workers: usize,

    /// Vectorization tiling and budget.
    pub vectorize: VectorizeOptions,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            start: NaiveDate::from_ymd_opt(2017, 1, 1).unwrap_or_default(),
            end: NaiveDate::from_ymd_opt(2019, 1, 1).unwrap_or_default(),
            buffer_m: 8000.0,
            min_area_m2: 1.0,
            tolerance_m: 1.0,
            equal_area_crs: CrsCode::Epsg5070.into(),
            workers: 4,
            vectorize: VectorizeOptions::default(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from environment variables on top of the defaults.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply environment overrides to an already loaded configuration.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("WINDOW_START") {
            if let Ok(date) = parse_date(&val) {
                self.start = date;
            }
        }

        if let Ok(val) = std::env::var("WINDOW_END") {
            if let Ok(date) = parse_date(&val) {
                self.end = date;
            }
        }

        if let Ok(val) = std::env::var("BUFFER_M") {
            if let Ok(buffer) = val.parse() {
                self.buffer_m = buffer;
            }
        }

        if let Ok(val) = std::env::var("MIN_AREA_M2") {
            if let Ok(area) = val.parse() {
                self.min_area_m2 = area;
            }
        }

        if let Ok(val) = std::env::var("TOLERANCE_M") {
            if let Ok(tolerance) = val.parse() {
                self.tolerance_m = tolerance;
            }
        }

        if let Ok(val) = std::env::var("EQUAL_AREA_CRS") {
            self.equal_area_crs = CrsSpec::Code(val);
        }

        if let Ok(val) = std::env::var("EXTRACT_WORKERS") {
            if let Ok(workers) = val.parse() {
                self.workers = workers;
            }
        }

        self.vectorize = self.vectorize.with_env_overrides();
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.start >= self.end {
            return Err(format!(
                "window start {} must precede end {}",
                self.start, self.end
            ));
        }

        if !(self.buffer_m >= 0.0) {
            return Err("buffer_m must be >= 0".to_string());
        }

        if !(self.min_area_m2 >= 0.0) {
            return Err("min_area_m2 must be >= 0".to_string());
        }

        if !(self.tolerance_m > 0.0) {
            return Err("tolerance_m must be > 0".to_string());
        }

        if self.workers == 0 {
            return Err("workers must be > 0".to_string());
        }

        match self.equal_area_crs.resolve() {
            Ok(crs) if crs.is_equal_area() => {}
            Ok(crs) => return Err(format!("equal_area_crs {} does not preserve area", crs)),
            Err(e) => return Err(format!("equal_area_crs: {}", e)),
        }

        self.vectorize.validate()
    }

    /// The configured date window.
    pub fn window(&self) -> Result<DateWindow> {
        Ok(DateWindow::new(self.start, self.end)?)
    }

    /// The resolved equal-area frame.
    pub fn equal_area(&self) -> Result<Crs> {
        Ok(self.equal_area_crs.resolve()?)
    }
}

/// Tiling and budget for vectorization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorizeOptions {
    /// Tile edge length in cells.
    pub tile_size: u32,

    /// Maximum number of cells vectorized per product.
    pub max_cells: u64,

    /// Report partial coverage instead of failing when over budget.
    pub best_effort: bool,
}

impl Default for VectorizeOptions {
    fn default() -> Self {
        Self {
            tile_size: 256,
            max_cells: 10_000_000_000,
            best_effort: true,
        }
    }
}

impl VectorizeOptions {
    fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("VECTORIZE_TILE_SIZE") {
            if let Ok(size) = val.parse() {
                self.tile_size = size;
            }
        }

        if let Ok(val) = std::env::var("VECTORIZE_MAX_CELLS") {
            if let Ok(cells) = val.parse() {
                self.max_cells = cells;
            }
        }

        if let Ok(val) = std::env::var("VECTORIZE_BEST_EFFORT") {
            self.best_effort = val.to_lowercase() == "true" || val == "1";
        }

        self
    }

    /// Validate the vectorization options.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.tile_size == 0 {
            return Err("vectorize tile_size must be > 0".to_string());
        }

        if self.max_cells == 0 {
            return Err("vectorize max_cells must be > 0".to_string());
        }

        Ok(())
    }
}

// ============================================================================
// Product Configuration
// ============================================================================

/// One precipitation product to process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductConfig {
    /// Product name used in identities and output file names.
    pub name: String,

    /// Band selector, e.g. `prcp` or `pr`.
    pub band: String,

    /// CRS of the product's frames.
    pub crs: CrsSpec,

    /// Where the frames live.
    pub source: SourceConfig,
}

/// Raster source location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    /// Directory of `<band>/*<date>*.asc` files.
    AsciiGrid { root: PathBuf },
}

impl ProductConfig {
    /// Validate the product configuration.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("product name must not be empty".to_string());
        }

        if self.band.trim().is_empty() {
            return Err(format!("product {} has an empty band selector", self.name));
        }

        self.crs
            .resolve()
            .map(|_| ())
            .map_err(|e| format!("product {}: {}", self.name, e))
    }

    /// Open the configured raster source.
    pub fn open(&self) -> Result<Box<dyn RasterSource>> {
        let crs = self.crs.resolve()?;
        match &self.source {
            SourceConfig::AsciiGrid { root } => {
                if !root.is_dir() {
                    return Err(FootprintError::invalid_config(format!(
                        "product {}: source root {} is not a directory",
                        self.name,
                        root.display()
                    )));
                }
                Ok(Box::new(AsciiGridSource::open(&self.name, root, crs)?))
            }
        }
    }
}
