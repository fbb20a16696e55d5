//! Native-Grid Pixel Footprints for Basin Precipitation
//!
//! This crate turns each gridded precipitation product into polygons of its
//! own native cells, measures how much of every cell lies inside two
//! watersheds, and joins daily values onto the cells that touch either
//! basin. Nothing is resampled: footprints follow the product's grid in its
//! own CRS, and areas are measured in an equal-area frame.
//!
//! # Architecture
//!
//! ```text
//! RasterSource (per product)
//!      │
//!      ▼
//! GridResolver::resolve(band, window)
//!      │
//!      ▼
//! FootprintBuilder ──► region of interest ──► labeled cells ──► polygons
//!      │
//!      ├─► AreaFractionCalculator (area_m2, area_CA, area_AR)
//!      │
//!      ├─► PixelIndexAssigner (col, row, pixel_id, lon/lat)
//!      │
//!      └─► TimeSeriesJoiner (one row per footprint per day)
//!               │
//!               ▼
//!          TableSink (CSV + GeoJSON)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use footprint::{Basin, BasinSet, DirectoryExporter, Pipeline, PipelineConfig, PlanarEngine};
//!
//! let config = PipelineConfig::from_env();
//! let basins = BasinSet::new(
//!     Basin::from_geojson_file("CA", "basins/ca.geojson")?,
//!     Basin::from_geojson_file("AR", "basins/ar.geojson")?,
//! );
//! let pipeline = Pipeline::new(config.clone(), PlanarEngine::new(config.tolerance_m), basins)?;
//! let reports = pipeline.run(&products, &DirectoryExporter::new("out"))?;
//! ```

pub mod area;
pub mod basin;
pub mod builder;
pub mod config;
pub mod engine;
pub mod error;
pub mod export;
pub mod geojson;
pub mod identity;
pub mod join;
pub mod pipeline;
pub mod raster;
pub mod resolver;
pub mod types;

// Re-export commonly used types at crate root
pub use area::AreaFractionCalculator;
pub use basin::{Basin, BasinSet};
pub use builder::FootprintBuilder;
pub use config::{PipelineConfig, ProductConfig, SourceConfig, VectorizeOptions};
pub use engine::{Coverage, GeometryEngine, LabelField, LabeledPolygon, PlanarEngine, Vectorization};
pub use error::{FootprintError, Result};
pub use export::{BasinProperties, DirectoryExporter, FootprintRow};
pub use identity::{ensure_unique, pixel_id, PixelIdentity, PixelIndexAssigner};
pub use join::TimeSeriesJoiner;
pub use pipeline::{Pipeline, ProductInput, ProductOutput, ProductReport, TableSink};
pub use raster::{AsciiGridSource, Frame, InMemoryRaster, RasterSource};
pub use resolver::{GridResolver, ResolvedGrid};
pub use types::{BasinAreas, DailyRecord, PixelFootprint};
