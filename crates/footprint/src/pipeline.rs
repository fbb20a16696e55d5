//! Per-product orchestration: grid, footprints, areas, identities, daily join.

use geo::Polygon;
use rayon::prelude::*;
use tracing::{info, warn};

use basin_common::{Crs, DateWindow, NativeGrid, PixelKey};

use crate::area::AreaFractionCalculator;
use crate::basin::BasinSet;
use crate::builder::FootprintBuilder;
use crate::config::PipelineConfig;
use crate::engine::{Coverage, GeometryEngine, LabeledPolygon, Vectorization};
use crate::error::{FootprintError, Result};
use crate::identity::{ensure_unique, PixelIndexAssigner};
use crate::join::TimeSeriesJoiner;
use crate::raster::RasterSource;
use crate::resolver::{GridResolver, ResolvedGrid};
use crate::types::{DailyRecord, PixelFootprint};

/// Destination for the two output tables of a product.
pub trait TableSink {
    /// Retained footprints with their native-frame geometry.
    fn write_footprints(&self, product: &str, grid: &NativeGrid, footprints: &[PixelFootprint]) -> Result<()>;

    /// Daily rows for the window.
    fn write_daily(&self, product: &str, window: &DateWindow, records: &[DailyRecord]) -> Result<()>;
}

/// A raster source and the band to extract from it.
pub struct ProductInput {
    pub source: Box<dyn RasterSource>,
    pub band: String,
}

/// Summary of one product run.
#[derive(Debug, Clone)]
pub struct ProductReport {
    pub product: String,
    pub band: String,
    pub grid: NativeGrid,
    /// Frames inside the window
    pub frames: usize,
    /// Footprints before the overlap filter
    pub footprints_total: usize,
    /// Footprints touching either basin
    pub footprints_kept: usize,
    pub daily_rows: usize,
    pub coverage: Coverage,
}

impl ProductReport {
    pub fn log(&self) {
        if let Coverage::Truncated { requested, processed } = self.coverage {
            warn!(
                product = %self.product,
                requested = requested,
                processed = processed,
                "Footprints cover only part of the region of interest"
            );
        }
        info!(
            product = %self.product,
            band = %self.band,
            crs = %self.grid.crs,
            scale_m = self.grid.nominal_scale,
            frames = self.frames,
            pixels_total = self.footprints_total,
            pixels_kept = self.footprints_kept,
            daily_rows = self.daily_rows,
            "Product complete"
        );
    }
}

/// Everything one product run produced.
#[derive(Debug, Clone)]
pub struct ProductOutput {
    pub report: ProductReport,
    pub footprints: Vec<PixelFootprint>,
    pub daily: Vec<DailyRecord>,
}

/// Runs the extraction stages for each product with one immutable
/// configuration, basin set and geometry engine.
pub struct Pipeline<E: GeometryEngine> {
    config: PipelineConfig,
    engine: E,
    basins: BasinSet,
    window: DateWindow,
    equal_area: Crs,
    pool: rayon::ThreadPool,
}

impl<E: GeometryEngine> Pipeline<E> {
    pub fn new(config: PipelineConfig, engine: E, basins: BasinSet) -> Result<Self> {
        config.validate().map_err(FootprintError::InvalidConfig)?;
        let window = config.window()?;
        let equal_area = config.equal_area()?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .thread_name(|i| format!("footprint-{}", i))
            .build()
            .map_err(|e| FootprintError::invalid_config(format!("worker pool: {}", e)))?;

        Ok(Self {
            config,
            engine,
            basins,
            window,
            equal_area,
            pool,
        })
    }

    pub fn window(&self) -> &DateWindow {
        &self.window
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every product and hand its tables to `sink`.
    ///
    /// Every product's grid is resolved first, so a missing band or an
    /// empty source fails the run before any geometry work.
    pub fn run(&self, products: &[ProductInput], sink: &dyn TableSink) -> Result<Vec<ProductReport>> {
        let resolved = products
            .iter()
            .map(|p| GridResolver::resolve(p.source.as_ref(), &p.band, &self.window))
            .collect::<Result<Vec<_>>>()?;

        let mut reports = Vec::with_capacity(products.len());
        for (product, resolved) in products.iter().zip(resolved) {
            let output = self
                .pool
                .install(|| self.process(product.source.as_ref(), &product.band, resolved))?;
            let name = product.source.product();
            sink.write_footprints(name, &output.report.grid, &output.footprints)?;
            sink.write_daily(name, &self.window, &output.daily)?;
            output.report.log();
            reports.push(output.report);
        }
        Ok(reports)
    }

    /// Run one product without exporting.
    pub fn run_product(&self, source: &dyn RasterSource, band: &str) -> Result<ProductOutput> {
        let resolved = GridResolver::resolve(source, band, &self.window)?;
        self.pool.install(|| self.process(source, band, resolved))
    }

    fn process(&self, source: &dyn RasterSource, band: &str, resolved: ResolvedGrid) -> Result<ProductOutput> {
        let product = source.product();
        let ResolvedGrid { grid, dates } = resolved;

        let builder = FootprintBuilder::new(&self.engine, self.config.vectorize);
        let vectorization =
            match builder.region_of_interest(&self.basins, &grid, &self.equal_area, self.config.buffer_m)? {
                Some(region) => builder.build(&grid, &region)?,
                None => {
                    warn!(product = %product, "Basins do not reach the native grid");
                    Vectorization::empty()
                }
            };

        let calculator = AreaFractionCalculator::new(&self.engine, &self.basins, grid.crs, self.equal_area)?;
        let assigner = PixelIndexAssigner::new(&self.engine, &grid, product);

        let footprints = vectorization
            .polygons
            .par_iter()
            .map(|labeled| {
                let polygon = single_polygon(labeled)?;
                let identity = assigner.assign(labeled.label, &polygon)?;
                let areas = calculator.compute(&polygon)?;
                Ok(PixelFootprint {
                    product: product.to_string(),
                    pixel_id: identity.pixel_id,
                    key: identity.key,
                    geometry: polygon,
                    reference_point: identity.centroid,
                    scale_m: grid.nominal_scale,
                    areas,
                    center_lon: identity.center_lon,
                    center_lat: identity.center_lat,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        ensure_unique(&footprints)?;

        let footprints_total = footprints.len();
        let kept: Vec<PixelFootprint> = footprints
            .into_iter()
            .filter(|fp| fp.areas.touches_basins(self.config.min_area_m2))
            .collect();
        info!(
            product = %product,
            pixels_total = footprints_total,
            pixels_kept = kept.len(),
            min_area_m2 = self.config.min_area_m2,
            "Filtered footprints by basin overlap"
        );

        let daily = TimeSeriesJoiner::join(source, band, &self.window, &kept)?;

        Ok(ProductOutput {
            report: ProductReport {
                product: product.to_string(),
                band: band.to_string(),
                grid,
                frames: dates.len(),
                footprints_total,
                footprints_kept: kept.len(),
                daily_rows: daily.len(),
                coverage: vectorization.coverage,
            },
            footprints: kept,
            daily,
        })
    }
}

/// The one polygon of a cell label.
fn single_polygon(labeled: &LabeledPolygon) -> Result<Polygon<f64>> {
    match labeled.geometry.0.as_slice() {
        [polygon] => Ok(polygon.clone()),
        parts => Err(FootprintError::identity(format!(
            "cell {} vectorized into {} parts",
            PixelKey::from_label(labeled.label),
            parts.len()
        ))),
    }
}
