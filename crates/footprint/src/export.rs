//! CSV and GeoJSON files for footprint and daily tables, plus the basin
//! boundaries they were measured against.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use geo::{Coord, MapCoords, Polygon};
use serde::Serialize;
use tracing::info;

use basin_common::{CrsCode, DateWindow, NativeGrid};
use projection::Transformer;

use crate::basin::BasinSet;
use crate::error::{FootprintError, Result};
use crate::geojson::{Feature, FeatureCollection, Geometry};
use crate::pipeline::TableSink;
use crate::types::{DailyRecord, PixelFootprint};

/// Footprint attributes, in output column order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FootprintRow {
    pub product: String,
    pub pixel_id: String,
    pub col: u32,
    pub row: u32,
    pub scale_m: f64,
    pub area_m2: f64,
    #[serde(rename = "area_CA")]
    pub area_ca: f64,
    #[serde(rename = "area_AR")]
    pub area_ar: f64,
    #[serde(rename = "frac_CA")]
    pub frac_ca: f64,
    #[serde(rename = "frac_AR")]
    pub frac_ar: f64,
    pub center_lon: f64,
    pub center_lat: f64,
}

impl From<&PixelFootprint> for FootprintRow {
    fn from(fp: &PixelFootprint) -> Self {
        Self {
            product: fp.product.clone(),
            pixel_id: fp.pixel_id.clone(),
            col: fp.col(),
            row: fp.row(),
            scale_m: fp.scale_m,
            area_m2: fp.areas.area_m2,
            area_ca: fp.areas.area_ca,
            area_ar: fp.areas.area_ar,
            frac_ca: fp.areas.frac_ca(),
            frac_ar: fp.areas.frac_ar(),
            center_lon: fp.center_lon,
            center_lat: fp.center_lat,
        }
    }
}

/// Properties of an exported basin boundary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BasinProperties {
    pub basin: String,
    /// CRS the boundary was supplied in
    pub source_crs: String,
}

/// Writes each product's tables into one output directory.
#[derive(Debug, Clone)]
pub struct DirectoryExporter {
    dir: PathBuf,
}

impl DirectoryExporter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn footprint_csv_path(&self, product: &str) -> PathBuf {
        self.dir
            .join(format!("{}_nativegrid_pixel_footprints.csv", product))
    }

    pub fn footprint_geojson_path(&self, product: &str) -> PathBuf {
        self.dir
            .join(format!("{}_nativegrid_pixel_footprints.geojson", product))
    }

    pub fn daily_csv_path(&self, product: &str, window: &DateWindow) -> PathBuf {
        self.dir.join(format!(
            "{}_nativegrid_pixels_daily_{}.csv",
            product,
            window.year_span()
        ))
    }

    pub fn basin_geojson_path(&self) -> PathBuf {
        self.dir.join("basin_boundaries.geojson")
    }

    /// Write both basins in lon/lat so they can be overlaid on the footprint
    /// layers.
    pub fn write_basins(&self, basins: &BasinSet) -> Result<PathBuf> {
        self.ensure_dir()?;

        let to_lon_lat = Transformer::new(&basins.crs, &CrsCode::Epsg4326.definition())?;
        let features = [&basins.ca, &basins.ar]
            .into_iter()
            .map(|basin| {
                let geometry = basin.geometry.try_map_coords(|c| lon_lat(c, &to_lon_lat))?;
                Ok(Feature::new(
                    basin.name.clone(),
                    Geometry::from_multi_polygon(&geometry),
                    BasinProperties {
                        basin: basin.name.clone(),
                        source_crs: basins.crs.to_string(),
                    },
                ))
            })
            .collect::<Result<Vec<_>>>()?;

        let path = self.basin_geojson_path();
        let writer = BufWriter::new(File::create(&path)?);
        serde_json::to_writer(writer, &FeatureCollection::new(features))?;
        info!(path = %path.display(), "Wrote basin boundaries");
        Ok(path)
    }

    fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        Ok(())
    }
}

impl TableSink for DirectoryExporter {
    fn write_footprints(&self, product: &str, grid: &NativeGrid, footprints: &[PixelFootprint]) -> Result<()> {
        self.ensure_dir()?;

        let csv_path = self.footprint_csv_path(product);
        write_csv(&csv_path, footprints.iter().map(FootprintRow::from))?;

        let to_lon_lat = Transformer::new(&grid.crs, &CrsCode::Epsg4326.definition())?;
        let features = footprints
            .iter()
            .map(|fp| {
                let geometry = lon_lat_polygon(&fp.geometry, &to_lon_lat)?;
                Ok(Feature::new(
                    fp.pixel_id.clone(),
                    Geometry::from_polygon(&geometry),
                    FootprintRow::from(fp),
                ))
            })
            .collect::<Result<Vec<_>>>()?;
        let geojson_path = self.footprint_geojson_path(product);
        let writer = BufWriter::new(File::create(&geojson_path)?);
        serde_json::to_writer(writer, &FeatureCollection::new(features))?;

        info!(
            product = %product,
            rows = footprints.len(),
            csv = %csv_path.display(),
            geojson = %geojson_path.display(),
            "Wrote footprint table"
        );
        Ok(())
    }

    fn write_daily(&self, product: &str, window: &DateWindow, records: &[DailyRecord]) -> Result<()> {
        self.ensure_dir()?;
        let path = self.daily_csv_path(product, window);
        write_csv(&path, records.iter())?;
        info!(
            product = %product,
            rows = records.len(),
            path = %path.display(),
            "Wrote daily table"
        );
        Ok(())
    }
}

fn write_csv<T: Serialize>(path: &Path, rows: impl Iterator<Item = T>) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

fn lon_lat_polygon(polygon: &Polygon<f64>, transformer: &Transformer) -> Result<Polygon<f64>> {
    polygon.try_map_coords(|c| lon_lat(c, transformer))
}

fn lon_lat(c: Coord<f64>, transformer: &Transformer) -> Result<Coord<f64>> {
    transformer
        .transform(c.x, c.y)
        .map(|(x, y)| Coord { x, y })
        .ok_or_else(|| FootprintError::Reprojection(format!("({}, {}) has no lon/lat", c.x, c.y)))
}
