//! Records produced per product: pixel footprints and daily rows.

use chrono::NaiveDate;
use geo::Polygon;
use serde::Serialize;

use basin_common::PixelKey;

/// Basin overlap measurements for one footprint, in square meters of the
/// equal-area frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BasinAreas {
    pub area_m2: f64,
    pub area_ca: f64,
    pub area_ar: f64,
}

impl BasinAreas {
    /// Fraction of the cell inside the CA basin, 0 for degenerate cells.
    pub fn frac_ca(&self) -> f64 {
        fraction(self.area_ca, self.area_m2)
    }

    /// Fraction of the cell inside the AR basin, 0 for degenerate cells.
    pub fn frac_ar(&self) -> f64 {
        fraction(self.area_ar, self.area_m2)
    }

    /// Whether either basin overlap exceeds `min_area_m2`.
    pub fn touches_basins(&self, min_area_m2: f64) -> bool {
        self.area_ca > min_area_m2 || self.area_ar > min_area_m2
    }
}

fn fraction(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        part / whole
    } else {
        0.0
    }
}

/// The exact boundary of one native cell plus everything known about it.
#[derive(Debug, Clone)]
pub struct PixelFootprint {
    pub product: String,
    pub pixel_id: String,
    pub key: PixelKey,
    /// Cell boundary in the native frame
    pub geometry: Polygon<f64>,
    /// Centroid in the native frame; the daily sampling point
    pub reference_point: (f64, f64),
    pub scale_m: f64,
    pub areas: BasinAreas,
    pub center_lon: f64,
    pub center_lat: f64,
}

impl PixelFootprint {
    pub fn col(&self) -> u32 {
        self.key.col
    }

    pub fn row(&self) -> u32 {
        self.key.row
    }
}

/// One day's value for one footprint, with the footprint's attributes
/// carried along. Field order is the output column order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyRecord {
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    pub product: String,
    pub pixel_id: String,
    pub col: u32,
    pub row: u32,
    pub value: f64,
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
}

impl DailyRecord {
    /// Row for `footprint` on `date` carrying `value`.
    pub fn new(footprint: &PixelFootprint, date: NaiveDate, value: f64) -> Self {
        Self {
            date,
            product: footprint.product.clone(),
            pixel_id: footprint.pixel_id.clone(),
            col: footprint.col(),
            row: footprint.row(),
            value,
            scale_m: footprint.scale_m,
            area_m2: footprint.areas.area_m2,
            area_ca: footprint.areas.area_ca,
            area_ar: footprint.areas.area_ar,
            frac_ca: footprint.areas.frac_ca(),
            frac_ar: footprint.areas.frac_ar(),
        }
    }
}
