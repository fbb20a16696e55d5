//! Daily per-pixel tables.

use chrono::NaiveDate;
use rayon::prelude::*;
use tracing::{debug, info};

use basin_common::DateWindow;

use crate::error::Result;
use crate::raster::RasterSource;
use crate::types::{DailyRecord, PixelFootprint};

/// Samples every footprint at its reference point on every frame of the
/// window.
///
/// Frames are processed in parallel on the current rayon pool; run inside
/// `ThreadPool::install` to bound the number of workers.
pub struct TimeSeriesJoiner;

impl TimeSeriesJoiner {
    /// Rows ordered by (date, pixel id), one per footprint and day that has
    /// a value. Days without a value for a footprint are omitted.
    pub fn join(
        source: &dyn RasterSource,
        band: &str,
        window: &DateWindow,
        footprints: &[PixelFootprint],
    ) -> Result<Vec<DailyRecord>> {
        if footprints.is_empty() {
            return Ok(Vec::new());
        }

        let dates: Vec<NaiveDate> = source
            .dates(band)
            .into_iter()
            .filter(|d| window.contains(*d))
            .collect();

        let per_day = dates
            .par_iter()
            .map(|&date| {
                let frame = source.frame(band, date)?;
                let rows: Vec<DailyRecord> = footprints
                    .iter()
                    .filter_map(|fp| {
                        let (x, y) = fp.reference_point;
                        frame
                            .sample_point(x, y)
                            .filter(|v| v.is_finite())
                            .map(|v| DailyRecord::new(fp, date, v))
                    })
                    .collect();
                debug!(date = %date, rows = rows.len(), "Sampled frame");
                Ok(rows)
            })
            .collect::<Result<Vec<_>>>()?;

        let mut records: Vec<DailyRecord> = per_day.into_iter().flatten().collect();
        records.sort_by(|a, b| (a.date, &a.pixel_id).cmp(&(b.date, &b.pixel_id)));
        records.dedup_by(|a, b| a.date == b.date && a.pixel_id == b.pixel_id && a.product == b.product);

        info!(
            product = %source.product(),
            frames = dates.len(),
            footprints = footprints.len(),
            rows = records.len(),
            "Joined daily values"
        );
        Ok(records)
    }
}
