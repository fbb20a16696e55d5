//! ESRI ASCII grid frames laid out as `<root>/<band>/*<date>*.asc`.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info};

use basin_common::{Crs, GeoTransform, NativeGrid};

use super::{Frame, RasterSource};
use crate::error::{FootprintError, Result};

/// Directory of daily ASCII grids, one sub-directory per band.
///
/// The CRS is not recorded in the files and is supplied by configuration.
#[derive(Debug, Clone)]
pub struct AsciiGridSource {
    product: String,
    crs: Crs,
    root: PathBuf,
    files: BTreeMap<String, BTreeMap<NaiveDate, PathBuf>>,
}

impl AsciiGridSource {
    /// Index every `<band>/*.asc` file below `root` whose name carries a date.
    pub fn open(product: impl Into<String>, root: impl AsRef<Path>, crs: Crs) -> Result<Self> {
        let product = product.into();
        let root = root.as_ref().to_path_buf();
        let mut files: BTreeMap<String, BTreeMap<NaiveDate, PathBuf>> = BTreeMap::new();

        for entry in walkdir::WalkDir::new(&root).min_depth(2).max_depth(2) {
            let entry = entry.map_err(|e| FootprintError::raster(e.to_string()))?;
            let path = entry.path();
            if !entry.file_type().is_file()
                || path.extension().and_then(|e| e.to_str()) != Some("asc")
            {
                continue;
            }
            let band = path
                .parent()
                .and_then(|p| p.file_name())
                .and_then(|n| n.to_str());
            let date = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(date_from_name);
            match (band, date) {
                (Some(band), Some(date)) => {
                    files
                        .entry(band.to_string())
                        .or_default()
                        .insert(date, path.to_path_buf());
                }
                _ => debug!(path = %path.display(), "Skipping grid without band or date"),
            }
        }

        info!(
            product = %product,
            root = %root.display(),
            bands = files.len(),
            frames = files.values().map(|f| f.len()).sum::<usize>(),
            "Indexed ASCII grid source"
        );

        Ok(Self {
            product,
            crs,
            root,
            files,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, band: &str, date: NaiveDate) -> Result<&PathBuf> {
        let frames = self.files.get(band).ok_or_else(|| self.unknown_band(band))?;
        frames.get(&date).ok_or_else(|| {
            FootprintError::raster(format!("{} has no '{}' frame for {}", self.product, band, date))
        })
    }
}

impl RasterSource for AsciiGridSource {
    fn product(&self) -> &str {
        &self.product
    }

    fn bands(&self) -> Vec<String> {
        self.files.keys().cloned().collect()
    }

    fn dates(&self, band: &str) -> Vec<NaiveDate> {
        self.files
            .get(band)
            .map(|frames| frames.keys().copied().collect())
            .unwrap_or_default()
    }

    fn frame(&self, band: &str, date: NaiveDate) -> Result<Arc<Frame>> {
        let path = self.path(band, date)?;
        let reader = BufReader::new(File::open(path)?);
        let mut lines = reader.lines();
        let (header, first_data) = read_header(&mut lines, path)?;
        let grid = header.grid(self.crs)?;

        let mut values = Vec::with_capacity(header.cols as usize * header.rows as usize);
        for line in first_data.into_iter().map(Ok).chain(lines) {
            for token in line?.split_whitespace() {
                let v: f32 = token.parse().map_err(|_| {
                    FootprintError::raster(format!("{}: bad value '{}'", path.display(), token))
                })?;
                values.push(v);
            }
        }

        Ok(Arc::new(Frame::new(date, grid, values, header.nodata)?))
    }

    fn grid(&self, band: &str, date: NaiveDate) -> Result<NativeGrid> {
        let path = self.path(band, date)?;
        let reader = BufReader::new(File::open(path)?);
        let (header, _) = read_header(&mut reader.lines(), path)?;
        header.grid(self.crs)
    }
}

/// Parsed ASCII grid header, corners already resolved.
#[derive(Debug, Clone, Copy, PartialEq)]
struct AsciiHeader {
    cols: u32,
    rows: u32,
    xll: f64,
    yll: f64,
    dx: f64,
    dy: f64,
    nodata: Option<f32>,
}

impl AsciiHeader {
    fn grid(&self, crs: Crs) -> Result<NativeGrid> {
        let top = self.yll + self.rows as f64 * self.dy;
        Ok(NativeGrid::new(
            crs,
            GeoTransform::north_up(self.xll, top, self.dx, self.dy),
            self.cols,
            self.rows,
        )?)
    }
}

/// Read `key value` lines until the first data line, which is returned
/// alongside the header.
fn read_header<B: BufRead>(
    lines: &mut std::io::Lines<B>,
    path: &Path,
) -> Result<(AsciiHeader, Option<String>)> {
    let mut entries: BTreeMap<String, f64> = BTreeMap::new();
    let mut first_data = None;

    for line in lines.by_ref() {
        let line = line?;
        let mut parts = line.split_whitespace();
        let Some(key) = parts.next() else { continue };
        if !key.starts_with(|c: char| c.is_ascii_alphabetic()) {
            first_data = Some(line);
            break;
        }
        let value = parts
            .next()
            .and_then(|v| v.parse::<f64>().ok())
            .ok_or_else(|| {
                FootprintError::raster(format!("{}: bad header line '{}'", path.display(), line))
            })?;
        entries.insert(key.to_ascii_lowercase(), value);
    }

    let get = |key: &str| {
        entries.get(key).copied().ok_or_else(|| {
            FootprintError::raster(format!("{}: header is missing '{}'", path.display(), key))
        })
    };

    let cols = get("ncols")? as u32;
    let rows = get("nrows")? as u32;
    let (dx, dy) = match entries.get("cellsize") {
        Some(&size) => (size, size),
        None => (get("dx")?, get("dy")?),
    };
    let xll = match entries.get("xllcenter") {
        Some(&center) => center - dx / 2.0,
        None => get("xllcorner")?,
    };
    let yll = match entries.get("yllcenter") {
        Some(&center) => center - dy / 2.0,
        None => get("yllcorner")?,
    };
    let nodata = entries.get("nodata_value").map(|v| *v as f32);

    Ok((
        AsciiHeader {
            cols,
            rows,
            xll,
            yll,
            dx,
            dy,
            nodata,
        },
        first_data,
    ))
}

/// First `yyyy-mm-dd` or `yyyymmdd` run in a file stem.
fn date_from_name(stem: &str) -> Option<NaiveDate> {
    let bytes = stem.as_bytes();
    for start in 0..bytes.len() {
        if let Some(slice) = stem.get(start..start + 10) {
            let b = slice.as_bytes();
            if b[4] == b'-' && b[7] == b'-' {
                if let Ok(date) = NaiveDate::parse_from_str(slice, "%Y-%m-%d") {
                    return Some(date);
                }
            }
        }
        if let Some(slice) = stem.get(start..start + 8) {
            if slice.bytes().all(|b| b.is_ascii_digit()) {
                if let Ok(date) = NaiveDate::parse_from_str(slice, "%Y%m%d") {
                    return Some(date);
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_date_from_name() {
        let d = NaiveDate::from_ymd_opt(2017, 3, 9).unwrap();
        assert_eq!(date_from_name("daymet_v4_prcp_20170309_na"), Some(d));
        assert_eq!(date_from_name("pr_2017-03-09"), Some(d));
        assert_eq!(date_from_name("pr_climatology"), None);
    }

    #[test]
    fn test_header_with_center_registration() {
        let text = "NCOLS 4\nNROWS 2\nXLLCENTER 0.5\nYLLCENTER 10.5\nCELLSIZE 1\nNODATA_VALUE -9999\n1 2 3 4\n";
        let mut lines = Cursor::new(text).lines();
        let (header, first) = read_header(&mut lines, Path::new("t.asc")).unwrap();
        assert_eq!(header.cols, 4);
        assert_eq!(header.rows, 2);
        assert_eq!(header.xll, 0.0);
        assert_eq!(header.yll, 10.0);
        assert_eq!(header.nodata, Some(-9999.0));
        assert_eq!(first.as_deref(), Some("1 2 3 4"));
    }

    #[test]
    fn test_header_missing_field() {
        let text = "ncols 4\nnrows 2\ncellsize 1\n1 2 3 4\n";
        let mut lines = Cursor::new(text).lines();
        assert!(read_header(&mut lines, Path::new("t.asc")).is_err());
    }
}
