//! Temporary directories and on-disk fixtures.

use std::fs;
use std::path::{Path, PathBuf};

/// Creates a temporary directory for test output.
///
/// The directory is automatically cleaned up when the returned `TempDir` is dropped.
pub fn temp_test_dir() -> tempfile::TempDir {
    tempfile::tempdir().expect("Failed to create temporary test directory")
}

/// Writes an ESRI ASCII grid with a north-up lower-left corner header.
///
/// `values` are row-major with row 0 at the top (north).
#[allow(clippy::too_many_arguments)]
pub fn write_ascii_grid(
    path: &Path,
    cols: usize,
    rows: usize,
    xll: f64,
    yll: f64,
    cellsize: f64,
    nodata: f32,
    values: &[f32],
) -> PathBuf {
    assert_eq!(values.len(), cols * rows, "value count must match grid shape");
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create grid directory");
    }

    let mut text = format!(
        "ncols {}\nnrows {}\nxllcorner {}\nyllcorner {}\ncellsize {}\nNODATA_value {}\n",
        cols, rows, xll, yll, cellsize, nodata
    );
    for row in values.chunks(cols) {
        let line: Vec<String> = row.iter().map(|v| v.to_string()).collect();
        text.push_str(&line.join(" "));
        text.push('\n');
    }
    fs::write(path, text).expect("Failed to write ASCII grid");
    path.to_path_buf()
}
