//! Test data generators for creating synthetic daily frames.
//!
//! These generators create predictable, verifiable test data patterns
//! that can be used across the test suite.

/// Creates a test grid with predictable values.
///
/// Each cell value is calculated as: `col * 1000 + row`
///
/// This makes it easy to verify that data is being read/written correctly
/// by checking that grid[row][col] == col * 1000 + row.
///
/// # Arguments
///
/// * `width` - Number of columns
/// * `height` - Number of rows
///
/// # Returns
///
/// A `Vec<f32>` in row-major order (row 0 first, then row 1, etc.)
///
/// # Example
///
/// ```
/// use test_utils::create_test_grid;
///
/// let grid = create_test_grid(10, 5);
/// assert_eq!(grid.len(), 50); // 10 * 5
/// assert_eq!(grid[0], 0.0);   // col=0, row=0 -> 0*1000 + 0
/// assert_eq!(grid[1], 1000.0); // col=1, row=0 -> 1*1000 + 0
/// assert_eq!(grid[10], 1.0);  // col=0, row=1 -> 0*1000 + 1
/// ```
pub fn create_test_grid(width: usize, height: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            data.push((col * 1000 + row) as f32);
        }
    }
    data
}

/// Creates a grid with random-ish but deterministic precipitation values.
///
/// Uses a simple hash-based approach for reproducibility.
///
/// # Arguments
///
/// * `width` - Number of columns
/// * `height` - Number of rows
/// * `seed` - Seed value for deterministic generation
///
/// # Returns
///
/// A `Vec<f32>` with precipitation values in mm.
pub fn create_precipitation_grid(width: usize, height: usize, seed: u32) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            // Simple deterministic pseudo-random
            let hash = simple_hash(col as u32, row as u32, seed);
            // Most values are 0 (no precip), some are up to 50mm
            let precip = if hash % 4 == 0 {
                (hash % 5000) as f32 / 100.0 // 0 to 50mm
            } else {
                0.0
            };
            data.push(precip);
        }
    }
    data
}

/// Simple deterministic hash for reproducible test data.
fn simple_hash(x: u32, y: u32, seed: u32) -> u32 {
    let mut h = seed;
    h = h.wrapping_mul(31).wrapping_add(x);
    h = h.wrapping_mul(31).wrapping_add(y);
    h ^= h >> 16;
    h = h.wrapping_mul(0x85ebca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2ae35);
    h ^= h >> 16;
    h
}

/// Creates a grid filled with a constant value.
///
/// Useful for testing edge cases and simple scenarios.
///
/// # Arguments
///
/// * `width` - Number of columns
/// * `height` - Number of rows
/// * `value` - The constant value to fill
///
/// # Returns
///
/// A `Vec<f32>` filled with the constant value.
pub fn create_constant_grid(width: usize, height: usize, value: f32) -> Vec<f32> {
    vec![value; width * height]
}

/// Creates a grid with NaN values at specified positions.
///
/// Useful for testing missing data handling.
///
/// # Arguments
///
/// * `width` - Number of columns
/// * `height` - Number of rows
/// * `nan_positions` - List of (col, row) positions that should be NaN
///
/// # Returns
///
/// A `Vec<f32>` with NaN at specified positions, zeros elsewhere.
pub fn create_grid_with_nans(
    width: usize,
    height: usize,
    nan_positions: &[(usize, usize)],
) -> Vec<f32> {
    let mut data = vec![0.0f32; width * height];
    for &(col, row) in nan_positions {
        if col < width && row < height {
            data[row * width + col] = f32::NAN;
        }
    }
    data
}

/// Creates `days` precipitation frames for the same grid, one seed per day.
pub fn create_daily_precipitation(width: usize, height: usize, days: usize) -> Vec<Vec<f32>> {
    (0..days)
        .map(|day| create_precipitation_grid(width, height, day as u32 + 1))
        .collect()
}
