//! End-to-end tests of per-product extraction.

use std::collections::HashSet;
use std::sync::Mutex;

use chrono::NaiveDate;
use geo::{Coord, LineString, MultiPolygon, Polygon};

use basin_common::{CrsCode, DateWindow, NativeGrid, PixelKey};
use footprint::{
    Basin, BasinSet, Coverage, DailyRecord, FootprintError, Frame, GeometryEngine, InMemoryRaster,
    Pipeline, PipelineConfig, PixelFootprint, PlanarEngine, ProductInput, TableSink,
    VectorizeOptions,
};
use test_utils::fixtures::{basin, grid, time};
use test_utils::{assert_approx_eq, create_daily_precipitation, create_grid_with_nans, create_test_grid};

// ============================================================================
// Helpers
// ============================================================================

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2017, 1, d).unwrap()
}

fn unit_config() -> PipelineConfig {
    PipelineConfig {
        start: day(1),
        end: day(4),
        buffer_m: 0.0,
        min_area_m2: 1e-6,
        tolerance_m: 1e-3,
        workers: 2,
        ..PipelineConfig::default()
    }
}

/// CA covers the top-left 1.5 x 1.5 of the unit grid, AR lies far away.
fn unit_basins() -> BasinSet {
    BasinSet::in_crs(
        Basin::new("CA", basin::unit_top_left()).unwrap(),
        Basin::new("AR", basin::unit_far_away()).unwrap(),
        CrsCode::Epsg5070.definition(),
    )
}

fn unit_pipeline(config: PipelineConfig) -> Pipeline<PlanarEngine> {
    let engine = PlanarEngine::new(config.tolerance_m);
    Pipeline::new(config, engine, unit_basins()).unwrap()
}

fn frames_source(product: &str, band: &str, g: &NativeGrid, frames: Vec<(NaiveDate, Vec<f32>)>) -> InMemoryRaster {
    let mut source = InMemoryRaster::new(product);
    for (date, values) in frames {
        source.insert(band, Frame::new(date, g.clone(), values, Some(-9999.0)).unwrap());
    }
    source
}

fn find<'a>(footprints: &'a [PixelFootprint], col: u32, row: u32) -> &'a PixelFootprint {
    footprints
        .iter()
        .find(|fp| fp.key == PixelKey::new(col, row))
        .unwrap_or_else(|| panic!("no footprint for c{} r{}", col, row))
}

fn assert_daily_invariants(records: &[DailyRecord], footprints: &[PixelFootprint], window: &DateWindow) {
    let ids: HashSet<&str> = footprints.iter().map(|fp| fp.pixel_id.as_str()).collect();
    let mut seen = HashSet::new();
    for r in records {
        assert!(window.contains(r.date), "{} outside {}", r.date, window);
        assert!(ids.contains(r.pixel_id.as_str()), "{} has no footprint", r.pixel_id);
        assert!(seen.insert((r.date, r.pixel_id.clone())), "duplicate row {} {}", r.date, r.pixel_id);
        assert!(r.value.is_finite());
        assert!((0.0..=1.0 + 1e-9).contains(&r.frac_ca));
        assert!((0.0..=1.0 + 1e-9).contains(&r.frac_ar));
    }
}

/// Polygon in `from` carried to lon/lat through the engine.
fn lon_lat_basin(engine: &PlanarEngine, from: &basin_common::Crs, ring: &[(f64, f64)]) -> MultiPolygon<f64> {
    let exterior: LineString<f64> = ring.iter().map(|&(x, y)| Coord { x, y }).collect::<Vec<_>>().into();
    let native = MultiPolygon(vec![Polygon::new(exterior, Vec::new())]);
    engine
        .reproject(&native, from, &CrsCode::Epsg4326.definition())
        .unwrap()
}

#[derive(Default)]
struct RecordingSink {
    footprints: Mutex<Vec<(String, usize)>>,
    daily: Mutex<Vec<(String, usize)>>,
}

impl TableSink for RecordingSink {
    fn write_footprints(&self, product: &str, _grid: &NativeGrid, footprints: &[PixelFootprint]) -> footprint::Result<()> {
        self.footprints
            .lock()
            .unwrap()
            .push((product.to_string(), footprints.len()));
        Ok(())
    }

    fn write_daily(&self, product: &str, _window: &DateWindow, records: &[DailyRecord]) -> footprint::Result<()> {
        self.daily.lock().unwrap().push((product.to_string(), records.len()));
        Ok(())
    }
}

// ============================================================================
// Unit grid scenarios
// ============================================================================

#[test]
fn test_unit_grid_area_fractions() {
    let g = grid::unit_grid_3x3();
    let source = frames_source(
        "UNIT",
        "prcp",
        &g,
        (1..=3).map(|d| (day(d), create_test_grid(3, 3))).collect(),
    );
    let pipeline = unit_pipeline(unit_config());
    let out = pipeline.run_product(&source, "prcp").unwrap();

    // Region rows 0..=1 are vectorized, only four cells touch CA.
    assert_eq!(out.report.footprints_total, 6);
    assert_eq!(out.report.footprints_kept, 4);
    assert_eq!(out.footprints.len(), 4);

    for (col, row, frac) in [(0, 0, 1.0), (1, 0, 0.5), (0, 1, 0.5), (1, 1, 0.25)] {
        let fp = find(&out.footprints, col, row);
        assert_approx_eq!(fp.areas.area_m2, 1.0, 1e-9);
        assert_approx_eq!(fp.areas.frac_ca(), frac, 1e-9);
        assert_approx_eq!(fp.areas.area_ar, 0.0, 1e-12);
        assert_eq!(fp.pixel_id, format!("UNIT_c{}_r{}", col, row));
        assert_eq!(fp.scale_m, 1.0);
    }
    assert!(out.footprints.iter().all(|fp| fp.col() < 2 && fp.row() < 2));
}

#[test]
fn test_unit_grid_daily_rows() {
    let g = grid::unit_grid_3x3();
    let source = frames_source(
        "UNIT",
        "prcp",
        &g,
        (1..=3).map(|d| (day(d), create_test_grid(3, 3))).collect(),
    );
    let pipeline = unit_pipeline(unit_config());
    let out = pipeline.run_product(&source, "prcp").unwrap();

    assert_eq!(out.daily.len(), 12);
    assert_eq!(out.report.daily_rows, 12);
    assert_eq!(out.report.frames, 3);
    assert_daily_invariants(&out.daily, &out.footprints, pipeline.window());

    let first_day: Vec<&DailyRecord> = out.daily.iter().filter(|r| r.date == day(1)).collect();
    assert_eq!(first_day.len(), 4);
    let r11 = first_day.iter().find(|r| r.pixel_id == "UNIT_c1_r1").unwrap();
    assert_eq!(r11.value, 1001.0);
    assert_approx_eq!(r11.frac_ca, 0.25, 1e-9);
    let r10 = first_day.iter().find(|r| r.pixel_id == "UNIT_c1_r0").unwrap();
    assert_eq!(r10.value, 1000.0);
}

#[test]
fn test_null_cell_omitted_from_daily_rows() {
    let g = grid::unit_grid_3x3();
    let source = frames_source("UNIT", "prcp", &g, vec![(day(1), create_grid_with_nans(3, 3, &[(1, 1)]))]);
    let pipeline = unit_pipeline(unit_config());
    let out = pipeline.run_product(&source, "prcp").unwrap();

    // The footprint stays, its day is dropped.
    assert_eq!(out.footprints.len(), 4);
    assert_eq!(out.daily.len(), 3);
    assert!(out.daily.iter().all(|r| r.pixel_id != "UNIT_c1_r1"));
}

#[test]
fn test_nodata_value_is_masked() {
    let g = grid::unit_grid_3x3();
    let mut values = create_test_grid(3, 3);
    values[0] = -9999.0;
    let source = frames_source("UNIT", "prcp", &g, vec![(day(2), values)]);
    let pipeline = unit_pipeline(unit_config());
    let out = pipeline.run_product(&source, "prcp").unwrap();

    assert_eq!(out.daily.len(), 3);
    assert!(out.daily.iter().all(|r| r.pixel_id != "UNIT_c0_r0"));
}

#[test]
fn test_frames_outside_window_are_ignored() {
    let g = grid::unit_grid_3x3();
    let source = frames_source(
        "UNIT",
        "prcp",
        &g,
        vec![
            (day(1), create_test_grid(3, 3)),
            (day(4), create_test_grid(3, 3)),
            (day(31), create_test_grid(3, 3)),
        ],
    );
    let pipeline = unit_pipeline(unit_config());
    let out = pipeline.run_product(&source, "prcp").unwrap();

    assert_eq!(out.report.frames, 1);
    assert!(out.daily.iter().all(|r| r.date == day(1)));
}

// ============================================================================
// Vectorization budget
// ============================================================================

#[test]
fn test_budget_exceeded_without_best_effort() {
    let g = grid::unit_grid_3x3();
    let source = frames_source("UNIT", "prcp", &g, vec![(day(1), create_test_grid(3, 3))]);
    let config = PipelineConfig {
        vectorize: VectorizeOptions {
            tile_size: 1,
            max_cells: 2,
            best_effort: false,
        },
        ..unit_config()
    };
    let err = unit_pipeline(config).run_product(&source, "prcp").unwrap_err();
    assert!(matches!(
        err,
        FootprintError::BudgetExceeded {
            requested: 6,
            max_cells: 2
        }
    ));
}

#[test]
fn test_budget_truncates_with_best_effort() {
    let g = grid::unit_grid_3x3();
    let source = frames_source("UNIT", "prcp", &g, vec![(day(1), create_test_grid(3, 3))]);
    let config = PipelineConfig {
        vectorize: VectorizeOptions {
            tile_size: 1,
            max_cells: 2,
            best_effort: true,
        },
        ..unit_config()
    };
    let out = unit_pipeline(config).run_product(&source, "prcp").unwrap();

    assert_eq!(
        out.report.coverage,
        Coverage::Truncated {
            requested: 6,
            processed: 2
        }
    );
    assert_eq!(out.report.footprints_total, 2);
    let keys: HashSet<PixelKey> = out.footprints.iter().map(|fp| fp.key).collect();
    assert_eq!(keys, HashSet::from([PixelKey::new(0, 0), PixelKey::new(1, 0)]));
}

#[test]
fn test_tiling_does_not_change_results() {
    let g = grid::unit_grid_3x3();
    let source = frames_source("UNIT", "prcp", &g, vec![(day(1), create_test_grid(3, 3))]);
    let tiled = PipelineConfig {
        vectorize: VectorizeOptions {
            tile_size: 1,
            ..VectorizeOptions::default()
        },
        ..unit_config()
    };
    let a = unit_pipeline(unit_config()).run_product(&source, "prcp").unwrap();
    let b = unit_pipeline(tiled).run_product(&source, "prcp").unwrap();

    assert_eq!(a.daily.len(), b.daily.len());
    for (x, y) in a.daily.iter().zip(&b.daily) {
        assert_eq!((x.date, &x.pixel_id, x.value), (y.date, &y.pixel_id, y.value));
    }
    for fp in &a.footprints {
        let other = find(&b.footprints, fp.col(), fp.row());
        assert_approx_eq!(fp.areas.area_ca, other.areas.area_ca, 1e-12);
    }
}

// ============================================================================
// Projected and geographic products
// ============================================================================

#[test]
fn test_geographic_product_end_to_end() {
    let engine = PlanarEngine::new(1.0);
    let basins = BasinSet::new(
        Basin::new("CA", basin::lon_lat_west()).unwrap(),
        Basin::new("AR", basin::lon_lat_east()).unwrap(),
    );
    let config = PipelineConfig {
        start: NaiveDate::parse_from_str(time::WINDOW_START, "%Y-%m-%d").unwrap(),
        end: NaiveDate::parse_from_str(time::WINDOW_END, "%Y-%m-%d").unwrap(),
        ..PipelineConfig::default()
    };
    let pipeline = Pipeline::new(config, engine, basins.clone()).unwrap();

    let g = grid::gridmet_like();
    let frames = create_daily_precipitation(24, 24, 3)
        .into_iter()
        .enumerate()
        .map(|(i, v)| (day(i as u32 + 1), v))
        .collect();
    let source = frames_source("GRIDMET", "pr", &g, frames);
    let out = pipeline.run_product(&source, "pr").unwrap();

    assert!(out.report.footprints_kept > 0);
    assert!(out.report.footprints_kept < out.report.footprints_total);
    let ids: HashSet<&str> = out.footprints.iter().map(|fp| fp.pixel_id.as_str()).collect();
    assert_eq!(ids.len(), out.footprints.len());

    for fp in &out.footprints {
        assert!(fp.areas.touches_basins(1.0));
        assert!((0.0..=1.0 + 1e-9).contains(&fp.areas.frac_ca()));
        assert!((0.0..=1.0 + 1e-9).contains(&fp.areas.frac_ar()));
        // Cell centers in lon/lat sit on the 1/48 degree half-step.
        let (cx, cy) = g.cell_center(fp.key);
        assert_approx_eq!(fp.center_lon, cx, 1e-9);
        assert_approx_eq!(fp.center_lat, cy, 1e-9);
        // Roughly 3.7 km x 4.6 km at this latitude
        assert!(fp.areas.area_m2 > 1.4e7 && fp.areas.area_m2 < 1.9e7, "{}", fp.areas.area_m2);
    }

    // Every piece of each basin lands in some footprint.
    let aea = CrsCode::Epsg5070.definition();
    let geographic = CrsCode::Epsg4326.definition();
    let ca_area = engine.area(&engine.reproject(&basins.ca.geometry, &geographic, &aea).unwrap());
    let ar_area = engine.area(&engine.reproject(&basins.ar.geometry, &geographic, &aea).unwrap());
    let ca_sum: f64 = out.footprints.iter().map(|fp| fp.areas.area_ca).sum();
    let ar_sum: f64 = out.footprints.iter().map(|fp| fp.areas.area_ar).sum();
    assert!((ca_sum - ca_area).abs() / ca_area < 1e-3, "{} vs {}", ca_sum, ca_area);
    assert!((ar_sum - ar_area).abs() / ar_area < 1e-3, "{} vs {}", ar_sum, ar_area);

    assert_eq!(out.daily.len(), out.footprints.len() * 3);
    assert_daily_invariants(&out.daily, &out.footprints, pipeline.window());
}

#[test]
fn test_lambert_product_end_to_end() {
    let engine = PlanarEngine::new(1.0);
    let lcc = CrsCode::DaymetLcc.definition();
    let g = grid::daymet_like();

    // Basins drawn in the Lambert frame, off the cell lattice.
    let ca = lon_lat_basin(
        &engine,
        &lcc,
        &[
            (475_300.0, -641_700.0),
            (494_600.0, -641_700.0),
            (494_600.0, -622_400.0),
            (475_300.0, -622_400.0),
            (475_300.0, -641_700.0),
        ],
    );
    let ar = lon_lat_basin(
        &engine,
        &lcc,
        &[
            (500_200.0, -618_900.0),
            (505_700.0, -618_900.0),
            (505_700.0, -612_300.0),
            (500_200.0, -618_900.0),
        ],
    );
    let basins = BasinSet::new(Basin::new("CA", ca).unwrap(), Basin::new("AR", ar).unwrap());
    let config = PipelineConfig {
        start: day(1),
        end: day(3),
        ..PipelineConfig::default()
    };
    let pipeline = Pipeline::new(config, engine, basins.clone()).unwrap();

    let frames = create_daily_precipitation(60, 60, 2)
        .into_iter()
        .enumerate()
        .map(|(i, v)| (day(i as u32 + 1), v))
        .collect();
    let source = frames_source("DAYMET", "prcp", &g, frames);
    let out = pipeline.run_product(&source, "prcp").unwrap();

    assert_eq!(out.report.grid.nominal_scale, 1000.0);
    for fp in &out.footprints {
        assert_eq!(fp.scale_m, 1000.0);
        // Near 37N the Lambert scale factor is below one, so true cells exceed 1 km²
        assert!(fp.areas.area_m2 > 1.0e6 && fp.areas.area_m2 < 1.2e6, "{}", fp.areas.area_m2);
        assert_eq!(fp.pixel_id, format!("DAYMET_c{}_r{}", fp.col(), fp.row()));
    }

    // Interior cells of CA are fully covered.
    let inner = find(&out.footprints, 20, 25);
    assert_approx_eq!(inner.areas.frac_ca(), 1.0, 1e-3);
    assert_approx_eq!(inner.areas.frac_ar(), 0.0, 1e-9);

    let aea = CrsCode::Epsg5070.definition();
    let geographic = CrsCode::Epsg4326.definition();
    let ca_area = engine.area(&engine.reproject(&basins.ca.geometry, &geographic, &aea).unwrap());
    let ca_sum: f64 = out.footprints.iter().map(|fp| fp.areas.area_ca).sum();
    assert!((ca_sum - ca_area).abs() / ca_area < 1e-3, "{} vs {}", ca_sum, ca_area);

    assert_eq!(out.daily.len(), out.footprints.len() * 2);
    assert_daily_invariants(&out.daily, &out.footprints, pipeline.window());
}

// ============================================================================
// Orchestration
// ============================================================================

#[test]
fn test_run_writes_both_tables_per_product() {
    let g = grid::unit_grid_3x3();
    let products = vec![
        ProductInput {
            source: Box::new(frames_source("A", "prcp", &g, vec![(day(1), create_test_grid(3, 3))])),
            band: "prcp".to_string(),
        },
        ProductInput {
            source: Box::new(frames_source(
                "B",
                "pr",
                &g,
                (1..=3).map(|d| (day(d), create_test_grid(3, 3))).collect(),
            )),
            band: "pr".to_string(),
        },
    ];
    let sink = RecordingSink::default();
    let reports = unit_pipeline(unit_config()).run(&products, &sink).unwrap();

    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].product, "A");
    assert_eq!(reports[1].band, "pr");
    assert_eq!(
        *sink.footprints.lock().unwrap(),
        vec![("A".to_string(), 4), ("B".to_string(), 4)]
    );
    assert_eq!(
        *sink.daily.lock().unwrap(),
        vec![("A".to_string(), 4), ("B".to_string(), 12)]
    );
}

#[test]
fn test_configuration_errors_precede_geometry() {
    let g = grid::unit_grid_3x3();
    let products = vec![
        ProductInput {
            source: Box::new(frames_source("A", "prcp", &g, vec![(day(1), create_test_grid(3, 3))])),
            band: "prcp".to_string(),
        },
        ProductInput {
            source: Box::new(frames_source("B", "pr", &g, vec![(day(1), create_test_grid(3, 3))])),
            band: "precip".to_string(),
        },
    ];
    let sink = RecordingSink::default();
    let err = unit_pipeline(unit_config()).run(&products, &sink).unwrap_err();

    assert!(err.is_configuration());
    match err {
        FootprintError::UnknownBand { product, band, available } => {
            assert_eq!(product, "B");
            assert_eq!(band, "precip");
            assert_eq!(available, vec!["pr".to_string()]);
        }
        other => panic!("unexpected error {}", other),
    }
    assert!(sink.footprints.lock().unwrap().is_empty());
    assert!(sink.daily.lock().unwrap().is_empty());
}

#[test]
fn test_empty_window_is_configuration_error() {
    let g = grid::unit_grid_3x3();
    let source = frames_source("UNIT", "prcp", &g, vec![(day(20), create_test_grid(3, 3))]);
    let err = unit_pipeline(unit_config()).run_product(&source, "prcp").unwrap_err();
    assert!(matches!(err, FootprintError::EmptySource { .. }));
}

#[test]
fn test_invalid_config_rejected() {
    let config = PipelineConfig {
        workers: 0,
        ..unit_config()
    };
    let err = Pipeline::new(config, PlanarEngine::new(1.0), unit_basins())
        .err()
        .unwrap();
    assert!(matches!(err, FootprintError::InvalidConfig(_)));
}

#[test]
fn test_basins_missing_grid_yield_no_rows() {
    let g = grid::km_grid(5_000_000.0, 5_000_000.0, 4);
    let source = frames_source("FAR", "prcp", &g, vec![(day(1), create_test_grid(4, 4))]);
    let out = unit_pipeline(unit_config()).run_product(&source, "prcp").unwrap();
    assert!(out.footprints.is_empty());
    assert!(out.daily.is_empty());
    assert_eq!(out.report.coverage, Coverage::Complete { cells: 0 });
}
