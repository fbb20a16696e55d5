//! Basin pixel extractor.
//!
//! Builds native-grid pixel footprints for each configured precipitation
//! product, measures their overlap with the two basins and writes the
//! footprint and daily tables.

mod config;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use footprint::{
    Basin, BasinSet, DirectoryExporter, GridResolver, Pipeline, PlanarEngine, ProductInput,
};

use config::ExtractorConfig;

#[derive(Parser, Debug)]
#[command(name = "extractor")]
#[command(about = "Native-grid pixel footprints and daily tables for two basins")]
struct Args {
    /// Configuration file path
    #[arg(short, long, env = "EXTRACTOR_CONFIG", default_value = "config/extractor.yaml")]
    config: PathBuf,

    /// Override the configured output directory
    #[arg(short, long, env = "OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Specific product to run (default: all configured)
    #[arg(short, long)]
    product: Option<String>,

    /// Log each product's native grid and the basin extents, then exit
    #[arg(long)]
    inspect: bool,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Initialize tracing
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true);
    if args.json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }

    info!("Starting basin pixel extractor");

    let mut config = ExtractorConfig::load(&args.config)?;
    if let Some(dir) = &args.output_dir {
        config.output_dir = dir.clone();
    }
    info!(
        config = %args.config.display(),
        window = %config.pipeline.window()?,
        products = ?config.products.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(),
        "Loaded configuration"
    );

    // Sources are opened before anything else so a bad path fails fast
    let products = config
        .selected_products(args.product.as_deref())?
        .into_iter()
        .map(|p| {
            let source = p
                .open()
                .with_context(|| format!("Failed to open source for product {}", p.name))?;
            Ok(ProductInput {
                source,
                band: p.band.clone(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let basins = load_basins(&config)?;

    if args.inspect {
        return inspect(&config, &products);
    }

    let exporter = DirectoryExporter::new(&config.output_dir);
    exporter
        .write_basins(&basins)
        .context("Failed to write basin boundaries")?;

    let engine = PlanarEngine::new(config.pipeline.tolerance_m);
    let pipeline = Pipeline::new(config.pipeline.clone(), engine, basins)?;
    let reports = pipeline.run(&products, &exporter)?;

    info!(
        products = reports.len(),
        pixels = reports.iter().map(|r| r.footprints_kept).sum::<usize>(),
        daily_rows = reports.iter().map(|r| r.daily_rows).sum::<usize>(),
        output_dir = %config.output_dir.display(),
        "Extraction completed"
    );

    Ok(())
}

/// Load both basins and log their extents.
fn load_basins(config: &ExtractorConfig) -> Result<BasinSet> {
    let ca = Basin::from_geojson_file("CA", &config.basins.ca)
        .with_context(|| format!("Failed to load CA basin from {:?}", config.basins.ca))?;
    let ar = Basin::from_geojson_file("AR", &config.basins.ar)
        .with_context(|| format!("Failed to load AR basin from {:?}", config.basins.ar))?;

    for basin in [&ca, &ar] {
        info!(basin = %basin.name, extent = ?basin.bounds(), "Basin extent (lon/lat)");
    }
    let basins = BasinSet::new(ca, ar);
    info!(extent = ?basins.bounds(), "Combined basin extent (lon/lat)");
    Ok(basins)
}

/// Resolve and log every product's native grid without running extraction.
fn inspect(config: &ExtractorConfig, products: &[ProductInput]) -> Result<()> {
    let window = config.pipeline.window()?;
    for product in products {
        let resolved = GridResolver::resolve(product.source.as_ref(), &product.band, &window)?;
        let grid = &resolved.grid;
        let extent = grid.extent();
        info!(
            product = %product.source.product(),
            band = %product.band,
            crs = %grid.crs,
            transform = ?grid.transform.to_gdal(),
            nominal_scale_m = grid.nominal_scale,
            cols = grid.cols,
            rows = grid.rows,
            extent = ?extent,
            first_day = ?resolved.dates.first(),
            last_day = ?resolved.dates.last(),
            frames = resolved.dates.len(),
            "Native grid"
        );
    }
    Ok(())
}
