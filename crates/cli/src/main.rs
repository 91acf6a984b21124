//! Vadose CLI - aeration-zone infiltration time from raster and vector inputs

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use vadose_algorithms::infiltration::pipeline::{run, LithologyFields, PipelineInputs};
use vadose_algorithms::infiltration::Formula;
use vadose_algorithms::interpolation::Method;
use vadose_core::io::{read_geojson, read_geotiff, write_geotiff};
use vadose_core::{FeatureCollection, Raster};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "vadose")]
#[command(author, version, about = "Aeration-zone infiltration time calculator", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about a raster file
    Info {
        /// Input raster file
        input: PathBuf,
    },
    /// Compute the infiltration-time raster
    Compute {
        /// Formula: witczak-zurek, bindeman, macioszczyk
        #[arg(long)]
        formula: String,
        /// Terrain elevation raster (GeoTIFF)
        #[arg(long)]
        elevation: PathBuf,
        /// Water-table elevation raster (GeoTIFF)
        #[arg(long)]
        water_table: PathBuf,
        /// Lithological-unit polygon layer (GeoJSON)
        #[arg(long)]
        lithology: PathBuf,
        /// Moisture capacity field on the lithology layer
        #[arg(long)]
        moisture_field: String,
        /// Effective infiltration coefficient field
        #[arg(long)]
        infiltration_field: String,
        /// Filtration coefficient field
        #[arg(long)]
        filtration_field: String,
        /// Effective porosity field
        #[arg(long)]
        porosity_field: String,
        /// Precipitation point layer (GeoJSON)
        #[arg(long)]
        precipitation: PathBuf,
        /// Precipitation value field
        #[arg(long)]
        precipitation_field: String,
        /// Interpolation method: idw, spline, natural-neighbor
        #[arg(long)]
        method: String,
        /// Nearest-point count for IDW
        #[arg(long)]
        points: Option<usize>,
        /// Output raster path (overwritten if present)
        #[arg(short, long)]
        output: PathBuf,
        /// Write derived rasters into this directory for inspection
        #[arg(long)]
        save_intermediates: Option<PathBuf>,
    },
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn read_raster(path: &PathBuf) -> Result<Raster<f64>> {
    let pb = spinner("Reading raster...");
    let raster: Raster<f64> = read_geotiff(path)
        .with_context(|| format!("Failed to read raster {}", path.display()))?;
    pb.finish_and_clear();
    info!(
        "{}: {} x {} at {}",
        path.display(),
        raster.cols(),
        raster.rows(),
        raster.cell_size()
    );
    Ok(raster)
}

fn read_layer(path: &PathBuf) -> Result<FeatureCollection> {
    let pb = spinner("Reading vector layer...");
    let layer = read_geojson(path)
        .with_context(|| format!("Failed to read layer {}", path.display()))?;
    pb.finish_and_clear();
    info!("{}: {} features", path.display(), layer.len());
    Ok(layer)
}

fn write_result(raster: &Raster<f64>, path: &PathBuf) -> Result<()> {
    let pb = spinner("Writing output...");
    write_geotiff(raster, path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    pb.finish_and_clear();
    Ok(())
}

fn done(name: &str, path: &PathBuf, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        // ── Info ─────────────────────────────────────────────────────
        Commands::Info { input } => {
            let raster = read_raster(&input)?;
            let (rows, cols) = raster.shape();
            let bounds = raster.bounds();
            let stats = raster.statistics();

            println!("File: {}", input.display());
            println!("Dimensions: {} x {} ({} cells)", cols, rows, raster.len());
            println!("Cell size: {}", raster.cell_size());
            println!(
                "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
                bounds.0, bounds.1, bounds.2, bounds.3
            );
            if let Some(nodata) = raster.nodata() {
                println!("NoData: {}", nodata);
            }
            println!("\nStatistics:");
            if let Some(min) = stats.min {
                println!("  Min: {:.4}", min);
            }
            if let Some(max) = stats.max {
                println!("  Max: {:.4}", max);
            }
            if let Some(mean) = stats.mean {
                println!("  Mean: {:.4}", mean);
            }
            println!(
                "  Valid cells: {} ({:.1}%)",
                stats.valid_count,
                100.0 * stats.valid_count as f64 / raster.len() as f64
            );
        }

        // ── Compute ──────────────────────────────────────────────────
        Commands::Compute {
            formula,
            elevation,
            water_table,
            lithology,
            moisture_field,
            infiltration_field,
            filtration_field,
            porosity_field,
            precipitation,
            precipitation_field,
            method,
            points,
            output,
            save_intermediates,
        } => {
            // Selectors fail fast, before any file is touched
            let formula: Formula = formula.parse()?;
            let method: Method = method.parse()?;

            let elevation = read_raster(&elevation)?;
            let water_table = read_raster(&water_table)?;
            let lithology = read_layer(&lithology)?;
            let precipitation = read_layer(&precipitation)?;

            info!("Formula: {}, interpolation: {}", formula, method.name());

            let start = Instant::now();
            let computed = run(PipelineInputs {
                formula,
                elevation: &elevation,
                water_table: &water_table,
                lithology: &lithology,
                fields: LithologyFields {
                    moisture_capacity: moisture_field,
                    infiltration: infiltration_field,
                    filtration: filtration_field,
                    effective_porosity: porosity_field,
                },
                precipitation: &precipitation,
                precipitation_field,
                method,
                max_points: points,
            })
            .context("Failed to compute infiltration time")?;
            let elapsed = start.elapsed();

            info!(
                "Working grid: {} x {} at {}",
                computed.grid.cols,
                computed.grid.rows,
                computed.grid.cell_size()
            );

            if let Some(dir) = save_intermediates {
                std::fs::create_dir_all(&dir)
                    .with_context(|| format!("Failed to create {}", dir.display()))?;
                for (name, raster) in &computed.intermediates {
                    let path = dir.join(format!("{name}.tif"));
                    write_result(raster, &path)?;
                    info!("Intermediate: {}", path.display());
                }
            }

            write_result(&computed.result, &output)?;
            done("Infiltration time", &output, elapsed);
        }
    }

    Ok(())
}
