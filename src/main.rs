//! Nowcast CLI - cloud-index nowcasting with advection and LETKF.
//!
//! Runs the nowcast on a synthetic drifting-cloud scenario, prints parallax
//! offsets, and estimates the memory footprint of a configuration.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

use nowcast::export::{export_output, ExportFormat as OutputFormat};
use nowcast::grid::{field_range, Grid, LatLonAxes};
use nowcast::letkf::{LocalizationConfig, LocalizationGeometry};
use nowcast::noise::{ScenarioConfig, SyntheticScenario};
use nowcast::parallax::{ParallaxConfig, ParallaxCorrector, ViewAngles};
use nowcast::pipeline::{parallax_diagnostics, FixedSun, NowcastConfig, SimulationDriver};

/// Cloud-index nowcasting engine.
#[derive(Parser)]
#[command(name = "nowcast")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a nowcast on a synthetic scenario and export the trajectories.
    Run {
        /// JSON run configuration; defaults apply to missing fields.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Grid rows.
        #[arg(long, default_value = "60")]
        rows: usize,

        /// Grid columns.
        #[arg(long, default_value = "80")]
        cols: usize,

        /// Number of satellite frames (15 minutes apart).
        #[arg(long, default_value = "5")]
        frames: usize,

        /// Number of ground sensors.
        #[arg(long, default_value = "12")]
        sensors: usize,

        /// Eastward wind (m/s).
        #[arg(long, default_value = "8.0")]
        wind_u: f64,

        /// Northward wind (m/s).
        #[arg(long, default_value = "2.0")]
        wind_v: f64,

        /// Random seed for scenario and ensemble.
        #[arg(short, long)]
        seed: Option<u64>,

        /// Ensemble members.
        #[arg(short, long)]
        members: Option<usize>,

        /// Assimilate frames globally instead of with localization.
        #[arg(long)]
        no_localization: bool,

        /// Sun azimuth (degrees clockwise from north).
        #[arg(long, default_value = "150.0")]
        sun_azimuth: f64,

        /// Sun elevation (degrees).
        #[arg(long, default_value = "55.0")]
        sun_elevation: f64,

        /// Output directory.
        #[arg(short, long, default_value = "./output")]
        output: PathBuf,

        /// Export format.
        #[arg(short, long, default_value = "png")]
        format: ExportFormat,

        /// Also report parallax-corrected sensor errors per frame.
        #[arg(long)]
        diagnostics: bool,
    },

    /// Print the parallax correction for fixed sun and satellite angles.
    Parallax {
        /// Cloud height (m).
        #[arg(long, default_value = "10000")]
        cloud_height: f64,

        /// Satellite azimuth (degrees).
        #[arg(long, default_value = "220.5")]
        sat_azimuth: f64,

        /// Satellite elevation (degrees).
        #[arg(long, default_value = "44.1")]
        sat_elevation: f64,

        /// Sun azimuth (degrees).
        #[arg(long)]
        sun_azimuth: f64,

        /// Sun elevation (degrees).
        #[arg(long)]
        sun_elevation: f64,

        /// Site latitude (degrees).
        #[arg(long, default_value = "32.2")]
        latitude: f64,

        /// Grid latitude step (degrees).
        #[arg(long, default_value = "0.0025")]
        lat_step: f64,

        /// Grid longitude step (degrees).
        #[arg(long, default_value = "0.0025")]
        lon_step: f64,

        /// Grid columns, for the flat offset.
        #[arg(long, default_value = "80")]
        cols: usize,
    },

    /// Display memory and work estimates for a configuration.
    Info {
        /// Grid rows.
        #[arg(long, default_value = "60")]
        rows: usize,

        /// Grid columns.
        #[arg(long, default_value = "80")]
        cols: usize,

        /// Ensemble members.
        #[arg(short, long, default_value = "40")]
        members: usize,

        /// Sparse assimilation stride (cells).
        #[arg(long, default_value = "5")]
        spacing: usize,

        /// Localization radius (cells).
        #[arg(long, default_value = "30")]
        radius: usize,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ExportFormat {
    /// 16-bit PNG frames.
    Png,
    /// 32-bit float RAW stacks.
    Raw,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            rows,
            cols,
            frames,
            sensors,
            wind_u,
            wind_v,
            seed,
            members,
            no_localization,
            sun_azimuth,
            sun_elevation,
            output,
            format,
            diagnostics,
        } => {
            let scenario = ScenarioConfig {
                rows,
                cols,
                frames,
                sensor_count: sensors,
                wind_u,
                wind_v,
                seed: seed.unwrap_or(42),
                ..Default::default()
            };
            run_nowcast(
                config,
                scenario,
                members,
                no_localization,
                ViewAngles::new(sun_azimuth, sun_elevation),
                output,
                format,
                diagnostics,
            );
        }
        Commands::Parallax {
            cloud_height,
            sat_azimuth,
            sat_elevation,
            sun_azimuth,
            sun_elevation,
            latitude,
            lat_step,
            lon_step,
            cols,
        } => {
            let config = ParallaxConfig {
                cloud_height_m: cloud_height,
                satellite: ViewAngles::new(sat_azimuth, sat_elevation),
                site_latitude_deg: Some(latitude),
            };
            run_parallax(config, ViewAngles::new(sun_azimuth, sun_elevation), lat_step, lon_step, cols);
        }
        Commands::Info {
            rows,
            cols,
            members,
            spacing,
            radius,
        } => {
            run_info(rows, cols, members, LocalizationConfig { spacing, radius });
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn run_nowcast(
    config_path: Option<PathBuf>,
    scenario_config: ScenarioConfig,
    members: Option<usize>,
    no_localization: bool,
    sun: ViewAngles,
    output: PathBuf,
    format: ExportFormat,
    diagnostics: bool,
) {
    let mut config = match &config_path {
        Some(path) => NowcastConfig::from_json_file(path).unwrap_or_else(|e| {
            eprintln!("Error loading config {}: {}", path.display(), e);
            std::process::exit(1);
        }),
        None => NowcastConfig::default(),
    };
    if let Some(members) = members {
        config.ensemble.ens_size = members;
    }
    if no_localization {
        config.letkf.localization = None;
    }
    config.seed = scenario_config.seed;

    let mut scenario_config = scenario_config;
    scenario_config.start = config.start;
    scenario_config.dx = config.dx;
    scenario_config.dy = config.dy;
    let frames = scenario_config.frames;
    config.end = config.start + chrono::Duration::minutes(15 * frames.saturating_sub(1) as i64);

    println!("Nowcast - Cloud Index Nowcasting");
    println!("================================");
    println!("Grid: {}x{} cells at {} m", scenario_config.rows, scenario_config.cols, config.dx);
    println!("Frames: {} ({} to {})", frames, config.start, config.end);
    println!("Members: {}", config.ensemble.ens_size);
    println!(
        "Localization: {}",
        match config.letkf.localization {
            Some(loc) => format!("stride {} radius {}", loc.spacing, loc.radius),
            None => "off (global)".to_string(),
        }
    );
    println!("Output: {}", output.display());

    let start = Instant::now();
    println!("\nGenerating synthetic scenario...");
    let scenario = SyntheticScenario::generate(scenario_config).unwrap_or_else(|e| {
        eprintln!("Error generating scenario: {}", e);
        std::process::exit(1);
    });

    let sun_model = FixedSun(sun);
    let driver = SimulationDriver::new(scenario.sources(&sun_model), config.clone());

    println!("Running nowcast...");
    let result = driver.run_with_callbacks(
        |i, total, time| println!("  [{}/{}] Cycle starting at {}", i + 1, total, time),
        |i, total| println!("  [{}/{}] Frame assimilated", i + 1, total),
    );
    let output_data = result.unwrap_or_else(|e| {
        eprintln!("Error during nowcast: {}", e);
        std::process::exit(1);
    });
    println!("Nowcast completed in {:.2?}", start.elapsed());

    if let Some(last) = output_data.analysis.last() {
        let (min, max) = field_range(last);
        println!("Final analysis range: [{:.4}, {:.4}]", min, max);
    }

    if diagnostics {
        println!("\nParallax diagnostics:");
        match parallax_diagnostics(
            scenario.satellite(),
            scenario.sensors(),
            &sun_model,
            &config.parallax,
            config.start,
            config.end,
        ) {
            Ok(report) => {
                for d in report {
                    println!(
                        "  {}  shift ({:+}, {:+}) cells  d_lat {:+.5}  d_lon {:+.5}  rmse {:.4}",
                        d.time,
                        d.cells.south_north,
                        d.cells.west_east,
                        d.d_lat,
                        d.d_lon,
                        d.rmse()
                    );
                }
            }
            Err(e) => eprintln!("  Diagnostics failed: {}", e),
        }
    }

    println!("\nExporting trajectories...");
    let export_start = Instant::now();
    let out_format = match format {
        ExportFormat::Png => OutputFormat::Png,
        ExportFormat::Raw => OutputFormat::Raw,
    };
    if let Err(e) = export_output(&output_data, &output, out_format) {
        eprintln!("Error exporting: {}", e);
        std::process::exit(1);
    }
    println!(
        "  Exported {} frames per trajectory in {:.2?}",
        output_data.timestamps.len(),
        export_start.elapsed()
    );
}

fn run_parallax(config: ParallaxConfig, sun: ViewAngles, lat_step: f64, lon_step: f64, cols: usize) {
    let latitude = config.site_latitude_deg.unwrap_or(0.0);
    let grid = Grid::new(5, cols.max(5), 1.0, 1.0).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });
    let axes = LatLonAxes::regular(&grid, latitude, 0.0, lat_step, lon_step);
    let corrector = ParallaxCorrector::new(config.clone(), &axes).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });

    let shift = nowcast::parallax::parallax_shift(config.cloud_height_m, config.satellite, sun);
    let degrees = corrector.degree_shift(sun);
    let cells = corrector.cell_shift(sun);

    println!("Nowcast - Parallax Correction");
    println!("=============================");
    println!("Cloud height: {} m", config.cloud_height_m);
    println!(
        "Satellite: azimuth {:.2}, elevation {:.2}",
        config.satellite.azimuth_deg, config.satellite.elevation_deg
    );
    println!("Sun:       azimuth {:.2}, elevation {:.2}", sun.azimuth_deg, sun.elevation_deg);
    println!();
    match (degrees, cells) {
        (Ok((d_lat, d_lon)), Ok(cells)) => {
            println!("Shift (m):       east {:+.1}, north {:+.1}", shift.x, shift.y);
            println!("Shift (deg):     lat {:+.6}, lon {:+.6}", d_lat, d_lon);
            println!("Shift (cells):   rows {:+}, cols {:+}", cells.south_north, cells.west_east);
            println!("Flat offset:     {:+}", cells.flat_offset(cols));
        }
        (Err(e), _) | (_, Err(e)) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn run_info(rows: usize, cols: usize, members: usize, localization: LocalizationConfig) {
    let grid = Grid::new(rows, cols, 250.0, 250.0).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });
    let geometry = LocalizationGeometry::new(grid, localization.spacing, localization.radius);
    let cells = grid.size() as u64;
    let k = members as u64;
    let positions = geometry.positions().len() as u64;
    let largest_window = (0..geometry.positions().len())
        .map(|i| geometry.neighborhood(i).len())
        .max()
        .unwrap_or(0);

    let bytes_field = cells * 8;
    let bytes_ensemble = (cells + 2) * k * 8;
    let bytes_weights = positions * k * k * 8;
    let bytes_png = cells * 2;

    println!("Nowcast - Configuration Info");
    println!("============================");
    println!();
    println!("Grid: {}x{} ({} cells)", rows, cols, cells);
    println!("Members: {}", members);
    println!(
        "Sparse positions: {} ({}x{}), largest window {} cells",
        positions,
        geometry.sparse_rows().len(),
        geometry.sparse_cols().len(),
        largest_window
    );
    println!();
    println!("Memory usage (in-memory):");
    println!("  Field:           {:>12} bytes ({:.2} MB)", bytes_field, mb(bytes_field));
    println!("  Ensemble:        {:>12} bytes ({:.2} MB)", bytes_ensemble, mb(bytes_ensemble));
    println!("  Local weights:   {:>12} bytes ({:.2} MB)", bytes_weights, mb(bytes_weights));
    let total = bytes_field * 2 + bytes_ensemble * 2 + bytes_weights;
    println!("  Total (approx):  {:>12} bytes ({:.2} MB)", total, mb(total));
    println!();
    println!("Export file sizes per frame:");
    println!("  PNG (16-bit):   {:>8} bytes ({:.2} MB)", bytes_png, mb(bytes_png));
    println!("  RAW (R32):      {:>8} bytes ({:.2} MB)", cells * 4, mb(cells * 4));
}

fn mb(bytes: u64) -> f64 {
    bytes as f64 / 1024.0 / 1024.0
}
