//! reliefmap CLI
//!
//! Renders relief tiles from a YAML configuration: a single tile, a PNG
//! pyramid for a region, or just a cache warm-up.

use clap::{Args, Parser, Subcommand};
use reliefmap_grid::CancellationToken;
use reliefmap_render::{parse_bounds, write_png, RenderConfig, RenderError, Result, TileGenerator, TileRenderer};
use reliefmap_tiles::{prefetch_region, LatLonBounds, ProgressCallback, TileCoord};
use std::path::PathBuf;
use std::process;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "reliefmap")]
#[command(about = "Render shaded relief map tiles", long_about = None)]
struct Cli {
    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render one tile to a PNG file
    Render {
        /// Render configuration (YAML)
        #[arg(long, short)]
        config: PathBuf,

        /// Zoom level
        #[arg(long, short)]
        zoom: u32,

        /// Tile column; with --y, overrides --lat/--lon
        #[arg(long, requires = "y")]
        x: Option<i64>,

        /// Tile row, counted from the north
        #[arg(long, requires = "x")]
        y: Option<i64>,

        /// Latitude of a point inside the tile
        #[arg(long, requires = "lon", allow_negative_numbers = true)]
        lat: Option<f64>,

        /// Longitude of a point inside the tile
        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lon: Option<f64>,

        /// Output PNG path
        #[arg(long, short)]
        output: PathBuf,
    },
    /// Render every tile of a region into out/{z}/{x}/{y}.png
    Generate {
        #[command(flatten)]
        region: Region,

        /// Output directory
        #[arg(long, short)]
        out_dir: PathBuf,

        /// Re-render tiles that already exist
        #[arg(long)]
        overwrite: bool,
    },
    /// Fetch every source tile of a region into the cache
    Prefetch {
        #[command(flatten)]
        region: Region,
    },
}

#[derive(Args)]
struct Region {
    /// Render configuration (YAML)
    #[arg(long, short)]
    config: PathBuf,

    /// min_lat,min_lon,max_lat,max_lon
    #[arg(long, allow_hyphen_values = true)]
    bounds: String,

    /// First zoom level
    #[arg(long)]
    min_zoom: u32,

    /// Last zoom level
    #[arg(long)]
    max_zoom: u32,
}

impl Region {
    fn resolve(&self) -> Result<(RenderConfig, LatLonBounds)> {
        let config = RenderConfig::load(&self.config)?;
        let bounds = parse_bounds(&self.bounds)?;
        Ok((config, bounds))
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn progress() -> ProgressCallback {
    Box::new(|message: &str| info!("{}", message))
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Render {
            config,
            zoom,
            x,
            y,
            lat,
            lon,
            output,
        } => {
            let config = RenderConfig::load(&config)?;
            let coord = match (x, y, lat, lon) {
                (Some(x), Some(y), _, _) => TileCoord::new(zoom, x, y),
                (_, _, Some(lat), Some(lon)) => {
                    TileCoord::for_lat_lon(lat, lon, zoom, reliefmap_tiles::AxisConvention::NorthDown)?
                }
                _ => {
                    return Err(RenderError::InvalidConfig(
                        "give either --x/--y or --lat/--lon".into(),
                    ))
                }
            };
            let renderer = TileRenderer::new(&config)?;
            let image = renderer.render_tile(&coord)?;
            write_png(&output, &image)?;
            info!(%coord, path = %output.display(), "Wrote tile");
        }
        Command::Generate {
            region,
            out_dir,
            overwrite,
        } => {
            let (config, bounds) = region.resolve()?;
            let cancel = CancellationToken::new();
            let handler_token = cancel.clone();
            ctrlc::set_handler(move || {
                eprintln!("Cancelling after the current tile...");
                handler_token.cancel();
            })?;

            let generator = TileGenerator::new(TileRenderer::new(&config)?, out_dir)
                .with_overwrite(overwrite)
                .with_cancellation(cancel)
                .with_progress(progress());
            let summary = generator.generate(bounds, region.min_zoom..=region.max_zoom)?;
            if summary.cancelled {
                return Err(RenderError::Cancelled);
            }
            if summary.failed > 0 {
                error!(failed = summary.failed, "Some tiles could not be rendered");
            }
        }
        Command::Prefetch { region } => {
            let (config, bounds) = region.resolve()?;
            let tiles = config.build_tileset()?;
            let callback = progress();
            let summary = prefetch_region(
                &tiles,
                bounds,
                region.min_zoom..=region.max_zoom,
                config.threads,
                Some(&callback),
            )?;
            if summary.failed > 0 {
                error!(failed = summary.failed, "Some tiles could not be fetched");
            }
        }
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli.log_level);
    reliefmap_metrics::describe_metrics();

    if let Err(err) = run(cli.command) {
        error!(error = %err, "reliefmap failed");
        eprintln!("Error: {}", err);
        process::exit(1);
    }
}
