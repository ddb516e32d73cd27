use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use std::path::PathBuf;

use tilestitch::{
    coord::validate_zoom, from_fractional_tile, to_fractional_tile, BoundingBox, Compositor, Config,
    Downloader,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Root directory of the tile store (overrides the config file)
    #[arg(short, long)]
    tile_root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a view centered on a point from the stored tiles
    Render {
        /// Latitude of the view center
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,

        /// Longitude of the view center
        #[arg(long, allow_negative_numbers = true)]
        lon: f64,

        /// Zoom level
        #[arg(short, long)]
        zoom: u32,

        /// Output width in pixels
        #[arg(long, default_value_t = 200)]
        width: u32,

        /// Output height in pixels
        #[arg(long, default_value_t = 200)]
        height: u32,

        /// Output image file
        #[arg(short, long, default_value = "output.png")]
        output: PathBuf,
    },

    /// Download tiles covering a bounding box into the tile store
    Download {
        #[command(flatten)]
        area: AreaArgs,

        /// Lowest zoom level to fetch
        #[arg(long)]
        min_zoom: Option<u32>,

        /// Highest zoom level to fetch
        #[arg(long)]
        max_zoom: Option<u32>,
    },

    /// Print the corners of a bounding box and its tile coverage
    Inspect {
        #[command(flatten)]
        area: AreaArgs,

        /// Zoom level used for the corner conversion example
        #[arg(short, long, default_value_t = 12)]
        zoom: u32,
    },

    /// Remove every tile from the tile store
    ClearTiles,
}

/// Bounding box overrides; any missing edge comes from the config file
#[derive(clap::Args)]
struct AreaArgs {
    #[arg(long, allow_negative_numbers = true)]
    min_lat: Option<f64>,

    #[arg(long, allow_negative_numbers = true)]
    min_lon: Option<f64>,

    #[arg(long, allow_negative_numbers = true)]
    max_lat: Option<f64>,

    #[arg(long, allow_negative_numbers = true)]
    max_lon: Option<f64>,
}

impl AreaArgs {
    fn resolve(&self, fallback: &BoundingBox) -> Result<BoundingBox> {
        let bbox = BoundingBox::new(
            self.min_lat.unwrap_or(fallback.min_lat),
            self.min_lon.unwrap_or(fallback.min_lon),
            self.max_lat.unwrap_or(fallback.max_lat),
            self.max_lon.unwrap_or(fallback.max_lon),
        )?;
        Ok(bbox)
    }
}

fn main() -> Result<()> {
    // Initialize logger
    env_logger::init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(tile_root) = &cli.tile_root {
        config.tile_root = tile_root.clone();
    }

    match &cli.command {
        Commands::Render { lat, lon, zoom, width, height, output } => {
            let compositor = Compositor::new(config.compositor_config(), config.tile_store());

            info!("Rendering {}x{} view at ({}, {}) zoom {}", width, height, lat, lon, zoom);
            let image = compositor.render(*lat, *lon, *zoom, *width, *height)
                .context("Failed to render view")?;

            image.save(output)
                .with_context(|| format!("Failed to save image to {}", output.display()))?;
            info!("Wrote {}", output.display());
        },

        Commands::Download { area, min_zoom, max_zoom } => {
            let bbox = area.resolve(&config.download.bbox)?;
            let min_zoom = min_zoom.unwrap_or(config.download.min_zoom);
            let max_zoom = max_zoom.unwrap_or(config.download.max_zoom);

            let downloader = Downloader::new(config.tile_store(), config.download.clone())?;
            let report = downloader.download_bbox(&bbox, min_zoom, max_zoom)
                .context("Failed to download tiles")?;

            println!(
                "{} downloaded, {} already present, {} failed",
                report.downloaded, report.skipped, report.failed
            );
        },

        Commands::Inspect { area, zoom } => {
            validate_zoom(*zoom)?;
            let bbox = area.resolve(&config.download.bbox)?;
            let corners = bbox.corners();

            println!("Corner coordinates (lat,lon):");
            for (name, point) in corners.named() {
                println!("{}: {:.6},{:.6}", name, point.lat, point.lon);
            }

            let (xtile, ytile) = to_fractional_tile(corners.top_left, *zoom);
            let back = from_fractional_tile(xtile, ytile, *zoom);
            println!("\nExample conversion @ zoom {}:", zoom);
            println!("  top_left -> tile numbers: xtile={:.4}, ytile={:.4}", xtile, ytile);
            println!("  back to lat/lon: lat={:.6}, lon={:.6}", back.lat, back.lon);

            println!("\nTile coverage:");
            for level in config.download.min_zoom..=config.download.max_zoom {
                let range = bbox.tile_range(level)?;
                println!(
                    "  zoom {}: x {}..={} y {}..={} ({} tiles)",
                    level, range.x_min, range.x_max, range.y_min, range.y_max, range.tile_count()
                );
            }
        },

        Commands::ClearTiles => {
            info!("Clearing tile store at {}", config.tile_root.display());
            config.tile_store().clear()
                .context("Failed to clear tile store")?;
            info!("Tile store cleared");
        },
    }

    Ok(())
}
