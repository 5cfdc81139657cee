use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use log::warn;
use rayon::prelude::*;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use mapimage::config::FileConfig;
use mapimage::tiles::{TileCache, TileFormat, tiles_covering};
use mapimage::{ImageRegistry, TileService};

/// Serve georeferenced raster images as Web Mercator map tiles
///
/// Examples:
///   # Show every configured image with its zoom range
///   mapimage list
///
///   # Render one TMS tile to a file
///   mapimage tile dardanelles 12 2345 2565 -o tile.png
///
///   # Pre-render the whole pyramid of an image into the cache
///   mapimage --config charts.toml seed dardanelles --max-zoom 14
#[derive(Parser, Debug)]
#[command(name = "mapimage")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to config file (optional, auto-searches mapimage.toml if not provided)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print metadata for every loaded image
    List,

    /// Print metadata for one image
    Info { id: String },

    /// Render a single tile
    Tile {
        id: String,
        zoom: u32,
        x: u32,
        y: u32,

        /// Row numbering: tms (origin bottom-left) or google/xyz (origin top-left)
        #[arg(short = 'f', long, default_value = "tms")]
        format: TileFormat,

        /// Output PNG path (defaults to stdout)
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,
    },

    /// Render every tile of an image into the cache
    Seed {
        id: String,

        /// First zoom level (defaults to the image's minimum)
        #[arg(long)]
        min_zoom: Option<u32>,

        /// Last zoom level (defaults to the image's maximum)
        #[arg(long)]
        max_zoom: Option<u32>,
    },

    /// Copy the original image file
    Raw {
        id: String,

        #[arg(short = 'o', long)]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let file_config = if let Some(ref config_path) = args.config {
        if config_path.exists() {
            FileConfig::from_file(config_path)
                .context(format!("Failed to load config file: {:?}", config_path))?
        } else {
            bail!("Config file not found: {:?}", config_path);
        }
    } else {
        FileConfig::load().unwrap_or_default()
    };

    let spinner = create_spinner("Loading images...")?;
    let start = Instant::now();
    let (registry, failures) = ImageRegistry::load(&file_config);
    spinner.finish_with_message(format!(
        "Loaded {} images, {} skipped [{:.1}s]",
        registry.len(),
        failures.len(),
        start.elapsed().as_secs_f32()
    ));

    let cache = file_config.cache_root().map(TileCache::new);
    let service = TileService::new(registry, cache, file_config.url_base.clone());

    match args.command {
        Command::List => {
            let metadata = service.all_metadata();
            println!("{}", serde_json::to_string_pretty(&metadata)?);
        }
        Command::Info { id } => {
            let metadata = service.metadata(&id)?;
            println!("{}", serde_json::to_string_pretty(&metadata)?);
        }
        Command::Tile {
            id,
            zoom,
            x,
            y,
            format,
            output,
        } => {
            let response = service
                .tile(&id, format, zoom, x, y)
                .context(format!("Failed to render tile {}/{}/{}", zoom, x, y))?;
            match output {
                Some(path) => {
                    std::fs::write(&path, &response.bytes)
                        .context(format!("Failed to write {}", path.display()))?;
                    println!(
                        "Wrote {} ({:.1} KB, {})",
                        path.display(),
                        response.bytes.len() as f64 / 1024.0,
                        response.content_type
                    );
                }
                None => std::io::stdout().write_all(&response.bytes)?,
            }
        }
        Command::Seed {
            id,
            min_zoom,
            max_zoom,
        } => seed(&service, &id, min_zoom, max_zoom)?,
        Command::Raw { id, output } => {
            let bytes = service.raw(&id)?;
            std::fs::write(&output, &bytes)
                .context(format!("Failed to write {}", output.display()))?;
            println!("Wrote {} ({} bytes)", output.display(), bytes.len());
        }
    }

    Ok(())
}

fn seed(
    service: &TileService,
    id: &str,
    min_zoom: Option<u32>,
    max_zoom: Option<u32>,
) -> Result<()> {
    if service.cache().is_none() {
        bail!("Seeding needs the tile cache; set cache = true in the config");
    }
    let image = service.registry().get(id)?;
    let min_zoom = min_zoom.unwrap_or(image.min_zoom());
    let max_zoom = max_zoom.unwrap_or(image.max_zoom());
    if min_zoom > max_zoom {
        bail!("--min-zoom {} is above --max-zoom {}", min_zoom, max_zoom);
    }

    let bounds = image.geo_bounds();
    let tiles: Vec<_> = (min_zoom..=max_zoom)
        .flat_map(|zoom| tiles_covering(bounds, zoom))
        .collect();

    let start = Instant::now();
    let progress = ProgressBar::new(tiles.len() as u64);
    progress.set_style(
        ProgressStyle::with_template("{bar:40.green/white} {pos}/{len} tiles [{elapsed}] {msg}")?,
    );
    progress.set_message(format!("z{}-{}", min_zoom, max_zoom));

    let failed = AtomicUsize::new(0);
    tiles.par_iter().for_each(|&tile| {
        if let Err(e) = service.image_tile(image, tile) {
            warn!("{} {}: {}", id, tile, e);
            failed.fetch_add(1, Ordering::Relaxed);
        }
        progress.inc(1);
    });

    progress.finish_with_message(format!(
        "done [{:.1}s]",
        start.elapsed().as_secs_f32()
    ));
    let failed = failed.into_inner();
    if failed > 0 {
        bail!("{} of {} tiles failed", failed, tiles.len());
    }
    println!("Seeded {} tiles for {}", tiles.len(), id);
    Ok(())
}

fn create_spinner(message: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg}")?
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(80));
    Ok(pb)
}
