use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber;

use microreel::{
    config::Config,
    media::MediaPool,
    ordering::{Canvas, OrderingEngine},
    script::{Script, Theme},
};

#[derive(Parser)]
#[command(
    name = "microreel",
    version,
    about = "Assemble themed slideshow reels from your photos and clips",
    long_about = "Microreel picks which photos and video clips fill each slot of a themed timeline, balancing repetition and spreading content across the reel, and prints the resulting encode plan."
)]
struct Cli {
    /// Media manifest file (TOML) describing the content pool
    #[arg(short, long)]
    media: PathBuf,

    /// Reel theme
    #[arg(short, long, value_enum, default_value_t = Theme::Memory)]
    theme: Theme,

    /// Re-shuffle instead of replaying a cached ordering
    #[arg(short, long)]
    shuffle: bool,

    /// Configuration file (optional)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .init();

    info!("Starting Microreel v{}", env!("CARGO_PKG_VERSION"));
    info!("Media manifest: {:?}", cli.media);
    info!("Theme: {:?}", cli.theme);

    // Load configuration
    let config = match cli.config {
        Some(config_path) => {
            info!("Loading configuration from {:?}", config_path);
            Config::from_file(&config_path)?
        }
        None => {
            info!("Using default configuration");
            Config::default()
        }
    };
    config.validate()?;

    let pool = MediaPool::from_manifest(&cli.media)?;
    info!(
        "Loaded {} media items ({} videos)",
        pool.len(),
        pool.video_count()
    );

    let script = Script::standard(cli.theme);
    let canvas = Canvas {
        width: config.encode.width,
        height: config.encode.height,
    };

    let mut engine = OrderingEngine::new(config.ordering.clone());
    let timeline = engine.compute_order(&pool, &script, canvas, cli.shuffle)?;

    info!(
        "Ordered {} slots, {}ms planned ({} frames at {}fps)",
        timeline.len(),
        timeline.total_duration_ms(),
        config.encode.total_frames(),
        config.encode.frame_rate
    );

    for (index, slot) in timeline.slots().iter().enumerate() {
        match slot.item {
            Some(id) if slot.is_video() => {
                info!(
                    "  slot {index:>2}: video {id} (part {}) for {}ms",
                    slot.video_part, slot.duration_ms
                );
            }
            Some(id) => {
                info!("  slot {index:>2}: image {id} for {}ms", slot.duration_ms);
            }
            None => {
                info!("  slot {index:>2}: filler for {}ms", slot.duration_ms);
            }
        }
    }

    info!("Plan complete; hand the timeline to an encoding host to render it");
    Ok(())
}
