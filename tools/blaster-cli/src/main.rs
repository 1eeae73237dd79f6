//! Blaster CLI: render animated collages from images, GIFs, and videos.
//!
//! Usage:
//!   blaster render <FILES>...     Record a collage video (blaster.mp4 or blaster.gif)
//!   blaster preview <FILES>...    Run the live preview and save a snapshot
//!   blaster check                 Check for ffmpeg/ffprobe
//!   blaster init [PATH]           Write a default scene preset
//!   blaster validate <PRESET>     Validate a scene preset
//!   blaster config                Show (or write) the application config

use std::path::PathBuf;

use blaster_common::config::{AppConfig, LoggingConfig};
use blaster_media_model::{BackgroundColor, CanvasSize, Direction};
use blaster_render_engine::ExportFormat;
use clap::{Args, Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "blaster",
    about = "Animated media collages, recorded frame by frame",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Scene options shared by `render` and `preview`.
#[derive(Args, Debug, Clone)]
pub struct SceneArgs {
    /// Media files (jpg, png, gif, mp4), in spawn order
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Scene preset (JSON) to start from
    #[arg(short, long)]
    pub preset: Option<PathBuf>,

    /// Canvas size: 1080x1080, 1920x1080, or 1080x1920
    #[arg(long)]
    pub canvas: Option<CanvasSize>,

    /// Background colour as #rrggbb
    #[arg(long)]
    pub background: Option<BackgroundColor>,

    /// Enable a motion direction (repeatable): up, down, left, right, inward, outward
    #[arg(long = "motion")]
    pub motion: Vec<Direction>,

    /// Seed for spawn positions
    #[arg(long)]
    pub seed: Option<u64>,

    /// Frame rate of the timeline and output
    #[arg(long)]
    pub fps: Option<u32>,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a collage video
    Render {
        #[command(flatten)]
        scene: SceneArgs,

        /// Output directory
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Video length in seconds
        #[arg(long)]
        seconds: Option<f64>,

        /// Output format: mp4 (ffmpeg) or gif
        #[arg(long, default_value = "mp4")]
        format: ExportFormat,

        /// Skip writing blaster.export.json next to the video
        #[arg(long)]
        no_report: bool,
    },

    /// Run the real-time preview and save the last frame
    Preview {
        #[command(flatten)]
        scene: SceneArgs,

        /// How long to run the preview, in seconds
        #[arg(long, default_value = "3.0")]
        seconds: f64,

        /// Where to write the snapshot PNG
        #[arg(long, default_value = "blaster-preview.png")]
        snapshot: PathBuf,
    },

    /// Check system capabilities
    Check,

    /// Write a default scene preset
    Init {
        /// Preset path
        #[arg(default_value = "blaster-preset.json")]
        path: PathBuf,

        /// Canvas size for the preset
        #[arg(long, default_value = "1080x1080")]
        canvas: CanvasSize,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Validate a scene preset
    Validate {
        /// Path to the preset
        path: PathBuf,
    },

    /// Show the effective application config
    Config {
        /// Write the effective config to its standard location
        #[arg(long)]
        write: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load();

    // Initialize logging
    let level = if cli.verbose {
        "debug".to_string()
    } else {
        config.logging.level.clone()
    };
    blaster_common::logging::init_logging(&LoggingConfig {
        level,
        ..config.logging.clone()
    });

    match cli.command {
        Commands::Render {
            scene,
            output,
            seconds,
            format,
            no_report,
        } => commands::render::run(&config, scene, output, seconds, format, !no_report).await,
        Commands::Preview {
            scene,
            seconds,
            snapshot,
        } => commands::preview::run(&config, scene, seconds, snapshot).await,
        Commands::Check => commands::check::run(),
        Commands::Init {
            path,
            canvas,
            force,
        } => commands::init::run(path, canvas, force),
        Commands::Validate { path } => commands::validate::run(path),
        Commands::Config { write } => commands::config::run(config, write),
    }
}
