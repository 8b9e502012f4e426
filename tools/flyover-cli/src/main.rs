//! Flyover CLI: turn GPS recordings into flyover videos.
//!
//! Usage:
//!   flyover inspect <ROUTE>      Show route statistics
//!   flyover plan <ROUTE>         Write the per-frame camera path as JSON
//!   flyover preview <ROUTE>      Play the camera path in real time
//!   flyover render <ROUTE>       Render a video
//!   flyover check                Check system capabilities

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use flyover_common::config::{AppConfig, LoggingConfig};

mod commands;

#[derive(Parser)]
#[command(
    name = "flyover",
    about = "Animated 3D flyover videos from GPS recordings",
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

#[derive(Subcommand)]
enum Commands {
    /// Show route statistics
    Inspect {
        /// GPX or route JSON file
        route: PathBuf,
    },

    /// Run the processing pipeline and write every camera pose as JSON
    Plan {
        /// GPX or route JSON file
        route: PathBuf,

        /// Output file for the poses
        #[arg(short, long, default_value = "poses.json")]
        output: PathBuf,

        /// Also write the processed route as JSON
        #[arg(long)]
        route_json: Option<PathBuf>,

        /// Route section length in seconds
        #[arg(long)]
        duration: Option<f64>,

        /// Frames per second
        #[arg(long)]
        fps: Option<u32>,
    },

    /// Play the camera path in real time, logging each pose
    Preview {
        /// GPX or route JSON file
        route: PathBuf,

        /// Playback speed multiplier (0.25 to 4)
        #[arg(long, default_value = "1.0")]
        speed: f64,

        /// Stop after this many frames
        #[arg(long)]
        frames: Option<u32>,

        /// Route section length in seconds
        #[arg(long)]
        duration: Option<f64>,
    },

    /// Render a flyover video
    Render(commands::render::RenderArgs),

    /// Check system capabilities
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load();

    let level = if cli.verbose {
        "debug".to_string()
    } else {
        config.logging.level.clone()
    };
    flyover_common::logging::init_logging(&LoggingConfig {
        level,
        ..config.logging.clone()
    });

    match cli.command {
        Commands::Inspect { route } => commands::inspect::run(route, &config),
        Commands::Plan {
            route,
            output,
            route_json,
            duration,
            fps,
        } => commands::plan::run(route, output, route_json, duration, fps, &config),
        Commands::Preview {
            route,
            speed,
            frames,
            duration,
        } => commands::preview::run(route, speed, frames, duration, &config).await,
        Commands::Render(args) => commands::render::run(args, &config).await,
        Commands::Check => commands::check::run(&config),
    }
}
