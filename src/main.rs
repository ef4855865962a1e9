use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use streetview_animator::{
    AnimatorError, GenerateOutcome, GoogleMapsClient, LogEvents, ManifestPlayer, Movie,
    MovieConfig, MovieServices, Result,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "streetview-animator")]
#[command(about = "Compile Street View scene descriptions into animation frames", long_about = None)]
struct Args {
    /// Movie description (JSON): frame settings and scenes
    #[arg(short, long)]
    movie: String,

    /// Output frame manifest path
    #[arg(short, long, default_value = "frames.json")]
    output: String,

    /// Frames per second
    #[arg(long)]
    frame_rate: Option<u32>,

    /// Frame width in pixels
    #[arg(long)]
    width: Option<u32>,

    /// Frame height in pixels
    #[arg(long)]
    height: Option<u32>,

    /// Google Maps API key
    #[arg(long)]
    api_key: Option<String>,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true)
        .init();

    let mut config = MovieConfig::from_file(&args.movie)
        .await
        .with_context(|| format!("Failed to read movie file: {}", args.movie))?;
    config
        .apply_env()
        .context("Invalid environment override")?;

    if let Some(frame_rate) = args.frame_rate {
        config.frame_rate = frame_rate;
    }
    if let Some(width) = args.width {
        config.frame_width = width;
    }
    if let Some(height) = args.height {
        config.frame_height = height;
    }
    if let Some(key) = args.api_key {
        config.api_key = Some(key);
    }

    if config.api_key.as_deref().map_or(true, str::is_empty) {
        eprintln!("Error: GOOGLE_MAPS_API_KEY not found. Please set it via --api-key, the movie file or the GOOGLE_MAPS_API_KEY environment variable");
        std::process::exit(1);
    }

    info!(
        scenes = config.scenes.len(),
        frame_rate = config.frame_rate,
        "Starting scene generation..."
    );

    if let Err(e) = run(config, args.output).await {
        error!("Frame generation failed: {}", e);
        std::process::exit(1);
    }

    info!("Frame generation completed successfully!");
    Ok(())
}

async fn run(config: MovieConfig, output: String) -> Result<()> {
    let api_key = config.api_key.clone().unwrap_or_default();
    let client = Arc::new(GoogleMapsClient::new(api_key, config.request_timeout())?);
    let services = MovieServices::new(
        client.clone(),
        client,
        Arc::new(ManifestPlayer::new(output)),
    )
    .with_events(Arc::new(LogEvents));

    let movie = Movie::new(config, services)?;

    let outcome = tokio::select! {
        outcome = movie.generate() => outcome?,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, cancelling generation");
            movie.cancel();
            return Err(AnimatorError::Cancelled);
        }
    };

    match outcome {
        GenerateOutcome::Completed(report) => {
            for failure in report.failures() {
                warn!(
                    scene_id = %failure.scene_id,
                    error = failure.error.as_deref().unwrap_or_default(),
                    "Scene has no frames"
                );
            }
        }
        GenerateOutcome::Cancelled => return Err(AnimatorError::Cancelled),
        GenerateOutcome::AlreadyGenerated | GenerateOutcome::InProgress => {}
    }

    let reel = movie.play().await?;
    info!(
        frames = reel.frames.len(),
        scenes = reel.scenes.len(),
        "Frames handed to player"
    );
    Ok(())
}
