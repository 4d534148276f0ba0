//! planvox Audio Player (planvox-ap) - Main entry point
//!
//! Plays an AI-generated study document as synthesized speech: resolves
//! audio through the durable cache or the synthesis service, and chains
//! playback across paragraphs (or chapters) until the document ends or the
//! user interrupts.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use planvox_ap::audio::CpalOutput;
use planvox_ap::playback::{play_chapter, play_paragraph, play_summary, TransportController};
use planvox_ap::services::{HttpSummarizer, HttpSynthesizer, SqliteAudioCache};
use planvox_ap::state::SharedState;
use planvox_common::config::{AudioConfigStore, Voice};
use planvox_common::document::Document;
use planvox_common::events::PlayerEvent;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for planvox-ap
#[derive(Parser, Debug)]
#[command(name = "planvox-ap")]
#[command(about = "Study-audio player for planvox documents")]
#[command(version)]
struct Args {
    /// Study document JSON file to play
    #[arg(short, long, required_unless_present_any = ["list_voices", "list_devices"])]
    document: Option<PathBuf>,

    /// Chapter index to start from
    #[arg(short, long, default_value = "0")]
    chapter: usize,

    /// Chain whole chapters instead of paragraphs
    #[arg(long, conflicts_with = "summary")]
    by_chapter: bool,

    /// Play the selected chapter's summary instead of its content
    #[arg(long)]
    summary: bool,

    /// Base URL of the synthesis/summary service
    #[arg(long, default_value = "http://127.0.0.1:8787", env = "PLANVOX_SERVICE_URL")]
    service_url: String,

    /// Audio cache database path (defaults to the platform data directory)
    #[arg(long, env = "PLANVOX_CACHE_DB")]
    cache_db: Option<PathBuf>,

    /// Synthesis voice override (persisted)
    #[arg(long)]
    voice: Option<Voice>,

    /// Playback speed override (persisted)
    #[arg(long)]
    speed: Option<f64>,

    /// Audio output device name (default device if omitted)
    #[arg(long)]
    audio_device: Option<String>,

    /// List known synthesis voices and exit
    #[arg(long)]
    list_voices: bool,

    /// List audio output devices and exit
    #[arg(long)]
    list_devices: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "planvox_ap=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    if args.list_voices {
        for voice in Voice::all() {
            println!("{}", voice);
        }
        return Ok(());
    }

    if args.list_devices {
        for name in CpalOutput::list_devices().context("Failed to enumerate audio devices")? {
            println!("{}", name);
        }
        return Ok(());
    }

    let document_path = args
        .document
        .as_ref()
        .expect("clap enforces --document unless a list flag is set");

    info!("Starting planvox Audio Player");
    info!("Document: {}", document_path.display());

    // Load the study document
    let contents = std::fs::read_to_string(document_path)
        .with_context(|| format!("Failed to read {}", document_path.display()))?;
    let document: Arc<Document> =
        Arc::new(serde_json::from_str(&contents).context("Failed to parse study document")?);
    info!(
        "Loaded \"{}\" ({} chapters)",
        document.title,
        document.chapters.len()
    );

    // Open the audio cache
    let cache_db = match args.cache_db {
        Some(path) => path,
        None => default_cache_path()?,
    };
    if let Some(parent) = cache_db.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let pool = SqlitePoolOptions::new()
        .connect_with(SqliteConnectOptions::new().filename(&cache_db).create_if_missing(true))
        .await
        .with_context(|| format!("Failed to open cache database {}", cache_db.display()))?;
    let cache = Arc::new(SqliteAudioCache::new(pool).await?);
    info!(
        "Audio cache: {} ({} entries)",
        cache_db.display(),
        cache.len().await?
    );

    // Wire up the playback engine
    let state = Arc::new(SharedState::new());
    let output = Arc::new(CpalOutput::with_device(args.audio_device.clone()));
    let http_client = reqwest::Client::new();
    let synthesizer = Arc::new(HttpSynthesizer::new(
        http_client.clone(),
        args.service_url.clone(),
    ));
    let summarizer = HttpSummarizer::new(http_client, args.service_url.clone());
    let config_store = AudioConfigStore::default_location().context("Failed to resolve config path")?;

    let controller = TransportController::new(
        Arc::clone(&state),
        output,
        synthesizer,
        cache,
        config_store,
    )
    .await;

    if let Some(voice) = args.voice {
        controller.set_voice(voice).await?;
    }
    if let Some(speed) = args.speed {
        controller.set_speed(speed).await?;
    }

    let position_task = TransportController::spawn_position_task(Arc::clone(&controller));
    spawn_event_logger(&state);

    // Start playback with the selected chaining policy
    if args.summary {
        play_summary(&controller, &summarizer, &document, args.chapter).await?;
    } else if args.by_chapter {
        play_chapter(&controller, &document, args.chapter).await?;
    } else {
        play_paragraph(&controller, &document, args.chapter, 0).await?;
    }

    shutdown_signal().await;

    controller.shutdown().await;
    position_task.abort();
    info!("Shutdown complete");
    Ok(())
}

/// Default cache database location under the platform data directory
fn default_cache_path() -> Result<PathBuf> {
    let dir = dirs::data_local_dir().context("Could not determine data directory")?;
    Ok(dir.join("planvox").join("audio-cache.db"))
}

/// Log notable player events for the console UI
fn spawn_event_logger(state: &Arc<SharedState>) {
    let mut events = state.subscribe_events();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                PlayerEvent::TrackStarted { title, .. } => info!("Now playing: {}", title),
                PlayerEvent::TrackFinished {
                    title, completed, ..
                } => {
                    if completed {
                        info!("Finished: {}", title);
                    }
                }
                PlayerEvent::PlaybackError { message, .. } => warn!("Playback error: {}", message),
                _ => {}
            }
        }
    });
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
