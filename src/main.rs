//! Prontu - Clinical Record Keeping with AI-Assisted Session Notes
//!
//! This is the main entry point for the Prontu service: a JSON API for
//! patient records and session notes, with a background pipeline that
//! transcribes and summarizes uploaded session audio through a remote
//! generative API.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use tracing_appender::{non_blocking, rolling};

use prontu::cli::{Args, Commands};
use prontu::config::Config;
use prontu::ai::{prompts, GeminiClient};
use prontu::audio::{AudioSplitter, FfmpegChunker};
use prontu::db::{practitioners, Database};
use prontu::pipeline::{PipelineHandle, PipelineRunner};
use prontu::web::{create_router, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Setup logging to both console and file
    setup_logging(args.verbose)?;

    // Load configuration
    let mut config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            // Try to load config.toml from current directory first
            if std::path::Path::new("config.toml").exists() {
                info!("Found config.toml in current directory, loading...");
                Config::from_file("config.toml")?
            } else {
                let mut config = Config::default();
                config.apply_env_overrides();
                config
            }
        }
    };

    match args.command {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }

            serve(config).await?;
        }
        Commands::InitConfig { output } => {
            Config::default().save_to_file(&output)?;
            println!("Configuration written to {}", output.display());
        }
        Commands::Check => {
            let chunker = FfmpegChunker::new(config.audio.clone());
            chunker.check_availability()?;
            println!("Audio transcoder is available");
        }
    }

    Ok(())
}

async fn serve(config: Config) -> Result<()> {
    info!("Starting Prontu - Clinical Record Keeping");

    let db = Database::open(&config.database.path)?;
    practitioners::ensure_default(&db, prompts::DEFAULT_SYSTEM_PROMPT)?;

    let chunker = Arc::new(FfmpegChunker::new(config.audio.clone()));
    if let Err(e) = chunker.check_availability() {
        // Small uploads pass through without the transcoder; only oversized
        // recordings need it, so start anyway.
        warn!("Audio transcoder unavailable, oversized uploads will fail: {}", e);
    }

    let client = Arc::new(GeminiClient::new(config.ai.clone()));
    let pipeline = PipelineRunner::spawn(&config.pipeline, db.clone(), chunker, client);

    let state = AppState {
        db,
        pipeline: pipeline.clone(),
        config: config.clone(),
    };

    let router = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid bind address: {}", e))?;

    info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal(pipeline))
        .await?;

    Ok(())
}

/// Wait for Ctrl-C, then stop the workers before the server exits
async fn shutdown_signal(pipeline: PipelineHandle) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        return;
    }

    info!("Shutdown requested, stopping pipeline workers");
    pipeline.shutdown();
}

/// Setup logging to both console and file
fn setup_logging(verbose: bool) -> Result<()> {
    // Create log directory
    let prontu_dir = std::env::current_dir()?.join(".prontu");
    let log_dir = prontu_dir.join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Set up file appender with daily rotation
    let file_appender = rolling::daily(&log_dir, "prontu.log");
    let (non_blocking_file, _guard) = non_blocking(file_appender);
    // Keep the guard alive for the duration of the program
    std::mem::forget(_guard);

    // Determine log level
    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    // Create console layer
    let console_layer = fmt::layer()
        .with_target(false)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true);

    // Create file layer
    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false); // No ANSI colors in file

    // Setup layered subscriber
    let subscriber = tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer);

    // Initialize the subscriber
    subscriber.try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!("Logging initialized - console: {}, file: {}",
          log_level, log_dir.join("prontu.log").display());

    Ok(())
}
