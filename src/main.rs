//! mixmentor service binary
//!
//! Resolves configuration, prepares storage directories, starts the FIFO
//! job worker, and serves the HTTP API.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use mixmentor::analysis::advisories::AdvisoryCatalog;
use mixmentor::analysis::capability::Capabilities;
use mixmentor::analysis::genre_profiles::ProfileStore;
use mixmentor::config::Settings;
use mixmentor::jobs::{JobStore, JobWorker};
use mixmentor::AppState;

#[derive(Debug, Parser)]
#[command(name = "mixmentor", version, about = "Audio mix quality analysis service")]
struct Args {
    /// Path to a TOML config file (overrides MIXMENTOR_CONFIG and defaults)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let settings = Arc::new(
        Settings::resolve(args.config.as_deref()).context("Failed to load configuration")?,
    );

    info!("Starting {} v{}", settings.app_name, env!("CARGO_PKG_VERSION"));

    mixmentor::storage::ensure_dirs(&settings)
        .await
        .context("Failed to create storage directories")?;

    let profiles = Arc::new(ProfileStore::new(settings.genre_profiles_path.clone()));
    // Fail fast on a broken profile file instead of at first job
    let genres = profiles
        .genres()
        .context("Failed to load genre profiles")?;
    info!("Loaded {} genre profiles from {}", genres.len(), profiles.path().display());

    let advisories = Arc::new(match &settings.advisories_path {
        Some(path) => AdvisoryCatalog::from_file(path).context("Failed to load advisory catalog")?,
        None => AdvisoryCatalog::default(),
    });

    let caps = Arc::new(Capabilities::default());
    let store = JobStore::new();
    let (worker, queue) = JobWorker::new(
        store.clone(),
        caps,
        profiles.clone(),
        advisories,
        settings.results_dir.clone(),
    );
    tokio::spawn(worker.run());

    let state = AppState::new(settings.clone(), store, queue, profiles);
    let app = mixmentor::build_router(state);

    let addr = format!("{}:{}", settings.host, settings.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
