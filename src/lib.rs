//! mixmentor - audio mix quality analysis service
//!
//! Accepts an uploaded recording (vocal take, instrumental, or full mix),
//! runs a battery of signal-processing extractors over it, and produces a
//! genre-aware quality report with scores and recommendations. Analysis
//! runs asynchronously behind a small HTTP API; a single FIFO worker
//! processes one job at a time.

pub mod analysis;
pub mod api;
pub mod config;
pub mod error;
pub mod jobs;
pub mod storage;

pub use crate::error::{ApiError, ApiResult};

use axum::extract::DefaultBodyLimit;
use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::analysis::genre_profiles::ProfileStore;
use crate::config::Settings;
use crate::jobs::{JobQueue, JobStore};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub store: JobStore,
    pub queue: JobQueue,
    pub profiles: Arc<ProfileStore>,
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        settings: Arc<Settings>,
        store: JobStore,
        queue: JobQueue,
        profiles: Arc<ProfileStore>,
    ) -> Self {
        Self {
            settings,
            store,
            queue,
            profiles,
            startup_time: Utc::now(),
        }
    }
}

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.settings.max_upload_bytes();
    Router::new()
        .merge(api::health_routes())
        .merge(api::job_routes())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
