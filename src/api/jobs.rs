//! Job submission and retrieval handlers
//!
//! POST /api/jobs (multipart upload), GET /api/jobs/:id,
//! GET /api/results/:id, GET /api/genres.

use axum::{
    extract::{Multipart, Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use uuid::Uuid;

use crate::analysis::{AnalysisMode, AnalysisRequest};
use crate::error::{ApiError, ApiResult};
use crate::jobs::JobStatus;
use crate::storage;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct JobCreateResponse {
    pub job_id: Uuid,
    pub status: JobStatus,
}

#[derive(Debug, Serialize)]
pub struct JobStatusResponse {
    pub job_id: Uuid,
    pub status: String,
    pub progress: f64,
    pub stage: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GenresResponse {
    pub genres: Vec<String>,
}

/// POST /api/jobs
///
/// Multipart form: `mode`, `genre`, optional `vocal_style`, file field
/// `audio`, optional file field `reference`. Uploads stream to disk under
/// the new job's id, then the job is recorded and enqueued.
pub async fn create_job(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<JobCreateResponse>> {
    let job_id = Uuid::new_v4();

    let mut mode: Option<String> = None;
    let mut genre: Option<String> = None;
    let mut vocal_style: Option<String> = None;
    let mut audio: Option<(String, std::path::PathBuf)> = None;
    let mut reference: Option<std::path::PathBuf> = None;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart form: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "mode" => mode = Some(read_text(field, "mode").await?),
            "genre" => genre = Some(read_text(field, "genre").await?),
            "vocal_style" => {
                let value = read_text(field, "vocal_style").await?;
                if !value.is_empty() {
                    vocal_style = Some(value);
                }
            }
            "audio" => {
                let ext = storage::safe_extension(field.file_name());
                let path = storage::upload_path(&state.settings.uploads_dir, job_id, &ext);
                storage::save_upload(&mut field, &path).await?;
                audio = Some((ext, path));
            }
            "reference" => {
                let ext = storage::safe_extension(field.file_name());
                let path = storage::reference_path(&state.settings.uploads_dir, job_id, &ext);
                storage::save_upload(&mut field, &path).await?;
                reference = Some(path);
            }
            // Unknown fields are ignored
            _ => {}
        }
    }

    let mode: AnalysisMode = mode
        .ok_or_else(|| ApiError::BadRequest("Missing form field 'mode'".to_string()))?
        .parse()
        .map_err(ApiError::BadRequest)?;
    let genre =
        genre.ok_or_else(|| ApiError::BadRequest("Missing form field 'genre'".to_string()))?;
    let (extension, audio_path) =
        audio.ok_or_else(|| ApiError::BadRequest("Missing audio file".to_string()))?;

    let request = AnalysisRequest {
        job_id,
        mode,
        genre,
        vocal_style,
        audio_path,
        reference_path: reference,
        extension,
    };

    tracing::info!(job_id = %job_id, mode = mode.as_str(), "Job submitted");
    state.store.create(request.clone());
    state
        .queue
        .enqueue(request)
        .await
        .map_err(ApiError::Internal)?;

    Ok(Json(JobCreateResponse {
        job_id,
        status: JobStatus::Queued,
    }))
}

/// GET /api/jobs/:id
///
/// Unknown ids answer with a `not_found` status rather than a 404, so
/// pollers can treat the response shape uniformly.
pub async fn job_status(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Json<JobStatusResponse> {
    match state.store.get(job_id) {
        Some(record) => Json(JobStatusResponse {
            job_id: record.job_id,
            status: record.status.as_str().to_string(),
            progress: record.progress,
            stage: record.stage,
            result: record.result,
            error: record.error,
        }),
        None => Json(JobStatusResponse {
            job_id,
            status: "not_found".to_string(),
            progress: 0.0,
            stage: "unknown".to_string(),
            result: None,
            error: None,
        }),
    }
}

/// GET /api/results/:id — the persisted report
pub async fn job_result(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    let path = storage::result_path(&state.settings.results_dir, job_id);
    let content = tokio::fs::read_to_string(&path)
        .await
        .map_err(|_| ApiError::NotFound(format!("No result for job {}", job_id)))?;
    let value: serde_json::Value = serde_json::from_str(&content)
        .map_err(|e| ApiError::Internal(format!("Stored result is unreadable: {}", e)))?;
    Ok(Json(value))
}

/// GET /api/genres — selectable genres from the profile store
pub async fn list_genres(State(state): State<AppState>) -> ApiResult<Json<GenresResponse>> {
    let genres = state
        .profiles
        .genres()
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(GenresResponse { genres }))
}

pub fn job_routes() -> Router<AppState> {
    Router::new()
        .route("/api/jobs", post(create_job))
        .route("/api/jobs/:id", get(job_status))
        .route("/api/results/:id", get(job_result))
        .route("/api/genres", get(list_genres))
}

async fn read_text(field: axum::extract::multipart::Field<'_>, name: &str) -> ApiResult<String> {
    field
        .text()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid form field '{}': {}", name, e)))
}
