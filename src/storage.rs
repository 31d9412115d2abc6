//! Upload and result persistence
//!
//! Uploads land at `<uploads_dir>/<job_id><ext>` (the reference file gets a
//! `-ref` suffix); results are pretty-printed JSON at
//! `<results_dir>/<job_id>.json`. Uploads stream to disk in chunks so
//! large files never sit in memory.

use crate::config::Settings;
use crate::error::{ApiError, ApiResult};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Create the uploads and results directories if missing
pub async fn ensure_dirs(settings: &Settings) -> std::io::Result<()> {
    tokio::fs::create_dir_all(&settings.uploads_dir).await?;
    tokio::fs::create_dir_all(&settings.results_dir).await?;
    Ok(())
}

/// Lowercased extension (with leading dot) from an uploaded filename,
/// stripped of any path components a client might smuggle in
pub fn safe_extension(filename: Option<&str>) -> String {
    let Some(name) = filename else {
        return String::new();
    };
    let base = Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("");
    match Path::new(base).extension().and_then(|e| e.to_str()) {
        Some(ext) => format!(".{}", ext.to_ascii_lowercase()),
        None => String::new(),
    }
}

/// Destination for the primary upload of a job
pub fn upload_path(uploads_dir: &Path, job_id: Uuid, extension: &str) -> PathBuf {
    let ext = if extension.is_empty() { ".wav" } else { extension };
    uploads_dir.join(format!("{}{}", job_id, ext))
}

/// Destination for the optional reference upload of a job
pub fn reference_path(uploads_dir: &Path, job_id: Uuid, extension: &str) -> PathBuf {
    let ext = if extension.is_empty() { ".wav" } else { extension };
    uploads_dir.join(format!("{}-ref{}", job_id, ext))
}

/// Per-job result location
pub fn result_path(results_dir: &Path, job_id: Uuid) -> PathBuf {
    results_dir.join(format!("{}.json", job_id))
}

/// Stream one multipart field to disk in 1 MiB chunks
pub async fn save_upload(field: &mut axum::extract::multipart::Field<'_>, dest: &Path) -> ApiResult<()> {
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut file = tokio::fs::File::create(dest).await?;
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Upload stream failed: {}", e)))?
    {
        file.write_all(&chunk).await?;
    }
    file.flush().await?;
    Ok(())
}
