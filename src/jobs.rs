//! Job store and worker loop
//!
//! An in-memory job store plus a single-consumer FIFO worker: at most one
//! job is analyzed at a time and additional submissions wait in queue
//! order. The pipeline itself is synchronous; the worker runs it on a
//! blocking task and the store doubles as the pipeline's progress sink.
//! There is no cancellation and no internal timeout.

use crate::analysis::advisories::AdvisoryCatalog;
use crate::analysis::capability::Capabilities;
use crate::analysis::genre_profiles::ProfileStore;
use crate::analysis::{run_analysis, AnalysisRequest, ProgressSink};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use tokio::sync::mpsc;
use uuid::Uuid;

const QUEUE_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Processing,
    Done,
    Failed,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Done => "done",
            JobStatus::Failed => "failed",
        }
    }
}

/// Bookkeeping for one submitted job
#[derive(Debug, Clone, Serialize)]
pub struct JobRecord {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub progress: f64,
    pub stage: String,
    #[serde(skip)]
    pub request: AnalysisRequest,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// In-memory job records, shared between API handlers and the worker
#[derive(Clone, Default)]
pub struct JobStore {
    jobs: Arc<RwLock<HashMap<Uuid, JobRecord>>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, request: AnalysisRequest) -> JobRecord {
        let now = Utc::now();
        let record = JobRecord {
            job_id: request.job_id,
            status: JobStatus::Queued,
            progress: 0.0,
            stage: "queued".to_string(),
            request,
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
        };
        self.jobs
            .write()
            .expect("job store poisoned")
            .insert(record.job_id, record.clone());
        record
    }

    pub fn get(&self, job_id: Uuid) -> Option<JobRecord> {
        self.jobs
            .read()
            .expect("job store poisoned")
            .get(&job_id)
            .cloned()
    }

    fn with_record(&self, job_id: Uuid, apply: impl FnOnce(&mut JobRecord)) {
        let mut jobs = self.jobs.write().expect("job store poisoned");
        if let Some(record) = jobs.get_mut(&job_id) {
            apply(record);
            record.updated_at = Utc::now();
        }
    }

    pub fn mark_processing(&self, job_id: Uuid) {
        self.with_record(job_id, |record| {
            record.status = JobStatus::Processing;
        });
    }

    pub fn mark_done(&self, job_id: Uuid, result: serde_json::Value) {
        self.with_record(job_id, |record| {
            record.status = JobStatus::Done;
            record.progress = 1.0;
            record.stage = "complete".to_string();
            record.result = Some(result);
        });
    }

    /// Records the failure message verbatim; no partial result is kept
    pub fn mark_failed(&self, job_id: Uuid, error: String) {
        self.with_record(job_id, |record| {
            record.status = JobStatus::Failed;
            record.progress = 1.0;
            record.stage = "failed".to_string();
            record.error = Some(error);
        });
    }
}

impl ProgressSink for JobStore {
    fn update(&self, job_id: Uuid, progress: f64, stage: &str) {
        self.with_record(job_id, |record| {
            record.progress = progress;
            record.stage = stage.to_string();
        });
    }
}

/// Submission handle held by the API layer
#[derive(Clone)]
pub struct JobQueue {
    sender: mpsc::Sender<AnalysisRequest>,
}

impl JobQueue {
    /// Enqueue a job; fails when the worker has shut down or the queue is
    /// at capacity
    pub async fn enqueue(&self, request: AnalysisRequest) -> Result<(), String> {
        self.sender
            .send(request)
            .await
            .map_err(|_| "Job worker is not running".to_string())
    }
}

/// Single-consumer worker pulling jobs in FIFO order
pub struct JobWorker {
    store: JobStore,
    receiver: mpsc::Receiver<AnalysisRequest>,
    caps: Arc<Capabilities>,
    profiles: Arc<ProfileStore>,
    advisories: Arc<AdvisoryCatalog>,
    results_dir: PathBuf,
}

impl JobWorker {
    pub fn new(
        store: JobStore,
        caps: Arc<Capabilities>,
        profiles: Arc<ProfileStore>,
        advisories: Arc<AdvisoryCatalog>,
        results_dir: PathBuf,
    ) -> (Self, JobQueue) {
        let (sender, receiver) = mpsc::channel(QUEUE_CAPACITY);
        (
            Self {
                store,
                receiver,
                caps,
                profiles,
                advisories,
                results_dir,
            },
            JobQueue { sender },
        )
    }

    /// Run until every queue handle is dropped
    pub async fn run(mut self) {
        tracing::info!("Job worker started");
        while let Some(request) = self.receiver.recv().await {
            let job_id = request.job_id;
            self.store.mark_processing(job_id);

            let store = self.store.clone();
            let caps = self.caps.clone();
            let profiles = self.profiles.clone();
            let advisories = self.advisories.clone();
            let results_dir = self.results_dir.clone();

            let outcome = tokio::task::spawn_blocking(move || {
                run_analysis(&request, &store, &caps, &profiles, &advisories, &results_dir)
            })
            .await;

            match outcome {
                Ok(Ok(report)) => match serde_json::to_value(&report) {
                    Ok(value) => self.store.mark_done(job_id, value),
                    Err(e) => {
                        tracing::error!(job_id = %job_id, error = %e, "Report serialization failed");
                        self.store
                            .mark_failed(job_id, format!("Failed to serialize report: {}", e));
                    }
                },
                Ok(Err(e)) => {
                    tracing::error!(job_id = %job_id, error = %e, "Job failed");
                    self.store.mark_failed(job_id, e.to_string());
                }
                Err(e) => {
                    tracing::error!(job_id = %job_id, error = %e, "Job panicked");
                    self.store.mark_failed(job_id, e.to_string());
                }
            }
        }
        tracing::info!("Job worker stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::AnalysisMode;

    fn request() -> AnalysisRequest {
        AnalysisRequest {
            job_id: Uuid::new_v4(),
            mode: AnalysisMode::Mix,
            genre: "pop".to_string(),
            vocal_style: None,
            audio_path: PathBuf::from("unused.wav"),
            reference_path: None,
            extension: ".wav".to_string(),
        }
    }

    #[test]
    fn job_lifecycle_transitions() {
        let store = JobStore::new();
        let record = store.create(request());
        assert_eq!(record.status, JobStatus::Queued);
        assert_eq!(record.progress, 0.0);

        store.mark_processing(record.job_id);
        store.update(record.job_id, 0.35, "detectors");
        let fetched = store.get(record.job_id).unwrap();
        assert_eq!(fetched.status, JobStatus::Processing);
        assert_eq!(fetched.progress, 0.35);
        assert_eq!(fetched.stage, "detectors");

        store.mark_done(record.job_id, serde_json::json!({"summary": "ok"}));
        let done = store.get(record.job_id).unwrap();
        assert_eq!(done.status, JobStatus::Done);
        assert_eq!(done.progress, 1.0);
        assert!(done.result.is_some());
        assert!(done.error.is_none());
    }

    #[test]
    fn failure_records_the_message_verbatim() {
        let store = JobStore::new();
        let record = store.create(request());
        store.mark_failed(record.job_id, "Decode error: no sample rate".to_string());

        let failed = store.get(record.job_id).unwrap();
        assert_eq!(failed.status, JobStatus::Failed);
        assert_eq!(failed.error.as_deref(), Some("Decode error: no sample rate"));
        assert!(failed.result.is_none());
    }

    #[test]
    fn updates_to_unknown_jobs_are_ignored() {
        let store = JobStore::new();
        store.update(Uuid::new_v4(), 0.5, "metrics");
        assert!(store.get(Uuid::new_v4()).is_none());
    }
}
