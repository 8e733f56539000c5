use std::sync::Arc;
use std::time::Duration;

use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::api::validation::ErrorResponse;
use crate::db::{Storage, StorageError};
use crate::sync::{PullOutcome, PullReport, SharedJobs, SyncClient, SyncError, SyncScheduler};
use crate::transfer::{self, RejectedLine};
use super::dto::CsvExport;
use super::models::{today, Job, JobUpdate, NewJob};

/// Service-level errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Writing through to storage failed
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Job not found
    #[error("Job not found: {0}")]
    NotFound(String),

    /// Deletion was not confirmed
    #[error("Deleting job {0} requires confirmation")]
    ConfirmationRequired(String),

    /// Import text held no valid rows
    #[error("No valid rows to import ({} lines rejected)", .0.len())]
    EmptyImport(Vec<RejectedLine>),

    /// No remote endpoint URL is set
    #[error("Remote endpoint is not configured")]
    RemoteNotConfigured,

    /// Remote request failed
    #[error("Remote sync failed: {0}")]
    Sync(#[from] SyncError),

    /// Jobs in the activation category need an activation date
    #[error("Activation date is required for category {0}")]
    MissingActivationDate(String),

    /// Uploaded payload could not be read
    #[error("Invalid upload: {0}")]
    InvalidUpload(String),
}

impl ResponseError for StoreError {
    fn error_response(&self) -> HttpResponse {
        match self {
            StoreError::Storage(e) => {
                error!("Storage error: {}", e);
                HttpResponse::InternalServerError().json(ErrorResponse {
                    error: "Failed to process request".to_string(),
                    fields: serde_json::json!({"message": "Storage error occurred"}),
                })
            }
            StoreError::NotFound(id) => {
                warn!("Job not found: {}", id);
                HttpResponse::NotFound().json(ErrorResponse {
                    error: "Not found".to_string(),
                    fields: serde_json::json!({"message": format!("Job with id {} not found", id)}),
                })
            }
            StoreError::ConfirmationRequired(id) => HttpResponse::Conflict().json(ErrorResponse {
                error: "Confirmation required".to_string(),
                fields: serde_json::json!({
                    "message": format!("Repeat the request with ?confirm=true to delete job {}", id)
                }),
            }),
            StoreError::EmptyImport(rejected) => {
                warn!("Import rejected: no valid rows ({} lines rejected)", rejected.len());
                HttpResponse::UnprocessableEntity().json(ErrorResponse {
                    error: "Import failed".to_string(),
                    fields: serde_json::json!({
                        "message": "Could not read the file or the format does not match",
                        "rejected": rejected,
                    }),
                })
            }
            StoreError::RemoteNotConfigured => HttpResponse::BadRequest().json(ErrorResponse {
                error: "Remote endpoint is not configured".to_string(),
                fields: serde_json::json!({"message": "Set scriptUrl in /settings first"}),
            }),
            StoreError::Sync(e) => {
                error!("Remote sync failed: {}", e);
                HttpResponse::BadGateway().json(ErrorResponse {
                    error: "Remote sync failed".to_string(),
                    fields: serde_json::json!({"message": e.to_string()}),
                })
            }
            StoreError::MissingActivationDate(category) => HttpResponse::BadRequest().json(ErrorResponse {
                error: "Validation failed".to_string(),
                fields: serde_json::json!({
                    "activation_date": {
                        "errors": [format!("Activation date is required for {}", category)]
                    }
                }),
            }),
            StoreError::InvalidUpload(msg) => HttpResponse::BadRequest().json(ErrorResponse {
                error: "Invalid upload".to_string(),
                fields: serde_json::json!({"message": msg}),
            }),
        }
    }
}

/// Explicit answer to the delete confirmation prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed,
    Declined,
}

impl From<bool> for Confirmation {
    fn from(confirmed: bool) -> Self {
        if confirmed {
            Confirmation::Confirmed
        } else {
            Confirmation::Declined
        }
    }
}

/// Counts reported back after an import
#[derive(Debug)]
pub struct ImportSummary {
    pub imported: usize,
    pub rejected: Vec<RejectedLine>,
}

/// Job store: the in-memory collection plus write-through persistence
///
/// Collection order is newest first. Every mutation overwrites the stored
/// document and schedules a debounced push to the remote endpoint.
pub struct JobService {
    jobs: SharedJobs,
    storage: Storage,
    sync: Arc<SyncClient>,
    scheduler: SyncScheduler,
    activation_category: String,
}

impl JobService {
    /// Create a JobService around an already loaded collection
    pub fn new(
        storage: Storage,
        initial: Vec<Job>,
        sync: Arc<SyncClient>,
        debounce: Duration,
        activation_category: impl Into<String>,
    ) -> Self {
        let jobs: SharedJobs = Arc::new(Mutex::new(initial));
        let scheduler = SyncScheduler::new(Arc::clone(&sync), Arc::clone(&jobs), debounce);
        Self {
            jobs,
            storage,
            sync,
            scheduler,
            activation_category: activation_category.into(),
        }
    }

    /// Create a JobService from whatever storage holds
    pub async fn load(
        storage: Storage,
        sync: Arc<SyncClient>,
        debounce: Duration,
        activation_category: impl Into<String>,
    ) -> Result<Self, StoreError> {
        let initial = storage.load_jobs().await?;
        info!("Service: Loaded {} jobs from storage", initial.len());
        Ok(Self::new(storage, initial, sync, debounce, activation_category))
    }

    /// Whether records in `category` carry an activation date
    pub fn tracks_activation(&self, category: &str) -> bool {
        category == self.activation_category
    }

    /// Copy of the whole collection
    pub async fn snapshot(&self) -> Vec<Job> {
        self.jobs.lock().await.clone()
    }

    /// Jobs in one category/subcategory pair matching `search`
    pub async fn list(&self, category: &str, sub_category: &str, search: &str) -> Vec<Job> {
        self.jobs
            .lock()
            .await
            .iter()
            .filter(|job| job.is_in(category, sub_category) && job.matches_search(search))
            .cloned()
            .collect()
    }

    /// Add a single job at the front of the collection
    pub async fn add(&self, new_job: NewJob) -> Result<Job, StoreError> {
        let with_activation = self.tracks_activation(&new_job.category);
        let missing_activation = new_job
            .activation_date
            .as_deref()
            .map_or(true, |date| date.trim().is_empty());
        if with_activation && missing_activation {
            return Err(StoreError::MissingActivationDate(new_job.category));
        }
        let job = new_job.into_job(with_activation);
        info!(
            "Service: Adding job id={} in {}/{}",
            job.id, job.category, job.sub_category
        );

        let mut jobs = self.jobs.lock().await;
        jobs.insert(0, job.clone());
        self.storage.save_jobs(&jobs).await?;
        drop(jobs);

        self.scheduler.schedule();
        Ok(job)
    }

    /// Merge `update` into the job with `id`
    pub async fn update(&self, id: &str, mut update: JobUpdate) -> Result<Job, StoreError> {
        let mut jobs = self.jobs.lock().await;
        let job = jobs
            .iter_mut()
            .find(|job| job.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        if update.activation_date.is_some() && !self.tracks_activation(&job.category) {
            warn!("Service: Ignoring activation date for job {} in {}", id, job.category);
            update.activation_date = None;
        }
        job.apply(update);
        let updated = job.clone();

        self.storage.save_jobs(&jobs).await?;
        drop(jobs);

        info!("Service: Updated job id={} status={}", updated.id, updated.status);
        self.scheduler.schedule();
        Ok(updated)
    }

    /// Remove the job with `id` once the deletion is confirmed
    pub async fn remove(&self, id: &str, confirmation: Confirmation) -> Result<Job, StoreError> {
        let mut jobs = self.jobs.lock().await;
        let position = jobs
            .iter()
            .position(|job| job.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        if confirmation == Confirmation::Declined {
            info!("Service: Deletion of job {} not confirmed", id);
            return Err(StoreError::ConfirmationRequired(id.to_string()));
        }

        let removed = jobs.remove(position);
        self.storage.save_jobs(&jobs).await?;
        drop(jobs);

        info!("Service: Removed job id={}", removed.id);
        self.scheduler.schedule();
        Ok(removed)
    }

    /// Put an imported batch in front of the collection, keeping its order
    pub async fn bulk_add(&self, batch: Vec<Job>) -> Result<usize, StoreError> {
        let count = batch.len();
        if count == 0 {
            warn!("Service: Bulk add called with empty batch");
            return Ok(0);
        }

        let mut jobs = self.jobs.lock().await;
        let existing = std::mem::replace(&mut *jobs, batch);
        jobs.extend(existing);
        self.storage.save_jobs(&jobs).await?;
        drop(jobs);

        info!("Service: Bulk added {} jobs", count);
        self.scheduler.schedule();
        Ok(count)
    }

    /// Parse delimited text and bulk add the valid rows
    ///
    /// # Returns
    /// - `Ok(ImportSummary)` - at least one row imported; rejected lines listed
    /// - `Err(StoreError::EmptyImport)` - no valid rows
    pub async fn import_from_text(
        &self,
        raw: &str,
        category: &str,
        sub_category: &str,
    ) -> Result<ImportSummary, StoreError> {
        let batch = transfer::parse_import(
            raw,
            category,
            sub_category,
            self.tracks_activation(category),
            &today(),
        );

        if batch.jobs.is_empty() {
            return Err(StoreError::EmptyImport(batch.rejected));
        }
        if !batch.rejected.is_empty() {
            warn!(
                "Service: Import into {}/{} skipped {} lines",
                category,
                sub_category,
                batch.rejected.len()
            );
        }

        let imported = self.bulk_add(batch.jobs).await?;
        Ok(ImportSummary {
            imported,
            rejected: batch.rejected,
        })
    }

    /// Serialize an already filtered list for download
    pub fn export_to_text(&self, category: &str, sub_category: &str, jobs: &[Job]) -> CsvExport {
        CsvExport {
            filename: transfer::export_filename(category, sub_category, &today()),
            content: transfer::export_csv(jobs, self.tracks_activation(category)),
        }
    }

    /// Overwrite the whole collection
    pub async fn replace_all(&self, replacement: Vec<Job>) -> Result<usize, StoreError> {
        let count = replacement.len();
        let mut jobs = self.jobs.lock().await;
        *jobs = replacement;
        self.storage.save_jobs(&jobs).await?;
        info!("Service: Replaced local collection with {} jobs", count);
        Ok(count)
    }

    /// Fetch the remote dataset and let it overwrite local jobs
    pub async fn pull_remote(&self) -> Result<PullReport, StoreError> {
        let url = self.sync.script_url().ok_or(StoreError::RemoteNotConfigured)?;

        match self.sync.pull(&url).await? {
            PullOutcome::Replaced(remote) => {
                // A pending push would send the pre-pull snapshot back out.
                self.scheduler.cancel();
                let count = self.replace_all(remote).await?;
                info!("Service: Loaded {} jobs from remote endpoint", count);
                Ok(PullReport::Replaced { count })
            }
            PullOutcome::Ignored(reason) => {
                info!("Service: Remote dataset ignored: {}", reason.as_str());
                Ok(PullReport::Ignored {
                    reason: reason.as_str().to_string(),
                })
            }
        }
    }

    /// Push local jobs to the remote endpoint right away
    pub async fn push_remote(&self) -> Result<usize, StoreError> {
        let url = self.sync.script_url().ok_or(StoreError::RemoteNotConfigured)?;
        self.scheduler.cancel();

        let snapshot = self.snapshot().await;
        self.sync.push(&url, &snapshot).await?;
        Ok(snapshot.len())
    }

    /// Save the remote endpoint URL and pull from it
    ///
    /// A pull failure is reported in the result, not as an error.
    pub async fn set_script_url(&self, url: Option<String>) -> Result<PullReport, StoreError> {
        let url = url
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty());

        self.storage.save_script_url(url.as_deref().unwrap_or_default()).await?;
        self.sync.set_script_url(url.clone());

        if url.is_none() {
            info!("Service: Remote endpoint cleared");
            self.scheduler.cancel();
            return Ok(PullReport::Ignored {
                reason: "remote endpoint cleared".to_string(),
            });
        }

        match self.pull_remote().await {
            Err(StoreError::Sync(e)) => {
                error!("Service: Failed to fetch from remote endpoint: {}", e);
                Ok(PullReport::Failed {
                    reason: e.to_string(),
                })
            }
            other => other,
        }
    }

    pub fn script_url(&self) -> Option<String> {
        self.sync.script_url()
    }

    pub fn is_syncing(&self) -> bool {
        self.sync.is_syncing()
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Run any pending debounced push now
    pub async fn flush_sync(&self) -> bool {
        self.scheduler.flush().await
    }
}
