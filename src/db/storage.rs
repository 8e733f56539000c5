use chrono::NaiveDateTime;
use sqlx::SqlitePool;
use tracing::{debug, warn};

use crate::api::job::Job;
use crate::db::kv_repository::KvRepository;
use crate::db::StorageError;

/// Key holding the JSON-encoded job list
pub const JOBS_KEY: &str = "jobs_data";

/// Key holding the remote endpoint URL
pub const SCRIPT_URL_KEY: &str = "remote_script_url";

/// Storage adapter persisting the whole job collection as one document
#[derive(Clone)]
pub struct Storage {
    pool: SqlitePool,
}

impl Storage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Load the persisted jobs
    ///
    /// A missing or malformed document yields an empty list.
    pub async fn load_jobs(&self) -> Result<Vec<Job>, StorageError> {
        let Some(row) = KvRepository::get(&self.pool, JOBS_KEY).await? else {
            debug!("No persisted jobs found, starting empty");
            return Ok(Vec::new());
        };

        match serde_json::from_str::<Vec<Job>>(&row.value) {
            Ok(jobs) => {
                debug!("Loaded {} persisted jobs", jobs.len());
                Ok(jobs)
            }
            Err(e) => {
                warn!("Persisted jobs are corrupt, starting empty: {}", e);
                Ok(Vec::new())
            }
        }
    }

    /// Overwrite the persisted job list
    pub async fn save_jobs(&self, jobs: &[Job]) -> Result<(), StorageError> {
        let encoded = serde_json::to_string(jobs)?;
        KvRepository::put(&self.pool, JOBS_KEY, &encoded).await?;
        debug!("Persisted {} jobs", jobs.len());
        Ok(())
    }

    /// Load the configured remote endpoint URL; blank counts as unset
    pub async fn load_script_url(&self) -> Result<Option<String>, StorageError> {
        let row = KvRepository::get(&self.pool, SCRIPT_URL_KEY).await?;
        Ok(row.map(|row| row.value).filter(|url| !url.trim().is_empty()))
    }

    /// Store the remote endpoint URL; an empty string clears it
    pub async fn save_script_url(&self, url: &str) -> Result<(), StorageError> {
        KvRepository::put(&self.pool, SCRIPT_URL_KEY, url).await?;
        Ok(())
    }

    /// When the job list was last written
    pub async fn last_saved_at(&self) -> Result<Option<NaiveDateTime>, StorageError> {
        let row = KvRepository::get(&self.pool, JOBS_KEY).await?;
        Ok(row.map(|row| row.updated_at))
    }
}
