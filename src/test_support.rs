//! Shared fixtures for unit tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::api::job::{Job, JobService, JobStatus, NewJob};
use crate::db::{migrations, Storage};
use crate::sync::{RemoteEndpoint, SyncClient, SyncError};

pub const URL: &str = "https://example.com/exec";

pub const TEST_DEBOUNCE: Duration = Duration::from_millis(30);

/// Single-connection in-memory database with migrations applied
pub async fn memory_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite");
    migrations::run_migrations(&pool).await.expect("migrations");
    pool
}

pub async fn memory_storage() -> Storage {
    Storage::new(memory_pool().await)
}

pub fn sample_job(category: &str, sub_category: &str) -> Job {
    new_job(category, sub_category).into_job(false)
}

pub fn new_job(category: &str, sub_category: &str) -> NewJob {
    NewJob {
        category: category.to_string(),
        sub_category: sub_category.to_string(),
        date_input: Some("2024-01-01".to_string()),
        branch_dept: "Jakarta / Ops".to_string(),
        job_type: "Weekly route audit".to_string(),
        status: Some(JobStatus::Pending),
        deadline: "2999-12-31".to_string(),
        activation_date: None,
    }
}

/// JobService over in-memory storage and a [`FakeRemote`]
pub async fn service_with(url: Option<&str>) -> (JobService, Arc<FakeRemote>) {
    let remote = Arc::new(FakeRemote::default());
    let client = Arc::new(SyncClient::new(remote.clone(), url.map(String::from)));
    let service = JobService::new(
        memory_storage().await,
        Vec::new(),
        client,
        TEST_DEBOUNCE,
        "Produksi Master Data",
    );
    (service, remote)
}

/// Remote endpoint that records pushes and serves a canned response
#[derive(Default)]
pub struct FakeRemote {
    pushes: Mutex<Vec<Vec<Job>>>,
    response: Mutex<Option<Value>>,
    fail_push: AtomicBool,
    fail_fetch: AtomicBool,
}

impl FakeRemote {
    pub fn pushes(&self) -> Vec<Vec<Job>> {
        self.pushes.lock().unwrap().clone()
    }

    pub fn respond_with(&self, body: Value) {
        *self.response.lock().unwrap() = Some(body);
    }

    pub fn fail_pushes(&self, fail: bool) {
        self.fail_push.store(fail, Ordering::SeqCst);
    }

    pub fn fail_fetches(&self, fail: bool) {
        self.fail_fetch.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl RemoteEndpoint for FakeRemote {
    async fn push(&self, _url: &str, jobs: &[Job]) -> Result<(), SyncError> {
        if self.fail_push.load(Ordering::SeqCst) {
            return Err(SyncError::Status(500));
        }
        self.pushes.lock().unwrap().push(jobs.to_vec());
        Ok(())
    }

    async fn fetch(&self, _url: &str) -> Result<Value, SyncError> {
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(SyncError::Status(503));
        }
        Ok(self
            .response
            .lock()
            .unwrap()
            .clone()
            .unwrap_or(Value::Array(Vec::new())))
    }
}
