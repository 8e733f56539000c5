//! Remote endpoint client.
//!
//! The remote side is a spreadsheet-backed web app: `GET` returns every row
//! as a JSON array, `POST` replaces the sheet with the posted array.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::api::job::Job;

/// Errors talking to the remote endpoint.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Request to remote endpoint failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Remote endpoint responded with status {0}")]
    Status(u16),

    #[error("Failed to encode jobs: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Transport for the remote dataset.
#[async_trait]
pub trait RemoteEndpoint: Send + Sync {
    /// Replace the remote dataset with `jobs`.
    async fn push(&self, url: &str, jobs: &[Job]) -> Result<(), SyncError>;

    /// Fetch the raw remote dataset.
    async fn fetch(&self, url: &str) -> Result<Value, SyncError>;
}

/// reqwest-backed remote endpoint.
pub struct HttpRemote {
    client: Client,
}

impl HttpRemote {
    pub fn new(timeout: Duration) -> Result<Self, SyncError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl RemoteEndpoint for HttpRemote {
    async fn push(&self, url: &str, jobs: &[Job]) -> Result<(), SyncError> {
        let body = serde_json::to_string(jobs)?;

        // text/plain keeps Apps Script web apps from rejecting the request.
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "text/plain;charset=utf-8")
            .body(body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SyncError::Status(response.status().as_u16()));
        }
        Ok(())
    }

    async fn fetch(&self, url: &str) -> Result<Value, SyncError> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(SyncError::Status(response.status().as_u16()));
        }
        Ok(response.json::<Value>().await?)
    }
}

/// Why a pulled dataset was not applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    Empty,
    NotAnArray,
    Undecodable,
}

impl IgnoreReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            IgnoreReason::Empty => "remote dataset is empty",
            IgnoreReason::NotAnArray => "remote response is not an array",
            IgnoreReason::Undecodable => "remote rows do not match the job format",
        }
    }
}

/// Result of interpreting a pulled dataset.
#[derive(Debug, PartialEq)]
pub enum PullOutcome {
    /// The remote rows should replace the local collection.
    Replaced(Vec<Job>),
    Ignored(IgnoreReason),
}

/// Interpret a fetched response body.
///
/// Only a non-empty array of job-shaped rows replaces local data. Rows
/// repeating an earlier id are dropped.
pub fn decode_remote(body: Value) -> PullOutcome {
    let rows = match body {
        Value::Array(rows) if rows.is_empty() => return PullOutcome::Ignored(IgnoreReason::Empty),
        Value::Array(rows) => rows,
        _ => return PullOutcome::Ignored(IgnoreReason::NotAnArray),
    };

    let jobs: Vec<Job> = match serde_json::from_value(Value::Array(rows)) {
        Ok(jobs) => jobs,
        Err(e) => {
            warn!("Remote dataset could not be decoded: {}", e);
            return PullOutcome::Ignored(IgnoreReason::Undecodable);
        }
    };

    let total = jobs.len();
    let mut seen = HashSet::with_capacity(total);
    let jobs: Vec<Job> = jobs.into_iter().filter(|job| seen.insert(job.id.clone())).collect();
    if jobs.len() < total {
        warn!("Dropped {} remote rows with duplicate ids", total - jobs.len());
    }

    PullOutcome::Replaced(jobs)
}

/// Remote sync client with the configured endpoint and in-flight tracking.
pub struct SyncClient {
    remote: Arc<dyn RemoteEndpoint>,
    script_url: RwLock<Option<String>>,
    in_flight: AtomicUsize,
}

impl SyncClient {
    pub fn new(remote: Arc<dyn RemoteEndpoint>, script_url: Option<String>) -> Self {
        Self {
            remote,
            script_url: RwLock::new(normalize_url(script_url)),
            in_flight: AtomicUsize::new(0),
        }
    }

    pub fn script_url(&self) -> Option<String> {
        self.script_url
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_script_url(&self, url: Option<String>) {
        *self.script_url.write().unwrap_or_else(PoisonError::into_inner) = normalize_url(url);
    }

    /// Whether a push or pull is currently running
    pub fn is_syncing(&self) -> bool {
        self.in_flight.load(Ordering::Acquire) > 0
    }

    /// POST the full collection to `url`.
    pub async fn push(&self, url: &str, jobs: &[Job]) -> Result<(), SyncError> {
        let _in_flight = InFlight::enter(&self.in_flight);
        self.remote.push(url, jobs).await?;
        info!("Pushed {} jobs to remote endpoint", jobs.len());
        Ok(())
    }

    /// GET the remote dataset from `url` and interpret it.
    pub async fn pull(&self, url: &str) -> Result<PullOutcome, SyncError> {
        let _in_flight = InFlight::enter(&self.in_flight);
        let body = self.remote.fetch(url).await?;
        Ok(decode_remote(body))
    }
}

fn normalize_url(url: Option<String>) -> Option<String> {
    url.map(|url| url.trim().to_string()).filter(|url| !url.is_empty())
}

struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{sample_job, FakeRemote};
    use serde_json::json;

    #[test]
    fn test_decode_empty_array_is_ignored() {
        assert_eq!(decode_remote(json!([])), PullOutcome::Ignored(IgnoreReason::Empty));
    }

    #[test]
    fn test_decode_non_array_is_ignored() {
        assert_eq!(
            decode_remote(json!({"error": "nope"})),
            PullOutcome::Ignored(IgnoreReason::NotAnArray)
        );
        assert_eq!(decode_remote(json!("Success")), PullOutcome::Ignored(IgnoreReason::NotAnArray));
    }

    #[test]
    fn test_decode_rows_with_foreign_headers_is_ignored() {
        let body = json!([{"Date Input": "2024-01-01", "Branch": "Jakarta"}]);
        assert_eq!(decode_remote(body), PullOutcome::Ignored(IgnoreReason::Undecodable));
    }

    #[test]
    fn test_decode_accepts_typed_sheet_cells() {
        let valid = sample_job("Ops", "Weekly");
        let body = json!([
            {
                "id": "row-1",
                "category": "Ops",
                "subCategory": "Daily",
                "dateInput": "2024-01-01T00:00:00.000Z",
                "branchDept": 1,
                "jobType": "Route audit",
                "status": "Completed",
                "deadline": "2024-01-05",
                "activationDate": ""
            },
            valid
        ]);

        let PullOutcome::Replaced(jobs) = decode_remote(body) else {
            panic!("typed cells should still decode");
        };
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].branch_dept, "1");
        assert_eq!(jobs[0].activation_date, None);
        assert_eq!(jobs[1], valid);
    }

    #[test]
    fn test_decode_replaces_and_dedupes() {
        let first = sample_job("Ops", "Daily");
        let second = sample_job("Ops", "Weekly");
        let body = json!([first, second, first]);

        assert_eq!(decode_remote(body), PullOutcome::Replaced(vec![first, second]));
    }

    #[test]
    fn test_blank_url_is_unset() {
        let client = SyncClient::new(Arc::new(FakeRemote::default()), Some("   ".into()));
        assert_eq!(client.script_url(), None);

        client.set_script_url(Some(" https://example.com/exec ".into()));
        assert_eq!(client.script_url().as_deref(), Some("https://example.com/exec"));
    }

    #[actix_web::test]
    async fn test_in_flight_resets_after_failure() {
        let remote = Arc::new(FakeRemote::default());
        remote.fail_pushes(true);
        let client = SyncClient::new(remote.clone(), Some("https://example.com/exec".into()));

        let result = client.push("https://example.com/exec", &[sample_job("Ops", "Daily")]).await;
        assert!(matches!(result, Err(SyncError::Status(500))));
        assert!(!client.is_syncing());
    }
}
