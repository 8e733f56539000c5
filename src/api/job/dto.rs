use serde::{Deserialize, Serialize};

use crate::transfer::RejectedLine;
use super::models::Job;

/// Response for single job creation or update
#[derive(Serialize)]
pub struct JobResponse {
    pub message: String,
    pub job: Job,
}

/// A job as shown in a list, with its overdue flag
#[derive(Serialize)]
pub struct JobView {
    #[serde(flatten)]
    pub job: Job,
    pub overdue: bool,
}

impl From<Job> for JobView {
    fn from(job: Job) -> Self {
        let overdue = job.is_overdue();
        Self { job, overdue }
    }
}

/// Response for a list of jobs
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobListResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_category: Option<String>,
    pub count: usize,
    pub jobs: Vec<JobView>,
}

impl JobListResponse {
    pub fn new(category: Option<String>, sub_category: Option<String>, jobs: Vec<Job>) -> Self {
        Self {
            category,
            sub_category,
            count: jobs.len(),
            jobs: jobs.into_iter().map(JobView::from).collect(),
        }
    }
}

/// Response for a bulk import
#[derive(Serialize)]
pub struct BulkImportResponse {
    pub message: String,
    pub created: usize,
    pub errors: Vec<RejectedLine>,
}

/// Response for a deletion
#[derive(Serialize)]
pub struct DeleteResponse {
    pub message: String,
    pub id: String,
}

/// Query parameters for list and export
#[derive(Deserialize, Default)]
pub struct SearchQuery {
    #[serde(default)]
    pub search: String,
}

/// Query parameters for deletion
#[derive(Deserialize)]
pub struct DeleteQuery {
    #[serde(default)]
    pub confirm: bool,
}

/// A rendered CSV download
#[derive(Debug)]
pub struct CsvExport {
    pub filename: String,
    pub content: String,
}
