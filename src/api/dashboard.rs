use std::collections::BTreeMap;

use actix_web::{get, web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::api::job::{Job, JobService, JobStatus};

/// Counts for one category/subcategory pair
#[derive(Debug, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CategorySummary {
    pub category: String,
    pub sub_category: String,
    pub total: usize,
    pub completed: usize,
    pub overdue: usize,
}

/// Overview across every job
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub overdue: usize,
    pub syncing: bool,
    pub categories: Vec<CategorySummary>,
}

/// Tally jobs by status, overdue state and category pair
///
/// Categories come out sorted by name.
pub fn summarize(jobs: &[Job], now: DateTime<Utc>) -> DashboardSummary {
    let mut summary = DashboardSummary::default();
    let mut categories: BTreeMap<(&str, &str), CategorySummary> = BTreeMap::new();

    for job in jobs {
        let overdue = job.is_overdue_at(now);
        summary.total += 1;
        match job.status {
            JobStatus::Pending => summary.pending += 1,
            JobStatus::InProgress => summary.in_progress += 1,
            JobStatus::Completed => summary.completed += 1,
        }
        if overdue {
            summary.overdue += 1;
        }

        let entry = categories
            .entry((job.category.as_str(), job.sub_category.as_str()))
            .or_insert_with(|| CategorySummary {
                category: job.category.clone(),
                sub_category: job.sub_category.clone(),
                ..Default::default()
            });
        entry.total += 1;
        if job.status == JobStatus::Completed {
            entry.completed += 1;
        }
        if overdue {
            entry.overdue += 1;
        }
    }

    summary.categories = categories.into_values().collect();
    summary
}

#[get("/dashboard")]
async fn dashboard(service: web::Data<JobService>) -> HttpResponse {
    let jobs = service.snapshot().await;
    let mut summary = summarize(&jobs, Utc::now());
    summary.syncing = service.is_syncing();
    HttpResponse::Ok().json(summary)
}

pub fn dashboard_config(config: &mut web::ServiceConfig) {
    config.service(dashboard);
}
