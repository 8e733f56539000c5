use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Value;
use validator::{Validate, ValidationError};

/// ISO calendar date format used for every date field
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Today's date (UTC) in [`DATE_FORMAT`]
pub fn today() -> String {
    Utc::now().date_naive().format(DATE_FORMAT).to_string()
}

/// Job status enum representing the state of a job
#[derive(Debug, Default, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStatus {
    #[default]
    Pending,
    #[serde(rename = "In Progress")]
    InProgress,
    Completed,
}

impl JobStatus {
    pub const ALL: [JobStatus; 3] = [JobStatus::Pending, JobStatus::InProgress, JobStatus::Completed];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "Pending",
            JobStatus::InProgress => "In Progress",
            JobStatus::Completed => "Completed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown job status '{}'", s))
    }
}

/// A tracked job record
///
/// Field names on the wire are camelCase; the remote endpoint stores the
/// same names as spreadsheet headers.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    #[serde(deserialize_with = "cell_text")]
    pub id: String,
    #[serde(deserialize_with = "cell_text")]
    pub category: String,
    #[serde(deserialize_with = "cell_text")]
    pub sub_category: String,
    #[serde(deserialize_with = "cell_text")]
    pub date_input: String,
    #[serde(deserialize_with = "cell_text")]
    pub branch_dept: String,
    #[serde(deserialize_with = "cell_text")]
    pub job_type: String,
    pub status: JobStatus,
    #[serde(deserialize_with = "cell_text")]
    pub deadline: String,
    #[serde(
        default,
        deserialize_with = "optional_cell_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub activation_date: Option<String>,
}

/// Spreadsheet cells come back typed: `001` arrives as the number `1`
fn cell_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(text) => Ok(text),
        Value::Number(number) => Ok(number.to_string()),
        Value::Bool(flag) => Ok(flag.to_string()),
        other => Err(de::Error::custom(format!("expected a text cell, found {}", other))),
    }
}

/// Empty cells and nulls mean no value
fn optional_cell_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::String(text) if text.trim().is_empty() => Ok(None),
        Value::String(text) => Ok(Some(text)),
        Value::Number(number) => Ok(Some(number.to_string())),
        other => Err(de::Error::custom(format!("expected a date cell, found {}", other))),
    }
}

impl Job {
    /// Generate a fresh opaque job id
    pub fn new_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    /// Whether the deadline has passed without the job being completed
    pub fn is_overdue(&self) -> bool {
        self.is_overdue_at(Utc::now())
    }

    /// Overdue check against an explicit clock
    ///
    /// Plain dates count from UTC midnight. A deadline that cannot be parsed
    /// is never overdue.
    pub fn is_overdue_at(&self, now: DateTime<Utc>) -> bool {
        if self.status == JobStatus::Completed {
            return false;
        }
        match parse_deadline(&self.deadline) {
            Some(deadline) => deadline < now,
            None => false,
        }
    }

    /// Whether the record belongs to the given category/subcategory pair
    pub fn is_in(&self, category: &str, sub_category: &str) -> bool {
        self.category == category && self.sub_category == sub_category
    }

    /// Case-insensitive substring match on branch/dept or job type
    pub fn matches_search(&self, term: &str) -> bool {
        let term = term.to_lowercase();
        self.branch_dept.to_lowercase().contains(&term) || self.job_type.to_lowercase().contains(&term)
    }

    /// Merge a partial update into this record
    pub fn apply(&mut self, update: JobUpdate) {
        if let Some(date_input) = update.date_input {
            self.date_input = date_input;
        }
        if let Some(branch_dept) = update.branch_dept {
            self.branch_dept = branch_dept;
        }
        if let Some(job_type) = update.job_type {
            self.job_type = job_type;
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(deadline) = update.deadline {
            self.deadline = deadline;
        }
        if let Some(activation_date) = update.activation_date {
            self.activation_date = Some(activation_date);
        }
    }
}

fn parse_deadline(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, DATE_FORMAT) {
        return date.and_hms_opt(0, 0, 0).map(|midnight| midnight.and_utc());
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|datetime| datetime.with_timezone(&Utc))
}

/// Rejects anything that is not a `YYYY-MM-DD` date
pub fn validate_iso_date(value: &str) -> Result<(), ValidationError> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map(|_| ())
        .map_err(|_| {
            let mut error = ValidationError::new("iso_date");
            error.message = Some("Date must use the YYYY-MM-DD format".into());
            error
        })
}

/// Form input for creating a single job
#[derive(Deserialize, Serialize, Debug, Clone, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewJob {
    #[validate(length(min = 1, message = "Category is required"))]
    pub category: String,
    #[validate(length(min = 1, message = "Sub-category is required"))]
    pub sub_category: String,
    #[validate(custom(function = "validate_iso_date"))]
    pub date_input: Option<String>,
    #[validate(length(min = 1, message = "Branch/Dept is required"))]
    pub branch_dept: String,
    #[validate(length(min = 1, message = "Job type is required"))]
    pub job_type: String,
    #[serde(default)]
    pub status: Option<JobStatus>,
    #[validate(custom(function = "validate_iso_date"))]
    pub deadline: String,
    #[validate(custom(function = "validate_iso_date"))]
    pub activation_date: Option<String>,
}

impl NewJob {
    /// Build the stored record, assigning a fresh id
    ///
    /// The activation date is only kept when `with_activation` is set.
    pub fn into_job(self, with_activation: bool) -> Job {
        Job {
            id: Job::new_id(),
            category: self.category,
            sub_category: self.sub_category,
            date_input: self.date_input.unwrap_or_else(today),
            branch_dept: self.branch_dept,
            job_type: self.job_type,
            status: self.status.unwrap_or_default(),
            deadline: self.deadline,
            activation_date: self.activation_date.filter(|_| with_activation),
        }
    }
}

/// Partial field edits for an existing job
///
/// `id`, `category` and `subCategory` are not editable.
#[derive(Deserialize, Serialize, Debug, Clone, Default, Validate)]
#[serde(rename_all = "camelCase")]
pub struct JobUpdate {
    #[validate(custom(function = "validate_iso_date"))]
    pub date_input: Option<String>,
    #[validate(length(min = 1, message = "Branch/Dept must not be empty"))]
    pub branch_dept: Option<String>,
    #[validate(length(min = 1, message = "Job type must not be empty"))]
    pub job_type: Option<String>,
    pub status: Option<JobStatus>,
    #[validate(custom(function = "validate_iso_date"))]
    pub deadline: Option<String>,
    #[validate(custom(function = "validate_iso_date"))]
    pub activation_date: Option<String>,
}

impl JobUpdate {
    pub fn status(status: JobStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_job;
    use chrono::TimeZone;

    #[test]
    fn test_status_wire_names() {
        assert_eq!(serde_json::to_string(&JobStatus::InProgress).unwrap(), "\"In Progress\"");
        assert_eq!("Completed".parse::<JobStatus>().unwrap(), JobStatus::Completed);
        assert!("in progress".parse::<JobStatus>().is_err());
    }

    #[test]
    fn test_job_serializes_camel_case() {
        let job = sample_job("Ops", "Daily");
        let value = serde_json::to_value(&job).unwrap();
        assert_eq!(value["subCategory"], "Daily");
        assert_eq!(value["branchDept"], job.branch_dept);
        assert!(value.get("activationDate").is_none());
    }

    #[test]
    fn test_overdue_past_deadline_pending() {
        let mut job = sample_job("Ops", "Daily");
        job.deadline = "2020-01-01".into();
        job.status = JobStatus::Pending;
        assert!(job.is_overdue());

        job.status = JobStatus::Completed;
        assert!(!job.is_overdue());
    }

    #[test]
    fn test_overdue_is_strict() {
        let mut job = sample_job("Ops", "Daily");
        job.deadline = "2024-03-10".into();
        let midnight = Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap();
        assert!(!job.is_overdue_at(midnight));
        assert!(job.is_overdue_at(midnight + chrono::Duration::seconds(1)));
    }

    #[test]
    fn test_overdue_accepts_rfc3339_and_ignores_garbage() {
        let mut job = sample_job("Ops", "Daily");
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();

        job.deadline = "2024-03-10T11:00:00.000Z".into();
        assert!(job.is_overdue_at(now));

        job.deadline = "not a date".into();
        assert!(!job.is_overdue_at(now));
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let mut job = sample_job("Ops", "Daily");
        job.branch_dept = "Jakarta / Ops".into();
        job.job_type = "Route audit".into();
        assert!(job.matches_search("jakarta"));
        assert!(job.matches_search("AUDIT"));
        assert!(job.matches_search(""));
        assert!(!job.matches_search("bandung"));
    }

    #[test]
    fn test_apply_status_only_touches_status() {
        let original = sample_job("Ops", "Daily");
        let mut job = original.clone();
        job.apply(JobUpdate::status(JobStatus::Completed));

        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(Job { status: original.status, ..job }, original);
    }

    #[test]
    fn test_new_job_validation() {
        let mut form = NewJob {
            category: "Ops".into(),
            sub_category: "Daily".into(),
            date_input: None,
            branch_dept: "Jakarta".into(),
            job_type: "Audit".into(),
            status: None,
            deadline: "2024-02-30".into(),
            activation_date: None,
        };
        assert!(form.validate().is_err());

        form.deadline = "2024-02-29".into();
        assert!(form.validate().is_ok());

        let job = form.into_job(false);
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.date_input, today());
    }

    #[test]
    fn test_activation_date_dropped_outside_activation_category() {
        let form = NewJob {
            category: "Ops".into(),
            sub_category: "Daily".into(),
            date_input: Some("2024-01-01".into()),
            branch_dept: "Jakarta".into(),
            job_type: "Audit".into(),
            status: Some(JobStatus::InProgress),
            deadline: "2024-01-10".into(),
            activation_date: Some("2024-01-05".into()),
        };
        assert_eq!(form.clone().into_job(false).activation_date, None);
        assert_eq!(form.into_job(true).activation_date.as_deref(), Some("2024-01-05"));
    }
}
