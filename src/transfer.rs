//! Delimited-text import and CSV export of jobs.
//!
//! Import accepts one record per line after a header line, fields separated
//! by `,` or `;`. Export writes the same column layout, so an exported file
//! can be imported again.

use serde::Serialize;

use crate::api::job::{Job, JobStatus};

/// Fewest fields a data line must carry to be imported
pub const MIN_IMPORT_COLUMNS: usize = 5;

const DEFAULT_BRANCH: &str = "Unknown";
const DEFAULT_JOB_TYPE: &str = "Imported Job";

/// A data line that was not imported
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedLine {
    /// 1-based line number in the source text
    pub line: usize,
    pub columns: usize,
    pub reason: String,
}

/// Outcome of parsing an import text
#[derive(Debug, Default)]
pub struct ImportBatch {
    pub jobs: Vec<Job>,
    pub rejected: Vec<RejectedLine>,
}

/// Parse delimited text into new jobs under `category`/`sub_category`
///
/// Empty fields fall back to defaults; `today` fills missing dates. An
/// unknown status becomes `Pending`. The activation date (sixth field) is
/// only kept when `with_activation` is set.
pub fn parse_import(
    raw: &str,
    category: &str,
    sub_category: &str,
    with_activation: bool,
    today: &str,
) -> ImportBatch {
    let mut batch = ImportBatch::default();

    for (index, line) in raw.lines().enumerate().skip(1) {
        if line.trim().is_empty() {
            continue;
        }

        let fields = split_fields(line);
        if fields.len() < MIN_IMPORT_COLUMNS {
            batch.rejected.push(RejectedLine {
                line: index + 1,
                columns: fields.len(),
                reason: format!(
                    "expected at least {} columns, found {}",
                    MIN_IMPORT_COLUMNS,
                    fields.len()
                ),
            });
            continue;
        }

        let field = |i: usize, default: &str| -> String {
            match fields.get(i).map(String::as_str) {
                Some(value) if !value.is_empty() => value.to_string(),
                _ => default.to_string(),
            }
        };

        let activation_date = fields
            .get(5)
            .filter(|value| with_activation && !value.is_empty())
            .cloned();

        batch.jobs.push(Job {
            id: Job::new_id(),
            category: category.to_string(),
            sub_category: sub_category.to_string(),
            date_input: field(0, today),
            branch_dept: field(1, DEFAULT_BRANCH),
            job_type: field(2, DEFAULT_JOB_TYPE),
            status: fields[3].parse().unwrap_or(JobStatus::Pending),
            deadline: field(4, today),
            activation_date,
        });
    }

    batch
}

/// Split a line on `,` or `;` outside double quotes, trimming each field
///
/// Quotes around a field are removed and `""` inside quotes becomes `"`.
fn split_fields(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' | ';' if !in_quotes => {
                fields.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    fields.push(current.trim().to_string());

    fields
}

/// Serialize jobs as CSV with a header row
///
/// Branch/dept and job type are always quoted.
pub fn export_csv(jobs: &[Job], with_activation: bool) -> String {
    let mut header = vec!["Date Input", "Branch/Dept", "Job Type", "Status", "Deadline"];
    if with_activation {
        header.push("Activation Date");
    }

    let mut lines = Vec::with_capacity(jobs.len() + 1);
    lines.push(header.join(","));

    for job in jobs {
        let mut row = vec![
            job.date_input.clone(),
            quote(&job.branch_dept),
            quote(&job.job_type),
            job.status.to_string(),
            job.deadline.clone(),
        ];
        if with_activation {
            row.push(job.activation_date.clone().unwrap_or_default());
        }
        lines.push(row.join(","));
    }

    lines.join("\n")
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// Download filename embedding the category pair and the export date
pub fn export_filename(category: &str, sub_category: &str, date: &str) -> String {
    format!(
        "Jobs_{}_{}_{}.csv",
        filename_safe(category),
        filename_safe(sub_category),
        date
    )
}

fn filename_safe(value: &str) -> String {
    value
        .chars()
        .map(|c| match c {
            '/' | '\\' | '"' | ':' | '*' | '?' | '<' | '>' | '|' => '-',
            _ => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_job;

    const TODAY: &str = "2024-06-01";

    fn import(raw: &str) -> ImportBatch {
        parse_import(raw, "Ops", "Daily", false, TODAY)
    }

    #[test]
    fn test_header_and_blank_lines_skipped() {
        let raw = "Date,Branch,Type,Status,Deadline\n\n2024-01-01,Jakarta,Audit,Completed,2024-01-05\n   \n";
        let batch = import(raw);

        assert_eq!(batch.jobs.len(), 1);
        assert!(batch.rejected.is_empty());
        let job = &batch.jobs[0];
        assert_eq!(job.category, "Ops");
        assert_eq!(job.sub_category, "Daily");
        assert_eq!(job.branch_dept, "Jakarta");
        assert_eq!(job.status, JobStatus::Completed);
    }

    #[test]
    fn test_three_columns_rejected() {
        let batch = import("header\n2024-01-01,Jakarta,Audit\n");
        assert!(batch.jobs.is_empty());
        assert_eq!(batch.rejected.len(), 1);
        assert_eq!(batch.rejected[0].line, 2);
        assert_eq!(batch.rejected[0].columns, 3);
    }

    #[test]
    fn test_invalid_status_defaults_to_pending() {
        let batch = import("header\n2024-01-01;Jakarta;Audit;Done-ish;2024-01-05\n");
        assert_eq!(batch.jobs.len(), 1);
        assert_eq!(batch.jobs[0].status, JobStatus::Pending);
        assert_eq!(batch.jobs[0].deadline, "2024-01-05");
    }

    #[test]
    fn test_empty_fields_take_defaults() {
        let batch = import("header\r\n,,,,\r\n");
        let job = &batch.jobs[0];
        assert_eq!(job.date_input, TODAY);
        assert_eq!(job.branch_dept, "Unknown");
        assert_eq!(job.job_type, "Imported Job");
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.deadline, TODAY);
    }

    #[test]
    fn test_activation_date_only_in_activation_category() {
        let raw = "header\n2024-01-01,Jakarta,Audit,Pending,2024-01-05,2024-01-03\n";
        assert_eq!(import(raw).jobs[0].activation_date, None);

        let batch = parse_import(raw, "Produksi Master Data", "Tarif", true, TODAY);
        assert_eq!(batch.jobs[0].activation_date.as_deref(), Some("2024-01-03"));
    }

    #[test]
    fn test_split_respects_quotes() {
        assert_eq!(
            split_fields(r#"2024-01-01,"Jakarta, Ops","Say ""hi""; then go",Pending,2024-01-05"#),
            vec!["2024-01-01", "Jakarta, Ops", r#"Say "hi"; then go"#, "Pending", "2024-01-05"]
        );
    }

    #[test]
    fn test_export_layout() {
        let mut job = sample_job("Ops", "Daily");
        job.date_input = "2024-01-01".into();
        job.branch_dept = "Jakarta".into();
        job.job_type = "Audit".into();
        job.status = JobStatus::InProgress;
        job.deadline = "2024-01-05".into();

        let csv = export_csv(&[job], false);
        assert_eq!(
            csv,
            "Date Input,Branch/Dept,Job Type,Status,Deadline\n2024-01-01,\"Jakarta\",\"Audit\",In Progress,2024-01-05"
        );
    }

    #[test]
    fn test_export_then_import_round_trip() {
        let mut first = sample_job("Produksi Master Data", "Tarif");
        first.branch_dept = "Jakarta, \"HQ\"".into();
        first.job_type = "Update tariff; batch 2".into();
        first.status = JobStatus::Completed;
        first.activation_date = Some("2024-02-01".into());
        let second = sample_job("Produksi Master Data", "Tarif");
        let exported = [first, second];

        let csv = export_csv(&exported, true);
        let batch = parse_import(&csv, "Produksi Master Data", "Tarif", true, TODAY);

        assert!(batch.rejected.is_empty());
        assert_eq!(batch.jobs.len(), exported.len());
        for (original, imported) in exported.iter().zip(&batch.jobs) {
            assert_ne!(original.id, imported.id);
            assert_eq!(original.branch_dept, imported.branch_dept);
            assert_eq!(original.job_type, imported.job_type);
            assert_eq!(original.status, imported.status);
            assert_eq!(original.deadline, imported.deadline);
            assert_eq!(original.activation_date, imported.activation_date);
        }
    }

    #[test]
    fn test_export_filename() {
        assert_eq!(
            export_filename("Produksi Master Data", "Tarif/Harga", "2024-06-01"),
            "Jobs_Produksi Master Data_Tarif-Harga_2024-06-01.csv"
        );
    }
}
