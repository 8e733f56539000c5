//! Apps Script web app that backs the remote endpoint.
//!
//! Users paste the script into a spreadsheet, deploy it as a web app and
//! save the deployment URL in settings. The first sheet row holds
//! [`REMOTE_COLUMNS`]; every later row is one job.

/// Sheet header row, one column per job field in wire order
pub const REMOTE_COLUMNS: [&str; 9] = [
    "id",
    "category",
    "subCategory",
    "dateInput",
    "branchDept",
    "jobType",
    "status",
    "deadline",
    "activationDate",
];

const TEMPLATE: &str = include_str!("remote_script.gs");

/// Script source with the header row filled in
pub fn remote_script() -> String {
    let columns = REMOTE_COLUMNS
        .iter()
        .map(|column| format!("\"{}\"", column))
        .collect::<Vec<_>>()
        .join(", ");
    TEMPLATE.replace("__COLUMNS__", &columns)
}
