pub mod client;
pub mod scheduler;
pub mod script;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::api::job::Job;

pub use client::{HttpRemote, PullOutcome, RemoteEndpoint, SyncClient, SyncError};
pub use scheduler::SyncScheduler;
pub use script::remote_script;

/// The in-memory job collection shared by the store and the scheduler
pub type SharedJobs = Arc<Mutex<Vec<Job>>>;

/// Which side wins a manual sync; there is no merge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncDirection {
    /// Replace local jobs with the remote dataset
    OverwriteLocal,
    /// Replace the remote dataset with local jobs
    OverwriteRemote,
}

/// Client-facing summary of a pull
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PullReport {
    Replaced { count: usize },
    Ignored { reason: String },
    Failed { reason: String },
}
