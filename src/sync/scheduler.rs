//! Debounced push scheduler.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error};

use super::client::SyncClient;
use super::SharedJobs;

/// Debounces pushes of the job collection to the remote endpoint.
///
/// Every [`schedule`](Self::schedule) call cancels the pending push and
/// starts a new countdown. When the countdown fires, the collection as it is
/// at that moment gets pushed.
pub struct SyncScheduler {
    client: Arc<SyncClient>,
    jobs: SharedJobs,
    debounce: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl SyncScheduler {
    pub fn new(client: Arc<SyncClient>, jobs: SharedJobs, debounce: Duration) -> Self {
        Self {
            client,
            jobs,
            debounce,
            pending: Mutex::new(None),
        }
    }

    /// (Re)start the debounce countdown. No-op without a remote endpoint.
    pub fn schedule(&self) {
        if self.client.script_url().is_none() {
            debug!("No remote endpoint configured, skipping sync");
            return;
        }

        let client = Arc::clone(&self.client);
        let jobs = Arc::clone(&self.jobs);
        let debounce = self.debounce;

        let handle = tokio::spawn(async move {
            sleep(debounce).await;
            // Detached: a later reschedule must not abort a request already sent.
            tokio::spawn(push_snapshot(client, jobs));
        });

        let previous = self.pending_slot().replace(handle);
        if let Some(previous) = previous {
            previous.abort();
            debug!("Rescheduled pending sync");
        }
    }

    /// Run a pending push immediately instead of waiting for the countdown.
    ///
    /// Returns whether a push was pending.
    pub async fn flush(&self) -> bool {
        let pending = self.pending_slot().take();
        match pending {
            Some(handle) if !handle.is_finished() => {
                handle.abort();
                push_snapshot(Arc::clone(&self.client), Arc::clone(&self.jobs)).await;
                true
            }
            _ => false,
        }
    }

    /// Drop any pending push.
    pub fn cancel(&self) {
        if let Some(handle) = self.pending_slot().take() {
            handle.abort();
        }
    }

    fn pending_slot(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn push_snapshot(client: Arc<SyncClient>, jobs: SharedJobs) {
    let Some(url) = client.script_url() else {
        return;
    };
    let snapshot = jobs.lock().await.clone();
    if let Err(e) = client.push(&url, &snapshot).await {
        error!("Failed to sync {} jobs to remote endpoint: {}", snapshot.len(), e);
    }
}
