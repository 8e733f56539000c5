pub mod dto;
pub mod handlers;
pub mod models;
pub mod service;

// Re-export commonly used types
pub use models::{Job, JobStatus, JobUpdate, NewJob};
pub use service::{Confirmation, JobService, StoreError};
