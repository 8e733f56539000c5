pub mod dashboard;
pub mod health;
pub mod job;
pub mod settings;
pub mod validation;
