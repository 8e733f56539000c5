pub mod connection;
pub mod error;
pub mod kv_repository;
pub mod migrations;
pub mod models;
pub mod storage;

pub use error::StorageError;
pub use storage::Storage;
