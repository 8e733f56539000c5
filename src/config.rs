use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// SQLite connection URL
    /// Format: sqlite://PATH/TO/FILE.db
    pub database_url: String,

    /// Maximum payload size for all requests (in bytes)
    /// Default: 10MB (10 * 1024 * 1024)
    pub max_payload_size: usize,

    pub max_db_connections: u32,

    /// Directory for rolling log files
    pub log_dir: String,

    /// Address the HTTP server binds to
    pub bind_addr: String,

    /// Quiet period after the last mutation before pushing to the remote
    pub sync_debounce: Duration,

    pub remote_timeout: Duration,

    /// Category whose jobs carry an activation date
    pub activation_category: String,

    /// Remote endpoint used when storage holds none
    pub remote_script_url: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Optional environment variables:
    /// - DATABASE_URL: SQLite connection string (default: sqlite://job-tracker.db)
    /// - MAX_PAYLOAD_SIZE: Maximum request payload size in bytes (default: 10485760 = 10MB)
    /// - MAX_DB_CONNECTIONS: Connection pool size (default: 5)
    /// - LOG_DIR: Log file directory (default: logs)
    /// - BIND_ADDR: HTTP listen address (default: 127.0.0.1:8080)
    /// - SYNC_DEBOUNCE_MS: Remote push debounce in milliseconds (default: 1000)
    /// - REMOTE_TIMEOUT_SECS: Remote request timeout in seconds (default: 30)
    /// - ACTIVATION_CATEGORY: Category tracking activation dates (default: Produksi Master Data)
    /// - REMOTE_SCRIPT_URL: Initial remote endpoint URL
    pub fn from_env() -> Result<Self, String> {
        // Load .env file if it exists
        dotenv::dotenv().ok();

        let max_db_connections: u32 = parse_or("MAX_DB_CONNECTIONS", env::var("MAX_DB_CONNECTIONS").ok(), 5)?;
        if max_db_connections == 0 {
            return Err("MAX_DB_CONNECTIONS must be at least 1".to_string());
        }

        Ok(Config {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://job-tracker.db".to_string()),
            max_payload_size: parse_or("MAX_PAYLOAD_SIZE", env::var("MAX_PAYLOAD_SIZE").ok(), 10 * 1024 * 1024)?,
            max_db_connections,
            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string()),
            sync_debounce: Duration::from_millis(parse_or(
                "SYNC_DEBOUNCE_MS",
                env::var("SYNC_DEBOUNCE_MS").ok(),
                1000,
            )?),
            remote_timeout: Duration::from_secs(parse_or(
                "REMOTE_TIMEOUT_SECS",
                env::var("REMOTE_TIMEOUT_SECS").ok(),
                30,
            )?),
            activation_category: env::var("ACTIVATION_CATEGORY")
                .unwrap_or_else(|_| "Produksi Master Data".to_string()),
            remote_script_url: env::var("REMOTE_SCRIPT_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
        })
    }
}

/// Parse an optional raw value, falling back to `default` when unset
fn parse_or<T: FromStr>(name: &str, raw: Option<String>, default: T) -> Result<T, String> {
    match raw {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| format!("{} has an invalid value: {}", name, raw)),
    }
}
