use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

/// Create a SQLite connection pool
///
/// # Parameters
/// - `database_url`: SQLite connection string
///   Format: sqlite://PATH/TO/FILE.db
/// - `max_connections`: upper bound on pooled connections
///
/// The database file is created when missing.
pub async fn get_connection(
    database_url: &str,
    max_connections: u32,
) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

    SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await
}
