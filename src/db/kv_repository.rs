use sqlx::SqlitePool;
use tracing::debug;

use crate::db::models::KvRow;

/// Repository for key-value database operations
///
/// Every value is a whole document; writes overwrite the previous value
/// for the key.
pub struct KvRepository;

impl KvRepository {
    /// Fetch the entry stored under `key`, if any
    pub async fn get(pool: &SqlitePool, key: &str) -> Result<Option<KvRow>, sqlx::Error> {
        let row = sqlx::query_as::<_, KvRow>(
            r#"
            SELECT key, value, updated_at
            FROM kv_store
            WHERE key = ?1
            "#,
        )
        .bind(key)
        .fetch_optional(pool)
        .await?;

        debug!("Loaded key={} found={}", key, row.is_some());
        Ok(row)
    }

    /// Insert or overwrite the value stored under `key`
    pub async fn put(pool: &SqlitePool, key: &str, value: &str) -> Result<(), sqlx::Error> {
        debug!("Writing key={} ({} bytes)", key, value.len());

        sqlx::query(
            r#"
            INSERT INTO kv_store (key, value, updated_at)
            VALUES (?1, ?2, CURRENT_TIMESTAMP)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(pool)
        .await?;

        Ok(())
    }
}
