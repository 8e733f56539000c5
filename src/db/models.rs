use chrono::NaiveDateTime;
use sqlx::FromRow;

/// Database representation of one key-value entry
#[derive(Debug, FromRow)]
pub struct KvRow {
    pub key: String,
    pub value: String,
    pub updated_at: NaiveDateTime,
}
