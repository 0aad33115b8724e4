//! Settings table accessors
//!
//! Key-value pairs; values are stored as text and parsed on read.

use crate::{Error, Result};
use sqlx::{Pool, Sqlite};

/// Read and parse a setting; `None` when the key is missing or NULL
pub async fn get_setting<T>(db: &Pool<Sqlite>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let row: Option<(Option<String>,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(db)
        .await
        .map_err(Error::Database)?;

    match row {
        Some((Some(value),)) => {
            let parsed = value
                .parse::<T>()
                .map_err(|e| Error::Config(format!("Parse setting '{}' failed: {}", key, e)))?;
            Ok(Some(parsed))
        }
        _ => Ok(None),
    }
}

/// Insert or replace a setting
pub async fn set_setting<T>(db: &Pool<Sqlite>, key: &str, value: T) -> Result<()>
where
    T: std::fmt::Display,
{
    sqlx::query(
        "INSERT INTO settings (key, value, updated_at) VALUES (?, ?, CURRENT_TIMESTAMP)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP",
    )
    .bind(key)
    .bind(value.to_string())
    .execute(db)
    .await
    .map_err(Error::Database)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init::init_memory_database;

    #[tokio::test]
    async fn test_setting_roundtrip_and_overwrite() {
        let pool = init_memory_database().await.unwrap();

        assert_eq!(get_setting::<u64>(&pool, "import_retry_delay_ms").await.unwrap(), None);

        set_setting(&pool, "import_retry_delay_ms", 250).await.unwrap();
        set_setting(&pool, "import_retry_delay_ms", 750).await.unwrap();

        assert_eq!(
            get_setting::<u64>(&pool, "import_retry_delay_ms").await.unwrap(),
            Some(750)
        );
    }

    #[tokio::test]
    async fn test_unparseable_setting_is_config_error() {
        let pool = init_memory_database().await.unwrap();
        set_setting(&pool, "import_progress_interval", "lots").await.unwrap();

        let result = get_setting::<usize>(&pool, "import_progress_interval").await;
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
