//! Import configuration resolution
//!
//! **Priority:** CLI flags (applied by the binary) → database `settings` →
//! TOML `[import]` table → built-in defaults.

use sqlx::{Pool, Sqlite};
use taxo_common::config::ImportConfig;
use taxo_common::db::settings::get_setting;
use taxo_common::Result;
use tracing::info;

pub const PROGRESS_INTERVAL_KEY: &str = "import_progress_interval";
pub const RETRY_DELAY_KEY: &str = "import_retry_delay_ms";
pub const PARENT_PAUSE_KEY: &str = "import_parent_pause_ms";
pub const BATCH_PAUSE_KEY: &str = "import_batch_pause_ms";
pub const MAX_WRITES_KEY: &str = "import_max_writes_per_second";

/// Overlay database settings on the TOML import configuration
pub async fn resolve_import_config(db: &Pool<Sqlite>, toml: &ImportConfig) -> Result<ImportConfig> {
    let mut config = toml.clone();

    if let Some(value) = get_setting::<usize>(db, PROGRESS_INTERVAL_KEY).await? {
        info!("{} loaded from database: {}", PROGRESS_INTERVAL_KEY, value);
        config.progress_interval = value.max(1);
    }
    if let Some(value) = get_setting::<u64>(db, RETRY_DELAY_KEY).await? {
        info!("{} loaded from database: {}", RETRY_DELAY_KEY, value);
        config.retry_delay_ms = value;
    }
    if let Some(value) = get_setting::<u64>(db, PARENT_PAUSE_KEY).await? {
        info!("{} loaded from database: {}", PARENT_PAUSE_KEY, value);
        config.parent_pause_ms = value;
    }
    if let Some(value) = get_setting::<u64>(db, BATCH_PAUSE_KEY).await? {
        info!("{} loaded from database: {}", BATCH_PAUSE_KEY, value);
        config.batch_pause_ms = value;
    }
    if let Some(value) = get_setting::<u32>(db, MAX_WRITES_KEY).await? {
        info!("{} loaded from database: {}", MAX_WRITES_KEY, value);
        // 0 turns the rate limiter off
        config.max_writes_per_second = (value > 0).then_some(value);
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use taxo_common::db::init_memory_database;
    use taxo_common::db::settings::set_setting;

    #[tokio::test]
    async fn test_toml_values_kept_without_settings() {
        let pool = init_memory_database().await.unwrap();
        let toml = ImportConfig {
            progress_interval: 25,
            ..Default::default()
        };

        let resolved = resolve_import_config(&pool, &toml).await.unwrap();
        assert_eq!(resolved, toml);
    }

    #[tokio::test]
    async fn test_database_overrides_toml() {
        let pool = init_memory_database().await.unwrap();
        set_setting(&pool, RETRY_DELAY_KEY, 40).await.unwrap();
        set_setting(&pool, MAX_WRITES_KEY, 0).await.unwrap();

        let toml = ImportConfig {
            retry_delay_ms: 900,
            max_writes_per_second: Some(10),
            ..Default::default()
        };

        let resolved = resolve_import_config(&pool, &toml).await.unwrap();
        assert_eq!(resolved.retry_delay_ms, 40);
        assert_eq!(resolved.max_writes_per_second, None);
        assert_eq!(resolved.progress_interval, 50);
    }
}
