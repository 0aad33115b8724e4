//! Configuration loading and root folder resolution
//!
//! Bootstrap configuration comes from a TOML file. Runtime import knobs may
//! additionally be overridden from the database `settings` table (see
//! `taxo_import::config`).
//!
//! Root folder priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`TAXO_ROOT_FOLDER`)
//! 3. TOML config file (`root_folder`)
//! 4. OS-dependent compiled default (fallback)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable naming the root folder
pub const ROOT_FOLDER_ENV: &str = "TAXO_ROOT_FOLDER";

/// Database file name inside the root folder
pub const DATABASE_FILE_NAME: &str = "taxo.db";

/// Config file name looked up in the platform config directories
pub const CONFIG_FILE_NAME: &str = "taxo-import.toml";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Root folder holding the database (optional)
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// Explicit database path; overrides `<root_folder>/taxo.db`
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Import engine defaults
    #[serde(default)]
    pub import: ImportConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Import engine tuning
///
/// All values have built-in defaults; the `[import]` table may set any subset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Rows between progress reports and throttle pauses
    #[serde(default = "default_progress_interval")]
    pub progress_interval: usize,

    /// Delay before the single persistence retry
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Pause after the parent resolution pass commits
    #[serde(default = "default_pause_ms")]
    pub parent_pause_ms: u64,

    /// Pause every `progress_interval` rows
    #[serde(default = "default_pause_ms")]
    pub batch_pause_ms: u64,

    /// When set, writes are paced by a rate limiter instead of fixed pauses
    #[serde(default)]
    pub max_writes_per_second: Option<u32>,

    /// Import event channel capacity
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            progress_interval: default_progress_interval(),
            retry_delay_ms: default_retry_delay_ms(),
            parent_pause_ms: default_pause_ms(),
            batch_pause_ms: default_pause_ms(),
            max_writes_per_second: None,
            event_capacity: default_event_capacity(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_progress_interval() -> usize {
    50
}

fn default_retry_delay_ms() -> u64 {
    500
}

fn default_pause_ms() -> u64 {
    1000
}

fn default_event_capacity() -> usize {
    100
}

/// Load TOML configuration
///
/// With an explicit path the file must exist and parse. Without one, the
/// platform config locations are searched and a missing file yields defaults.
pub fn load_toml_config(explicit: Option<&Path>) -> Result<TomlConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match find_config_file() {
            Some(path) => path,
            None => {
                debug!("No config file found, using built-in defaults");
                return Ok(TomlConfig::default());
            }
        },
    };

    let content = std::fs::read_to_string(&path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let config = parse_toml_config(&content)
        .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;

    debug!("Loaded config from {}", path.display());
    Ok(config)
}

/// Parse TOML configuration text
pub fn parse_toml_config(content: &str) -> Result<TomlConfig> {
    toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
}

/// Search the user config dir, then `/etc/taxo`
fn find_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("taxo").join(CONFIG_FILE_NAME));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(unix) {
        let system_config = PathBuf::from("/etc/taxo").join(CONFIG_FILE_NAME);
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Resolve the root folder following the documented priority order
pub fn resolve_root_folder(cli_arg: Option<&Path>, toml_config: &TomlConfig) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Some(path) = &toml_config.root_folder {
        return path.clone();
    }

    // Priority 4: OS-dependent compiled default
    default_root_folder()
}

/// Resolve the database file: explicit CLI path, TOML path, or `<root>/taxo.db`
pub fn resolve_database_path(
    cli_database: Option<&Path>,
    root_folder: &Path,
    toml_config: &TomlConfig,
) -> PathBuf {
    if let Some(path) = cli_database {
        return path.to_path_buf();
    }
    if let Some(path) = &toml_config.database_path {
        return path.clone();
    }
    root_folder.join(DATABASE_FILE_NAME)
}

/// OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("taxo"))
        .unwrap_or_else(|| PathBuf::from("./taxo_data"))
}
