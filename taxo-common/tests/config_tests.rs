//! Configuration loading and root folder resolution tests
//!
//! Tests that touch TAXO_ROOT_FOLDER are marked #[serial] so they never race
//! on the process environment.

use serial_test::serial;
use std::io::Write;
use std::path::{Path, PathBuf};
use taxo_common::config::{
    load_toml_config, parse_toml_config, resolve_database_path, resolve_root_folder, ImportConfig,
    TomlConfig, ROOT_FOLDER_ENV,
};

#[test]
fn test_empty_toml_uses_defaults() {
    let config = parse_toml_config("").unwrap();
    assert_eq!(config.logging.level, "info");
    assert_eq!(config.import, ImportConfig::default());
    assert_eq!(config.import.progress_interval, 50);
    assert_eq!(config.import.max_writes_per_second, None);
}

#[test]
fn test_partial_import_table() {
    let config = parse_toml_config(
        r#"
        root_folder = "/srv/taxo"

        [logging]
        level = "debug"

        [import]
        progress_interval = 10
        max_writes_per_second = 20
        "#,
    )
    .unwrap();

    assert_eq!(config.root_folder, Some(PathBuf::from("/srv/taxo")));
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.import.progress_interval, 10);
    assert_eq!(config.import.max_writes_per_second, Some(20));
    // Untouched keys keep their defaults
    assert_eq!(config.import.retry_delay_ms, 500);
}

#[test]
fn test_malformed_toml_is_config_error() {
    let result = parse_toml_config("[import\nprogress_interval = ");
    assert!(matches!(result, Err(taxo_common::Error::Config(_))));
}

#[test]
fn test_load_explicit_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[import]\nretry_delay_ms = 25").unwrap();

    let config = load_toml_config(Some(file.path())).unwrap();
    assert_eq!(config.import.retry_delay_ms, 25);
}

#[test]
fn test_load_missing_explicit_file_fails() {
    let result = load_toml_config(Some(Path::new("/nonexistent/taxo-import.toml")));
    assert!(result.is_err());
}

#[test]
#[serial]
fn test_cli_overrides_env_and_toml() {
    std::env::set_var(ROOT_FOLDER_ENV, "/from/env");
    let toml = TomlConfig {
        root_folder: Some(PathBuf::from("/from/toml")),
        ..Default::default()
    };

    let root = resolve_root_folder(Some(Path::new("/from/cli")), &toml);
    assert_eq!(root, PathBuf::from("/from/cli"));

    std::env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_env_overrides_toml() {
    std::env::set_var(ROOT_FOLDER_ENV, "/from/env");
    let toml = TomlConfig {
        root_folder: Some(PathBuf::from("/from/toml")),
        ..Default::default()
    };

    assert_eq!(resolve_root_folder(None, &toml), PathBuf::from("/from/env"));

    std::env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_toml_used_when_env_missing() {
    std::env::remove_var(ROOT_FOLDER_ENV);
    let toml = TomlConfig {
        root_folder: Some(PathBuf::from("/from/toml")),
        ..Default::default()
    };

    assert_eq!(resolve_root_folder(None, &toml), PathBuf::from("/from/toml"));
}

#[test]
fn test_database_path_resolution() {
    let root = Path::new("/data/taxo");
    let mut toml = TomlConfig::default();

    assert_eq!(
        resolve_database_path(None, root, &toml),
        PathBuf::from("/data/taxo/taxo.db")
    );

    toml.database_path = Some(PathBuf::from("/elsewhere/terms.db"));
    assert_eq!(
        resolve_database_path(None, root, &toml),
        PathBuf::from("/elsewhere/terms.db")
    );

    assert_eq!(
        resolve_database_path(Some(Path::new("/cli.db")), root, &toml),
        PathBuf::from("/cli.db")
    );
}
