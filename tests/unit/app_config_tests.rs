/*!
 * Tests for app configuration functionality
 */

use log::LevelFilter;
use std::fs;

use cityinfo::app_config::{Config, LogLevel};

/// Test the default configuration
#[test]
fn test_default_config_shouldHaveSensibleDefaults() {
    let config = Config::default();

    assert_eq!(config.database.path, None);
    assert!(!config.database.in_memory);
    assert_eq!(config.database.max_connections, 8);
    assert_eq!(config.database.busy_timeout_ms, 5000);
    assert!(config.cache.enabled);
    assert_eq!(config.log_level, LogLevel::Info);
    assert!(config.validate().is_ok());
}

/// Test loading a partial config file fills in defaults
#[test]
fn test_fromFile_withPartialJson_shouldApplyDefaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("conf.json");
    fs::write(
        &path,
        r#"{ "database": { "path": "/tmp/cities.db" }, "log_level": "debug" }"#,
    )
    .unwrap();

    let config = Config::from_file(&path).unwrap();

    assert_eq!(config.database.path.as_deref(), Some("/tmp/cities.db"));
    assert_eq!(config.database.max_connections, 8);
    assert!(config.cache.enabled);
    assert_eq!(config.log_level, LogLevel::Debug);
    assert_eq!(config.log_level.to_level_filter(), LevelFilter::Debug);
}

/// Test that malformed files are rejected
#[test]
fn test_fromFile_withInvalidJson_shouldFail() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("conf.json");
    fs::write(&path, "{ not json").unwrap();

    assert!(Config::from_file(&path).is_err());
}

/// Test that a missing file is created with the default config
#[test]
fn test_loadOrCreate_withMissingFile_shouldWriteDefaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("conf.json");

    let (config, created) = Config::load_or_create(&path).unwrap();
    assert!(created);
    assert!(path.exists());
    assert_eq!(config, Config::default());

    let (reloaded, created) = Config::load_or_create(&path).unwrap();
    assert!(!created);
    assert_eq!(reloaded, config);
}

/// Test saving and reloading a customized config
#[test]
fn test_save_shouldRoundTripCustomValues() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("conf.json");

    let mut config = Config::in_memory();
    config.database.max_connections = 3;
    config.cache.enabled = false;
    config.log_level = LogLevel::Trace;
    config.save(&path).unwrap();

    assert_eq!(Config::from_file(&path).unwrap(), config);
}

/// Test validation failures
#[test]
fn test_validate_withBadValues_shouldFail() {
    let mut config = Config::default();
    config.database.max_connections = 0;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.database.path = Some("   ".to_string());
    assert!(config.validate().is_err());
}

/// Test pool options derived from the database section
#[test]
fn test_poolOptions_shouldMirrorDatabaseConfig() {
    let mut config = Config::default();
    config.database.max_connections = 2;
    config.database.busy_timeout_ms = 250;

    let options = config.database.pool_options();

    assert_eq!(options.max_connections, 2);
    assert_eq!(options.busy_timeout_ms, 250);
}
