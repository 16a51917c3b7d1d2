//! Tests for layered configuration.

use std::path::PathBuf;

use figment::Jail;

use crate::config::{ConfigError, DagConfig};

#[test]
fn test_defaults() {
    let config = DagConfig::default();
    assert_eq!(config.traversal.max_depth, 10_000);
    assert_eq!(config.storage.data_dir, PathBuf::from("./dagstore-data"));
    assert!(config.storage.sync_on_write);
    assert_eq!(config.logging.level, "info");
    assert!(config.validate().is_ok());
}

#[test]
fn test_load_without_file_uses_defaults() {
    Jail::expect_with(|_jail| {
        let config = DagConfig::load().map_err(|e| e.to_string())?;
        assert_eq!(config, DagConfig::default());
        Ok(())
    });
}

#[test]
fn test_load_reads_default_file() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "dagstore.toml",
            r#"
                [traversal]
                max_depth = 32

                [logging]
                level = "debug"
            "#,
        )?;
        let config = DagConfig::load().map_err(|e| e.to_string())?;
        assert_eq!(config.traversal.max_depth, 32);
        assert_eq!(config.logging.level, "debug");
        // Untouched sections keep their defaults
        assert!(config.storage.sync_on_write);
        Ok(())
    });
}

#[test]
fn test_env_overrides_file() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "custom.toml",
            r#"
                [traversal]
                max_depth = 32

                [storage]
                data_dir = "/var/lib/dagstore"
            "#,
        )?;
        jail.set_env("DAGSTORE_TRAVERSAL__MAX_DEPTH", "64");
        jail.set_env("DAGSTORE_STORAGE__SYNC_ON_WRITE", "false");

        let config = DagConfig::load_from("custom.toml").map_err(|e| e.to_string())?;
        assert_eq!(config.traversal.max_depth, 64);
        assert_eq!(config.storage.data_dir, PathBuf::from("/var/lib/dagstore"));
        assert!(!config.storage.sync_on_write);
        assert!(!config.log_store_options().sync_on_write);
        Ok(())
    });
}

#[test]
fn test_load_from_missing_file() {
    Jail::expect_with(|_jail| {
        let result = DagConfig::load_from("nope.toml");
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
        Ok(())
    });
}

#[test]
fn test_zero_depth_is_invalid() {
    Jail::expect_with(|jail| {
        jail.set_env("DAGSTORE_TRAVERSAL__MAX_DEPTH", "0");
        let result = DagConfig::load();
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
        Ok(())
    });
}

#[test]
fn test_malformed_value_is_load_error() {
    Jail::expect_with(|jail| {
        jail.create_file("dagstore.toml", "[traversal]\nmax_depth = \"deep\"\n")?;
        let result = DagConfig::load();
        assert!(matches!(result, Err(ConfigError::Load(_))));
        Ok(())
    });
}

#[test]
fn test_validate_rejects_empty_data_dir() {
    let mut config = DagConfig::default();
    config.storage.data_dir = PathBuf::new();
    let err = config.validate().unwrap_err();
    assert_eq!(
        err.to_string(),
        "Invalid configuration: storage.data_dir cannot be empty"
    );
}

#[test]
fn test_to_toml_round_trips() {
    let mut config = DagConfig::default();
    config.traversal.max_depth = 7;
    let rendered = config.to_toml().unwrap();
    assert!(rendered.contains("max_depth = 7"));
    let parsed: DagConfig = toml::from_str(&rendered).unwrap();
    assert_eq!(parsed, config);
}
