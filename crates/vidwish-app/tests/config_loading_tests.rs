//! Integration tests for TOML configuration and environment overrides.

use std::path::PathBuf;

use vidwish_app::config::{AppConfig, ConfigError, DATA_DIR_ENV, GALLERY_ROUTE_ENV};
use vidwish_capture::FacingMode;
use vidwish_ui::Route;

#[test]
fn config_loading_tests_empty_document_yields_defaults() {
    let config = AppConfig::from_toml_str("").expect("empty config should parse");
    assert_eq!(config, AppConfig::default());
    assert_eq!(config.recording.limit_secs, 33);
    assert_eq!(config.recording.width, 1280);
    assert_eq!(config.recording.height, 720);
    assert_eq!(config.recording.facing_mode, FacingMode::User);
    assert!(config.recording.echo_cancellation);
    assert_eq!(config.recording.mime_type, "video/webm");
    assert_eq!(config.validation.min_duration_secs, 27.0);
    assert_eq!(config.validation.max_duration_secs, 38.0);
    assert_eq!(config.storage.data_dir, PathBuf::from("vidwish-data"));
    assert_eq!(config.storage.collection, "videos");
    assert_eq!(config.gallery.route, "/gallery");
    assert_eq!(config.gallery.visibility_threshold, 0.5);
}

#[test]
fn config_loading_tests_partial_tables_override_fields() {
    let config = AppConfig::from_toml_str(
        r#"
[recording]
limit_secs = 20
facing_mode = "environment"

[storage]
collection = "wishes"
"#,
    )
    .expect("config should parse");

    assert_eq!(config.recording.limit_secs, 20);
    assert_eq!(config.recording.facing_mode, FacingMode::Environment);
    assert_eq!(config.recording.width, 1280);
    assert_eq!(config.upload_target().collection, "wishes");
    assert_eq!(config.upload_target().object_prefix, "videos");
    assert_eq!(
        config.capture_config().expect("capture config should build").limit_secs,
        20
    );
}

#[test]
fn config_loading_tests_rejects_invalid_values_and_unknown_keys() {
    assert!(matches!(
        AppConfig::from_toml_str("[recording]\nlimit_secs = 0\n"),
        Err(ConfigError::Invalid(_))
    ));
    assert!(matches!(
        AppConfig::from_toml_str("[validation]\nmin_duration_secs = 40.0\n"),
        Err(ConfigError::Invalid(_))
    ));
    assert!(matches!(
        AppConfig::from_toml_str("[gallery]\nvisibility_threshold = 1.5\n"),
        Err(ConfigError::Invalid(_))
    ));
    assert!(matches!(
        AppConfig::from_toml_str("[storage]\nbucket = \"x\"\n"),
        Err(ConfigError::Parse(_))
    ));
}

#[test]
fn config_loading_tests_env_overrides_apply() {
    let mut config = AppConfig::default();
    config.apply_overrides(|key| match key {
        DATA_DIR_ENV => Some("/srv/vidwish".to_string()),
        GALLERY_ROUTE_ENV => Some("/mary".to_string()),
        _ => None,
    });

    assert_eq!(config.storage.data_dir, PathBuf::from("/srv/vidwish"));
    assert_eq!(config.route_table().resolve("/mary"), Route::Gallery);
    assert_eq!(config.route_table().resolve("/gallery"), Route::Booth);
}

#[test]
fn config_loading_tests_blank_overrides_are_ignored() {
    let mut config = AppConfig::default();
    config.apply_overrides(|_| Some("  ".to_string()));
    assert_eq!(config, AppConfig::default());
}

#[test]
fn config_loading_tests_reads_files() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let path = dir.path().join("vidwish.toml");
    std::fs::write(&path, "[gallery]\nroute = \"/wall\"\n").expect("config should be written");

    let config = AppConfig::from_file(&path).expect("config should load");
    assert_eq!(config.gallery.route, "/wall");

    assert!(matches!(
        AppConfig::from_file(&dir.path().join("missing.toml")),
        Err(ConfigError::Read { .. })
    ));
}
