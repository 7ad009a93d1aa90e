//! Tests for layered settings

use std::path::PathBuf;

use tempfile::TempDir;

use sectree::config::{RawSettings, Settings};

#[test]
fn given_template_when_parsed_then_every_setting_is_commented_out() {
    // Arrange
    let template = Settings::template();

    // Act
    let raw: RawSettings = toml::from_str(&template).unwrap();

    // Assert
    assert!(raw.base_dir.is_none());
    assert!(raw.store_file.is_none());
    assert!(raw.audit_log.is_none());
    assert!(raw.actor.is_none());
    assert!(raw.renumber_after_delete.is_none());
}

#[test]
fn given_config_file_when_layered_then_file_values_override_defaults() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sectree.toml");
    std::fs::write(
        &path,
        r#"
base_dir = "/srv/manuals"
actor = "compliance-bot"
renumber_after_delete = true
"#,
    )
    .unwrap();

    // Act
    let settings = Settings::load_with_file(Settings::default(), &path).unwrap();

    // Assert
    assert_eq!(settings.base_dir, PathBuf::from("/srv/manuals"));
    assert_eq!(settings.store_file, PathBuf::from("/srv/manuals/store.json"));
    assert_eq!(settings.actor, "compliance-bot");
    assert!(settings.renumber_after_delete);
    assert!(settings.audit_log.is_none());
}

#[test]
fn given_malformed_config_file_when_layered_then_config_error() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sectree.toml");
    std::fs::write(&path, "renumber_after_delete = \"sometimes\"").unwrap();

    // Act
    let err = Settings::load_with_file(Settings::default(), &path).unwrap_err();

    // Assert
    assert!(err.to_string().contains("config error"), "{err}");
}

#[test]
fn given_settings_when_rendered_as_toml_then_audit_log_omitted_until_set() {
    // Arrange
    let mut settings = Settings::default();

    // Act
    let without = settings.to_toml().unwrap();
    settings.audit_log = Some(PathBuf::from("/var/log/sectree.jsonl"));
    let with = settings.to_toml().unwrap();

    // Assert
    assert!(!without.contains("audit_log"));
    assert!(with.contains("audit_log = \"/var/log/sectree.jsonl\""));
}
