//! Config save/load roundtrip integration tests.

use secret_wallet_core::config::{BiometricFallback, Config};
use std::path::Path;
use tempfile::TempDir;

#[test]
fn test_config_save_and_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json5");

    let config = Config::default();
    config.save(&path).unwrap();

    let loaded = Config::load(&path).unwrap();
    assert_eq!(loaded.service, config.service);
    assert_eq!(loaded.inject.reuse_seconds, config.inject.reuse_seconds);
    assert_eq!(loaded.biometric.fallback, BiometricFallback::Degrade);
}

#[test]
fn test_config_modify_and_reload() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json5");

    let mut config = Config::default();
    config.inject.reuse_seconds = 30;
    config.biometric.fallback = BiometricFallback::Require;
    config.save(&path).unwrap();

    let loaded = Config::load(&path).unwrap();
    assert_eq!(loaded.inject.reuse_seconds, 30);
    assert_eq!(loaded.biometric.fallback, BiometricFallback::Require);
}

#[test]
fn test_config_json5_comments() {
    let config = Config::parse(
        r#"{
            // keep secrets under a team namespace
            service: "com.example.team",
            biometric: { fallback: "require" },
        }"#,
    )
    .unwrap();
    assert_eq!(config.service, "com.example.team");
    assert_eq!(config.biometric.fallback, BiometricFallback::Require);
    assert_eq!(config.inject.reuse_seconds, 10);
}

#[test]
fn test_config_load_nonexistent() {
    let result = Config::load(Path::new("/nonexistent/config.json5"));
    assert!(result.is_err());
}

#[test]
fn test_config_parse_invalid() {
    assert!(Config::parse("not valid json").is_err());
}
