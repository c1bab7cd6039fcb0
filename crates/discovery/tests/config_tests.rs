//! Integration tests for configuration loading
//!
//! Tests discovery configuration parsing, including:
//! - Full and partial documents
//! - Save/load through the filesystem
//! - Invalid configuration handling
//!
//! Run with: `cargo test -p discovery --test config_tests`

use discovery::config::{self, BOOT_LOADER_FILTER, DiscoveryConfig, TRACKING_MODULE_FILTER};
use std::time::Duration;
use tempfile::tempdir;

const FULL_CONFIG: &str = r#"
[discovery]
poll_interval_us = 250
rounds = 5
round_interval_ms = 200
presence_channel_capacity = 16

[usb]
filters = ["0x8087:0x0b37", "0x03e7:*"]

[logging]
level = "debug"
"#;

#[test]
fn test_full_config() {
    let config = DiscoveryConfig::from_toml(FULL_CONFIG).unwrap();

    assert_eq!(config.discovery.poll_interval(), Duration::from_micros(250));
    assert_eq!(config.discovery.rounds, 5);
    assert_eq!(config.discovery.round_interval(), Duration::from_millis(200));
    assert_eq!(config.discovery.discovery_timeout(), Duration::from_secs(1));
    assert_eq!(config.discovery.presence_channel_capacity, 16);
    assert_eq!(config.usb.filters, vec!["0x8087:0x0b37", "0x03e7:*"]);
    assert_eq!(config.logging.level, "debug");
}

#[test]
fn test_partial_config_fills_defaults() {
    let config = DiscoveryConfig::from_toml("[discovery]\nrounds = 3\n").unwrap();

    assert_eq!(config.discovery.rounds, 3);
    assert_eq!(config.discovery.poll_interval_us, 100);
    assert_eq!(config.discovery.round_interval_ms, 1000);
    assert_eq!(
        config.usb.filters,
        vec![TRACKING_MODULE_FILTER, BOOT_LOADER_FILTER]
    );
}

#[test]
fn test_invalid_filter_rejected() {
    let err = DiscoveryConfig::from_toml("[usb]\nfilters = [\"8087:0b37\"]\n").unwrap_err();
    assert!(format!("{:#}", err).contains("must start with '0x'"));
}

#[test]
fn test_zero_poll_interval_rejected() {
    assert!(DiscoveryConfig::from_toml("[discovery]\npoll_interval_us = 0\n").is_err());
}

#[test]
fn test_malformed_toml_rejected() {
    assert!(DiscoveryConfig::from_toml("[discovery\nrounds = ").is_err());
}

#[test]
fn test_save_and_load() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("discovery.toml");

    let mut config = DiscoveryConfig::default();
    config.discovery.rounds = 7;
    config.logging.level = "warn".to_string();
    config.save(&path).unwrap();

    let loaded = DiscoveryConfig::load(Some(path.clone())).unwrap();
    assert_eq!(loaded.discovery.rounds, 7);
    assert_eq!(loaded.logging.level, "warn");

    let via_str = config::load_config(path.to_str().unwrap()).unwrap();
    assert_eq!(via_str.discovery, loaded.discovery);
}

#[test]
fn test_missing_file_is_error() {
    let dir = tempdir().unwrap();
    let result = DiscoveryConfig::load(Some(dir.path().join("absent.toml")));
    assert!(result.is_err());
}
