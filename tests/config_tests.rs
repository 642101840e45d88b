//! Integration tests for the TOML configuration system
//!
//! These tests verify that the configuration system works end-to-end:
//! - Loading and validating voxa.toml from disk
//! - Resolving secrets from the environment
//! - Building the aggregator configuration
//! - Reloading through the configuration manager

use std::fs;
use std::time::Duration;
use tempfile::TempDir;
use voxa::cli::init::{self, InitConfig, InitResult};
use voxa::cli::output::Output;
use voxa::metrics::FeedKind;
use voxa::utils::toml_config::{ConfigError, ConfigManager, VoxaConfig};

const FULL_CONFIG: &str = r#"
[api]
base_url = "https://api.voxa.test/"
timeout_secs = 15

[session]
path = "/tmp/voxa-tests/session.json"
key = "dashboard_token"

[auth]
login_path = "/auth"
jwt_secret_env = "VOXA_CONFIG_TEST_SECRET"

[metrics]
feeds = ["analytics", "urgency"]
reconnect_initial_ms = 250
reconnect_max_ms = 8000
reconnect_multiplier = 1.5
reconnect_jitter = false

[logging]
level = "warn"
"#;

fn write_config(dir: &TempDir, content: &str) -> std::path::PathBuf {
    let path = dir.path().join("voxa.toml");
    fs::write(&path, content).expect("write config");
    path
}

#[test]
fn test_load_full_config() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, FULL_CONFIG);

    let config = VoxaConfig::load(&path).expect("config should load");

    assert_eq!(config.api.timeout(), Duration::from_secs(15));
    assert_eq!(config.session.key, "dashboard_token");
    assert_eq!(config.metrics.feeds, vec![FeedKind::Analytics, FeedKind::Urgency]);
    assert_eq!(config.logging.level, "warn");
    assert!(!config.logging.json);

    let aggregator = config.metrics.aggregator_config();
    assert_eq!(aggregator.feeds, vec![FeedKind::Analytics, FeedKind::Urgency]);
    assert_eq!(aggregator.reconnect.initial_delay, Duration::from_millis(250));
    assert_eq!(aggregator.reconnect.multiplier, 1.5);
    assert!(!aggregator.reconnect.jitter);
}

#[test]
fn test_jwt_secret_resolves_from_env() {
    let dir = TempDir::new().unwrap();
    let config = VoxaConfig::load(write_config(&dir, FULL_CONFIG)).unwrap();

    std::env::set_var("VOXA_CONFIG_TEST_SECRET", "config-test-secret-32-characters!!");
    assert_eq!(
        config.jwt_secret().unwrap().as_deref(),
        Some("config-test-secret-32-characters!!")
    );
}

#[test]
fn test_missing_file_is_reported() {
    let dir = TempDir::new().unwrap();
    let err = VoxaConfig::load(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::FileNotFound(_)));
}

#[test]
fn test_malformed_toml_is_parse_error() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[api\nbase_url = ");
    assert!(matches!(
        VoxaConfig::load(&path),
        Err(ConfigError::ParseError(_))
    ));
}

#[test]
fn test_manager_reload_picks_up_changes() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, FULL_CONFIG);
    let manager = ConfigManager::new(&path).unwrap();
    let shared = manager.clone();

    assert_eq!(manager.config().metrics.feeds.len(), 2);

    write_config(&dir, "[metrics]\nfeeds = [\"sentiment\"]\n");
    manager.reload().unwrap();

    assert_eq!(shared.config().metrics.feeds, vec![FeedKind::Sentiment]);
    assert_eq!(shared.config().api.base_url, "http://localhost:3000");
}

#[test]
fn test_init_output_round_trips_through_loader() {
    let dir = TempDir::new().unwrap();
    let result = init::run(
        InitConfig {
            path: dir.path().to_path_buf(),
            force: false,
            base_url: "https://api.voxa.test".to_string(),
        },
        &Output::no_color(),
    );
    assert!(matches!(result, InitResult::Success));

    let config = VoxaConfig::load(dir.path().join("voxa.toml")).unwrap();
    assert_eq!(config.api.base_url, "https://api.voxa.test");
    assert_eq!(config.metrics.feeds, FeedKind::ALL.to_vec());
}
