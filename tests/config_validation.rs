//! Integration tests for configuration validation

#![allow(clippy::expect_used, clippy::unwrap_used)]

use source_connector::config::{ClientConfig, ConnectConfig, LoggingConfig, PlayerConfig};
use source_connector::error::ProtocolError;
use source_connector::identity::IdentityProvider;
use std::time::Duration;
use tracing::Level;

const VALID: &str = r#"
[client]
address = "198.51.100.4:27015"
bind_address = "0.0.0.0:0"
resolve_timeout = 2500

[player]
name = "DormantLemon"
password = "devowari"
game_version = "4630212"
client_challenge = 167679079

[identity]
identity_id = 76561198000000001
ticket = "AQIDBA=="

[logging]
log_level = "debug"
log_to_console = true
json_format = true
"#;

fn valid_config() -> ConnectConfig {
    ConnectConfig::from_toml(VALID).expect("fixture parses")
}

#[test]
fn test_fixture_parses_and_validates() {
    let config = valid_config();
    assert!(config.validate().is_empty(), "{:?}", config.validate());
    assert!(config.validate_strict().is_ok());

    assert_eq!(config.client.resolve_timeout, Duration::from_millis(2500));
    assert_eq!(config.player.client_challenge, Some(167_679_079));
    assert_eq!(config.logging.log_level, Level::DEBUG);
    assert!(config.logging.json_format);
}

#[test]
fn test_identity_provider_from_config() {
    let provider = valid_config().identity.to_provider().unwrap();
    assert_eq!(provider.identity_id(), 76_561_198_000_000_001);
    assert_eq!(provider.create_ticket().unwrap(), vec![1, 2, 3, 4]);
}

#[test]
fn test_default_config_needs_identity() {
    let errors = ConnectConfig::default().validate();
    assert!(errors.iter().any(|e| e.contains("Identity id must be set")));
    assert!(errors.iter().any(|e| e.contains("ticket must be set")));
    assert!(!errors.iter().any(|e| e.contains("address")));
}

#[test]
fn test_invalid_ticket_encoding() {
    let mut config = valid_config();
    config.identity.ticket = "not base64!".to_string();
    assert!(config
        .validate()
        .iter()
        .any(|e| e.contains("not valid base64")));
    assert!(matches!(
        config.identity.to_provider(),
        Err(ProtocolError::ConfigError(_))
    ));
}

#[test]
fn test_server_address_formats() {
    let mut client = ClientConfig::default();
    for ok in ["127.0.0.1:27015", "play.example.com:27016", "[::1]:27015"] {
        client.address = ok.to_string();
        assert!(client.validate().is_empty(), "{ok} should be valid");
    }

    for bad in ["", "no-port", "host:notaport", ":27015"] {
        client.address = bad.to_string();
        assert!(!client.validate().is_empty(), "{bad:?} should be invalid");
    }
}

#[test]
fn test_resolve_timeout_bounds() {
    let mut client = ClientConfig::default();
    client.resolve_timeout = Duration::from_millis(50);
    assert!(client
        .validate()
        .iter()
        .any(|e| e.contains("Resolve timeout too short")));

    client.resolve_timeout = Duration::from_secs(120);
    assert!(client
        .validate()
        .iter()
        .any(|e| e.contains("Resolve timeout too long")));
}

#[test]
fn test_player_validation() {
    let mut player = PlayerConfig::default();
    assert!(player.validate().is_empty());

    player.name = String::new();
    assert!(player.validate().iter().any(|e| e.contains("cannot be empty")));

    player.name = "x".repeat(40);
    assert!(player.validate().iter().any(|e| e.contains("too long")));

    player.name = "ok".to_string();
    player.password = "a\0b".to_string();
    assert!(player.validate().iter().any(|e| e.contains("NUL")));
}

#[test]
fn test_password_and_version_bounds() {
    let mut player = PlayerConfig::default();
    player.password = "x".repeat(255);
    player.game_version = "9".repeat(32);
    assert!(player.validate().is_empty(), "{:?}", player.validate());

    player.password = "x".repeat(2100);
    assert!(player
        .validate()
        .iter()
        .any(|e| e.contains("Password too long")));

    player.password = String::new();
    player.game_version = "9".repeat(33);
    assert!(player
        .validate()
        .iter()
        .any(|e| e.contains("Game version too long")));

    player.game_version = "46\0".to_string();
    assert!(player.validate().iter().any(|e| e.contains("NUL")));
}

#[test]
fn test_challenge_or_random_prefers_configured_value() {
    let mut player = PlayerConfig::default();
    player.client_challenge = Some(-5);
    assert_eq!(player.challenge_or_random(), -5);
}

#[test]
fn test_logging_needs_an_output() {
    let logging = LoggingConfig {
        log_to_console: false,
        log_file_path: None,
        ..LoggingConfig::default()
    };
    assert!(logging
        .validate()
        .iter()
        .any(|e| e.contains("At least one logging output")));
}

#[test]
fn test_invalid_log_level_rejected() {
    let toml = VALID.replace("\"debug\"", "\"verbose\"");
    let err = ConnectConfig::from_toml(&toml).unwrap_err();
    assert!(err.to_string().contains("Invalid log level"));
}

#[test]
fn test_save_and_reload() {
    let path = std::env::temp_dir().join(format!("source-connector-{}.toml", std::process::id()));
    let config = valid_config();
    config.save_to_file(&path).unwrap();

    let reloaded = ConnectConfig::from_file(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(reloaded.player.name, config.player.name);
    assert_eq!(reloaded.identity.ticket, config.identity.ticket);
    assert_eq!(reloaded.client.resolve_timeout, config.client.resolve_timeout);
}

#[test]
fn test_example_config_parses() {
    let example = ConnectConfig::example_config();
    assert!(ConnectConfig::from_toml(&example).is_ok());
}

#[test]
fn test_from_env_overrides_defaults() {
    std::env::set_var("SOURCE_CONNECTOR_GAME_VERSION", "7.7.7.7");
    std::env::set_var("SOURCE_CONNECTOR_IDENTITY_ID", "42");
    let config = ConnectConfig::from_env().unwrap();
    std::env::remove_var("SOURCE_CONNECTOR_GAME_VERSION");
    std::env::remove_var("SOURCE_CONNECTOR_IDENTITY_ID");

    assert_eq!(config.player.game_version, "7.7.7.7");
    assert_eq!(config.identity.identity_id, 42);
    assert_eq!(config.player.name, PlayerConfig::default().name);
}
