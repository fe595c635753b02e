//! # Configuration Management
//!
//! Wire constants and runtime configuration for the connector.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()`
//! - Direct instantiation with defaults
//! - Environment overrides via `from_env()`
//!
//! ## Example
//! ```toml
//! [client]
//! address = "127.0.0.1:27015"
//! resolve_timeout = 5000
//!
//! [player]
//! name = "player"
//! password = ""
//! game_version = "4630212"
//!
//! [identity]
//! identity_id = 76561198000000001
//! ticket = "q83v"
//! ```

use crate::error::{ProtocolError, Result};
use crate::identity::StaticIdentity;
use crate::utils::timeout;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;
use tracing::Level;

/// Network protocol version sent in the connect packet
pub const PROTOCOL_VERSION: i32 = 24;

/// Authentication scheme id for third-party identity tickets
pub const AUTH_PROTOCOL_TICKET: i32 = 3;

/// Marker opening every connectionless packet
pub const CONNECTIONLESS_HEADER: i32 = -1;

/// Width of the message type field in connected payloads
pub const NET_MESSAGE_BITS: u32 = 6;

/// Width of the command tag inside the post-authentication packet
pub const COMMAND_TAG_BITS: u32 = 4;

/// Scratch buffer size for outbound bit-packed packets
pub const SCRATCH_BUFFER_SIZE: usize = 2048;

/// Longest refusal reason kept from a `'9'` packet
pub const MAX_REASON_LENGTH: usize = 1024;

/// Largest datagram the transport accepts
pub const MAX_DATAGRAM_SIZE: usize = 4096;

/// Top-level configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ConnectConfig {
    #[serde(default)]
    pub client: ClientConfig,

    #[serde(default)]
    pub player: PlayerConfig,

    #[serde(default)]
    pub identity: IdentityConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ConnectConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to open config file: {e}")))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to parse TOML: {e}")))
    }

    /// Defaults overridden by `SOURCE_CONNECTOR_*` environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env();
        Ok(config)
    }

    /// Apply `SOURCE_CONNECTOR_*` overrides on top of the current values
    pub fn apply_env(&mut self) {
        if let Ok(addr) = std::env::var("SOURCE_CONNECTOR_ADDRESS") {
            self.client.address = addr;
        }

        if let Ok(name) = std::env::var("SOURCE_CONNECTOR_PLAYER_NAME") {
            self.player.name = name;
        }

        if let Ok(password) = std::env::var("SOURCE_CONNECTOR_PASSWORD") {
            self.player.password = password;
        }

        if let Ok(version) = std::env::var("SOURCE_CONNECTOR_GAME_VERSION") {
            self.player.game_version = version;
        }

        if let Ok(challenge) = std::env::var("SOURCE_CONNECTOR_CLIENT_CHALLENGE") {
            if let Ok(val) = challenge.parse::<i32>() {
                self.player.client_challenge = Some(val);
            }
        }

        if let Ok(id) = std::env::var("SOURCE_CONNECTOR_IDENTITY_ID") {
            if let Ok(val) = id.parse::<u64>() {
                self.identity.identity_id = val;
            }
        }

        if let Ok(ticket) = std::env::var("SOURCE_CONNECTOR_TICKET") {
            self.identity.ticket = ticket;
        }
    }

    /// Generate example configuration file content
    pub fn example_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# Failed to generate example config"))
    }

    /// Save configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to write config file: {e}")))?;

        Ok(())
    }

    /// Validate the configuration. Empty list means configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        errors.extend(self.client.validate());
        errors.extend(self.player.validate());
        errors.extend(self.identity.validate());
        errors.extend(self.logging.validate());
        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ProtocolError::ConfigError(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

/// Transport client configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientConfig {
    /// Game server address, `host:port`
    pub address: String,

    /// Local bind address for the UDP socket
    pub bind_address: String,

    /// Timeout for resolving the server address
    #[serde(with = "duration_serde")]
    pub resolve_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            address: String::from("127.0.0.1:27015"),
            bind_address: String::from("0.0.0.0:0"),
            resolve_timeout: timeout::RESOLVE_TIMEOUT,
        }
    }
}

impl ClientConfig {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        match self.address.rsplit_once(':') {
            _ if self.address.is_empty() => {
                errors.push("Server address cannot be empty".to_string());
            }
            Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => {}
            _ => errors.push(format!(
                "Invalid server address format: '{}' (expected format: 'host:27015')",
                self.address
            )),
        }

        if self.bind_address.parse::<std::net::SocketAddr>().is_err() {
            errors.push(format!(
                "Invalid bind address: '{}' (expected format: '0.0.0.0:0')",
                self.bind_address
            ));
        }

        if self.resolve_timeout.as_millis() < 100 {
            errors.push("Resolve timeout too short (minimum: 100ms)".to_string());
        } else if self.resolve_timeout.as_secs() > 60 {
            errors.push("Resolve timeout too long (maximum: 60s)".to_string());
        }

        errors
    }
}

/// Credentials presented to the game server
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlayerConfig {
    pub name: String,

    pub password: String,

    /// Game build the server expects, e.g. "4630212"
    pub game_version: String,

    /// Challenge seed; drawn at random when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_challenge: Option<i32>,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            name: String::from("unnamed"),
            password: String::new(),
            game_version: String::from("1.0.0.0"),
            client_challenge: None,
        }
    }
}

impl PlayerConfig {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.name.is_empty() {
            errors.push("Player name cannot be empty".to_string());
        } else if self.name.len() > 32 {
            errors.push(format!(
                "Player name too long: {} bytes (maximum: 32)",
                self.name.len()
            ));
        }

        if self.password.len() > 255 {
            errors.push(format!(
                "Password too long: {} bytes (maximum: 255)",
                self.password.len()
            ));
        }

        if self.name.contains('\0')
            || self.password.contains('\0')
            || self.game_version.contains('\0')
        {
            errors.push(
                "Player name, password and game version cannot contain NUL bytes".to_string(),
            );
        }

        if self.game_version.is_empty() {
            errors.push("Game version cannot be empty".to_string());
        } else if self.game_version.len() > 32 {
            errors.push(format!(
                "Game version too long: {} bytes (maximum: 32)",
                self.game_version.len()
            ));
        }

        errors
    }

    /// Configured challenge, or a fresh random one
    pub fn challenge_or_random(&self) -> i32 {
        self.client_challenge.unwrap_or_else(rand::random::<i32>)
    }
}

/// Identity presented with the connect packet
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct IdentityConfig {
    /// 64-bit account identity
    pub identity_id: u64,

    /// Base64 encoded authentication ticket
    pub ticket: String,
}

impl IdentityConfig {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.identity_id == 0 {
            errors.push("Identity id must be set".to_string());
        }

        if self.ticket.is_empty() {
            errors.push("Authentication ticket must be set".to_string());
        } else if self.decode_ticket().is_err() {
            errors.push("Authentication ticket is not valid base64".to_string());
        }

        errors
    }

    pub fn decode_ticket(&self) -> Result<Vec<u8>> {
        base64::engine::general_purpose::STANDARD
            .decode(self.ticket.trim())
            .map_err(|e| ProtocolError::ConfigError(format!("Invalid ticket encoding: {e}")))
    }

    /// Build the provider backing this configuration
    pub fn to_provider(&self) -> Result<StaticIdentity> {
        Ok(StaticIdentity::new(self.identity_id, self.decode_ticket()?))
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(with = "log_level_serde")]
    pub log_level: Level,

    /// Whether to log to console
    pub log_to_console: bool,

    /// Path to an additional log file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file_path: Option<String>,

    /// Whether to use JSON formatting for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: Level::INFO,
            log_to_console: true,
            log_file_path: None,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if let Some(ref path) = self.log_file_path {
            if let Some(parent) = Path::new(path).parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    errors.push(format!(
                        "Log file directory does not exist: {}",
                        parent.display()
                    ));
                }
            }
        }

        if !self.log_to_console && self.log_file_path.is_none() {
            errors
                .push("At least one logging output (console or file) must be enabled".to_string());
        }

        errors
    }
}

/// Helper module for Duration serialization/deserialization
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis = duration.as_millis() as u64;
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

/// Helper module for tracing::Level serialization/deserialization
mod log_level_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::str::FromStr;
    use tracing::Level;

    pub fn serialize<S>(level: &Level, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let level_str = match *level {
            Level::TRACE => "trace",
            Level::DEBUG => "debug",
            Level::INFO => "info",
            Level::WARN => "warn",
            Level::ERROR => "error",
        };
        level_str.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Level, D::Error>
    where
        D: Deserializer<'de>,
    {
        let level_str = String::deserialize(deserializer)?;
        Level::from_str(&level_str)
            .map_err(|_| serde::de::Error::custom(format!("Invalid log level: {level_str}")))
    }
}
