//! Core configuration types and loading.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Environment variable that overrides `identity.password`.
pub const PASSWORD_ENV: &str = "TMI_RELAY_PASSWORD";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Relay configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Chat server address.
    #[serde(default)]
    pub server: ServerConfig,
    /// Login and channel.
    pub identity: IdentityConfig,
    /// Registration handshake tuning.
    #[serde(default)]
    pub handshake: HandshakeSettings,
    /// Event loop tuning.
    #[serde(default)]
    pub event_loop: EventLoopConfig,
    /// Backoff between connection attempts.
    #[serde(default)]
    pub reconnect: ReconnectConfig,
    /// Where decoded messages go and where outbound chat comes from.
    #[serde(default)]
    pub delivery: DeliveryConfig,
    /// Fixed trigger/reply pairs.
    #[serde(default)]
    pub responders: Vec<ResponderConfig>,
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// `TMI_RELAY_PASSWORD`, when set, replaces the password from the file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;
        config.apply_password_override(std::env::var(PASSWORD_ENV).ok());
        Ok(config)
    }

    /// Replace the configured password with `password` if it is non-empty.
    pub fn apply_password_override(&mut self, password: Option<String>) {
        if let Some(password) = password.filter(|p| !p.is_empty()) {
            self.identity.password = password;
        }
    }

    /// `host:port` of the chat server.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Chat server address.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host name (default: irc.chat.twitch.tv).
    #[serde(default = "default_host")]
    pub host: String,
    /// Plaintext port (default: 6667).
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "irc.chat.twitch.tv".to_string()
}

fn default_port() -> u16 {
    6667
}

/// Login and channel.
#[derive(Clone, Deserialize)]
pub struct IdentityConfig {
    /// Login name, sent as NICK.
    pub user: String,
    /// OAuth token (`oauth:...`), sent as PASS.
    #[serde(default)]
    pub password: String,
    /// Channel to join, with or without the leading `#`.
    pub channel: String,
}

impl fmt::Debug for IdentityConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityConfig")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("channel", &self.channel)
            .finish()
    }
}

/// Registration handshake tuning.
#[derive(Debug, Clone, Deserialize)]
pub struct HandshakeSettings {
    /// Upper bound on the whole handshake in seconds (default: 30).
    #[serde(default = "default_handshake_timeout")]
    pub timeout_secs: u64,
    /// Seconds a single receive may wait for data (default: 20).
    #[serde(default = "default_receive_timeout")]
    pub receive_timeout_secs: u64,
    /// Numerics that count as the welcome reply (default: 001, 376).
    #[serde(default = "default_welcome_codes")]
    pub welcome_codes: Vec<String>,
    /// Capabilities to request (default: twitch.tv/tags, twitch.tv/commands).
    #[serde(default = "default_capabilities")]
    pub capabilities: Vec<String>,
    /// Also send `USER` during registration (default: false).
    #[serde(default)]
    pub send_user: bool,
}

impl HandshakeSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn receive_timeout(&self) -> Duration {
        Duration::from_secs(self.receive_timeout_secs)
    }
}

impl Default for HandshakeSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_handshake_timeout(),
            receive_timeout_secs: default_receive_timeout(),
            welcome_codes: default_welcome_codes(),
            capabilities: default_capabilities(),
            send_user: false,
        }
    }
}

fn default_handshake_timeout() -> u64 {
    30
}

fn default_receive_timeout() -> u64 {
    20
}

fn default_welcome_codes() -> Vec<String> {
    vec![
        tmi_proto::numeric::RPL_WELCOME.to_string(),
        tmi_proto::numeric::RPL_ENDOFMOTD.to_string(),
    ]
}

fn default_capabilities() -> Vec<String> {
    tmi_proto::DEFAULT_CAPABILITIES
        .iter()
        .map(|cap| cap.to_string())
        .collect()
}

/// Event loop tuning.
#[derive(Debug, Clone, Deserialize)]
pub struct EventLoopConfig {
    /// Seconds between heartbeat ticks (default: 20).
    #[serde(default = "default_tick")]
    pub tick_secs: u64,
}

impl EventLoopConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_secs(self.tick_secs)
    }
}

impl Default for EventLoopConfig {
    fn default() -> Self {
        Self {
            tick_secs: default_tick(),
        }
    }
}

fn default_tick() -> u64 {
    20
}

/// Exponential backoff between connection attempts.
#[derive(Debug, Clone, Deserialize)]
pub struct ReconnectConfig {
    /// Delay after the first failure in milliseconds (default: 1000).
    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,
    /// Ceiling for the doubled delay in seconds (default: 60).
    #[serde(default = "default_max_delay")]
    pub max_delay_secs: u64,
    /// Attempts per outage before giving up (default: 5).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Seconds a connection must stay up before earlier failures are
    /// forgotten (default: 30).
    #[serde(default = "default_stable")]
    pub stable_secs: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay(),
            max_delay_secs: default_max_delay(),
            max_attempts: default_max_attempts(),
            stable_secs: default_stable(),
        }
    }
}

fn default_initial_delay() -> u64 {
    1000
}

fn default_max_delay() -> u64 {
    60
}

fn default_max_attempts() -> u32 {
    5
}

fn default_stable() -> u64 {
    30
}

/// How messages leave and chat lines enter the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    /// Messages to stdout, chat lines from stdin.
    #[default]
    Stdio,
    /// Messages to `output_pipe`, chat lines from `input_pipe`.
    Pipe,
    /// Messages and chat lines as signals on the D-Bus session bus.
    Bus,
}

/// Serialization of delivered messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Tab-separated fields.
    #[default]
    Tsv,
    /// One JSON object per line.
    Json,
}

/// Delivery configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DeliveryConfig {
    #[serde(default)]
    pub mode: DeliveryMode,
    #[serde(default)]
    pub format: OutputFormat,
    /// Named pipe read for outbound chat lines (pipe mode).
    pub input_pipe: Option<PathBuf>,
    /// Named pipe written with delivered messages (pipe mode).
    pub output_pipe: Option<PathBuf>,
    /// Well-known name claimed on the session bus (bus mode).
    #[serde(default = "default_bus_name")]
    pub bus_name: String,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            mode: DeliveryMode::default(),
            format: OutputFormat::default(),
            input_pipe: None,
            output_pipe: None,
            bus_name: default_bus_name(),
        }
    }
}

fn default_bus_name() -> String {
    "org.tmirelay.Relay".to_string()
}

/// A chat command answered with fixed text.
#[derive(Debug, Clone, Deserialize)]
pub struct ResponderConfig {
    /// Exact message body that fires the reply, e.g. `$trnm`.
    pub trigger: String,
    /// Text sent back to the channel.
    pub reply: String,
}
