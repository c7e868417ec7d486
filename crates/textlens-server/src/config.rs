//! Server configuration loading from file and environment variables.

use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use thiserror::Error;

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server network settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Database settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Session settings.
    #[serde(default)]
    pub session: SessionConfig,

    /// Rate limiting settings.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// AI provider settings.
    #[serde(default)]
    pub ai: AiConfig,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,

    /// Busy timeout for SQLite connections, in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Maximum number of pooled SQLite connections.
    #[serde(default = "default_pool_max_size")]
    pub pool_max_size: u32,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "textlens_server=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

/// Session configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Session lifetime in days.
    #[serde(default = "default_session_ttl_days")]
    pub ttl_days: u32,

    /// How often the expired-session sweep runs, in seconds. 0 disables it.
    #[serde(default = "default_prune_interval_seconds")]
    pub prune_interval_seconds: u64,
}

/// Rate limiting configuration (requests per minute).
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Limit applied to most endpoints.
    #[serde(default = "default_rate_limit")]
    pub default_limit: u32,

    /// Stricter limit applied to login and register.
    #[serde(default = "default_auth_rate_limit")]
    pub auth_limit: u32,
}

/// AI provider configuration. A provider is considered configured when
/// its API key is set.
#[derive(Debug, Clone, Deserialize)]
pub struct AiConfig {
    /// Preferred provider ("anthropic", "deepseek", "moonshot"). When
    /// unset the first configured provider is used.
    #[serde(default)]
    pub default_provider: Option<String>,

    #[serde(default)]
    pub anthropic_api_key: Option<String>,
    #[serde(default = "default_anthropic_model")]
    pub anthropic_model: String,

    #[serde(default)]
    pub deepseek_api_key: Option<String>,
    #[serde(default = "default_deepseek_model")]
    pub deepseek_model: String,

    #[serde(default)]
    pub moonshot_api_key: Option<String>,
    #[serde(default = "default_moonshot_model")]
    pub moonshot_model: String,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    3000
}

fn default_db_path() -> String {
    "textlens.db".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_pool_max_size() -> u32 {
    8
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_session_ttl_days() -> u32 {
    7
}

fn default_prune_interval_seconds() -> u64 {
    3_600
}

fn default_rate_limit() -> u32 {
    120
}

fn default_auth_rate_limit() -> u32 {
    20
}

fn default_anthropic_model() -> String {
    "claude-3-5-haiku-20241022".to_string()
}

fn default_deepseek_model() -> String {
    "deepseek-chat".to_string()
}

fn default_moonshot_model() -> String {
    "moonshot-v1-8k".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
            pool_max_size: default_pool_max_size(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_days: default_session_ttl_days(),
            prune_interval_seconds: default_prune_interval_seconds(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            default_limit: default_rate_limit(),
            auth_limit: default_auth_rate_limit(),
        }
    }
}

// Model names must keep their defaults even when the whole [ai] section
// is absent and a key arrives via env override.
impl Default for AiConfig {
    fn default() -> Self {
        Self {
            default_provider: None,
            anthropic_api_key: None,
            anthropic_model: default_anthropic_model(),
            deepseek_api_key: None,
            deepseek_model: default_deepseek_model(),
            moonshot_api_key: None,
            moonshot_model: default_moonshot_model(),
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `TEXTLENS_HOST` overrides `server.host`
/// - `TEXTLENS_PORT` overrides `server.port`
/// - `TEXTLENS_DB_PATH` overrides `database.path`
/// - `TEXTLENS_LOG_LEVEL` overrides `logging.level`
/// - `TEXTLENS_LOG_JSON` overrides `logging.json` (set to "true" to enable)
/// - `TEXTLENS_SESSION_TTL_DAYS` overrides `session.ttl_days`
/// - `TEXTLENS_AI_PROVIDER` overrides `ai.default_provider`
/// - `TEXTLENS_ANTHROPIC_API_KEY`, `TEXTLENS_DEEPSEEK_API_KEY`,
///   `TEXTLENS_MOONSHOT_API_KEY` override the provider API keys
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    // Environment variable overrides
    if let Ok(host) = std::env::var("TEXTLENS_HOST") {
        if let Ok(parsed) = host.parse() {
            config.server.host = parsed;
        }
    }
    if let Ok(port) = std::env::var("TEXTLENS_PORT") {
        if let Ok(parsed) = port.parse() {
            config.server.port = parsed;
        }
    }
    if let Ok(db_path) = std::env::var("TEXTLENS_DB_PATH") {
        config.database.path = db_path;
    }
    if let Ok(level) = std::env::var("TEXTLENS_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Ok(json) = std::env::var("TEXTLENS_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
    if let Ok(ttl) = std::env::var("TEXTLENS_SESSION_TTL_DAYS") {
        if let Ok(parsed) = ttl.parse() {
            config.session.ttl_days = parsed;
        }
    }
    if let Ok(provider) = std::env::var("TEXTLENS_AI_PROVIDER") {
        config.ai.default_provider = Some(provider);
    }
    if let Ok(key) = std::env::var("TEXTLENS_ANTHROPIC_API_KEY") {
        config.ai.anthropic_api_key = Some(key);
    }
    if let Ok(key) = std::env::var("TEXTLENS_DEEPSEEK_API_KEY") {
        config.ai.deepseek_api_key = Some(key);
    }
    if let Ok(key) = std::env::var("TEXTLENS_MOONSHOT_API_KEY") {
        config.ai.moonshot_api_key = Some(key);
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = Config::default();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.session.ttl_days, 7);
        assert_eq!(config.rate_limit.auth_limit, 20);
        assert!(config.ai.anthropic_api_key.is_none());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let config: Config = toml::from_str(
            r#"
            [server]
            port = 8080

            [ai]
            deepseek_api_key = "sk-test"
            "#,
        )
        .unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, default_host());
        assert_eq!(config.database.path, "textlens.db");
        assert_eq!(config.ai.deepseek_api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.ai.deepseek_model, "deepseek-chat");
    }
}
