//! Configuration for SmsRust

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Dispatch engine configuration
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Daily counter reset configuration
    #[serde(default)]
    pub daily_reset: DailyResetConfig,

    /// Time-restriction monitor configuration
    #[serde(default)]
    pub time_restriction: TimeRestrictionConfig,

    /// Content provider configuration
    #[serde(default)]
    pub content: ContentConfig,

    /// API configuration
    #[serde(default)]
    pub api: ApiConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
        }
    }
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database backend: "postgres" or "memory"
    #[serde(default = "default_db_backend")]
    pub backend: String,

    /// Database URL (for postgres)
    pub url: Option<String>,

    /// Maximum connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: default_db_backend(),
            url: None,
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
        }
    }
}

fn default_db_backend() -> String {
    "postgres".to_string()
}

fn default_max_connections() -> u32 {
    20
}

fn default_min_connections() -> u32 {
    5
}

/// Dispatch engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Minimum pacing delay between sends, in seconds
    #[serde(default = "default_interval_min")]
    pub interval_min_secs: u64,

    /// Maximum pacing delay between sends, in seconds
    #[serde(default = "default_interval_max")]
    pub interval_max_secs: u64,

    /// Default campaign daily message limit
    #[serde(default = "default_daily_message_limit")]
    pub daily_message_limit: i32,

    /// Dispatch attempts per job before terminal failure
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base retry delay, in seconds (doubles per attempt)
    #[serde(default = "default_retry_base")]
    pub retry_base_secs: u64,

    /// Device transport call timeout, in seconds
    #[serde(default = "default_transport_timeout")]
    pub transport_timeout_secs: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            interval_min_secs: default_interval_min(),
            interval_max_secs: default_interval_max(),
            daily_message_limit: default_daily_message_limit(),
            max_attempts: default_max_attempts(),
            retry_base_secs: default_retry_base(),
            transport_timeout_secs: default_transport_timeout(),
        }
    }
}

fn default_interval_min() -> u64 {
    30
}

fn default_interval_max() -> u64 {
    90
}

fn default_daily_message_limit() -> i32 {
    300
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_base() -> u64 {
    5
}

fn default_transport_timeout() -> u64 {
    30
}

/// Daily counter reset configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyResetConfig {
    /// Local hour of the reset
    #[serde(default)]
    pub hour: u32,

    /// Local minute of the reset
    #[serde(default = "default_reset_minute")]
    pub minute: u32,

    /// Offset from UTC in minutes for the reset clock
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

impl Default for DailyResetConfig {
    fn default() -> Self {
        Self {
            hour: 0,
            minute: default_reset_minute(),
            utc_offset_minutes: 0,
        }
    }
}

fn default_reset_minute() -> u32 {
    5
}

/// Time-restriction monitor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeRestrictionConfig {
    /// Interval between window checks, in seconds
    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u64,
}

impl Default for TimeRestrictionConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: default_check_interval(),
        }
    }
}

fn default_check_interval() -> u64 {
    3600
}

/// Content provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentConfig {
    /// AI variant-generation endpoint; AI selection is skipped when unset
    pub endpoint: Option<String>,

    /// API key for the provider
    pub api_key: Option<String>,

    /// Provider request timeout in seconds
    #[serde(default = "default_content_timeout")]
    pub timeout_secs: u64,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            timeout_secs: default_content_timeout(),
        }
    }
}

fn default_content_timeout() -> u64 {
    30
}

/// API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API port
    #[serde(default = "default_api_port")]
    pub port: u16,

    /// CORS allowed origins
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            port: default_api_port(),
            cors_origins: Vec::new(),
        }
    }
}

fn default_api_port() -> u16 {
    8080
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: "json" or "text"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Config {
    /// Load configuration from file
    pub fn from_file(path: &std::path::Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default locations
    pub fn load() -> crate::Result<Self> {
        let paths = [
            std::path::PathBuf::from("./config.toml"),
            std::path::PathBuf::from("/etc/smsrust/config.toml"),
        ];

        for path in paths {
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        Err(crate::Error::Config(
            "No configuration file found".to_string(),
        ))
    }

    /// Validate cross-field constraints
    pub fn validate(&self) -> crate::Result<()> {
        if self.dispatch.interval_min_secs > self.dispatch.interval_max_secs {
            return Err(crate::Error::Config(
                "dispatch.interval_min_secs must not exceed interval_max_secs".to_string(),
            ));
        }
        if self.dispatch.max_attempts == 0 {
            return Err(crate::Error::Config(
                "dispatch.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.daily_reset.hour > 23 || self.daily_reset.minute > 59 {
            return Err(crate::Error::Config(
                "daily_reset hour/minute out of range".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let dispatch = DispatchConfig::default();
        assert_eq!(dispatch.interval_min_secs, 30);
        assert_eq!(dispatch.interval_max_secs, 90);
        assert_eq!(dispatch.daily_message_limit, 300);
        assert_eq!(dispatch.max_attempts, 3);
        assert_eq!(dispatch.transport_timeout_secs, 30);

        let monitor = TimeRestrictionConfig::default();
        assert_eq!(monitor.check_interval_secs, 3600);
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[server]
bind_address = "127.0.0.1"

[database]
backend = "postgres"
url = "postgres://localhost/smsrust"

[dispatch]
interval_min_secs = 10
interval_max_secs = 20
daily_message_limit = 100

[daily_reset]
hour = 4
utc_offset_minutes = -300
"#;

        let config: Config = toml::from_str(toml).unwrap();
        config.validate().unwrap();
        assert_eq!(config.server.bind_address, "127.0.0.1");
        assert_eq!(config.dispatch.interval_min_secs, 10);
        assert_eq!(config.dispatch.daily_message_limit, 100);
        assert_eq!(config.daily_reset.hour, 4);
        assert_eq!(config.daily_reset.minute, 5);
    }

    #[test]
    fn test_validate_rejects_inverted_interval() {
        let toml = r#"
[database]
backend = "memory"

[dispatch]
interval_min_secs = 90
interval_max_secs = 30
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert!(config.validate().is_err());
    }
}
