use std::{env, fmt, net::SocketAddr, time::Duration};

use url::Url;

use super::server_bind_address;

pub const DEFAULT_STATUS_API_BASE_URL: &str = "http://localhost:8065/";
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;

/// Application runtime environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
    Test,
}

impl Environment {
    fn from_str(value: &str) -> Result<Self, ConfigError> {
        match value {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            "test" => Ok(Self::Test),
            other => Err(ConfigError::InvalidEnvironment(other.to_string())),
        }
    }

    /// Returns the canonical name used for logging/metrics labels.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Test => "test",
        }
    }
}

/// Runtime configuration resolved from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub environment: Environment,
    pub status_api_base_url: Url,
    pub status_api_token: Option<String>,
    pub status_feature_enabled: bool,
    pub fetch_timeout: Duration,
}

impl AppConfig {
    /// Constructs the configuration by reading and validating environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let env_value = env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());
        let environment = Environment::from_str(&env_value)?;
        let bind_addr = server_bind_address().map_err(ConfigError::BindAddress)?;

        let base_value = env::var("STATUS_API_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_STATUS_API_BASE_URL.to_string());
        let status_api_base_url = parse_base_url(&base_value)?;

        let status_api_token = env::var("STATUS_API_TOKEN")
            .ok()
            .filter(|value| !value.trim().is_empty());

        let status_feature_enabled = match env::var("STATUS_FEATURE_ENABLED") {
            Ok(value) => parse_flag(&value)
                .ok_or_else(|| ConfigError::InvalidFeatureFlag(value.clone()))?,
            Err(_) => true,
        };

        let fetch_timeout = match env::var("STATUS_FETCH_TIMEOUT_SECS") {
            Ok(value) => match value.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => return Err(ConfigError::InvalidTimeout(value)),
            },
            Err(_) => Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
        };

        Ok(Self {
            bind_addr,
            environment,
            status_api_base_url,
            status_api_token,
            status_feature_enabled,
            fetch_timeout,
        })
    }
}

/// Parses the chat server URL, making sure it ends with `/` so relative joins
/// keep any path prefix.
fn parse_base_url(value: &str) -> Result<Url, ConfigError> {
    let mut normalized = value.trim().to_string();
    if !normalized.ends_with('/') {
        normalized.push('/');
    }
    Url::parse(&normalized).map_err(|err| ConfigError::InvalidBaseUrl(value.to_string(), err))
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Errors that can occur during configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    InvalidEnvironment(String),
    BindAddress(std::net::AddrParseError),
    InvalidBaseUrl(String, url::ParseError),
    InvalidFeatureFlag(String),
    InvalidTimeout(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidEnvironment(value) => write!(
                f,
                "APP_ENV must be one of 'development', 'production', or 'test' (got {value})"
            ),
            Self::BindAddress(err) => write!(f, "invalid APP_BIND_ADDR value: {err}"),
            Self::InvalidBaseUrl(value, err) => {
                write!(f, "invalid STATUS_API_BASE_URL value '{value}': {err}")
            }
            Self::InvalidFeatureFlag(value) => {
                write!(f, "STATUS_FEATURE_ENABLED must be a boolean (got {value})")
            }
            Self::InvalidTimeout(value) => write!(
                f,
                "STATUS_FETCH_TIMEOUT_SECS must be a positive integer (got {value})"
            ),
        }
    }
}

impl std::error::Error for ConfigError {}
