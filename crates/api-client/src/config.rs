//! Configuration for the Marina API client
//!
//! Supports environment-based configuration with sensible defaults.

use crate::error::{ApiError, ApiResult};
use marina_core::retry::RetryConfig;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Default API base URL (local backend)
const DEFAULT_API_URL: &str = "http://localhost:5000/api";

/// Default per-attempt timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Upper bound on configured retries
const MAX_RETRY_ATTEMPTS: u32 = 10;

/// Environment types
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local development backend
    #[default]
    Development,
    /// Staging environment
    Staging,
    /// Production environment
    Production,
}

impl Environment {
    /// Parse from `MARINA_ENV`
    pub fn from_env() -> Self {
        Self::parse(&env::var("MARINA_ENV").unwrap_or_default())
    }

    fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "staging" | "stage" => Self::Staging,
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }
}

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL every request path is resolved against
    pub base_url: String,
    /// Per-attempt timeout
    #[serde(with = "duration_secs")]
    pub timeout: Duration,
    /// Retry configuration
    pub retry: RetryConfig,
    /// Install a log subscriber in front ends that honor it
    pub logging: bool,
    /// Credential file location; `None` uses the platform data directory
    pub credentials_path: Option<PathBuf>,
    /// `User-Agent` header
    pub user_agent: String,
    /// Current environment
    pub environment: Environment,
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

fn default_user_agent() -> String {
    format!("marina-client/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            retry: RetryConfig::default(),
            logging: true,
            credentials_path: None,
            user_agent: default_user_agent(),
            environment: Environment::default(),
        }
    }
}

impl ClientConfig {
    /// Create configuration from environment variables
    ///
    /// Reads the following environment variables:
    /// - `MARINA_API_URL`: Base URL
    /// - `MARINA_ENV`: Environment (development/staging/production), picks the preset
    /// - `MARINA_TIMEOUT_SECS`: Per-attempt timeout in seconds
    /// - `MARINA_RETRY_ATTEMPTS`: Extra attempts after a network failure
    /// - `MARINA_RETRY_DELAY_MS`: Base retry delay in milliseconds
    /// - `MARINA_RETRY_ON_TIMEOUT`: Retry timed-out attempts too (`true`/`1`)
    /// - `MARINA_LOGGING`: Logging toggle (`false`/`0` disables)
    /// - `MARINA_CREDENTIALS_PATH`: Credential file location
    ///
    /// A value that does not parse is a configuration error naming the variable.
    pub fn from_env() -> ApiResult<Self> {
        let config = Self::from_lookup(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ApiResult<Self> {
        let environment = Environment::parse(&lookup("MARINA_ENV").unwrap_or_default());
        let mut config = match environment {
            Environment::Development => Self::development(),
            Environment::Staging => Self::staging(),
            Environment::Production => Self::production(),
        };

        if let Some(url) = non_empty(&lookup, "MARINA_API_URL") {
            config.base_url = url;
        }
        if let Some(secs) = parsed(&lookup, "MARINA_TIMEOUT_SECS")? {
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(attempts) = parsed(&lookup, "MARINA_RETRY_ATTEMPTS")? {
            config.retry.retry_attempts = attempts;
        }
        if let Some(ms) = parsed(&lookup, "MARINA_RETRY_DELAY_MS")? {
            config.retry.base_delay = Duration::from_millis(ms);
        }
        if let Some(flag) = flag(&lookup, "MARINA_RETRY_ON_TIMEOUT")? {
            config.retry.retry_on_timeout = flag;
        }
        if let Some(flag) = flag(&lookup, "MARINA_LOGGING")? {
            config.logging = flag;
        }
        if let Some(path) = non_empty(&lookup, "MARINA_CREDENTIALS_PATH") {
            config.credentials_path = Some(PathBuf::from(path));
        }

        Ok(config)
    }

    /// Create development configuration (local backend)
    #[must_use]
    pub fn development() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            retry: RetryConfig::quick(),
            environment: Environment::Development,
            ..Self::default()
        }
    }

    /// Create staging configuration
    #[must_use]
    pub fn staging() -> Self {
        Self {
            retry: RetryConfig::default(),
            logging: false,
            environment: Environment::Staging,
            ..Self::default()
        }
    }

    /// Create production configuration
    #[must_use]
    pub fn production() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            retry: RetryConfig::patient(),
            logging: false,
            environment: Environment::Production,
            ..Self::default()
        }
    }

    /// Builder-style method to set base URL
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Builder-style method to set timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builder-style method to set retry config
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Builder-style method to toggle logging
    #[must_use]
    pub fn with_logging(mut self, logging: bool) -> Self {
        self.logging = logging;
        self
    }

    /// Builder-style method to set the credential file
    #[must_use]
    pub fn with_credentials_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.credentials_path = Some(path.into());
        self
    }

    /// Builder-style method to set the user agent
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> ApiResult<()> {
        if self.base_url.is_empty() {
            return Err(ApiError::config("base_url cannot be empty"));
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ApiError::config("base_url must start with http:// or https://"));
        }

        if self.timeout.is_zero() {
            return Err(ApiError::config("timeout cannot be zero"));
        }

        if self.retry.retry_attempts > MAX_RETRY_ATTEMPTS {
            return Err(ApiError::config(format!(
                "retry_attempts cannot exceed {MAX_RETRY_ATTEMPTS}"
            )));
        }

        Ok(())
    }
}

fn non_empty(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> ApiResult<Option<T>> {
    non_empty(lookup, key)
        .map(|value| {
            value
                .parse()
                .map_err(|_| ApiError::from(marina_core::Error::invalid_config(key, &value)))
        })
        .transpose()
}

fn flag(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> ApiResult<Option<bool>> {
    non_empty(lookup, key)
        .map(|value| {
            parse_flag(&value)
                .ok_or_else(|| ApiError::from(marina_core::Error::invalid_config(key, &value)))
        })
        .transpose()
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
