//! Service-client configuration parsed from environment variables.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use std::time::Duration;

use crate::error::ApiError;
use crate::retry::RetryPolicy;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_RETRY_ATTEMPTS: usize = 3;
pub const DEFAULT_RETRY_BASE_MS: u64 = 250;
pub const DEFAULT_VALIDATE_DEBOUNCE_MS: u64 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// Service base URL without a trailing slash.
    pub base_url: String,
    pub timeouts: ApiTimeouts,
    pub retry: RetryPolicy,
    /// Quiet period before a graph change is sent for validation.
    pub debounce_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_owned(),
            timeouts: ApiTimeouts {
                request_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
                connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            },
            retry: RetryPolicy { attempts: DEFAULT_RETRY_ATTEMPTS, base_ms: DEFAULT_RETRY_BASE_MS },
            debounce_ms: DEFAULT_VALIDATE_DEBOUNCE_MS,
        }
    }
}

impl ApiConfig {
    /// Build typed config from environment variables.
    ///
    /// Optional:
    /// - `STACKBOARD_API_URL`: default `http://127.0.0.1:8000`
    /// - `STACKBOARD_REQUEST_TIMEOUT_SECS`: default 30
    /// - `STACKBOARD_CONNECT_TIMEOUT_SECS`: default 10
    /// - `STACKBOARD_RETRY_ATTEMPTS`: default 3
    /// - `STACKBOARD_RETRY_BASE_MS`: default 250
    /// - `STACKBOARD_VALIDATE_DEBOUNCE_MS`: default 300
    ///
    /// Unparseable numbers fall back to their defaults.
    pub fn from_env() -> Result<Self, ApiError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ApiConfig::from_env`] but reading values through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ApiError> {
        let base_url = lookup("STACKBOARD_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_owned());
        let config = Self {
            base_url,
            timeouts: ApiTimeouts {
                request_secs: parse_or(&lookup, "STACKBOARD_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
                connect_secs: parse_or(&lookup, "STACKBOARD_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS),
            },
            retry: RetryPolicy {
                attempts: parse_or(&lookup, "STACKBOARD_RETRY_ATTEMPTS", DEFAULT_RETRY_ATTEMPTS),
                base_ms: parse_or(&lookup, "STACKBOARD_RETRY_BASE_MS", DEFAULT_RETRY_BASE_MS),
            },
            debounce_ms: parse_or(&lookup, "STACKBOARD_VALIDATE_DEBOUNCE_MS", DEFAULT_VALIDATE_DEBOUNCE_MS),
        };
        config.validated()
    }

    /// Normalize the base URL and reject values no request could succeed with.
    pub fn validated(mut self) -> Result<Self, ApiError> {
        self.base_url = self.base_url.trim().trim_end_matches('/').to_owned();
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ApiError::Config(format!("base URL must be http(s): `{}`", self.base_url)));
        }
        if self.timeouts.request_secs == 0 {
            return Err(ApiError::Config("request timeout must be at least 1s".into()));
        }
        if self.retry.attempts == 0 {
            return Err(ApiError::Config("retry attempts must be at least 1".into()));
        }
        Ok(self)
    }

    #[must_use]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Join an endpoint path onto the base URL.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    lookup(key)
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}
