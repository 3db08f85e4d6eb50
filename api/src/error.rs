//! Service-client errors.

#[cfg(test)]
#[path = "error_test.rs"]
mod error_test;

/// Stable error code and retry classification, rendered by the UI as a tagged
/// failure with an optional retry action.
pub trait ErrorCode {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

/// Errors produced by service-client operations.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// A configuration value is missing or unusable.
    #[error("config error: {0}")]
    Config(String),

    /// The request exceeded the hard per-request timeout.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// The connection to the service could not be established.
    #[error("connect failed: {0}")]
    Connect(String),

    /// The request failed in transport after connecting.
    #[error("request failed: {0}")]
    Request(String),

    /// The service returned a non-success HTTP status.
    #[error("service returned status {status}")]
    Status { status: u16, body: String },

    /// The response body could not be deserialized.
    #[error("response parse failed: {0}")]
    Parse(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl ApiError {
    /// Classify a transport error from the HTTP client.
    #[must_use]
    pub fn from_transport(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() {
            Self::Connect(err.to_string())
        } else {
            Self::Request(err.to_string())
        }
    }
}

impl ErrorCode for ApiError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Config(_) => "E_CONFIG",
            Self::Timeout(_) => "E_TIMEOUT",
            Self::Connect(_) => "E_CONNECT",
            Self::Request(_) => "E_REQUEST",
            Self::Status { .. } => "E_STATUS",
            Self::Parse(_) => "E_PARSE",
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT_BUILD",
        }
    }

    fn retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout(_) | Self::Connect(_) | Self::Request(_) | Self::Status { status: 429 | 502 | 503 | 504, .. }
        )
    }
}
