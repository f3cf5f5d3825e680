use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::Platform;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Plugin error: {platform}: {message}")]
    Plugin { platform: String, message: String },
}

/// Failure of a single connector branch. Always captured per platform,
/// never propagated past the aggregator.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConnectorError {
    #[error("{platform}: timed out: {message}")]
    Timeout { platform: Platform, message: String },

    #[error("{platform}: authentication failed: {message}")]
    AuthFailure { platform: Platform, message: String },

    #[error("{platform}: rate limited: {message}")]
    RateLimited { platform: Platform, message: String },

    #[error("{platform}: malformed response: {message}")]
    MalformedResponse { platform: Platform, message: String },

    #[error("{platform}: network error: {message}")]
    NetworkError { platform: Platform, message: String },
}

impl ConnectorError {
    pub fn timeout(platform: Platform, message: impl Into<String>) -> Self {
        Self::Timeout { platform, message: message.into() }
    }

    pub fn auth(platform: Platform, message: impl Into<String>) -> Self {
        Self::AuthFailure { platform, message: message.into() }
    }

    pub fn rate_limited(platform: Platform, message: impl Into<String>) -> Self {
        Self::RateLimited { platform, message: message.into() }
    }

    pub fn malformed(platform: Platform, message: impl Into<String>) -> Self {
        Self::MalformedResponse { platform, message: message.into() }
    }

    pub fn network(platform: Platform, message: impl Into<String>) -> Self {
        Self::NetworkError { platform, message: message.into() }
    }

    pub fn platform(&self) -> Platform {
        match self {
            Self::Timeout { platform, .. }
            | Self::AuthFailure { platform, .. }
            | Self::RateLimited { platform, .. }
            | Self::MalformedResponse { platform, .. }
            | Self::NetworkError { platform, .. } => *platform,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "timeout",
            Self::AuthFailure { .. } => "auth_failure",
            Self::RateLimited { .. } => "rate_limited",
            Self::MalformedResponse { .. } => "malformed_response",
            Self::NetworkError { .. } => "network_error",
        }
    }

    /// Whether another attempt against the same backend may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::NetworkError { .. })
    }
}

/// Request-level failures of the aggregator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AggregationError {
    #[error("all platforms failed: {0}")]
    AllPlatformsFailed(String),

    #[error("invalid search options: {0}")]
    InvalidOptions(String),
}

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;
