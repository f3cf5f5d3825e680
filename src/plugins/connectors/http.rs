use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::RetryIf;

use crate::config::ConnectorConfig;
use crate::models::Platform;
use crate::utils::error::{AppError, ConnectorError};

/// HTTP plumbing shared by the marketplace connectors.
///
/// Maps transport and status failures onto [`ConnectorError`] and retries
/// the transient ones (429 and network failures) with exponential backoff.
pub struct ConnectorHttp {
    client: Client,
    platform: Platform,
    config: ConnectorConfig,
}

impl ConnectorHttp {
    pub fn new(platform: Platform, config: ConnectorConfig, timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(5)))
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self {
            client,
            platform,
            config,
        })
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// The configured credential; a missing key fails before any call is made.
    pub fn api_key(&self) -> Result<&str, ConnectorError> {
        self.config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| ConnectorError::auth(self.platform, "no API key configured"))
    }

    /// Send the request built by `build` and decode a JSON body.
    pub async fn get_json<T, F>(&self, build: F) -> Result<T, ConnectorError>
    where
        T: DeserializeOwned,
        F: Fn(&Client) -> RequestBuilder,
    {
        let base_delay = self.config.retry_delay_ms.max(2);
        let strategy = ExponentialBackoff::from_millis(2)
            .factor(base_delay / 2)
            .max_delay(Duration::from_secs(5))
            .map(jitter)
            .take(self.config.retry_attempts as usize);

        RetryIf::start(
            strategy,
            || self.send_once::<T>(build(&self.client)),
            |err: &ConnectorError| {
                let retry = err.is_transient();
                if retry {
                    tracing::debug!("Retrying {} request after transient error: {}", self.platform, err);
                }
                retry
            },
        )
        .await
    }

    async fn send_once<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ConnectorError> {
        let response = request
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ConnectorError::auth(self.platform, format!("HTTP {}", status.as_u16())));
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .map(|v| format!(" (retry after {}s)", v))
                .unwrap_or_default();
            return Err(ConnectorError::rate_limited(
                self.platform,
                format!("HTTP 429{}", retry_after),
            ));
        }

        if !status.is_success() {
            return Err(ConnectorError::network(
                self.platform,
                format!("unexpected HTTP status {}", status.as_u16()),
            ));
        }

        let body = response.bytes().await.map_err(|e| self.transport_error(e))?;
        serde_json::from_slice(&body)
            .map_err(|e| ConnectorError::malformed(self.platform, format!("invalid response body: {}", e)))
    }

    fn transport_error(&self, err: reqwest::Error) -> ConnectorError {
        if err.is_timeout() {
            ConnectorError::timeout(self.platform, "backend request timed out")
        } else if err.is_decode() {
            ConnectorError::malformed(self.platform, err.to_string())
        } else {
            ConnectorError::network(self.platform, err.to_string())
        }
    }
}
