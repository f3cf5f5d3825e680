use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::models::{AggregatedResult, Platform, PlatformResult, Product};
use crate::ranking::DealKind;
use crate::utils::error::AggregationError;

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: chrono::Utc::now(),
        }
    }
}

impl ApiResponse<()> {
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::error_with_details(code, message, None)
    }

    pub fn error_with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: Option<Value>,
    ) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ApiError {
                code: code.into(),
                message: message.into(),
                details,
            }),
            timestamp: chrono::Utc::now(),
        }
    }
}

/// Errors raised by the HTTP layer itself.
///
/// Connector failures never show up here; they are part of the
/// aggregated result body.
#[derive(Debug)]
pub enum WebError {
    BadRequest(String),
    Validation(validator::ValidationErrors),
    NotFound(String),
    InternalServerError(String),
}

impl WebError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebError::BadRequest(_) | WebError::Validation(_) => StatusCode::BAD_REQUEST,
            WebError::NotFound(_) => StatusCode::NOT_FOUND,
            WebError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            WebError::BadRequest(_) => "BAD_REQUEST",
            WebError::Validation(_) => "VALIDATION_ERROR",
            WebError::NotFound(_) => "NOT_FOUND",
            WebError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    pub fn message(&self) -> String {
        match self {
            WebError::BadRequest(msg) => msg.clone(),
            WebError::Validation(_) => "Invalid query parameters".to_string(),
            WebError::NotFound(msg) => msg.clone(),
            WebError::InternalServerError(msg) => msg.clone(),
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound(format!("{} not found", resource.into()))
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::InternalServerError(msg.into())
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let details = match &self {
            WebError::Validation(errors) => serde_json::to_value(errors.field_errors()).ok(),
            _ => None,
        };
        let body = ApiResponse::<()>::error_with_details(self.error_code(), self.message(), details);
        (status, Json(body)).into_response()
    }
}

impl From<validator::ValidationErrors> for WebError {
    fn from(errors: validator::ValidationErrors) -> Self {
        WebError::Validation(errors)
    }
}

impl From<AggregationError> for WebError {
    fn from(err: AggregationError) -> Self {
        match err {
            AggregationError::InvalidOptions(msg) => WebError::BadRequest(msg),
            AggregationError::AllPlatformsFailed(msg) => WebError::InternalServerError(msg),
        }
    }
}

/// Ranked deal view derived from one aggregated search.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DealsView {
    pub success: bool,
    pub kind: DealKind,
    pub query: String,
    pub products: Vec<Product>,
    pub platform_results: BTreeMap<Platform, PlatformResult>,
    pub search_time: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DealsView {
    pub fn new(kind: DealKind, query: String, products: Vec<Product>, result: &AggregatedResult) -> Self {
        Self {
            success: result.success,
            kind,
            query,
            products,
            platform_results: result.platform_results.clone(),
            search_time: result.search_time,
            error: result.error.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub version: String,
    pub uptime_secs: u64,
    pub connectors: Vec<Platform>,
    pub cache: CacheStats,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CacheStats {
    pub search_entries: u64,
    pub deals_entries: u64,
}

impl HealthResponse {
    pub fn new(uptime_secs: u64, connectors: Vec<Platform>, cache: CacheStats) -> Self {
        // No connectors means every search fails, which is worth surfacing
        let status = if connectors.is_empty() { "degraded" } else { "healthy" };
        Self {
            status: status.to_string(),
            service: "deal-aggregator".to_string(),
            timestamp: chrono::Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_secs,
            connectors,
            cache,
        }
    }
}
