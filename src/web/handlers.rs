use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use super::{ApiResponse, AppState, CacheStats, DealsView, HealthResponse, WebError};
use crate::aggregator::Aggregator;
use crate::cache::{CacheKey, ResultCache};
use crate::models::{AggregatedResult, Platform, SearchOptions, SortBy};
use crate::ranking::DealKind;

/// Query string shared by the search and deals endpoints.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct SearchParams {
    #[serde(default)]
    #[validate(length(min = 1, max = 200, message = "q must be between 1 and 200 characters"))]
    pub q: String,
    pub platforms: Option<String>,
    pub category: Option<String>,
    pub max_results: Option<usize>,
    pub sort_by: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
}

impl SearchParams {
    /// Options as requested. Unknown platform tags and sort orders are
    /// dropped rather than rejected.
    pub fn to_options(&self) -> SearchOptions {
        let mut options = SearchOptions::default()
            .with_max_results(self.max_results.unwrap_or(0))
            .with_price_range(self.min_price, self.max_price);

        if let Some(raw) = &self.platforms {
            options = options.with_platforms(Platform::parse_list(raw));
        }
        if let Some(category) = &self.category {
            options = options.with_category(category.clone());
        }
        if let Some(raw) = &self.sort_by {
            match raw.parse::<SortBy>() {
                Ok(sort_by) => options = options.with_sort_by(sort_by),
                Err(e) => tracing::warn!("Ignoring sort order: {}", e),
            }
        }

        options
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct DealParams {
    pub kind: Option<String>,
    #[validate(range(min = 1, max = 100, message = "limit must be between 1 and 100"))]
    pub limit: Option<usize>,
}

impl AppState {
    async fn cached_search(
        &self,
        cache: &ResultCache,
        query: &str,
        options: SearchOptions,
    ) -> Arc<AggregatedResult> {
        let key = CacheKey::new(query, &options);
        let aggregator = Arc::clone(&self.aggregator);
        let query = CacheKey::normalize_query(query);
        cache
            .get_or_compute(key, move || async move { aggregator.search(&query, &options).await })
            .await
    }
}

fn cacheable_json<T: Serialize>(succeeded: bool, max_age_secs: u64, body: &T) -> Response {
    if succeeded {
        (
            StatusCode::OK,
            [(header::CACHE_CONTROL, format!("public, max-age={}", max_age_secs))],
            Json(body),
        )
            .into_response()
    } else {
        // Every connector failed; the body still carries the per-platform errors
        (
            StatusCode::BAD_GATEWAY,
            [(header::CACHE_CONTROL, "no-store".to_string())],
            Json(body),
        )
            .into_response()
    }
}

pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Response, WebError> {
    params.validate()?;
    let query = Aggregator::validate_query(&params.q)?;
    let options = state.aggregator.normalize_options(&params.to_options());

    tracing::debug!("Search request: q='{}', options={:?}", query, options);
    let result = state.cached_search(&state.search_cache, &query, options).await;

    Ok(cacheable_json(result.success, state.search_ttl_secs, &*result))
}

pub async fn deals(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
    Query(deal): Query<DealParams>,
) -> Result<Response, WebError> {
    params.validate()?;
    deal.validate()?;
    let query = Aggregator::validate_query(&params.q)?;

    let kind = match deal.kind.as_deref() {
        Some(raw) => raw.parse::<DealKind>().map_err(WebError::bad_request)?,
        None => DealKind::BestPrice,
    };
    let limit = deal.limit.unwrap_or(state.default_deal_limit);
    let options = state.aggregator.normalize_options(&params.to_options());

    tracing::debug!("Deals request: kind={}, limit={}, q='{}'", kind, limit, query);
    let result = state.cached_search(&state.deals_cache, &query, options).await;
    let products = kind.rank(&result.products, limit, &state.ranking);
    let view = DealsView::new(kind, query, products, &result);

    Ok(cacheable_json(view.success, state.deals_ttl_secs, &view))
}

pub async fn list_platforms(State(state): State<AppState>) -> Json<ApiResponse<Vec<Platform>>> {
    let platforms = state.aggregator.registry().list_platforms().await;
    Json(ApiResponse::success(platforms))
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let connectors = state.aggregator.registry().list_platforms().await;
    let cache = CacheStats {
        search_entries: state.search_cache.entry_count().await,
        deals_entries: state.deals_cache.entry_count().await,
    };
    Json(HealthResponse::new(
        state.started_at.elapsed().as_secs(),
        connectors,
        cache,
    ))
}

pub async fn metrics(State(state): State<AppState>) -> Result<String, WebError> {
    state
        .metrics
        .as_ref()
        .map(|handle| handle.render())
        .ok_or_else(|| WebError::not_found("Metrics"))
}

pub async fn fallback() -> WebError {
    WebError::not_found("Route")
}
