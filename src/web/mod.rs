use axum::{http::Method, middleware::from_fn, routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Notify;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::aggregator::Aggregator;
use crate::cache::ResultCache;
use crate::config::{AppConfig, ServerConfig};
use crate::ranking::RankingConfig;
use crate::utils::error::AppError;

pub mod handlers;
pub mod middleware;
pub mod responses;

pub use handlers::{DealParams, SearchParams};
pub use responses::*;

#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<Aggregator>,
    pub search_cache: ResultCache,
    pub deals_cache: ResultCache,
    pub search_ttl_secs: u64,
    pub deals_ttl_secs: u64,
    pub ranking: RankingConfig,
    pub default_deal_limit: usize,
    pub metrics: Option<PrometheusHandle>,
    pub metrics_endpoint: String,
    /// Whole-request budget enforced by the router; slower requests get 408.
    pub request_timeout: Duration,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(aggregator: Aggregator, config: &AppConfig, metrics: Option<PrometheusHandle>) -> Self {
        let cache = &config.cache;
        Self {
            aggregator: Arc::new(aggregator),
            search_cache: ResultCache::new(
                "search",
                Duration::from_secs(cache.search_ttl_secs),
                cache.max_entries,
            ),
            deals_cache: ResultCache::new(
                "deals",
                Duration::from_secs(cache.deals_ttl_secs),
                cache.max_entries,
            ),
            search_ttl_secs: cache.search_ttl_secs,
            deals_ttl_secs: cache.deals_ttl_secs,
            ranking: RankingConfig {
                review_count_offset: config.ranking.review_count_offset,
            },
            default_deal_limit: config.ranking.default_deal_limit,
            metrics: metrics.filter(|_| config.metrics.enabled),
            metrics_endpoint: config.metrics.endpoint.clone(),
            request_timeout: Duration::from_secs(config.server.request_timeout),
            started_at: Instant::now(),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let mut router = Router::new()
        // Health check
        .route("/health", get(handlers::health))
        // API routes
        .nest("/api/v1", api_routes());

    if state.metrics.is_some() {
        router = router.route(&state.metrics_endpoint, get(handlers::metrics));
    }

    let request_timeout = state.request_timeout;
    router
        .fallback(handlers::fallback)
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                        .on_response(DefaultOnResponse::new().level(Level::INFO)),
                )
                .layer(from_fn(middleware::request_logging))
                .layer(TimeoutLayer::new(request_timeout))
                .layer(CompressionLayer::new())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods([Method::GET, Method::OPTIONS]),
                ),
        )
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/platforms", get(handlers::list_platforms))
        .route("/search", get(handlers::search))
        .route("/deals", get(handlers::deals))
}

/// Bind and serve until ctrl-c.
///
/// After the signal, open connections get `shutdown_timeout` seconds to
/// drain before they are dropped.
pub async fn serve(state: AppState, config: &ServerConfig) -> Result<(), AppError> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {} ({})", addr, config.base_url);

    let signalled = Arc::new(Notify::new());
    let notify = Arc::clone(&signalled);
    let server = axum::serve(listener, create_router(state))
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            notify.notify_one();
        })
        .into_future();
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => result?,
        _ = signalled.notified() => {
            let grace = Duration::from_secs(config.shutdown_timeout);
            match tokio::time::timeout(grace, &mut server).await {
                Ok(result) => result?,
                Err(_) => tracing::warn!(
                    "Connections still open after {}s; shutting down anyway",
                    config.shutdown_timeout
                ),
            }
        }
    }

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
