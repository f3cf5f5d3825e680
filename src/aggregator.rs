use futures::FutureExt;
use std::any::Any;
use std::collections::{BTreeMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;

use crate::config::AggregatorConfig;
use crate::models::{AggregatedResult, Platform, PlatformResult, Product, SearchOptions};
use crate::plugins::manager::ConnectorHandle;
use crate::plugins::ConnectorRegistry;
use crate::ranking;
use crate::utils::error::{AggregationError, ConnectorError};

struct BranchOutcome {
    platform: Platform,
    result: Result<Vec<Product>, ConnectorError>,
    elapsed_ms: u64,
}

/// Fans one search out to every selected connector and merges the answers.
///
/// Branches run as independent tasks. A branch that fails, panics, or is
/// still running at the request deadline only affects its own entry in
/// `platform_results`; the merge order is the platform order, never the
/// completion order.
#[derive(Clone)]
pub struct Aggregator {
    registry: ConnectorRegistry,
    config: AggregatorConfig,
}

impl Aggregator {
    pub fn new(registry: ConnectorRegistry, config: AggregatorConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &ConnectorRegistry {
        &self.registry
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    pub fn validate_query(query: &str) -> Result<String, AggregationError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AggregationError::InvalidOptions(
                "search query must not be empty".to_string(),
            ));
        }
        Ok(query.to_string())
    }

    /// Options as they will actually be executed (and cached under).
    pub fn normalize_options(&self, options: &SearchOptions) -> SearchOptions {
        options.normalized(self.config.default_max_results, self.config.max_results_cap)
    }

    pub async fn search(&self, query: &str, options: &SearchOptions) -> AggregatedResult {
        let started = Instant::now();

        let query = match Self::validate_query(query) {
            Ok(query) => query,
            Err(e) => {
                tracing::warn!("Rejected search: {}", e);
                return AggregatedResult::failure(e.to_string(), BTreeMap::new(), elapsed_ms(started));
            }
        };
        let options = self.normalize_options(options);

        let connectors = self.registry.resolve(&options.platforms).await;
        if connectors.is_empty() {
            let error = AggregationError::AllPlatformsFailed(
                "no connector registered for the requested platforms".to_string(),
            );
            tracing::warn!("Search '{}' has no connectors to run", query);
            return AggregatedResult::failure(error.to_string(), BTreeMap::new(), elapsed_ms(started));
        }

        let selected: Vec<Platform> = connectors.iter().map(|(platform, _)| *platform).collect();
        let mut outcomes = self.run_branches(&query, &options, connectors).await;

        let mut platform_results = BTreeMap::new();
        let mut products = Vec::new();
        let mut seen = HashSet::new();
        let mut failures = Vec::new();

        for platform in selected {
            let (result, elapsed) = match outcomes.remove(&platform) {
                Some(branch) => (branch.result, branch.elapsed_ms),
                None => (
                    Err(ConnectorError::timeout(platform, "request deadline elapsed")),
                    self.config.request_timeout_ms,
                ),
            };

            match result {
                Ok(mut batch) => {
                    batch.truncate(options.max_results_per_platform);
                    platform_results.insert(platform, PlatformResult::succeeded(batch.len(), elapsed));
                    products.extend(
                        batch
                            .into_iter()
                            .filter(|p| seen.insert((p.platform, p.id.clone()))),
                    );
                }
                Err(error) => {
                    tracing::warn!("Search '{}' failed on {}", query, error);
                    failures.push(error.to_string());
                    platform_results.insert(platform, PlatformResult::failed(error, elapsed));
                }
            }
        }

        let search_time = elapsed_ms(started);
        if failures.len() == platform_results.len() {
            let error = AggregationError::AllPlatformsFailed(failures.join("; "));
            tracing::info!(
                query = %query,
                platforms = platform_results.len(),
                success = false,
                elapsed_ms = search_time,
                "Aggregated search failed"
            );
            return AggregatedResult::failure(error.to_string(), platform_results, search_time);
        }

        products.retain(|p| options.accepts(p));
        ranking::sort_products(&mut products, options.sort_by);

        tracing::info!(
            query = %query,
            platforms = platform_results.len(),
            success = true,
            products = products.len(),
            elapsed_ms = search_time,
            "Aggregated search complete"
        );

        AggregatedResult {
            success: true,
            products,
            platform_results,
            search_time,
            error: None,
        }
    }

    /// Run every branch and collect whatever finished before the deadline.
    async fn run_branches(
        &self,
        query: &str,
        options: &SearchOptions,
        connectors: Vec<(Platform, ConnectorHandle)>,
    ) -> BTreeMap<Platform, BranchOutcome> {
        let query: Arc<str> = Arc::from(query);
        let options = Arc::new(options.clone());
        let connector_timeout = self.config.connector_timeout();

        let mut tasks = JoinSet::new();
        for (platform, connector) in connectors {
            let query = Arc::clone(&query);
            let options = Arc::clone(&options);
            tasks.spawn(async move {
                let started = Instant::now();
                metrics::counter!("connector_requests_total", "platform" => platform.as_str()).increment(1);

                let result = AssertUnwindSafe(connector.execute(&query, &options, connector_timeout))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|panic| {
                        Err(ConnectorError::network(
                            platform,
                            format!("connector panicked: {}", panic_message(panic.as_ref())),
                        ))
                    });

                let elapsed = elapsed_ms(started);
                metrics::histogram!("connector_latency_ms", "platform" => platform.as_str())
                    .record(elapsed as f64);
                if let Err(e) = &result {
                    metrics::counter!(
                        "connector_errors_total",
                        "platform" => platform.as_str(),
                        "kind" => e.kind()
                    )
                    .increment(1);
                }

                BranchOutcome {
                    platform,
                    result,
                    elapsed_ms: elapsed,
                }
            });
        }

        let deadline = tokio::time::Instant::now() + self.config.request_timeout();
        let mut outcomes = BTreeMap::new();
        loop {
            match tokio::time::timeout_at(deadline, tasks.join_next()).await {
                Ok(Some(Ok(branch))) => {
                    outcomes.insert(branch.platform, branch);
                }
                Ok(Some(Err(e))) => {
                    tracing::error!("Connector task failed to complete: {}", e);
                }
                Ok(None) => break,
                Err(_) => {
                    tracing::warn!(
                        "Request deadline elapsed with {} connector(s) still pending",
                        tasks.len()
                    );
                    tasks.abort_all();
                    break;
                }
            }
        }

        outcomes
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    duration_ms(started.elapsed())
}

/// Whole milliseconds, rounded up so any measurable work reports at least 1.
fn duration_ms(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_nanos().div_ceil(1_000_000)).unwrap_or(u64::MAX)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
