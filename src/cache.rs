use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use moka::future::Cache;
use moka::policy::EvictionPolicy;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::models::{AggregatedResult, SearchOptions};

/// Stable identity of one `(query, options)` pair.
///
/// Options must already be normalized; the set-typed fields serialize in a
/// fixed order, so equivalent selections hash identically.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// The query form that is hashed. Callers sharing an entry must also
    /// search with this form.
    pub fn normalize_query(query: &str) -> String {
        query.trim().to_lowercase()
    }

    pub fn new(query: &str, options: &SearchOptions) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(Self::normalize_query(query).as_bytes());
        hasher.update([0u8]);
        hasher.update(serde_json::to_vec(options).unwrap_or_default());
        Self(format!("{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

type InFlight = Shared<BoxFuture<'static, Arc<AggregatedResult>>>;

/// Read-through, single-flight cache of aggregated results.
///
/// Stored entries expire after the TTL or are evicted least-recently-used
/// once `max_entries` is reached. Only successful results are stored.
#[derive(Clone)]
pub struct ResultCache {
    name: &'static str,
    entries: Cache<CacheKey, Arc<AggregatedResult>>,
    in_flight: Arc<Mutex<HashMap<CacheKey, InFlight>>>,
}

impl ResultCache {
    pub fn new(name: &'static str, ttl: Duration, max_entries: u64) -> Self {
        let entries = Cache::builder()
            .name(name)
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .eviction_policy(EvictionPolicy::lru())
            .build();

        Self {
            name,
            entries,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub async fn get(&self, key: &CacheKey) -> Option<Arc<AggregatedResult>> {
        self.entries.get(key).await
    }

    /// Return the cached result for `key`, joining an identical computation
    /// already in flight, or start `compute` as the single upstream call.
    ///
    /// The computation runs on its own task: dropping the returned future
    /// withdraws this caller only, and other waiters still get the result.
    pub async fn get_or_compute<F, Fut>(&self, key: CacheKey, compute: F) -> Arc<AggregatedResult>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = AggregatedResult> + Send + 'static,
    {
        if let Some(hit) = self.entries.get(&key).await {
            tracing::debug!("{} cache hit for {}", self.name, key);
            metrics::counter!("cache_hits_total", "cache" => self.name).increment(1);
            return hit;
        }

        let pending = {
            let mut in_flight = self.in_flight.lock().await;

            // A computation may have finished between the lookup and the lock
            if let Some(hit) = self.entries.get(&key).await {
                metrics::counter!("cache_hits_total", "cache" => self.name).increment(1);
                return hit;
            }

            match in_flight.get(&key) {
                Some(pending) => {
                    tracing::debug!("{} cache joining in-flight search for {}", self.name, key);
                    pending.clone()
                }
                None => {
                    metrics::counter!("cache_misses_total", "cache" => self.name).increment(1);
                    let pending = self.spawn_compute(key.clone(), compute());
                    in_flight.insert(key, pending.clone());
                    pending
                }
            }
        };

        pending.await
    }

    fn spawn_compute<Fut>(&self, key: CacheKey, compute: Fut) -> InFlight
    where
        Fut: Future<Output = AggregatedResult> + Send + 'static,
    {
        let entries = self.entries.clone();
        let in_flight = Arc::clone(&self.in_flight);
        let name = self.name;

        let handle = tokio::spawn(async move {
            let result = Arc::new(compute.await);
            if result.success {
                entries.insert(key.clone(), Arc::clone(&result)).await;
            } else {
                tracing::debug!("{} cache not storing failed result for {}", name, key);
            }
            // Store before releasing the in-flight slot so later callers see one or the other
            in_flight.lock().await.remove(&key);
            result
        });

        async move {
            match handle.await {
                Ok(result) => result,
                Err(e) => {
                    tracing::error!("{} cache computation task failed: {}", name, e);
                    Arc::new(AggregatedResult::failure(
                        format!("search task failed: {}", e),
                        BTreeMap::new(),
                        0,
                    ))
                }
            }
        }
        .boxed()
        .shared()
    }

    pub fn invalidate_all(&self) {
        self.entries.invalidate_all();
    }

    pub async fn entry_count(&self) -> u64 {
        self.entries.run_pending_tasks().await;
        self.entries.entry_count()
    }
}
