use async_trait::async_trait;
use std::collections::HashSet;
use std::time::Duration;

use crate::models::{NewProduct, Platform, Product, SearchOptions};
use crate::utils::error::ConnectorError;

/// Adapter for one external marketplace search backend.
///
/// Implementors only shape the outbound request and map the backend's raw
/// records into [`NewProduct`]. Timeouts, normalization and truncation are
/// handled by [`ConnectorPlugin::execute`].
#[async_trait]
pub trait ConnectorPlugin: Send + Sync {
    /// Plugin metadata
    fn name(&self) -> &str;
    fn platform(&self) -> Platform;
    fn description(&self) -> &str;

    /// One outbound search call against the backend.
    async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<NewProduct>, ConnectorError>;

    /// Plugin lifecycle
    async fn initialize(&self) -> Result<(), ConnectorError> {
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), ConnectorError> {
        Ok(())
    }

    /// Run a search bounded by `timeout` and return canonical products.
    ///
    /// Always resolves within `timeout`, either with a (possibly empty)
    /// product list or a typed error.
    async fn execute(
        &self,
        query: &str,
        options: &SearchOptions,
        timeout: Duration,
    ) -> Result<Vec<Product>, ConnectorError> {
        let platform = self.platform();
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let raw = match tokio::time::timeout(timeout, self.search(query, options)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(ConnectorError::timeout(
                    platform,
                    format!("no response within {}ms", timeout.as_millis()),
                ));
            }
        };

        Ok(normalize_batch(platform, raw, options.max_results_per_platform))
    }
}

/// Normalize one backend batch: drop unusable records, keep the first
/// occurrence of each id, and cap the batch size.
pub fn normalize_batch(platform: Platform, raw: Vec<NewProduct>, limit: usize) -> Vec<Product> {
    let mut seen = HashSet::new();
    raw.into_iter()
        .filter_map(|record| Product::normalize(platform, record))
        .filter(|product| seen.insert(product.id.clone()))
        .take(limit)
        .collect()
}
