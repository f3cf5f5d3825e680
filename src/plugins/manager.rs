use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use super::connectors::{AmazonConnector, BestBuyConnector, EbayConnector, WalmartConnector};
use super::traits::ConnectorPlugin;
use crate::config::ConnectorsConfig;
use crate::models::Platform;
use crate::utils::error::AppError;

pub type ConnectorHandle = Arc<dyn ConnectorPlugin>;

/// Registered connectors keyed by platform.
///
/// Iteration order follows `Platform`'s ordering, which is also the order
/// the aggregator merges results in.
#[derive(Clone)]
pub struct ConnectorRegistry {
    connectors: Arc<RwLock<BTreeMap<Platform, ConnectorHandle>>>,
}

impl ConnectorRegistry {
    pub fn new() -> Self {
        Self {
            connectors: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    /// Initialize and register a connector, replacing any previous one for
    /// the same platform.
    pub async fn register_connector(&self, connector: ConnectorHandle) -> Result<(), AppError> {
        let platform = connector.platform();
        connector.initialize().await.map_err(|e| AppError::Plugin {
            platform: platform.to_string(),
            message: format!("failed to initialize connector: {}", e),
        })?;

        let mut connectors = self.connectors.write().await;
        if connectors.insert(platform, connector).is_some() {
            tracing::debug!("Replaced existing {} connector", platform);
        }
        Ok(())
    }

    pub async fn has_connector(&self, platform: Platform) -> bool {
        let connectors = self.connectors.read().await;
        connectors.contains_key(&platform)
    }

    pub async fn list_platforms(&self) -> Vec<Platform> {
        let connectors = self.connectors.read().await;
        connectors.keys().copied().collect()
    }

    /// Connectors for the requested platforms, in merge order.
    ///
    /// An empty selection means every registered connector. Selected
    /// platforms without a connector are skipped.
    pub async fn resolve(&self, platforms: &BTreeSet<Platform>) -> Vec<(Platform, ConnectorHandle)> {
        let connectors = self.connectors.read().await;
        if platforms.is_empty() {
            return connectors
                .iter()
                .map(|(platform, connector)| (*platform, Arc::clone(connector)))
                .collect();
        }

        platforms
            .iter()
            .filter_map(|platform| match connectors.get(platform) {
                Some(connector) => Some((*platform, Arc::clone(connector))),
                None => {
                    tracing::warn!("No connector registered for requested platform {}", platform);
                    None
                }
            })
            .collect()
    }

    /// Register a connector for every enabled platform in `config`.
    pub async fn initialize_default_connectors(
        &self,
        config: &ConnectorsConfig,
        timeout: Duration,
    ) -> Result<(), AppError> {
        for platform in Platform::ALL {
            let connector_config = config.for_platform(platform);
            if !connector_config.enabled {
                tracing::info!("Connector {} is disabled", platform);
                continue;
            }

            let config = connector_config.clone();
            let connector: ConnectorHandle = match platform {
                Platform::Amazon => Arc::new(AmazonConnector::new(config, timeout)?),
                Platform::BestBuy => Arc::new(BestBuyConnector::new(config, timeout)?),
                Platform::Ebay => Arc::new(EbayConnector::new(config, timeout)?),
                Platform::Walmart => Arc::new(WalmartConnector::new(config, timeout)?),
            };
            self.register_connector(connector).await?;
            tracing::info!("Registered {} connector", platform);
        }

        Ok(())
    }

    pub async fn shutdown(&self) -> Result<(), AppError> {
        let mut connectors = self.connectors.write().await;
        while let Some((platform, connector)) = connectors.pop_first() {
            if let Err(e) = connector.shutdown().await {
                tracing::warn!("Error shutting down {} connector: {}", platform, e);
            }
        }
        Ok(())
    }
}

impl Default for ConnectorRegistry {
    fn default() -> Self {
        Self::new()
    }
}
