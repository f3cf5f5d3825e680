use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;

use super::http::ConnectorHttp;
use crate::config::ConnectorConfig;
use crate::models::{NewProduct, Platform, SearchOptions};
use crate::plugins::traits::ConnectorPlugin;
use crate::utils::error::{AppError, ConnectorError};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EbaySearchResponse {
    // eBay omits the array entirely when nothing matched
    #[serde(default)]
    item_summaries: Vec<EbayItem>,
    total: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EbayItem {
    item_id: String,
    title: Option<String>,
    brand: Option<String>,
    price: Option<EbayAmount>,
    marketing_price: Option<EbayMarketingPrice>,
    image: Option<EbayImage>,
    item_web_url: Option<String>,
    categories: Option<Vec<EbayCategory>>,
}

#[derive(Debug, Deserialize)]
struct EbayAmount {
    value: Decimal,
    currency: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EbayMarketingPrice {
    original_price: Option<EbayAmount>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EbayImage {
    image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EbayCategory {
    category_name: String,
}

/// eBay Browse API connector. Authenticates with a bearer token.
pub struct EbayConnector {
    http: ConnectorHttp,
}

impl EbayConnector {
    pub fn new(config: ConnectorConfig, timeout: Duration) -> Result<Self, AppError> {
        Ok(Self {
            http: ConnectorHttp::new(Platform::Ebay, config, timeout)?,
        })
    }

    fn to_new_product(item: EbayItem) -> NewProduct {
        let (price, currency) = match item.price {
            Some(amount) => (Some(amount.value), amount.currency),
            None => (None, None),
        };

        NewProduct {
            id: item.item_id,
            title: item.title.unwrap_or_default(),
            brand: item.brand,
            price,
            original_price: item
                .marketing_price
                .and_then(|m| m.original_price)
                .map(|a| a.value),
            currency,
            // Browse search summaries carry no review data
            rating: None,
            review_count: None,
            image_url: item.image.and_then(|i| i.image_url),
            source_url: item.item_web_url,
            category: item
                .categories
                .and_then(|c| c.into_iter().next())
                .map(|c| c.category_name),
            in_stock: None,
        }
    }
}

#[async_trait]
impl ConnectorPlugin for EbayConnector {
    fn name(&self) -> &str {
        "eBay"
    }

    fn platform(&self) -> Platform {
        Platform::Ebay
    }

    fn description(&self) -> &str {
        "eBay listings via the Browse item summary search"
    }

    async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<NewProduct>, ConnectorError> {
        let token = self.http.api_key()?;
        let url = self.http.endpoint("/buy/browse/v1/item_summary/search");
        let limit = options.max_results_per_platform.to_string();

        let response: EbaySearchResponse = self
            .http
            .get_json(|client| {
                client
                    .get(&url)
                    .bearer_auth(token)
                    .query(&[("q", query), ("limit", limit.as_str())])
            })
            .await?;

        tracing::debug!(
            "eBay returned {} of {} matching items",
            response.item_summaries.len(),
            response.total.unwrap_or_default()
        );

        Ok(response
            .item_summaries
            .into_iter()
            .map(Self::to_new_product)
            .collect())
    }
}
