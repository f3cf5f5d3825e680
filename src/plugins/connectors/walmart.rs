use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use super::http::ConnectorHttp;
use crate::config::ConnectorConfig;
use crate::models::{NewProduct, Platform, SearchOptions};
use crate::plugins::traits::ConnectorPlugin;
use crate::utils::error::{AppError, ConnectorError};
use crate::utils::price::{FlexibleAmount, PriceParser};

const CONSUMER_ID_HEADER: &str = "WM_CONSUMER.ID";

#[derive(Debug, Deserialize)]
struct WalmartSearchResponse {
    items: Option<Vec<WalmartItem>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WalmartItem {
    item_id: serde_json::Value,
    name: Option<String>,
    brand_name: Option<String>,
    sale_price: Option<FlexibleAmount>,
    msrp: Option<FlexibleAmount>,
    customer_rating: Option<FlexibleAmount>,
    num_reviews: Option<u32>,
    thumbnail_image: Option<String>,
    product_url: Option<String>,
    category_path: Option<String>,
    stock: Option<String>,
}

/// Walmart affiliate search connector.
///
/// Walmart mixes numeric and display-string amounts (`"$1,299.99"`), and
/// ratings come back as strings, so those fields go through [`PriceParser`].
pub struct WalmartConnector {
    http: ConnectorHttp,
    parser: PriceParser,
}

impl WalmartConnector {
    pub fn new(config: ConnectorConfig, timeout: Duration) -> Result<Self, AppError> {
        Ok(Self {
            http: ConnectorHttp::new(Platform::Walmart, config, timeout)?,
            parser: PriceParser::new(),
        })
    }

    fn to_new_product(&self, item: WalmartItem) -> NewProduct {
        let id = match item.item_id {
            serde_json::Value::String(id) => id,
            serde_json::Value::Number(id) => id.to_string(),
            _ => String::new(),
        };

        // categoryPath is slash separated, most specific last
        let category = item
            .category_path
            .as_deref()
            .and_then(|path| path.rsplit('/').next())
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string);

        let in_stock = item.stock.map(|stock| {
            !matches!(
                stock.to_ascii_lowercase().as_str(),
                "not available" | "out of stock"
            )
        });

        NewProduct {
            id,
            title: item.name.unwrap_or_default(),
            brand: item.brand_name,
            price: item.sale_price.and_then(|p| p.to_decimal(&self.parser)),
            original_price: item.msrp.and_then(|p| p.to_decimal(&self.parser)),
            currency: None,
            rating: item.customer_rating.and_then(|r| r.to_f64()),
            review_count: item.num_reviews,
            image_url: item.thumbnail_image,
            source_url: item.product_url,
            category,
            in_stock,
        }
    }
}

#[async_trait]
impl ConnectorPlugin for WalmartConnector {
    fn name(&self) -> &str {
        "Walmart"
    }

    fn platform(&self) -> Platform {
        Platform::Walmart
    }

    fn description(&self) -> &str {
        "Walmart catalog search via the affiliate search API"
    }

    async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<NewProduct>, ConnectorError> {
        let consumer_id = self.http.api_key()?;
        let url = self.http.endpoint("/v1/search");
        let num_items = options.max_results_per_platform.to_string();

        let response: WalmartSearchResponse = self
            .http
            .get_json(|client| {
                client
                    .get(&url)
                    .header(CONSUMER_ID_HEADER, consumer_id)
                    .query(&[("query", query), ("numItems", num_items.as_str())])
            })
            .await?;

        let items = response.items.ok_or_else(|| {
            ConnectorError::malformed(Platform::Walmart, "response is missing items")
        })?;

        Ok(items
            .into_iter()
            .map(|item| self.to_new_product(item))
            .collect())
    }
}
