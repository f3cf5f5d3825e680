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
struct BestBuyResponse {
    products: Option<Vec<BestBuyProduct>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BestBuyProduct {
    sku: serde_json::Value,
    name: Option<String>,
    manufacturer: Option<String>,
    sale_price: Option<Decimal>,
    regular_price: Option<Decimal>,
    customer_review_average: Option<f64>,
    customer_review_count: Option<u32>,
    image: Option<String>,
    url: Option<String>,
    category_path: Option<Vec<BestBuyCategory>>,
    online_availability: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct BestBuyCategory {
    name: String,
}

/// Best Buy products API connector.
pub struct BestBuyConnector {
    http: ConnectorHttp,
}

impl BestBuyConnector {
    pub fn new(config: ConnectorConfig, timeout: Duration) -> Result<Self, AppError> {
        Ok(Self {
            http: ConnectorHttp::new(Platform::BestBuy, config, timeout)?,
        })
    }

    fn to_new_product(item: BestBuyProduct) -> NewProduct {
        // SKUs arrive as numbers from the live API and as strings from some mirrors
        let id = match item.sku {
            serde_json::Value::String(sku) => sku,
            serde_json::Value::Number(sku) => sku.to_string(),
            _ => String::new(),
        };

        // The most specific category is the last element of the path
        let category = item
            .category_path
            .and_then(|path| path.into_iter().last())
            .map(|c| c.name);

        NewProduct {
            id,
            title: item.name.unwrap_or_default(),
            brand: item.manufacturer,
            price: item.sale_price,
            original_price: item.regular_price,
            currency: None,
            rating: item.customer_review_average,
            review_count: item.customer_review_count,
            image_url: item.image,
            source_url: item.url,
            category,
            in_stock: item.online_availability,
        }
    }
}

#[async_trait]
impl ConnectorPlugin for BestBuyConnector {
    fn name(&self) -> &str {
        "Best Buy"
    }

    fn platform(&self) -> Platform {
        Platform::BestBuy
    }

    fn description(&self) -> &str {
        "Best Buy catalog search via the products API"
    }

    async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<NewProduct>, ConnectorError> {
        let api_key = self.http.api_key()?;
        let url = self.http.endpoint("/v1/products");
        let page_size = options.max_results_per_platform.to_string();

        let response: BestBuyResponse = self
            .http
            .get_json(|client| {
                client.get(&url).query(&[
                    ("search", query),
                    ("apiKey", api_key),
                    ("pageSize", page_size.as_str()),
                    ("format", "json"),
                ])
            })
            .await?;

        let products = response.products.ok_or_else(|| {
            ConnectorError::malformed(Platform::BestBuy, "response is missing products")
        })?;

        Ok(products.into_iter().map(Self::to_new_product).collect())
    }
}
