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
struct AmazonSearchResponse {
    search_results: Option<Vec<AmazonItem>>,
}

#[derive(Debug, Deserialize)]
struct AmazonItem {
    asin: String,
    title: Option<String>,
    brand: Option<String>,
    price: Option<AmazonPrice>,
    list_price: Option<AmazonPrice>,
    rating: Option<f64>,
    ratings_total: Option<u32>,
    image: Option<String>,
    link: Option<String>,
    category: Option<String>,
    availability: Option<AmazonAvailability>,
}

#[derive(Debug, Deserialize)]
struct AmazonPrice {
    value: Decimal,
    currency: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AmazonAvailability {
    #[serde(rename = "type")]
    kind: Option<String>,
}

pub struct AmazonConnector {
    http: ConnectorHttp,
}

impl AmazonConnector {
    pub fn new(config: ConnectorConfig, timeout: Duration) -> Result<Self, AppError> {
        Ok(Self {
            http: ConnectorHttp::new(Platform::Amazon, config, timeout)?,
        })
    }

    fn to_new_product(item: AmazonItem) -> NewProduct {
        let in_stock = item
            .availability
            .and_then(|a| a.kind)
            .map(|kind| !kind.eq_ignore_ascii_case("out_of_stock"));

        let (price, currency) = match item.price {
            Some(price) => (Some(price.value), price.currency),
            None => (None, None),
        };

        NewProduct {
            id: item.asin,
            title: item.title.unwrap_or_default(),
            brand: item.brand,
            price,
            original_price: item.list_price.map(|p| p.value),
            currency,
            rating: item.rating,
            review_count: item.ratings_total,
            image_url: item.image,
            source_url: item.link,
            category: item.category,
            in_stock,
        }
    }
}

#[async_trait]
impl ConnectorPlugin for AmazonConnector {
    fn name(&self) -> &str {
        "Amazon"
    }

    fn platform(&self) -> Platform {
        Platform::Amazon
    }

    fn description(&self) -> &str {
        "Amazon product search via a keyword search API"
    }

    async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<NewProduct>, ConnectorError> {
        let api_key = self.http.api_key()?;
        let url = self.http.endpoint("/search");
        let max_results = options.max_results_per_platform.to_string();

        let response: AmazonSearchResponse = self
            .http
            .get_json(|client| {
                client.get(&url).query(&[
                    ("q", query),
                    ("api_key", api_key),
                    ("max_results", max_results.as_str()),
                ])
            })
            .await?;

        let items = response.search_results.ok_or_else(|| {
            ConnectorError::malformed(Platform::Amazon, "response is missing search_results")
        })?;

        Ok(items.into_iter().map(Self::to_new_product).collect())
    }
}
