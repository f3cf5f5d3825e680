use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::Platform;

pub const DEFAULT_CURRENCY: &str = "usd";
pub const MAX_RATING: f64 = 5.0;

/// Canonical listing produced by every connector.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub title: String,
    pub brand: String,

    // Pricing
    pub price: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_price: Option<Decimal>,
    pub currency: String,

    // Reviews (absent means unrated, not rated zero)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_count: Option<u32>,

    pub image_url: String,
    pub source_url: String,
    pub platform: Platform,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub in_stock: bool,

    pub fetched_at: DateTime<Utc>,
}

/// Loosely populated record a connector builds from its backend's raw shape.
#[derive(Debug, Clone, Default)]
pub struct NewProduct {
    pub id: String,
    pub title: String,
    pub brand: Option<String>,
    pub price: Option<Decimal>,
    pub original_price: Option<Decimal>,
    pub currency: Option<String>,
    pub rating: Option<f64>,
    pub review_count: Option<u32>,
    pub image_url: Option<String>,
    pub source_url: Option<String>,
    pub category: Option<String>,
    pub in_stock: Option<bool>,
}

impl Product {
    /// Normalize a raw connector record into the canonical shape.
    ///
    /// Returns `None` for records that cannot be represented: missing id,
    /// missing title, or a missing or negative price.
    pub fn normalize(platform: Platform, raw: NewProduct) -> Option<Self> {
        let id = raw.id.trim();
        let title = raw.title.trim();
        if id.is_empty() || title.is_empty() {
            tracing::debug!("Skipping {} record without id or title", platform);
            return None;
        }

        let price = match raw.price {
            Some(price) if !price.is_sign_negative() => price,
            _ => {
                tracing::debug!("Skipping {} record {} without a usable price", platform, id);
                return None;
            }
        };

        // A list price below the selling price is bad upstream data, not a discount
        let original_price = raw.original_price.filter(|original| *original >= price);

        let rating = raw
            .rating
            .filter(|r| r.is_finite())
            .map(|r| r.clamp(0.0, MAX_RATING));

        let currency = raw
            .currency
            .map(|c| c.trim().to_lowercase())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());

        Some(Self {
            id: id.to_string(),
            title: title.to_string(),
            brand: trimmed(raw.brand),
            price,
            original_price,
            currency,
            rating,
            review_count: raw.review_count,
            image_url: trimmed(raw.image_url),
            source_url: trimmed(raw.source_url),
            platform,
            category: raw.category.map(|c| c.trim().to_string()).filter(|c| !c.is_empty()),
            in_stock: raw.in_stock.unwrap_or(true),
            fetched_at: Utc::now(),
        })
    }

    /// Absolute discount, when a list price above the selling price is known.
    pub fn discount_amount(&self) -> Option<Decimal> {
        self.original_price
            .filter(|original| *original > self.price)
            .map(|original| original - self.price)
    }

    /// Discount as a fraction of the list price (0.25 = 25% off).
    pub fn discount_fraction(&self) -> Option<Decimal> {
        let original = self.original_price?;
        let amount = self.discount_amount()?;
        if original.is_zero() {
            return None;
        }
        Some(amount / original)
    }

    pub fn matches_category(&self, wanted: &str) -> bool {
        match &self.category {
            Some(category) => category.to_lowercase().contains(&wanted.to_lowercase()),
            None => false,
        }
    }
}

fn trimmed(value: Option<String>) -> String {
    value.map(|v| v.trim().to_string()).unwrap_or_default()
}
