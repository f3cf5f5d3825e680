use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use crate::models::{Platform, Product};
use crate::utils::error::ConnectorError;

pub const DEFAULT_MAX_RESULTS_PER_PLATFORM: usize = 25;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    Price,
    /// Keep merge order.
    #[default]
    Relevance,
    Rating,
}

impl FromStr for SortBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "price" => Ok(SortBy::Price),
            "relevance" | "" => Ok(SortBy::Relevance),
            "rating" => Ok(SortBy::Rating),
            other => Err(format!("unknown sort order '{}'", other)),
        }
    }
}

impl fmt::Display for SortBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SortBy::Price => "price",
            SortBy::Relevance => "relevance",
            SortBy::Rating => "rating",
        };
        f.write_str(name)
    }
}

/// Inclusive price bounds. A missing `max` means unbounded.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct PriceRange {
    pub min: Decimal,
    pub max: Option<Decimal>,
}

impl PriceRange {
    pub fn new(min: Option<Decimal>, max: Option<Decimal>) -> Self {
        Self {
            min: min.unwrap_or_default(),
            max,
        }
    }

    pub fn contains(&self, price: Decimal) -> bool {
        price >= self.min && self.max.is_none_or(|max| price <= max)
    }

    /// Clamp a negative minimum to zero and swap inverted bounds.
    pub fn normalized(&self) -> Self {
        let min = self.min.max(Decimal::ZERO);
        match self.max {
            Some(max) if max < min => Self {
                min: max.max(Decimal::ZERO),
                max: Some(min),
            },
            max => Self { min, max },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct SearchOptions {
    /// Empty selects every registered connector.
    #[serde(default)]
    pub platforms: BTreeSet<Platform>,
    #[serde(default = "default_max_results")]
    pub max_results_per_platform: usize,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub sort_by: SortBy,
    #[serde(default)]
    pub price_range: PriceRange,
}

fn default_max_results() -> usize {
    DEFAULT_MAX_RESULTS_PER_PLATFORM
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            platforms: BTreeSet::new(),
            max_results_per_platform: DEFAULT_MAX_RESULTS_PER_PLATFORM,
            category: None,
            sort_by: SortBy::Relevance,
            price_range: PriceRange::default(),
        }
    }
}

impl SearchOptions {
    pub fn with_platforms(mut self, platforms: impl IntoIterator<Item = Platform>) -> Self {
        self.platforms = platforms.into_iter().collect();
        self
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results_per_platform = max_results;
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_sort_by(mut self, sort_by: SortBy) -> Self {
        self.sort_by = sort_by;
        self
    }

    pub fn with_price_range(mut self, min: Option<Decimal>, max: Option<Decimal>) -> Self {
        self.price_range = PriceRange::new(min, max);
        self
    }

    /// Canonical form used for execution and cache keys. Recoverable bad
    /// values are defaulted instead of rejected.
    pub fn normalized(&self, default_max_results: usize, max_results_cap: usize) -> Self {
        let max_results_per_platform = match self.max_results_per_platform {
            0 => default_max_results,
            n => n.min(max_results_cap),
        };

        let category = self
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_lowercase);

        Self {
            platforms: self.platforms.clone(),
            max_results_per_platform,
            category,
            sort_by: self.sort_by,
            price_range: self.price_range.normalized(),
        }
    }

    pub fn accepts(&self, product: &Product) -> bool {
        if !self.price_range.contains(product.price) {
            return false;
        }
        match &self.category {
            Some(category) => product.matches_category(category),
            None => true,
        }
    }
}

/// Per-connector outcome of one aggregation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlatformResult {
    pub count: usize,
    pub elapsed_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ConnectorError>,
}

impl PlatformResult {
    pub fn succeeded(count: usize, elapsed_ms: u64) -> Self {
        Self {
            count,
            elapsed_ms,
            error: None,
        }
    }

    pub fn failed(error: ConnectorError, elapsed_ms: u64) -> Self {
        Self {
            count: 0,
            elapsed_ms,
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedResult {
    pub success: bool,
    pub products: Vec<Product>,
    pub platform_results: BTreeMap<Platform, PlatformResult>,
    /// Wall-clock milliseconds for the whole fan-out.
    pub search_time: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AggregatedResult {
    pub fn failure(
        error: impl Into<String>,
        platform_results: BTreeMap<Platform, PlatformResult>,
        search_time: u64,
    ) -> Self {
        Self {
            success: false,
            products: Vec::new(),
            platform_results,
            search_time,
            error: Some(error.into()),
        }
    }

    pub fn failed_platforms(&self) -> Vec<Platform> {
        self.platform_results
            .iter()
            .filter(|(_, result)| result.error.is_some())
            .map(|(platform, _)| *platform)
            .collect()
    }
}
