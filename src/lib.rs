pub mod aggregator;
pub mod cache;
pub mod config;
pub mod models;
pub mod plugins;
pub mod ranking;
pub mod utils;
pub mod web;

// Re-export commonly used types
pub use aggregator::Aggregator;
pub use cache::{CacheKey, ResultCache};
pub use config::AppConfig;
pub use models::{AggregatedResult, Platform, Product, SearchOptions, SortBy};
pub use plugins::{ConnectorPlugin, ConnectorRegistry};
pub use ranking::{DealKind, RankingConfig};
pub use utils::error::{AggregationError, AppError, ConnectorError};

pub type Result<T> = std::result::Result<T, AppError>;
