use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod product;
pub mod search;

// Re-exports for convenience
pub use product::*;
pub use search::*;

/// One tag per supported marketplace connector.
///
/// Variants are declared alphabetically; the derived `Ord` is the merge
/// priority used by the aggregator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Amazon,
    #[serde(alias = "best_buy", alias = "best-buy")]
    BestBuy,
    Ebay,
    Walmart,
}

impl Platform {
    pub const ALL: [Platform; 4] = [
        Platform::Amazon,
        Platform::BestBuy,
        Platform::Ebay,
        Platform::Walmart,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Amazon => "amazon",
            Platform::BestBuy => "bestbuy",
            Platform::Ebay => "ebay",
            Platform::Walmart => "walmart",
        }
    }

    /// Parse a comma separated list of tags, dropping anything unrecognised.
    pub fn parse_list(raw: &str) -> Vec<Platform> {
        raw.split(',')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .filter_map(|tag| match tag.parse::<Platform>() {
                Ok(platform) => Some(platform),
                Err(e) => {
                    tracing::warn!("Ignoring platform filter: {}", e);
                    None
                }
            })
            .collect()
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "amazon" => Ok(Platform::Amazon),
            "bestbuy" | "best_buy" | "best-buy" => Ok(Platform::BestBuy),
            "ebay" => Ok(Platform::Ebay),
            "walmart" => Ok(Platform::Walmart),
            other => Err(format!("unknown platform '{}'", other)),
        }
    }
}
