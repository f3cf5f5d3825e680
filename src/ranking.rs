//! Deal views and sort orders over an already merged product list.
//!
//! Every function here is pure: it takes a borrowed slice, returns a new
//! ordered vector, and breaks ties on `id` (then platform) so equal scores
//! always come out in the same order.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::models::{Product, SortBy};

pub const DEFAULT_REVIEW_COUNT_OFFSET: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankingConfig {
    /// Added to the review count before taking log2 in the top-rated score.
    pub review_count_offset: f64,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            review_count_offset: DEFAULT_REVIEW_COUNT_OFFSET,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DealKind {
    BestPrice,
    BiggestDiscount,
    TopRated,
}

impl DealKind {
    pub fn rank(&self, products: &[Product], limit: usize, config: &RankingConfig) -> Vec<Product> {
        match self {
            DealKind::BestPrice => get_best_deals(products, limit),
            DealKind::BiggestDiscount => get_biggest_discounts(products, limit),
            DealKind::TopRated => top_rated_with(products, limit, config),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DealKind::BestPrice => "best_price",
            DealKind::BiggestDiscount => "biggest_discount",
            DealKind::TopRated => "top_rated",
        }
    }
}

impl fmt::Display for DealKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DealKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "best_price" | "best_deals" => Ok(DealKind::BestPrice),
            "biggest_discount" | "biggest_discounts" => Ok(DealKind::BiggestDiscount),
            "top_rated" => Ok(DealKind::TopRated),
            other => Err(format!("unknown deal kind '{}'", other)),
        }
    }
}

fn by_identity(a: &Product, b: &Product) -> Ordering {
    a.id.cmp(&b.id).then_with(|| a.platform.cmp(&b.platform))
}

/// Missing ratings sort after every present rating.
fn rating_desc(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.total_cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Lowest price first, then highest rating.
pub fn get_best_deals(products: &[Product], limit: usize) -> Vec<Product> {
    let mut ranked = products.to_vec();
    ranked.sort_by(|a, b| {
        a.price
            .cmp(&b.price)
            .then_with(|| rating_desc(a.rating, b.rating))
            .then_with(|| by_identity(a, b))
    });
    ranked.truncate(limit);
    ranked
}

/// Largest percentage off the list price. Products without a real discount
/// are excluded.
pub fn get_biggest_discounts(products: &[Product], limit: usize) -> Vec<Product> {
    let mut discounted: Vec<_> = products
        .iter()
        .filter_map(|product| {
            let fraction = product.discount_fraction()?;
            let amount = product.discount_amount()?;
            Some((fraction, amount, product))
        })
        .collect();

    discounted.sort_by(|(fa, aa, a), (fb, ab, b)| {
        fb.cmp(fa)
            .then_with(|| ab.cmp(aa))
            .then_with(|| a.price.cmp(&b.price))
            .then_with(|| by_identity(a, b))
    });

    discounted
        .into_iter()
        .take(limit)
        .map(|(_, _, product)| product.clone())
        .collect()
}

pub fn get_top_rated_products(products: &[Product], limit: usize) -> Vec<Product> {
    top_rated_with(products, limit, &RankingConfig::default())
}

/// `rating * log2(review_count + offset)`; `None` when either input is missing.
pub fn rating_score(product: &Product, config: &RankingConfig) -> Option<f64> {
    let rating = product.rating?;
    let reviews = product.review_count?;
    Some(rating * (reviews as f64 + config.review_count_offset).log2())
}

fn top_rated_with(products: &[Product], limit: usize, config: &RankingConfig) -> Vec<Product> {
    let mut scored: Vec<_> = products
        .iter()
        .map(|product| (rating_score(product, config), product))
        .collect();

    scored.sort_by(|(sa, a), (sb, b)| {
        rating_desc(*sa, *sb)
            .then_with(|| b.review_count.unwrap_or(0).cmp(&a.review_count.unwrap_or(0)))
            .then_with(|| by_identity(a, b))
    });

    scored
        .into_iter()
        .take(limit)
        .map(|(_, product)| product.clone())
        .collect()
}

/// Order merged results in place. Stable, so `Relevance` and equal keys
/// keep merge order.
pub fn sort_products(products: &mut [Product], sort_by: SortBy) {
    match sort_by {
        SortBy::Relevance => {}
        SortBy::Price => products.sort_by(|a, b| a.price.cmp(&b.price)),
        SortBy::Rating => products.sort_by(|a, b| rating_desc(a.rating, b.rating)),
    }
}
