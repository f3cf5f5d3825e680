use regex::Regex;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::LazyLock;

static PRICE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{1,3}(?:,\d{3})+(?:\.\d{1,2})?|\d+(?:\.\d{1,2})?)")
        .expect("price regex is valid")
});

/// Extracts amounts and currencies from marketplace display strings such as
/// `"$1,299.99"` or `"£45"`.
pub struct PriceParser {
    currency_symbols: HashMap<String, String>,
    default_currency: String,
}

impl PriceParser {
    pub fn new() -> Self {
        Self::with_default_currency("usd")
    }

    pub fn with_default_currency(default_currency: &str) -> Self {
        let mut currency_symbols = HashMap::new();
        currency_symbols.insert("$".to_string(), default_currency.to_lowercase());
        currency_symbols.insert("US$".to_string(), "usd".to_string());
        currency_symbols.insert("C$".to_string(), "cad".to_string());
        currency_symbols.insert("A$".to_string(), "aud".to_string());
        currency_symbols.insert("£".to_string(), "gbp".to_string());
        currency_symbols.insert("€".to_string(), "eur".to_string());
        currency_symbols.insert("¥".to_string(), "jpy".to_string());
        currency_symbols.insert("₹".to_string(), "inr".to_string());

        Self {
            currency_symbols,
            default_currency: default_currency.to_lowercase(),
        }
    }

    pub fn parse_amount(&self, text: &str) -> Option<Decimal> {
        let captures = PRICE_REGEX.captures(text)?;
        let amount = captures.get(1)?.as_str().replace(',', "");
        Decimal::from_str(&amount).ok()
    }

    /// Amount plus the currency implied by any symbol in the text.
    pub fn parse(&self, text: &str) -> Option<(Decimal, String)> {
        let amount = self.parse_amount(text)?;
        let currency = self
            .extract_currency(text)
            .unwrap_or_else(|| self.default_currency.clone());
        Some((amount, currency))
    }

    fn extract_currency(&self, text: &str) -> Option<String> {
        // Check longer currency symbols first (US$ before $)
        let mut symbols: Vec<_> = self.currency_symbols.iter().collect();
        symbols.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(b.0)));

        symbols
            .into_iter()
            .find(|(symbol, _)| text.contains(symbol.as_str()))
            .map(|(_, code)| code.clone())
    }
}

impl Default for PriceParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Amount field that some backends send as a number and others as display text.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FlexibleAmount {
    Number(Decimal),
    Text(String),
}

impl FlexibleAmount {
    pub fn to_decimal(&self, parser: &PriceParser) -> Option<Decimal> {
        match self {
            FlexibleAmount::Number(amount) => Some(*amount),
            FlexibleAmount::Text(text) => parser.parse_amount(text),
        }
    }

    pub fn to_f64(&self) -> Option<f64> {
        match self {
            FlexibleAmount::Number(amount) => rust_decimal::prelude::ToPrimitive::to_f64(amount),
            FlexibleAmount::Text(text) => text.trim().parse().ok(),
        }
    }
}
