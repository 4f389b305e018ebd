//! Lenient product shape accepted from JSON input and structured page data,
//! validated into [`ScrapedProduct`] at the extraction boundary

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::price::Price;
use crate::domain::product::{RejectedRecord, ScrapedProduct};
use crate::domain::repositories::ExtractionBatch;

/// Price as it appears in input.
///
/// A plain decimal is a `Number` whether it arrives as `19.99` or `"19.99"`;
/// only formatted strings such as `"29,95 TND"` are `Text` and also become
/// the record's `price_text`. Exported products carry their price as a plain
/// decimal string, so re-importing them does not invent display text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawPrice {
    Number(Decimal),
    Text(String),
}

impl RawPrice {
    fn to_price(&self) -> Result<Option<Price>, String> {
        match self {
            Self::Number(value) => Price::new(*value).map(Some).map_err(|e| e.to_string()),
            Self::Text(text) if text.trim().is_empty() => Ok(None),
            Self::Text(text) => Ok(Price::parse_display(text)),
        }
    }

    fn display_text(&self) -> Option<String> {
        match self {
            Self::Text(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawProduct {
    #[serde(alias = "productID", alias = "product_id", alias = "sku")]
    pub id: Option<String>,
    pub name: Option<String>,
    pub price: Option<RawPrice>,
    pub price_text: Option<String>,
    pub original_price: Option<RawPrice>,
    pub image_url: Option<String>,
    #[serde(alias = "url")]
    pub product_url: Option<String>,
    pub color: Option<String>,
    pub category: Option<String>,
    pub is_sale: Option<bool>,
    pub sizes: Vec<String>,
    pub description: Option<String>,
    pub source: Option<String>,
    pub scraped_at: Option<DateTime<Utc>>,
}

/// Values applied where a raw record is silent
#[derive(Debug, Clone)]
pub struct RecordDefaults {
    pub category: String,
    pub source: Option<String>,
    pub scraped_at: DateTime<Utc>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl RawProduct {
    /// Validates required fields and converts prices.
    ///
    /// A missing identifier is kept as an empty string: rejecting it is the
    /// reconciler's call. A missing name or product URL, or an unusable price,
    /// rejects the record here.
    pub fn into_record(
        self,
        position: usize,
        defaults: &RecordDefaults,
    ) -> Result<ScrapedProduct, RejectedRecord> {
        let id = self.id.map(|v| v.trim().to_string()).unwrap_or_default();
        let reject = |reason: String| {
            RejectedRecord::new(position, Some(id.clone()).filter(|v| !v.is_empty()), reason)
        };

        let name = non_blank(self.name).ok_or_else(|| reject("missing product name".into()))?;
        let product_url =
            non_blank(self.product_url).ok_or_else(|| reject("missing product URL".into()))?;

        let price = self
            .price
            .as_ref()
            .map(RawPrice::to_price)
            .transpose()
            .map_err(|e| reject(format!("invalid price: {e}")))?
            .flatten();
        let original_price = self
            .original_price
            .as_ref()
            .map(RawPrice::to_price)
            .transpose()
            .map_err(|e| reject(format!("invalid original price: {e}")))?
            .flatten();

        let price_text = non_blank(self.price_text)
            .or_else(|| self.price.as_ref().and_then(RawPrice::display_text));

        let is_sale = self.is_sale.unwrap_or_else(|| match (price, original_price) {
            (Some(current), Some(original)) => original > current,
            _ => false,
        });

        let sizes = self
            .sizes
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(ScrapedProduct::new(
            id.clone(),
            name,
            product_url,
            non_blank(self.category).unwrap_or_else(|| defaults.category.clone()),
            self.scraped_at.unwrap_or(defaults.scraped_at),
        )
        .with_price(price)
        .with_price_text(price_text)
        .with_original_price(original_price)
        .with_image_url(non_blank(self.image_url))
        .with_color(non_blank(self.color))
        .with_sale(is_sale)
        .with_sizes(sizes)
        .with_description(non_blank(self.description))
        .with_source(non_blank(self.source).or_else(|| defaults.source.clone())))
    }
}

/// Converts raw records into a batch, keeping boundary rejections
pub fn into_batch(raws: Vec<RawProduct>, defaults: &RecordDefaults) -> ExtractionBatch {
    let mut batch = ExtractionBatch::default();
    for (position, raw) in raws.into_iter().enumerate() {
        match raw.into_record(position, defaults) {
            Ok(record) => batch.records.push(record),
            Err(rejected) => {
                warn!("Rejected {}", rejected);
                batch.rejected.push(rejected);
            }
        }
    }
    batch
}
