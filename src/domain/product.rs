use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::price::Price;

/// One product as produced by extraction, before persistence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapedProduct {
    /// Stable retailer product identifier (primary key in the store)
    pub id: String,
    pub name: String,
    pub price: Option<Price>,
    /// Price as displayed on the listing, e.g. "29,95 TND"
    pub price_text: Option<String>,
    pub original_price: Option<Price>,
    pub image_url: Option<String>,
    pub product_url: String,
    pub color: Option<String>,
    pub category: String,
    pub is_sale: bool,
    /// Ordered; the same size may appear once per color variant
    pub sizes: Vec<String>,
    pub description: Option<String>,
    /// Retailer tag, e.g. "zara"
    pub source: Option<String>,
    pub scraped_at: DateTime<Utc>,
}

impl ScrapedProduct {
    /// Creates a product with the required fields; optional fields start empty
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        product_url: impl Into<String>,
        category: impl Into<String>,
        scraped_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price: None,
            price_text: None,
            original_price: None,
            image_url: None,
            product_url: product_url.into(),
            color: None,
            category: category.into(),
            is_sale: false,
            sizes: Vec::new(),
            description: None,
            source: None,
            scraped_at,
        }
    }

    #[must_use]
    pub fn with_price(mut self, price: Option<Price>) -> Self {
        self.price = price;
        self
    }

    #[must_use]
    pub fn with_price_text(mut self, price_text: Option<String>) -> Self {
        self.price_text = price_text;
        self
    }

    #[must_use]
    pub fn with_original_price(mut self, original_price: Option<Price>) -> Self {
        self.original_price = original_price;
        self
    }

    #[must_use]
    pub fn with_image_url(mut self, image_url: Option<String>) -> Self {
        self.image_url = image_url;
        self
    }

    #[must_use]
    pub fn with_color(mut self, color: Option<String>) -> Self {
        self.color = color;
        self
    }

    #[must_use]
    pub const fn with_sale(mut self, is_sale: bool) -> Self {
        self.is_sale = is_sale;
        self
    }

    #[must_use]
    pub fn with_sizes(mut self, sizes: Vec<String>) -> Self {
        self.sizes = sizes;
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: Option<String>) -> Self {
        self.source = source;
        self
    }

    /// True when the identifier is usable as a store key
    pub fn has_identifier(&self) -> bool {
        !self.id.trim().is_empty()
    }
}

/// Stored counterpart of a [`ScrapedProduct`] plus lifecycle timestamps.
///
/// `created_at` is written once by the insert and never changes afterwards;
/// `updated_at` moves forward on every write that changed a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedProduct {
    #[serde(flatten)]
    pub record: ScrapedProduct,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PersistedProduct {
    /// First sighting of a product: both lifecycle timestamps are `now`
    pub fn first_seen(record: ScrapedProduct, now: DateTime<Utc>) -> Self {
        Self {
            record,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> &str {
        &self.record.id
    }
}

/// A record excluded from reconciliation, reported alongside the plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedRecord {
    /// Position of the record in the extracted batch
    pub position: usize,
    pub id: Option<String>,
    pub reason: String,
}

impl RejectedRecord {
    pub fn new(position: usize, id: Option<String>, reason: impl Into<String>) -> Self {
        Self {
            position,
            id,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for RejectedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "record #{} ({}): {}", self.position, id, self.reason),
            None => write!(f, "record #{}: {}", self.position, self.reason),
        }
    }
}

/// Filter for listing stored products
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductQuery {
    pub category: Option<String>,
    pub limit: Option<u32>,
}
