//! Write plan produced by reconciliation
//!
//! A [`Plan`] is a plain value: it lists what must be inserted and which
//! fields of which stored products must change. Applying it is the job of the
//! persistence side.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::price::Price;
use super::product::ScrapedProduct;

/// Comparison fields tracked by change detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductField {
    Name,
    Price,
    PriceText,
    OriginalPrice,
    ImageUrl,
    Color,
    Category,
    IsSale,
    Sizes,
}

impl ProductField {
    pub const ALL: [Self; 9] = [
        Self::Name,
        Self::Price,
        Self::PriceText,
        Self::OriginalPrice,
        Self::ImageUrl,
        Self::Color,
        Self::Category,
        Self::IsSale,
        Self::Sizes,
    ];

    /// Column name in the `products` table
    pub const fn column(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Price => "price",
            Self::PriceText => "price_text",
            Self::OriginalPrice => "original_price",
            Self::ImageUrl => "image_url",
            Self::Color => "color",
            Self::Category => "category",
            Self::IsSale => "is_sale",
            Self::Sizes => "sizes",
        }
    }
}

impl fmt::Display for ProductField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// New value for a single comparison field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum FieldChange {
    Name(String),
    Price(Option<Price>),
    PriceText(Option<String>),
    OriginalPrice(Option<Price>),
    ImageUrl(Option<String>),
    Color(Option<String>),
    Category(String),
    IsSale(bool),
    Sizes(Vec<String>),
}

impl FieldChange {
    pub const fn field(&self) -> ProductField {
        match self {
            Self::Name(_) => ProductField::Name,
            Self::Price(_) => ProductField::Price,
            Self::PriceText(_) => ProductField::PriceText,
            Self::OriginalPrice(_) => ProductField::OriginalPrice,
            Self::ImageUrl(_) => ProductField::ImageUrl,
            Self::Color(_) => ProductField::Color,
            Self::Category(_) => ProductField::Category,
            Self::IsSale(_) => ProductField::IsSale,
            Self::Sizes(_) => ProductField::Sizes,
        }
    }

    /// Writes the new value into a record
    pub fn apply_to(&self, record: &mut ScrapedProduct) {
        match self {
            Self::Name(v) => record.name.clone_from(v),
            Self::Price(v) => record.price = *v,
            Self::PriceText(v) => record.price_text.clone_from(v),
            Self::OriginalPrice(v) => record.original_price = *v,
            Self::ImageUrl(v) => record.image_url.clone_from(v),
            Self::Color(v) => record.color.clone_from(v),
            Self::Category(v) => record.category.clone_from(v),
            Self::IsSale(v) => record.is_sale = *v,
            Self::Sizes(v) => record.sizes.clone_from(v),
        }
    }
}

/// Update of an existing product: only the changed fields plus `updated_at`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub id: String,
    pub changes: Vec<FieldChange>,
    pub updated_at: DateTime<Utc>,
}

impl ProductUpdate {
    pub fn fields(&self) -> Vec<ProductField> {
        self.changes.iter().map(FieldChange::field).collect()
    }
}

/// Insert/update actions computed for one batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub inserts: Vec<ScrapedProduct>,
    pub updates: Vec<ProductUpdate>,
}

impl Plan {
    pub fn is_empty(&self) -> bool {
        self.inserts.is_empty() && self.updates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inserts.len() + self.updates.len()
    }

    pub fn insert_ids(&self) -> Vec<&str> {
        self.inserts.iter().map(|p| p.id.as_str()).collect()
    }

    pub fn update_ids(&self) -> Vec<&str> {
        self.updates.iter().map(|u| u.id.as_str()).collect()
    }

    /// Content hash of the plan, used to recognise identical runs in logs.
    /// Inserts contribute their identifier only; updates their field changes.
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for insert in &self.inserts {
            hasher.update(b"I");
            hasher.update(insert.id.as_bytes());
        }
        for update in &self.updates {
            hasher.update(b"U");
            hasher.update(update.id.as_bytes());
            if let Ok(bytes) = serde_json::to_vec(&update.changes) {
                hasher.update(&bytes);
            }
        }
        hasher.finalize().to_hex()[..16].to_string()
    }
}
