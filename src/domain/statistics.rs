//! Catalog statistics reported by the `stats` command

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::price::Price;
use super::product::PersistedProduct;

/// Product counts per price range
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBuckets {
    pub under_50: u64,
    pub from_50_to_100: u64,
    pub from_100_to_200: u64,
    pub over_200: u64,
    pub unpriced: u64,
}

impl PriceBuckets {
    pub fn record(&mut self, price: Option<Price>) {
        let Some(price) = price else {
            self.unpriced += 1;
            return;
        };
        let value = price.as_decimal();
        if value < Decimal::from(50) {
            self.under_50 += 1;
        } else if value < Decimal::from(100) {
            self.from_50_to_100 += 1;
        } else if value < Decimal::from(200) {
            self.from_100_to_200 += 1;
        } else {
            self.over_200 += 1;
        }
    }

    /// Labelled rows in display order
    pub fn rows(&self) -> [(&'static str, u64); 5] {
        [
            ("0-50", self.under_50),
            ("50-100", self.from_50_to_100),
            ("100-200", self.from_100_to_200),
            ("200+", self.over_200),
            ("unpriced", self.unpriced),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogStatistics {
    pub total_products: u64,
    pub by_category: BTreeMap<String, u64>,
    pub sale_products: u64,
    pub price_ranges: PriceBuckets,
    pub latest_scrape: Option<DateTime<Utc>>,
}

impl CatalogStatistics {
    pub fn from_products<'a>(products: impl IntoIterator<Item = &'a PersistedProduct>) -> Self {
        let mut stats = Self::default();
        for product in products {
            let record = &product.record;
            stats.total_products += 1;
            *stats.by_category.entry(record.category.clone()).or_insert(0) += 1;
            if record.is_sale {
                stats.sale_products += 1;
            }
            stats.price_ranges.record(record.price);
            stats.latest_scrape = stats.latest_scrape.max(Some(record.scraped_at));
        }
        stats
    }
}
