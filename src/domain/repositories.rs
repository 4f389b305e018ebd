//! Repository interfaces for catalog synchronization
//!
//! Contains the trait definitions the sync pipeline talks to. Storage and
//! extraction backends implement them in the infrastructure layer.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::errors::ExtractionError;
use crate::domain::plan::ProductUpdate;
use crate::domain::product::{PersistedProduct, ProductQuery, RejectedRecord, ScrapedProduct};
use crate::domain::snapshot::ProductSnapshot;
use crate::domain::statistics::CatalogStatistics;

#[async_trait]
pub trait ProductRepository: Send + Sync {
    // Snapshot reads (one per run)
    async fn load_snapshot(&self, ids: &[String]) -> Result<ProductSnapshot>;
    async fn find_product(&self, id: &str) -> Result<Option<PersistedProduct>>;

    // Plan application, one statement per product
    async fn insert_product(&self, product: &PersistedProduct) -> Result<()>;
    /// Returns false when no stored row matched the identifier
    async fn update_product(&self, update: &ProductUpdate) -> Result<bool>;
    /// Refreshes `scraped_at` only; `updated_at` and all other fields stay untouched
    async fn mark_seen(&self, ids: &[String], seen_at: DateTime<Utc>) -> Result<u64>;

    // Queries
    async fn list_products(&self, query: &ProductQuery) -> Result<Vec<PersistedProduct>>;
    async fn count_products(&self) -> Result<u64>;
    async fn get_statistics(&self) -> Result<CatalogStatistics>;

    // Housekeeping
    async fn delete_scraped_before(&self, cutoff: DateTime<Utc>) -> Result<u64>;
}

/// Output of one extraction: validated records plus boundary rejections
#[derive(Debug, Clone, Default)]
pub struct ExtractionBatch {
    pub records: Vec<ScrapedProduct>,
    pub rejected: Vec<RejectedRecord>,
}

impl ExtractionBatch {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
pub trait ProductSource: Send + Sync {
    async fn extract(&self) -> Result<ExtractionBatch, ExtractionError>;

    /// Human readable description for logs
    fn describe(&self) -> String;
}
