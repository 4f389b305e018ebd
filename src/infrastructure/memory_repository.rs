//! In-memory [`ProductRepository`] used by tests and dry runs without a database

use anyhow::{Result, bail};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::plan::ProductUpdate;
use crate::domain::product::{PersistedProduct, ProductQuery};
use crate::domain::repositories::ProductRepository;
use crate::domain::snapshot::ProductSnapshot;
use crate::domain::statistics::CatalogStatistics;

#[derive(Clone, Default)]
pub struct InMemoryProductRepository {
    products: Arc<RwLock<HashMap<String, PersistedProduct>>>,
}

impl InMemoryProductRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn with_products(products: impl IntoIterator<Item = PersistedProduct>) -> Self {
        let repository = Self::new();
        {
            let mut guard = repository.products.write().await;
            for product in products {
                guard.insert(product.record.id.clone(), product);
            }
        }
        repository
    }

    /// Copy of everything stored, unordered
    pub async fn all(&self) -> Vec<PersistedProduct> {
        self.products.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn load_snapshot(&self, ids: &[String]) -> Result<ProductSnapshot> {
        let guard = self.products.read().await;
        let products = ids.iter().filter_map(|id| guard.get(id).cloned());
        Ok(ProductSnapshot::new(products, Utc::now()))
    }

    async fn find_product(&self, id: &str) -> Result<Option<PersistedProduct>> {
        Ok(self.products.read().await.get(id).cloned())
    }

    async fn insert_product(&self, product: &PersistedProduct) -> Result<()> {
        let mut guard = self.products.write().await;
        if guard.contains_key(&product.record.id) {
            bail!("UNIQUE constraint failed: products.id ({})", product.record.id);
        }
        guard.insert(product.record.id.clone(), product.clone());
        Ok(())
    }

    async fn update_product(&self, update: &ProductUpdate) -> Result<bool> {
        let mut guard = self.products.write().await;
        let Some(stored) = guard.get_mut(&update.id) else {
            return Ok(false);
        };
        for change in &update.changes {
            change.apply_to(&mut stored.record);
        }
        stored.updated_at = update.updated_at;
        Ok(true)
    }

    async fn mark_seen(&self, ids: &[String], seen_at: DateTime<Utc>) -> Result<u64> {
        let mut guard = self.products.write().await;
        let mut touched = 0;
        for id in ids {
            if let Some(stored) = guard.get_mut(id) {
                stored.record.scraped_at = seen_at;
                touched += 1;
            }
        }
        Ok(touched)
    }

    async fn list_products(&self, query: &ProductQuery) -> Result<Vec<PersistedProduct>> {
        let guard = self.products.read().await;
        let mut products: Vec<_> = guard
            .values()
            .filter(|p| query.category.as_ref().is_none_or(|c| &p.record.category == c))
            .cloned()
            .collect();
        products.sort_by(|a, b| {
            b.record
                .scraped_at
                .cmp(&a.record.scraped_at)
                .then_with(|| a.record.id.cmp(&b.record.id))
        });
        if let Some(limit) = query.limit {
            products.truncate(limit as usize);
        }
        Ok(products)
    }

    async fn count_products(&self) -> Result<u64> {
        Ok(self.products.read().await.len() as u64)
    }

    async fn get_statistics(&self) -> Result<CatalogStatistics> {
        Ok(CatalogStatistics::from_products(self.products.read().await.values()))
    }

    async fn delete_scraped_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let mut guard = self.products.write().await;
        let before = guard.len();
        guard.retain(|_, p| p.record.scraped_at >= cutoff);
        Ok((before - guard.len()) as u64)
    }
}
