//! Immutable view of the persisted products relevant to one batch

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use super::errors::SyncError;
use super::product::PersistedProduct;

/// Lookup capability the reconciler reads through.
///
/// `Ok(None)` means the identifier is not stored; `Err` means the store could
/// not answer and the batch must be aborted.
pub trait ProductLookup {
    fn find(&self, id: &str) -> Result<Option<&PersistedProduct>, SyncError>;
}

/// Snapshot of stored products keyed by identifier, read once per run
#[derive(Debug, Clone, Default)]
pub struct ProductSnapshot {
    products: HashMap<String, PersistedProduct>,
    taken_at: Option<DateTime<Utc>>,
}

impl ProductSnapshot {
    pub fn new(products: impl IntoIterator<Item = PersistedProduct>, taken_at: DateTime<Utc>) -> Self {
        Self {
            products: products
                .into_iter()
                .map(|p| (p.record.id.clone(), p))
                .collect(),
            taken_at: Some(taken_at),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub const fn taken_at(&self) -> Option<DateTime<Utc>> {
        self.taken_at
    }

    pub fn get(&self, id: &str) -> Option<&PersistedProduct> {
        self.products.get(id)
    }
}

impl ProductLookup for ProductSnapshot {
    fn find(&self, id: &str) -> Result<Option<&PersistedProduct>, SyncError> {
        Ok(self.products.get(id))
    }
}
