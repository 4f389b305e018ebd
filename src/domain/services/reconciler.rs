//! Product reconciliation
//!
//! Compares a freshly extracted batch against a snapshot of the store and
//! decides insert / update / no-op per product. Nothing here touches storage:
//! the result is a [`Plan`] that the persistence side applies.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::domain::errors::SyncError;
use crate::domain::plan::{FieldChange, Plan, ProductUpdate};
use crate::domain::product::{RejectedRecord, ScrapedProduct};
use crate::domain::snapshot::ProductLookup;

/// Result of reconciling one batch
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconcileOutcome {
    pub plan: Plan,
    /// Stored products seen again with identical comparison fields
    pub unchanged: Vec<String>,
    pub rejected: Vec<RejectedRecord>,
    /// Identifiers that appeared more than once; the last occurrence was used
    pub duplicates: Vec<String>,
}

/// Computes the plan for `batch` against `lookup`.
///
/// - records without an identifier are rejected and reported
/// - duplicate identifiers: the last occurrence wins, first position is kept
/// - a failing lookup aborts the batch and no plan is returned
pub fn reconcile<L>(
    batch: &[ScrapedProduct],
    lookup: &L,
    now: DateTime<Utc>,
) -> Result<ReconcileOutcome, SyncError>
where
    L: ProductLookup + ?Sized,
{
    let mut outcome = ReconcileOutcome::default();
    let mut slots: HashMap<&str, usize> = HashMap::with_capacity(batch.len());
    let mut latest: Vec<&ScrapedProduct> = Vec::with_capacity(batch.len());

    for (position, record) in batch.iter().enumerate() {
        if !record.has_identifier() {
            let rejected = RejectedRecord::new(position, None, "missing product identifier");
            warn!("Rejected {}", rejected);
            outcome.rejected.push(rejected);
            continue;
        }

        match slots.get(record.id.as_str()) {
            Some(&slot) => {
                latest[slot] = record;
                if !outcome.duplicates.contains(&record.id) {
                    outcome.duplicates.push(record.id.clone());
                }
            }
            None => {
                slots.insert(record.id.as_str(), latest.len());
                latest.push(record);
            }
        }
    }

    if !outcome.duplicates.is_empty() {
        warn!(
            count = outcome.duplicates.len(),
            "Duplicate product identifiers in batch, last occurrence wins: {:?}",
            outcome.duplicates
        );
    }

    for record in latest {
        match lookup.find(&record.id)? {
            None => {
                debug!("➕ New product {}", record.id);
                outcome.plan.inserts.push(record.clone());
            }
            Some(existing) => {
                let changes = diff_product(&existing.record, record);
                if changes.is_empty() {
                    outcome.unchanged.push(record.id.clone());
                } else {
                    debug!(
                        "✏️ Product {} changed: {:?}",
                        record.id,
                        changes.iter().map(FieldChange::field).collect::<Vec<_>>()
                    );
                    outcome.plan.updates.push(ProductUpdate {
                        id: record.id.clone(),
                        changes,
                        updated_at: now.max(existing.created_at),
                    });
                }
            }
        }
    }

    info!(
        inserts = outcome.plan.inserts.len(),
        updates = outcome.plan.updates.len(),
        unchanged = outcome.unchanged.len(),
        rejected = outcome.rejected.len(),
        "Reconciliation completed"
    );

    Ok(outcome)
}

/// Comparison-field differences between a stored record and an incoming one.
///
/// The returned changes carry the incoming values. Prices compare as decimals.
pub fn diff_product(stored: &ScrapedProduct, incoming: &ScrapedProduct) -> Vec<FieldChange> {
    let mut changes = Vec::new();

    if stored.name != incoming.name {
        changes.push(FieldChange::Name(incoming.name.clone()));
    }
    if stored.price != incoming.price {
        changes.push(FieldChange::Price(incoming.price));
    }
    if stored.price_text != incoming.price_text {
        changes.push(FieldChange::PriceText(incoming.price_text.clone()));
    }
    if stored.original_price != incoming.original_price {
        changes.push(FieldChange::OriginalPrice(incoming.original_price));
    }
    if stored.image_url != incoming.image_url {
        changes.push(FieldChange::ImageUrl(incoming.image_url.clone()));
    }
    if stored.color != incoming.color {
        changes.push(FieldChange::Color(incoming.color.clone()));
    }
    if stored.category != incoming.category {
        changes.push(FieldChange::Category(incoming.category.clone()));
    }
    if stored.is_sale != incoming.is_sale {
        changes.push(FieldChange::IsSale(incoming.is_sale));
    }
    if stored.sizes != incoming.sizes {
        changes.push(FieldChange::Sizes(incoming.sizes.clone()));
    }

    changes
}
