//! Applies a reconciliation [`Plan`] through a [`ProductRepository`]

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::domain::errors::SyncError;
use crate::domain::plan::Plan;
use crate::domain::product::PersistedProduct;
use crate::domain::repositories::ProductRepository;

/// Per-action outcome of applying a plan
#[derive(Debug, Clone, Default, Serialize)]
pub struct ApplyReport {
    pub inserted: Vec<String>,
    pub updated: Vec<String>,
    #[serde(serialize_with = "serialize_errors")]
    pub failures: Vec<SyncError>,
}

fn serialize_errors<S: serde::Serializer>(errors: &[SyncError], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(errors.iter().map(ToString::to_string))
}

impl ApplyReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failed_ids(&self) -> Vec<&str> {
        self.failures
            .iter()
            .filter_map(|f| match f {
                SyncError::WriteFailure { id, .. } => Some(id.as_str()),
                _ => None,
            })
            .collect()
    }
}

pub struct PlanExecutor {
    repository: Arc<dyn ProductRepository>,
}

impl PlanExecutor {
    pub fn new(repository: Arc<dyn ProductRepository>) -> Self {
        Self { repository }
    }

    /// Applies every action in its own statement.
    ///
    /// A failing action is recorded as [`SyncError::WriteFailure`] and the
    /// remaining actions still run. Inserts get `created_at = updated_at = now`.
    pub async fn apply(&self, plan: &Plan, now: DateTime<Utc>) -> ApplyReport {
        let mut report = ApplyReport::default();

        for record in &plan.inserts {
            let product = PersistedProduct::first_seen(record.clone(), now);
            match self.repository.insert_product(&product).await {
                Ok(()) => {
                    debug!("➕ Inserted {}", record.id);
                    report.inserted.push(record.id.clone());
                }
                Err(e) => {
                    error!("❌ Insert failed for {}: {:#}", record.id, e);
                    report.failures.push(SyncError::WriteFailure {
                        id: record.id.clone(),
                        reason: format!("{e:#}"),
                    });
                }
            }
        }

        for update in &plan.updates {
            match self.repository.update_product(update).await {
                Ok(true) => {
                    debug!("✏️ Updated {} ({:?})", update.id, update.fields());
                    report.updated.push(update.id.clone());
                }
                Ok(false) => {
                    error!("❌ Update matched no stored product: {}", update.id);
                    report.failures.push(SyncError::WriteFailure {
                        id: update.id.clone(),
                        reason: "product no longer stored".to_string(),
                    });
                }
                Err(e) => {
                    error!("❌ Update failed for {}: {:#}", update.id, e);
                    report.failures.push(SyncError::WriteFailure {
                        id: update.id.clone(),
                        reason: format!("{e:#}"),
                    });
                }
            }
        }

        info!(
            inserted = report.inserted.len(),
            updated = report.updated.len(),
            failed = report.failures.len(),
            "Plan applied"
        );
        report
    }
}
