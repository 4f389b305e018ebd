//! Sync workflow: extract -> snapshot -> reconcile -> apply -> housekeeping

use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

use crate::application::plan_executor::PlanExecutor;
use crate::application::summary::SyncSummary;
use crate::domain::errors::SyncError;
use crate::domain::repositories::{ProductRepository, ProductSource};
use crate::domain::services::reconciler::{ReconcileOutcome, reconcile};

#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    /// Compute and report the plan without writing anything
    pub dry_run: bool,
    /// Refresh `scraped_at` of products seen again (outside the plan)
    pub refresh_seen_timestamps: bool,
    /// Delete products not seen for this many days after a successful run.
    /// Ignored unless `refresh_seen_timestamps` is on.
    pub cleanup_days: Option<u32>,
}

/// Result of one run
#[derive(Debug, Clone)]
pub struct SyncRun {
    pub summary: SyncSummary,
    /// Present whenever reconciliation completed
    pub outcome: Option<ReconcileOutcome>,
}

pub struct SyncUseCase {
    source: Arc<dyn ProductSource>,
    repository: Arc<dyn ProductRepository>,
    options: SyncOptions,
}

impl SyncUseCase {
    pub fn new(
        source: Arc<dyn ProductSource>,
        repository: Arc<dyn ProductRepository>,
        options: SyncOptions,
    ) -> Self {
        Self {
            source,
            repository,
            options,
        }
    }

    pub async fn run(&self) -> SyncRun {
        self.run_at(Utc::now()).await
    }

    /// Runs the whole workflow with `now` as the clock value.
    ///
    /// Never returns an error: failures are recorded in the summary, which is
    /// always produced.
    pub async fn run_at(&self, now: DateTime<Utc>) -> SyncRun {
        let mut summary = SyncSummary::start(self.source.describe(), self.options.dry_run, now);
        info!("🚀 Sync {} started: {}", summary.run_id, summary.source);

        let outcome = self.execute(now, &mut summary).await;

        summary.finish(Utc::now());
        summary.log();
        SyncRun { summary, outcome }
    }

    async fn execute(&self, now: DateTime<Utc>, summary: &mut SyncSummary) -> Option<ReconcileOutcome> {
        let batch = match self.source.extract().await {
            Ok(batch) => batch,
            Err(e) => {
                summary.abort(SyncError::from(e));
                return None;
            }
        };

        summary.extracted = batch.records.len() + batch.rejected.len();
        for rejected in &batch.rejected {
            summary.record_rejection(&SyncError::InvalidRecord(rejected.clone()));
        }
        if batch.is_empty() {
            summary.abort("extraction produced no products");
            return None;
        }

        let mut seen = HashSet::new();
        let ids: Vec<String> = batch
            .records
            .iter()
            .filter(|r| r.has_identifier() && seen.insert(r.id.as_str()))
            .map(|r| r.id.clone())
            .collect();

        let snapshot = match self.repository.load_snapshot(&ids).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                summary.abort(SyncError::lookup(format!("{e:#}")));
                return None;
            }
        };
        info!("📸 Snapshot: {} of {} products already stored", snapshot.len(), ids.len());

        let outcome = match reconcile(&batch.records, &snapshot, now) {
            Ok(outcome) => outcome,
            Err(e) => {
                summary.abort(e);
                return None;
            }
        };

        for rejected in &outcome.rejected {
            summary.record_rejection(&SyncError::InvalidRecord(rejected.clone()));
        }
        summary.duplicates = outcome.duplicates.len();
        summary.unchanged = outcome.unchanged.len();
        summary.plan_fingerprint = Some(outcome.plan.fingerprint());

        if self.options.dry_run {
            summary.inserted = outcome.plan.inserts.len();
            summary.updated = outcome.plan.updates.len();
            info!("🔍 Dry run: {} planned actions, nothing written", outcome.plan.len());
            return Some(outcome);
        }

        let report = PlanExecutor::new(self.repository.clone())
            .apply(&outcome.plan, now)
            .await;
        summary.inserted = report.inserted.len();
        summary.updated = report.updated.len();
        for failure in &report.failures {
            summary.record_failure(failure);
        }

        let mut last_seen_current = self.options.refresh_seen_timestamps;
        if self.options.refresh_seen_timestamps {
            let seen_again: Vec<String> = outcome
                .unchanged
                .iter()
                .chain(report.updated.iter())
                .cloned()
                .collect();
            if !seen_again.is_empty() {
                match self.repository.mark_seen(&seen_again, now).await {
                    Ok(touched) => summary.seen_refreshed = touched,
                    Err(e) => {
                        warn!("Failed to refresh last-seen timestamps: {:#}", e);
                        last_seen_current = false;
                    }
                }
            }
        }

        if let Some(days) = self.options.cleanup_days {
            // `scraped_at` only tracks last-seen once this run's products were refreshed
            if !last_seen_current {
                warn!("Skipping retention cleanup: last-seen timestamps were not refreshed");
            } else if summary.is_success() {
                let cutoff = now - Duration::days(i64::from(days));
                match self.repository.delete_scraped_before(cutoff).await {
                    Ok(removed) => {
                        info!("🧹 Removed {} products not seen for {} days", removed, days);
                        summary.cleaned_up = removed;
                    }
                    Err(e) => warn!("Retention cleanup failed: {:#}", e),
                }
            } else {
                warn!("Skipping retention cleanup after an unsuccessful run");
            }
        }

        Some(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::summary::RunStatus;
    use crate::domain::errors::ExtractionError;
    use crate::domain::plan::ProductUpdate;
    use crate::domain::product::{PersistedProduct, ProductQuery, ScrapedProduct};
    use crate::domain::repositories::ExtractionBatch;
    use crate::domain::snapshot::ProductSnapshot;
    use crate::domain::statistics::CatalogStatistics;
    use crate::infrastructure::memory_repository::InMemoryProductRepository;
    use async_trait::async_trait;

    struct FixedSource(Result<Vec<ScrapedProduct>, ExtractionError>);

    #[async_trait]
    impl ProductSource for FixedSource {
        async fn extract(&self) -> Result<ExtractionBatch, ExtractionError> {
            self.0.clone().map(|records| ExtractionBatch {
                records,
                rejected: Vec::new(),
            })
        }

        fn describe(&self) -> String {
            "fixed".to_string()
        }
    }

    /// Store whose reads fail
    struct OfflineRepository;

    #[async_trait]
    impl ProductRepository for OfflineRepository {
        async fn load_snapshot(&self, _ids: &[String]) -> anyhow::Result<ProductSnapshot> {
            anyhow::bail!("database is locked")
        }
        async fn find_product(&self, _id: &str) -> anyhow::Result<Option<PersistedProduct>> {
            anyhow::bail!("database is locked")
        }
        async fn insert_product(&self, _product: &PersistedProduct) -> anyhow::Result<()> {
            unreachable!("nothing may be written after a lookup failure")
        }
        async fn update_product(&self, _update: &ProductUpdate) -> anyhow::Result<bool> {
            unreachable!("nothing may be written after a lookup failure")
        }
        async fn mark_seen(&self, _ids: &[String], _seen_at: DateTime<Utc>) -> anyhow::Result<u64> {
            unreachable!("nothing may be written after a lookup failure")
        }
        async fn list_products(&self, _query: &ProductQuery) -> anyhow::Result<Vec<PersistedProduct>> {
            Ok(Vec::new())
        }
        async fn count_products(&self) -> anyhow::Result<u64> {
            Ok(0)
        }
        async fn get_statistics(&self) -> anyhow::Result<CatalogStatistics> {
            Ok(CatalogStatistics::default())
        }
        async fn delete_scraped_before(&self, _cutoff: DateTime<Utc>) -> anyhow::Result<u64> {
            unreachable!("nothing may be written after a lookup failure")
        }
    }

    fn record(id: &str, price: &str, scraped_at: DateTime<Utc>) -> ScrapedProduct {
        ScrapedProduct::new(id, "Parka", format!("https://shop/{id}"), "Men", scraped_at)
            .with_price(price.parse().ok())
    }

    fn use_case(
        records: Vec<ScrapedProduct>,
        repository: Arc<dyn ProductRepository>,
        options: SyncOptions,
    ) -> SyncUseCase {
        SyncUseCase::new(Arc::new(FixedSource(Ok(records))), repository, options)
    }

    #[tokio::test]
    async fn test_insert_then_noop_on_second_run() {
        let repo = Arc::new(InMemoryProductRepository::new());
        let now = Utc::now();
        let records = vec![record("A", "19.99", now)];

        let first = use_case(records.clone(), repo.clone(), SyncOptions::default())
            .run_at(now)
            .await;
        assert!(first.summary.is_success());
        assert_eq!(first.summary.inserted, 1);

        let second = use_case(records, repo.clone(), SyncOptions::default())
            .run_at(now + Duration::hours(1))
            .await;
        assert!(second.outcome.unwrap().plan.is_empty());
        assert_eq!(second.summary.unchanged, 1);
        assert_eq!(second.summary.inserted + second.summary.updated, 0);
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let repo = Arc::new(InMemoryProductRepository::new());
        let options = SyncOptions {
            dry_run: true,
            ..SyncOptions::default()
        };

        let run = use_case(vec![record("A", "10", Utc::now())], repo.clone(), options)
            .run()
            .await;
        assert!(run.summary.dry_run);
        assert_eq!(run.summary.inserted, 1);
        assert!(run.summary.plan_fingerprint.is_some());
        assert_eq!(repo.count_products().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_lookup_failure_aborts_with_summary() {
        let run = use_case(
            vec![record("A", "10", Utc::now())],
            Arc::new(OfflineRepository),
            SyncOptions::default(),
        )
        .run()
        .await;

        assert!(run.outcome.is_none());
        assert_eq!(run.summary.status, RunStatus::Aborted);
        assert_eq!(run.summary.extracted, 1);
        assert!(run.summary.errors[0].contains("Product lookup failed"));
    }

    #[tokio::test]
    async fn test_extraction_failure_and_empty_batch_abort() {
        let repo: Arc<dyn ProductRepository> = Arc::new(InMemoryProductRepository::new());

        let failing = SyncUseCase::new(
            Arc::new(FixedSource(Err(ExtractionError::AllPagesFailed { failed: 1 }))),
            repo.clone(),
            SyncOptions::default(),
        );
        assert_eq!(failing.run().await.summary.status, RunStatus::Aborted);

        let empty = use_case(Vec::new(), repo, SyncOptions::default()).run().await;
        assert_eq!(empty.summary.status, RunStatus::Aborted);
    }

    #[tokio::test]
    async fn test_seen_refresh_and_retention() {
        let now = Utc::now();
        let long_ago = now - Duration::days(60);
        let repo = Arc::new(
            InMemoryProductRepository::with_products([
                PersistedProduct::first_seen(record("KEEP", "10", long_ago), long_ago),
                PersistedProduct::first_seen(record("DROP", "10", long_ago), long_ago),
            ])
            .await,
        );

        let options = SyncOptions {
            dry_run: false,
            refresh_seen_timestamps: true,
            cleanup_days: Some(30),
        };
        let run = use_case(vec![record("KEEP", "10", now)], repo.clone(), options)
            .run_at(now)
            .await;

        assert!(run.summary.is_success());
        assert_eq!(run.summary.seen_refreshed, 1);
        assert_eq!(run.summary.cleaned_up, 1);

        let kept = repo.find_product("KEEP").await.unwrap().unwrap();
        assert_eq!(kept.record.scraped_at, now);
        assert_eq!(kept.updated_at, long_ago);
        assert!(repo.find_product("DROP").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_retention_is_skipped_without_seen_refresh() {
        let now = Utc::now();
        let long_ago = now - Duration::days(40);
        let repo = Arc::new(
            InMemoryProductRepository::with_products([PersistedProduct::first_seen(
                record("A", "10", long_ago),
                long_ago,
            )])
            .await,
        );

        let options = SyncOptions {
            dry_run: false,
            refresh_seen_timestamps: false,
            cleanup_days: Some(30),
        };
        let run = use_case(vec![record("A", "10", now)], repo.clone(), options)
            .run_at(now)
            .await;

        assert!(run.summary.is_success());
        assert_eq!(run.summary.unchanged, 1);
        assert_eq!(run.summary.cleaned_up, 0);
        assert!(repo.find_product("A").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_rejected_records_are_reported_as_invalid() {
        let repo = Arc::new(InMemoryProductRepository::new());
        let run = use_case(
            vec![record("  ", "10", Utc::now()), record("B", "10", Utc::now())],
            repo,
            SyncOptions::default(),
        )
        .run()
        .await;

        assert!(run.summary.is_success());
        assert_eq!(run.summary.inserted, 1);
        assert_eq!(run.summary.rejected, 1);
        assert!(run.summary.errors[0].starts_with("Invalid record: record #0"));
    }
}
