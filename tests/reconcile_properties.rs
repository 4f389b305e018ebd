//! Property tests for reconciliation

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;

use catalog_sync::application::{SyncOptions, SyncUseCase};
use catalog_sync::domain::errors::ExtractionError;
use catalog_sync::domain::price::Price;
use catalog_sync::domain::product::{PersistedProduct, ScrapedProduct};
use catalog_sync::domain::repositories::{ExtractionBatch, ProductRepository, ProductSource};
use catalog_sync::domain::snapshot::ProductSnapshot;
use catalog_sync::infrastructure::memory_repository::InMemoryProductRepository;
use catalog_sync::reconcile;

struct VecSource(Vec<ScrapedProduct>);

#[async_trait::async_trait]
impl ProductSource for VecSource {
    async fn extract(&self) -> Result<ExtractionBatch, ExtractionError> {
        Ok(ExtractionBatch {
            records: self.0.clone(),
            rejected: Vec::new(),
        })
    }

    fn describe(&self) -> String {
        "generated".to_string()
    }
}

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

prop_compose! {
    fn arb_price()(cents in 0u32..100_000) -> Option<Price> {
        format!("{}.{:02}", cents / 100, cents % 100).parse().ok()
    }
}

prop_compose! {
    fn arb_product()(
        id in "[A-F]{1,2}",
        name in "[a-z ]{1,12}",
        price in arb_price(),
        category in prop::sample::select(vec!["Men", "Women", "Kids"]),
        is_sale in any::<bool>(),
        sizes in prop::collection::vec(prop::sample::select(vec!["XS", "S", "M", "L"]), 0..4),
    ) -> ScrapedProduct {
        ScrapedProduct::new(id.clone(), name, format!("https://shop/{id}"), category, base_time())
            .with_price(price)
            .with_sale(is_sale)
            .with_sizes(sizes.into_iter().map(String::from).collect())
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn second_run_of_same_batch_plans_nothing(batch in prop::collection::vec(arb_product(), 1..20)) {
        tokio_test::block_on(async {
            let repo = Arc::new(InMemoryProductRepository::new());
            let now = base_time();

            let first = SyncUseCase::new(Arc::new(VecSource(batch.clone())), repo.clone(), SyncOptions::default())
                .run_at(now)
                .await;
            prop_assert!(first.summary.is_success());

            let distinct: HashSet<&str> = batch.iter().map(|p| p.id.as_str()).collect();
            prop_assert_eq!(repo.count_products().await.unwrap(), distinct.len() as u64);

            let second = SyncUseCase::new(Arc::new(VecSource(batch.clone())), repo, SyncOptions::default())
                .run_at(now + Duration::hours(1))
                .await;
            let outcome = second.outcome.unwrap();
            prop_assert!(outcome.plan.is_empty());
            prop_assert_eq!(outcome.unchanged.len(), distinct.len());
            Ok(())
        })?;
    }

    #[test]
    fn every_distinct_id_lands_in_exactly_one_bucket(
        stored in prop::collection::vec(arb_product(), 0..10),
        batch in prop::collection::vec(arb_product(), 1..20),
    ) {
        let now = base_time() + Duration::days(1);
        let snapshot = ProductSnapshot::new(
            stored.into_iter().map(|p| PersistedProduct::first_seen(p, base_time())),
            now,
        );
        let outcome = reconcile(&batch, &snapshot, now).unwrap();

        let inserts: HashSet<&str> = outcome.plan.insert_ids().into_iter().collect();
        let updates: HashSet<&str> = outcome.plan.update_ids().into_iter().collect();
        let unchanged: HashSet<&str> = outcome.unchanged.iter().map(String::as_str).collect();
        let distinct: HashSet<&str> = batch.iter().map(|p| p.id.as_str()).collect();

        prop_assert_eq!(inserts.len() + updates.len() + unchanged.len(), distinct.len());
        prop_assert!(inserts.is_disjoint(&updates));
        prop_assert!(inserts.is_disjoint(&unchanged));
        prop_assert!(updates.is_disjoint(&unchanged));
        for id in &inserts {
            prop_assert!(snapshot.get(id).is_none());
        }
        for update in &outcome.plan.updates {
            prop_assert!(!update.changes.is_empty());
            prop_assert!(update.updated_at >= snapshot.get(&update.id).unwrap().created_at);
        }
    }
}
