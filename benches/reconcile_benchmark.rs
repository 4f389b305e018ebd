//! Reconciliation throughput: pure diffing and a full sync against an in-memory store

use chrono::{Duration, Utc};
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use std::sync::Arc;
use tokio::runtime::Runtime;

use catalog_sync::application::{SyncOptions, SyncUseCase};
use catalog_sync::domain::errors::ExtractionError;
use catalog_sync::domain::product::{PersistedProduct, ScrapedProduct};
use catalog_sync::domain::repositories::{ExtractionBatch, ProductSource};
use catalog_sync::domain::snapshot::ProductSnapshot;
use catalog_sync::infrastructure::memory_repository::InMemoryProductRepository;
use catalog_sync::reconcile;

struct BenchSource(Vec<ScrapedProduct>);

#[async_trait::async_trait]
impl ProductSource for BenchSource {
    async fn extract(&self) -> Result<ExtractionBatch, ExtractionError> {
        Ok(ExtractionBatch {
            records: self.0.clone(),
            rejected: Vec::new(),
        })
    }

    fn describe(&self) -> String {
        "bench".to_string()
    }
}

fn batch(size: usize) -> Vec<ScrapedProduct> {
    let now = Utc::now();
    (0..size)
        .map(|i| {
            ScrapedProduct::new(format!("{i}"), format!("Product {i}"), format!("https://shop/p{i}.html"), "Men", now)
                .with_price(format!("{}.99", i % 300).parse().ok())
                .with_sizes(vec!["S".into(), "M".into(), "L".into()])
        })
        .collect()
}

fn reconcile_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconcile");
    for size in [100, 1_000, 10_000] {
        let records = batch(size);
        let earlier = Utc::now() - Duration::days(1);
        // every other stored product differs in price
        let snapshot = ProductSnapshot::new(
            records.iter().enumerate().map(|(i, r)| {
                let mut stored = r.clone();
                if i % 2 == 0 {
                    stored.price = "1.00".parse().ok();
                }
                PersistedProduct::first_seen(stored, earlier)
            }),
            Utc::now(),
        );

        group.bench_with_input(BenchmarkId::new("half_changed", size), &records, |b, records| {
            b.iter(|| black_box(reconcile(records, &snapshot, Utc::now())));
        });
    }
    group.finish();
}

fn sync_benchmark(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let records = batch(1_000);

    c.bench_function("sync 1000 new products (in-memory store)", |b| {
        b.to_async(&rt).iter(|| async {
            let use_case = SyncUseCase::new(
                Arc::new(BenchSource(records.clone())),
                Arc::new(InMemoryProductRepository::new()),
                SyncOptions::default(),
            );
            black_box(use_case.run().await)
        });
    });
}

criterion_group!(benches, reconcile_benchmark, sync_benchmark);
criterion_main!(benches);
