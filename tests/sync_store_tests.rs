//! End-to-end sync runs against a file-backed SQLite store

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::Arc;
use tempfile::TempDir;

use catalog_sync::application::{RunStatus, SyncOptions, SyncUseCase};
use catalog_sync::domain::errors::ExtractionError;
use catalog_sync::domain::product::{ProductQuery, ScrapedProduct};
use catalog_sync::domain::repositories::{ExtractionBatch, ProductRepository, ProductSource};
use catalog_sync::infrastructure::database_connection::DatabaseConnection;
use catalog_sync::infrastructure::extraction::raw_product::{RecordDefaults, into_batch};
use catalog_sync::infrastructure::extraction::{JsonFileSource, ListingParser, ListingParserConfig};
use catalog_sync::infrastructure::product_repository::SqliteProductRepository;

struct StaticSource(Vec<ScrapedProduct>);

#[async_trait]
impl ProductSource for StaticSource {
    async fn extract(&self) -> Result<ExtractionBatch, ExtractionError> {
        Ok(ExtractionBatch {
            records: self.0.clone(),
            rejected: Vec::new(),
        })
    }

    fn describe(&self) -> String {
        format!("{} static records", self.0.len())
    }
}

/// Listing HTML run through the real parser, without the network
struct ListingPages(Vec<String>);

#[async_trait]
impl ProductSource for ListingPages {
    async fn extract(&self) -> Result<ExtractionBatch, ExtractionError> {
        let parser = ListingParser::new(ListingParserConfig {
            base_url: "https://www.zara.com".into(),
            max_products: 0,
        })?;
        let raws = self
            .0
            .iter()
            .flat_map(|html| parser.parse(html, "https://www.zara.com/tn/fr/homme-l1.html"))
            .collect();
        let defaults = RecordDefaults {
            category: "Men".into(),
            source: Some("zara".into()),
            scraped_at: Utc::now(),
        };
        Ok(into_batch(raws, &defaults))
    }

    fn describe(&self) -> String {
        format!("{} listing pages", self.0.len())
    }
}

async fn file_store(dir: &TempDir) -> Arc<SqliteProductRepository> {
    let url = format!("sqlite://{}", dir.path().join("catalog.db").display());
    let db = DatabaseConnection::new(&url).await.unwrap();
    db.migrate().await.unwrap();
    Arc::new(SqliteProductRepository::new(db.into_pool()))
}

fn at(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, hour, 0, 0).unwrap()
}

fn product(id: &str, price: &str, scraped_at: DateTime<Utc>) -> ScrapedProduct {
    ScrapedProduct::new(id, format!("Product {id}"), format!("https://shop/p-{id}"), "Men", scraped_at)
        .with_price(price.parse().ok())
        .with_sizes(vec!["S".into(), "M".into()])
}

async fn sync(
    records: Vec<ScrapedProduct>,
    repo: Arc<SqliteProductRepository>,
    now: DateTime<Utc>,
) -> catalog_sync::SyncRun {
    SyncUseCase::new(Arc::new(StaticSource(records)), repo, SyncOptions::default())
        .run_at(now)
        .await
}

#[tokio::test]
async fn repeated_batch_produces_empty_plan() {
    let dir = tempfile::tempdir().unwrap();
    let repo = file_store(&dir).await;
    let batch = vec![product("A", "19.99", at(8)), product("B", "5.00", at(8))];

    let first = sync(batch.clone(), repo.clone(), at(8)).await;
    assert_eq!(first.summary.inserted, 2);

    let second = sync(batch, repo.clone(), at(9)).await;
    let outcome = second.outcome.unwrap();
    assert!(outcome.plan.is_empty(), "{:?}", outcome.plan);
    assert_eq!(second.summary.unchanged, 2);
    assert_eq!(repo.count_products().await.unwrap(), 2);
}

#[tokio::test]
async fn trailing_zero_price_is_not_a_change() {
    let dir = tempfile::tempdir().unwrap();
    let repo = file_store(&dir).await;

    sync(vec![product("A", "20.00", at(8))], repo.clone(), at(8)).await;
    let run = sync(vec![product("A", "20", at(9))], repo, at(9)).await;

    assert!(run.outcome.unwrap().plan.is_empty());
}

#[tokio::test]
async fn update_preserves_created_at() {
    let dir = tempfile::tempdir().unwrap();
    let repo = file_store(&dir).await;

    sync(vec![product("A", "19.99", at(8))], repo.clone(), at(8)).await;
    let run = sync(vec![product("A", "14.99", at(10))], repo.clone(), at(10)).await;
    assert_eq!(run.summary.updated, 1);

    let stored = repo.find_product("A").await.unwrap().unwrap();
    assert_eq!(stored.created_at, at(8));
    assert_eq!(stored.updated_at, at(10));
    assert_eq!(stored.record.price, "14.99".parse().ok());
    assert_eq!(stored.record.sizes, vec!["S", "M"]);
}

#[tokio::test]
async fn failed_write_leaves_other_products_applied() {
    let dir = tempfile::tempdir().unwrap();
    let repo = file_store(&dir).await;
    sync(vec![product("A", "1.00", at(8)), product("B", "1.00", at(8))], repo.clone(), at(8)).await;

    sqlx::query(
        "CREATE TRIGGER block_b BEFORE UPDATE ON products WHEN OLD.id = 'B' \
         BEGIN SELECT RAISE(ABORT, 'row is locked'); END",
    )
    .execute(repo.pool())
    .await
    .unwrap();

    let run = sync(
        vec![product("A", "2.00", at(9)), product("B", "2.00", at(9))],
        repo.clone(),
        at(9),
    )
    .await;

    assert_eq!(run.summary.status, RunStatus::PartiallyFailed);
    assert_eq!(run.summary.updated, 1);
    assert_eq!(run.summary.failed, 1);
    assert!(run.summary.errors[0].contains("'B'"));

    let a = repo.find_product("A").await.unwrap().unwrap();
    let b = repo.find_product("B").await.unwrap().unwrap();
    assert_eq!(a.record.price, "2".parse().ok());
    assert_eq!(b.record.price, "1".parse().ok());
}

#[tokio::test]
async fn retention_removes_products_missing_from_recent_runs() {
    let dir = tempfile::tempdir().unwrap();
    let repo = file_store(&dir).await;
    let start = at(8);
    sync(vec![product("A", "1", start), product("B", "1", start)], repo.clone(), start).await;

    let later = start + Duration::days(40);
    let options = SyncOptions {
        dry_run: false,
        refresh_seen_timestamps: true,
        cleanup_days: Some(30),
    };
    let run = SyncUseCase::new(Arc::new(StaticSource(vec![product("A", "1", later)])), repo.clone(), options)
        .run_at(later)
        .await;

    assert!(run.summary.is_success());
    assert_eq!(run.summary.cleaned_up, 1);
    let remaining = repo.list_products(&ProductQuery::default()).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id(), "A");
    assert_eq!(remaining[0].record.scraped_at, later);
}

#[tokio::test]
async fn json_file_batch_is_synced() {
    let dir = tempfile::tempdir().unwrap();
    let repo = file_store(&dir).await;
    let input = dir.path().join("products.json");
    std::fs::write(
        &input,
        r#"{"products": [
            {"id": "100", "name": "Wool Coat", "price": "129.90", "url": "https://shop/wool-coat-p100.html", "sizes": ["M"]},
            {"id": "101", "name": "Scarf", "price": 19.5, "url": "https://shop/scarf-p101.html", "category": "Accessories"},
            {"id": "", "name": "Nameless id", "price": "1", "url": "https://shop/x"},
            {"id": "102", "price": "9.99", "url": "https://shop/no-name"}
        ]}"#,
    )
    .unwrap();

    let source = Arc::new(JsonFileSource::new(&input, "Women", Some("fixture".to_string())));
    let run = SyncUseCase::new(source, repo.clone(), SyncOptions::default()).run().await;

    assert!(run.summary.is_success(), "{:?}", run.summary.errors);
    assert_eq!(run.summary.extracted, 4);
    assert_eq!(run.summary.inserted, 2);
    assert_eq!(run.summary.rejected, 2);

    let stats = repo.get_statistics().await.unwrap();
    assert_eq!(stats.total_products, 2);
    assert_eq!(stats.by_category.get("Women"), Some(&1));
    assert_eq!(stats.by_category.get("Accessories"), Some(&1));

    let coat = repo.find_product("100").await.unwrap().unwrap();
    assert_eq!(coat.record.source.as_deref(), Some("fixture"));
}

#[tokio::test]
async fn reformatted_listing_pages_sync_without_changes() {
    let dir = tempfile::tempdir().unwrap();
    let repo = file_store(&dir).await;

    let first_render = vec![
        r#"<script type="application/ld+json">
           {"@type": "ItemList", "itemListElement": [
             {"item": {"@type": "Product", "productID": "A", "name": "Tee",
                       "url": "/tn/fr/tee-p001.html",
                       "offers": {"price": "19.99", "priceCurrency": "TND", "size": ["S", "M"]}}}]}
           </script>"#
            .to_string(),
        r#"<div class="product-item" data-productid="B">
             <a href="/tn/fr/cap-p002.html"><h3>Cap</h3></a>
             <span class="price">29,90 TND</span>
           </div>"#
            .to_string(),
    ];
    let second_render = vec![
        r#"<script type="application/ld+json">
           {"@type": "ItemList", "itemListElement": [
             {"item": {"@type": "Product", "productID": "A", "name": "Tee",
                       "url": "/tn/fr/tee-p001.html",
                       "offers": {"price": 19.990, "priceCurrency": "TND", "size": ["S", "M"]}}}]}
           </script>"#
            .to_string(),
        r#"<div class="product-item" data-productid="B">
             <a href="/tn/fr/cap-p002.html"><h3> Cap </h3></a>
             <span class="price">
               29,90
               <small>TND</small>
             </span>
           </div>"#
            .to_string(),
    ];

    let first = SyncUseCase::new(Arc::new(ListingPages(first_render)), repo.clone(), SyncOptions::default())
        .run_at(at(8))
        .await;
    assert_eq!(first.summary.inserted, 2, "{:?}", first.summary.errors);

    let second = SyncUseCase::new(Arc::new(ListingPages(second_render)), repo, SyncOptions::default())
        .run_at(at(9))
        .await;
    let outcome = second.outcome.unwrap();
    assert!(outcome.plan.is_empty(), "{:?}", outcome.plan);
    assert_eq!(second.summary.unchanged, 2);
}

#[tokio::test]
async fn products_seen_again_survive_retention_without_seen_refresh() {
    let dir = tempfile::tempdir().unwrap();
    let repo = file_store(&dir).await;
    let start = at(8);
    sync(vec![product("A", "1", start)], repo.clone(), start).await;

    let later = start + Duration::days(40);
    let options = SyncOptions {
        dry_run: false,
        refresh_seen_timestamps: false,
        cleanup_days: Some(30),
    };
    let run = SyncUseCase::new(Arc::new(StaticSource(vec![product("A", "1", later)])), repo.clone(), options)
        .run_at(later)
        .await;

    assert_eq!(run.summary.unchanged, 1);
    assert_eq!(run.summary.cleaned_up, 0);
    assert_eq!(repo.count_products().await.unwrap(), 1);
}
