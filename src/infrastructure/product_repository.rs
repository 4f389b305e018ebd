//! SQLite implementation of [`ProductRepository`]
//!
//! Prices are stored as normalized decimal TEXT, sizes as a JSON array and
//! timestamps as fixed-width RFC 3339 strings (microsecond precision, `Z`
//! suffix) so that lexicographic order in SQL matches time order.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use crate::domain::plan::{FieldChange, ProductUpdate};
use crate::domain::price::Price;
use crate::domain::product::{PersistedProduct, ProductQuery, ScrapedProduct};
use crate::domain::repositories::ProductRepository;
use crate::domain::snapshot::ProductSnapshot;
use crate::domain::statistics::{CatalogStatistics, PriceBuckets};

/// SQLite caps bound parameters per statement; IN lists are chunked below it
const ID_CHUNK_SIZE: usize = 500;

const PRODUCT_COLUMNS: &str = "id, name, price, price_text, original_price, image_url, \
     product_url, color, category, sizes, is_sale, description, source, \
     created_at, updated_at, scraped_at";

#[derive(Clone)]
pub struct SqliteProductRepository {
    pool: Arc<SqlitePool>,
}

impl SqliteProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool: Arc::new(pool) }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

pub(crate) fn encode_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_timestamp(column: &str, value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("Invalid {} timestamp: {}", column, value))
}

fn encode_price(price: Option<Price>) -> Option<String> {
    price.map(|p| p.normalized())
}

fn decode_price(column: &str, value: Option<String>) -> Result<Option<Price>> {
    value
        .map(|text| {
            text.parse::<Price>()
                .with_context(|| format!("Invalid {} value: {}", column, text))
        })
        .transpose()
}

fn encode_sizes(sizes: &[String]) -> Result<String> {
    serde_json::to_string(sizes).context("Failed to encode sizes")
}

fn row_to_product(row: &SqliteRow) -> Result<PersistedProduct> {
    let id: String = row.try_get("id")?;
    let sizes_json: String = row.try_get("sizes")?;
    let sizes: Vec<String> = serde_json::from_str(&sizes_json)
        .with_context(|| format!("Invalid sizes for product {}: {}", id, sizes_json))?;

    let scraped_at: String = row.try_get("scraped_at")?;
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;

    let record = ScrapedProduct {
        name: row.try_get("name")?,
        price: decode_price("price", row.try_get("price")?)?,
        price_text: row.try_get("price_text")?,
        original_price: decode_price("original_price", row.try_get("original_price")?)?,
        image_url: row.try_get("image_url")?,
        product_url: row.try_get("product_url")?,
        color: row.try_get("color")?,
        category: row.try_get("category")?,
        is_sale: row.try_get("is_sale")?,
        sizes,
        description: row.try_get("description")?,
        source: row.try_get("source")?,
        scraped_at: decode_timestamp("scraped_at", &scraped_at)?,
        id,
    };

    Ok(PersistedProduct {
        record,
        created_at: decode_timestamp("created_at", &created_at)?,
        updated_at: decode_timestamp("updated_at", &updated_at)?,
    })
}

fn push_change(builder: &mut QueryBuilder<'_, Sqlite>, change: &FieldChange) -> Result<()> {
    builder.push(change.field().column()).push(" = ");
    match change {
        FieldChange::Name(v) | FieldChange::Category(v) => {
            builder.push_bind(v.clone());
        }
        FieldChange::Price(v) | FieldChange::OriginalPrice(v) => {
            builder.push_bind(encode_price(*v));
        }
        FieldChange::PriceText(v) | FieldChange::ImageUrl(v) | FieldChange::Color(v) => {
            builder.push_bind(v.clone());
        }
        FieldChange::IsSale(v) => {
            builder.push_bind(*v);
        }
        FieldChange::Sizes(v) => {
            builder.push_bind(encode_sizes(v)?);
        }
    }
    Ok(())
}

#[async_trait]
impl ProductRepository for SqliteProductRepository {
    async fn load_snapshot(&self, ids: &[String]) -> Result<ProductSnapshot> {
        let taken_at = Utc::now();
        let mut products = Vec::with_capacity(ids.len());

        for chunk in ids.chunks(ID_CHUNK_SIZE) {
            let mut builder = QueryBuilder::<Sqlite>::new(format!(
                "SELECT {} FROM products WHERE id IN (",
                PRODUCT_COLUMNS
            ));
            let mut separated = builder.separated(", ");
            for id in chunk {
                separated.push_bind(id.as_str());
            }
            separated.push_unseparated(")");

            let rows = builder
                .build()
                .fetch_all(self.pool.as_ref())
                .await
                .context("Failed to read product snapshot")?;
            for row in &rows {
                products.push(row_to_product(row)?);
            }
        }

        debug!("Snapshot loaded: {} of {} identifiers stored", products.len(), ids.len());
        Ok(ProductSnapshot::new(products, taken_at))
    }

    async fn find_product(&self, id: &str) -> Result<Option<PersistedProduct>> {
        let sql = format!("SELECT {} FROM products WHERE id = ?", PRODUCT_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(self.pool.as_ref())
            .await
            .with_context(|| format!("Failed to load product {}", id))?;

        row.as_ref().map(row_to_product).transpose()
    }

    async fn insert_product(&self, product: &PersistedProduct) -> Result<()> {
        let record = &product.record;
        let sql = format!(
            "INSERT INTO products ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            PRODUCT_COLUMNS
        );

        sqlx::query(&sql)
            .bind(&record.id)
            .bind(&record.name)
            .bind(encode_price(record.price))
            .bind(&record.price_text)
            .bind(encode_price(record.original_price))
            .bind(&record.image_url)
            .bind(&record.product_url)
            .bind(&record.color)
            .bind(&record.category)
            .bind(encode_sizes(&record.sizes)?)
            .bind(record.is_sale)
            .bind(&record.description)
            .bind(&record.source)
            .bind(encode_timestamp(product.created_at))
            .bind(encode_timestamp(product.updated_at))
            .bind(encode_timestamp(record.scraped_at))
            .execute(self.pool.as_ref())
            .await
            .with_context(|| format!("Failed to insert product {}", record.id))?;

        Ok(())
    }

    async fn update_product(&self, update: &ProductUpdate) -> Result<bool> {
        let mut builder = QueryBuilder::<Sqlite>::new("UPDATE products SET ");
        for change in &update.changes {
            push_change(&mut builder, change)?;
            builder.push(", ");
        }
        builder
            .push("updated_at = ")
            .push_bind(encode_timestamp(update.updated_at))
            .push(" WHERE id = ")
            .push_bind(update.id.as_str());

        let result = builder
            .build()
            .execute(self.pool.as_ref())
            .await
            .with_context(|| format!("Failed to update product {}", update.id))?;

        Ok(result.rows_affected() > 0)
    }

    async fn mark_seen(&self, ids: &[String], seen_at: DateTime<Utc>) -> Result<u64> {
        let seen_at = encode_timestamp(seen_at);
        let mut touched = 0;

        for chunk in ids.chunks(ID_CHUNK_SIZE) {
            let mut builder = QueryBuilder::<Sqlite>::new("UPDATE products SET scraped_at = ");
            builder.push_bind(seen_at.as_str()).push(" WHERE id IN (");
            let mut separated = builder.separated(", ");
            for id in chunk {
                separated.push_bind(id.as_str());
            }
            separated.push_unseparated(")");

            touched += builder
                .build()
                .execute(self.pool.as_ref())
                .await
                .context("Failed to refresh last-seen timestamps")?
                .rows_affected();
        }

        Ok(touched)
    }

    async fn list_products(&self, query: &ProductQuery) -> Result<Vec<PersistedProduct>> {
        let mut builder =
            QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM products", PRODUCT_COLUMNS));
        if let Some(category) = &query.category {
            builder.push(" WHERE category = ").push_bind(category.as_str());
        }
        builder.push(" ORDER BY scraped_at DESC, id ASC");
        if let Some(limit) = query.limit {
            builder.push(" LIMIT ").push_bind(i64::from(limit));
        }

        let rows = builder
            .build()
            .fetch_all(self.pool.as_ref())
            .await
            .context("Failed to list products")?;

        rows.iter().map(row_to_product).collect()
    }

    async fn count_products(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(self.pool.as_ref())
            .await
            .context("Failed to count products")?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    async fn get_statistics(&self) -> Result<CatalogStatistics> {
        let pool = self.pool.as_ref();

        let by_category: BTreeMap<String, u64> = sqlx::query(
            "SELECT category, COUNT(*) AS total FROM products GROUP BY category ORDER BY category",
        )
        .fetch_all(pool)
        .await
        .context("Failed to count products per category")?
        .iter()
        .map(|row| -> Result<(String, u64)> {
            let total: i64 = row.try_get("total")?;
            Ok((row.try_get("category")?, u64::try_from(total).unwrap_or_default()))
        })
        .collect::<Result<_>>()?;

        let summary = sqlx::query(
            r"
            SELECT
                COUNT(*) AS total,
                COALESCE(SUM(CASE WHEN is_sale THEN 1 ELSE 0 END), 0) AS on_sale,
                COALESCE(SUM(CASE WHEN price IS NULL THEN 1 ELSE 0 END), 0) AS unpriced,
                COALESCE(SUM(CASE WHEN CAST(price AS REAL) < 50 THEN 1 ELSE 0 END), 0) AS under_50,
                COALESCE(SUM(CASE WHEN CAST(price AS REAL) >= 50 AND CAST(price AS REAL) < 100 THEN 1 ELSE 0 END), 0) AS from_50_to_100,
                COALESCE(SUM(CASE WHEN CAST(price AS REAL) >= 100 AND CAST(price AS REAL) < 200 THEN 1 ELSE 0 END), 0) AS from_100_to_200,
                COALESCE(SUM(CASE WHEN CAST(price AS REAL) >= 200 THEN 1 ELSE 0 END), 0) AS over_200,
                MAX(scraped_at) AS latest_scrape
            FROM products
            ",
        )
        .fetch_one(pool)
        .await
        .context("Failed to compute catalog statistics")?;

        let count = |column: &str| -> Result<u64> {
            let value: i64 = summary.try_get(column)?;
            Ok(u64::try_from(value).unwrap_or_default())
        };
        let latest_scrape: Option<String> = summary.try_get("latest_scrape")?;

        Ok(CatalogStatistics {
            total_products: count("total")?,
            by_category,
            sale_products: count("on_sale")?,
            price_ranges: PriceBuckets {
                under_50: count("under_50")?,
                from_50_to_100: count("from_50_to_100")?,
                from_100_to_200: count("from_100_to_200")?,
                over_200: count("over_200")?,
                unpriced: count("unpriced")?,
            },
            latest_scrape: latest_scrape
                .map(|value| decode_timestamp("scraped_at", &value))
                .transpose()?,
        })
    }

    async fn delete_scraped_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM products WHERE scraped_at < ?")
            .bind(encode_timestamp(cutoff))
            .execute(self.pool.as_ref())
            .await
            .context("Failed to delete stale products")?;
        Ok(result.rows_affected())
    }
}
