//! `catalog-sync check`

use anyhow::{Context, Result};
use serde::Serialize;
use std::process::ExitCode;
use tracing::{info, warn};

use crate::infrastructure::config::AppConfig;
use crate::infrastructure::database_connection::DatabaseConnection;

const EXPECTED_INDEXES: [&str; 4] = [
    "idx_products_category",
    "idx_products_scraped_at",
    "idx_products_is_sale",
    "idx_products_created_at",
];

#[derive(Debug, Clone, Serialize)]
pub struct DatabaseReport {
    pub database_url: String,
    pub in_memory: bool,
    pub products_table: bool,
    pub missing_indexes: Vec<String>,
    pub product_count: i64,
    pub journal_mode: String,
}

impl DatabaseReport {
    pub fn is_healthy(&self) -> bool {
        self.products_table && self.missing_indexes.is_empty()
    }
}

pub async fn diagnose(db: &DatabaseConnection, database_url: &str) -> Result<DatabaseReport> {
    db.health_check().await?;
    let pool = db.pool();

    let table_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'products'")
            .fetch_one(pool)
            .await?;

    let indexes: Vec<String> =
        sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type = 'index' AND tbl_name = 'products'")
            .fetch_all(pool)
            .await?;
    let missing_indexes = EXPECTED_INDEXES
        .iter()
        .filter(|expected| !indexes.iter().any(|name| name == *expected))
        .map(|s| s.to_string())
        .collect();

    let product_count = if table_count > 0 {
        sqlx::query_scalar("SELECT COUNT(*) FROM products").fetch_one(pool).await?
    } else {
        0
    };

    let journal_mode: String = sqlx::query_scalar("PRAGMA journal_mode")
        .fetch_one(pool)
        .await
        .context("Failed to read journal mode")?;

    Ok(DatabaseReport {
        database_url: database_url.to_string(),
        in_memory: db.is_in_memory(),
        products_table: table_count > 0,
        missing_indexes,
        product_count,
        journal_mode,
    })
}

pub async fn check_database(config: &AppConfig) -> Result<ExitCode> {
    let url = &config.database.url;
    let db = DatabaseConnection::with_max_connections(url, config.database.max_connections).await?;
    db.migrate().await?;
    let report = diagnose(&db, url).await?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    if report.is_healthy() {
        info!("✅ Database OK: {} products", report.product_count);
        Ok(ExitCode::SUCCESS)
    } else {
        warn!("Database schema incomplete after migration");
        Ok(ExitCode::FAILURE)
    }
}
