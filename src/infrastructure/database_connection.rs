// Database connection and pool management
// This module handles SQLite database connections using sqlx

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::infrastructure::config::defaults;

pub struct DatabaseConnection {
    pool: SqlitePool,
    in_memory: bool,
}

impl DatabaseConnection {
    pub async fn new(database_url: &str) -> Result<Self> {
        Self::with_max_connections(database_url, defaults::MAX_CONNECTIONS).await
    }

    pub async fn with_max_connections(database_url: &str, max_connections: u32) -> Result<Self> {
        let in_memory = is_in_memory(database_url);

        if !in_memory {
            // Create database file directory if it doesn't exist
            let db_path = database_url
                .trim_start_matches("sqlite://")
                .trim_start_matches("sqlite:");
            let db_path = db_path.split('?').next().unwrap_or(db_path);
            if let Some(parent) = Path::new(db_path).parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("Failed to create database directory {:?}", parent))?;
            }
        }

        let mut options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("Invalid database URL: {}", database_url))?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5));
        if !in_memory {
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        // An in-memory database lives as long as its single connection
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(max_connections.max(1))
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to connect to {}", database_url))?;

        debug!("Database pool ready: {}", database_url);
        Ok(Self { pool, in_memory })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub const fn is_in_memory(&self) -> bool {
        self.in_memory
    }

    pub fn into_pool(self) -> SqlitePool {
        self.pool
    }

    pub async fn migrate(&self) -> Result<()> {
        let create_products_sql = r"
            CREATE TABLE IF NOT EXISTS products (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                price TEXT,
                price_text TEXT,
                original_price TEXT,
                image_url TEXT,
                product_url TEXT NOT NULL,
                color TEXT,
                category TEXT NOT NULL,
                sizes TEXT NOT NULL DEFAULT '[]',
                is_sale BOOLEAN NOT NULL DEFAULT 0,
                description TEXT,
                source TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                scraped_at TEXT NOT NULL
            )
        ";

        let create_indexes_sql = [
            "CREATE INDEX IF NOT EXISTS idx_products_category ON products (category)",
            "CREATE INDEX IF NOT EXISTS idx_products_scraped_at ON products (scraped_at)",
            "CREATE INDEX IF NOT EXISTS idx_products_created_at ON products (created_at)",
            "CREATE INDEX IF NOT EXISTS idx_products_is_sale ON products (is_sale)",
        ];

        sqlx::query(create_products_sql)
            .execute(&self.pool)
            .await
            .context("Failed to create products table")?;
        for sql in create_indexes_sql {
            sqlx::query(sql)
                .execute(&self.pool)
                .await
                .with_context(|| format!("Failed to run: {}", sql))?;
        }

        info!("🗄️ Database schema is up to date");
        Ok(())
    }

    /// Round-trips a trivial query
    pub async fn health_check(&self) -> Result<()> {
        let one: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("Database health check failed")?;
        anyhow::ensure!(one == 1, "Unexpected health check result: {}", one);
        Ok(())
    }
}

fn is_in_memory(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}
