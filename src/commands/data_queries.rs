//! Read-only commands: `stats`, `list`, `export`

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use std::path::Path;
use std::process::ExitCode;
use tracing::info;

use crate::commands::open_repository;
use crate::domain::product::{PersistedProduct, ProductQuery};
use crate::domain::repositories::ProductRepository;
use crate::domain::statistics::CatalogStatistics;
use crate::infrastructure::config::AppConfig;

/// Shape written by `export`, readable again by `sync --input`
#[derive(Debug, Serialize)]
pub struct ProductExport<'a> {
    pub exported_at: chrono::DateTime<Utc>,
    pub count: usize,
    pub products: &'a [PersistedProduct],
}

pub fn render_stats(stats: &CatalogStatistics) -> String {
    let mut out = String::new();
    out.push_str("\n📊 Catalog Statistics\n\n");
    out.push_str(&format!("  Total products:        {}\n", stats.total_products));
    out.push_str(&format!("  On sale:               {}\n", stats.sale_products));
    if let Some(latest) = stats.latest_scrape {
        out.push_str(&format!("  Latest scrape:         {}\n", latest.format("%Y-%m-%d %H:%M:%S UTC")));
    }

    out.push_str("\n  By category:\n");
    for (category, count) in &stats.by_category {
        out.push_str(&format!("    {category:<20} {count}\n"));
    }

    out.push_str("\n  By price:\n");
    for (label, count) in stats.price_ranges.rows() {
        out.push_str(&format!("    {label:<20} {count}\n"));
    }
    out
}

pub fn render_product_line(product: &PersistedProduct) -> String {
    let record = &product.record;
    let price = record
        .price
        .map_or_else(|| "-".to_string(), |p| p.to_string());
    let sale = if record.is_sale { " [SALE]" } else { "" };
    format!(
        "{:<14} {:<40} {:>10} {:<12}{}",
        record.id, record.name, price, record.category, sale
    )
}

pub async fn show_stats(config: &AppConfig) -> Result<ExitCode> {
    let repository = open_repository(config).await?;
    let stats = repository.get_statistics().await?;
    println!("{}", render_stats(&stats));
    Ok(ExitCode::SUCCESS)
}

pub async fn list_products(config: &AppConfig, category: Option<String>, limit: u32) -> Result<ExitCode> {
    let repository = open_repository(config).await?;
    let products = repository
        .list_products(&ProductQuery {
            category,
            limit: Some(limit),
        })
        .await?;

    if products.is_empty() {
        println!("No products stored yet. Run `catalog-sync sync` first.");
    }
    for product in &products {
        println!("{}", render_product_line(product));
    }
    Ok(ExitCode::SUCCESS)
}

pub async fn export_products(config: &AppConfig, output: Option<&Path>) -> Result<ExitCode> {
    let repository = open_repository(config).await?;
    let products = repository.list_products(&ProductQuery::default()).await?;

    let export = ProductExport {
        exported_at: Utc::now(),
        count: products.len(),
        products: &products,
    };
    let json = serde_json::to_string_pretty(&export)?;

    match output {
        Some(path) => {
            tokio::fs::write(path, json)
                .await
                .with_context(|| format!("Failed to write export to {}", path.display()))?;
            info!("💾 Exported {} products to {}", products.len(), path.display());
        }
        None => println!("{json}"),
    }
    Ok(ExitCode::SUCCESS)
}
