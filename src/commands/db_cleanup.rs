//! `catalog-sync cleanup`

use anyhow::{Result, ensure};
use chrono::{DateTime, Duration, Utc};
use std::process::ExitCode;
use tracing::info;

use crate::commands::open_repository;
use crate::domain::repositories::ProductRepository;
use crate::infrastructure::config::AppConfig;

/// Products last scraped before this instant are removed
pub fn retention_cutoff(now: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    now - Duration::days(i64::from(days))
}

pub async fn remove_stale_products(
    repository: &dyn ProductRepository,
    days: u32,
    now: DateTime<Utc>,
) -> Result<u64> {
    ensure!(days > 0, "Retention must be at least one day");
    let cutoff = retention_cutoff(now, days);
    let removed = repository.delete_scraped_before(cutoff).await?;
    info!("🧹 Removed {} products last seen before {}", removed, cutoff);
    Ok(removed)
}

pub async fn cleanup_stale_products(config: &AppConfig, days: Option<u32>) -> Result<ExitCode> {
    let repository = open_repository(config).await?;
    let days = days.unwrap_or(config.sync.cleanup_days);
    let removed = remove_stale_products(&repository, days, Utc::now()).await?;
    println!("Removed {removed} products not seen for {days} days");
    Ok(ExitCode::SUCCESS)
}
