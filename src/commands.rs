//! CLI command handlers
//!
//! Each handler gets the loaded [`AppConfig`] and returns the process exit code.

pub mod data_queries;
pub mod db_cleanup;
pub mod db_diagnostics;
pub mod sync_commands;

use anyhow::{Context, Result};
use std::process::ExitCode;

use crate::cli::Command;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::database_connection::DatabaseConnection;
use crate::infrastructure::product_repository::SqliteProductRepository;

/// Opens the configured database and brings its schema up to date
pub async fn open_repository(config: &AppConfig) -> Result<SqliteProductRepository> {
    let db = DatabaseConnection::with_max_connections(&config.database.url, config.database.max_connections)
        .await
        .context("Failed to open product database")?;
    db.migrate().await?;
    Ok(SqliteProductRepository::new(db.into_pool()))
}

pub async fn dispatch(command: Command, config: &AppConfig) -> Result<ExitCode> {
    match command {
        Command::Sync(args) => sync_commands::run_sync(config, args).await,
        Command::Stats => data_queries::show_stats(config).await,
        Command::List { category, limit } => data_queries::list_products(config, category, limit).await,
        Command::Export { output } => data_queries::export_products(config, output.as_deref()).await,
        Command::Cleanup { days } => db_cleanup::cleanup_stale_products(config, days).await,
        Command::Check => db_diagnostics::check_database(config).await,
    }
}
