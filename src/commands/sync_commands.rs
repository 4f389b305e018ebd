//! `catalog-sync sync`

use anyhow::{Context, Result};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;

use crate::application::sync_use_case::{SyncOptions, SyncUseCase};
use crate::cli::SyncArgs;
use crate::commands::open_repository;
use crate::domain::repositories::ProductSource;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::extraction::{JsonFileSource, WebListingSource};

/// Builds the product source selected on the command line
pub fn build_source(config: &AppConfig, args: &SyncArgs) -> Result<Arc<dyn ProductSource>> {
    let extraction = &config.extraction;
    Ok(match &args.input {
        Some(path) => Arc::new(JsonFileSource::new(
            path.clone(),
            extraction.default_category.clone(),
            extraction.source_tag.clone(),
        )),
        None => Arc::new(
            WebListingSource::from_config(extraction, args.urls.clone())
                .context("Failed to set up listing extraction")?,
        ),
    })
}

/// Maps configuration and flags onto run options
pub fn sync_options(config: &AppConfig, args: &SyncArgs) -> SyncOptions {
    let cleanup_enabled = config.sync.cleanup_enabled && !args.no_cleanup;
    SyncOptions {
        dry_run: args.dry_run,
        refresh_seen_timestamps: config.sync.refresh_seen_timestamps,
        cleanup_days: cleanup_enabled.then(|| args.cleanup_days.unwrap_or(config.sync.cleanup_days)),
    }
}

pub async fn run_sync(config: &AppConfig, args: SyncArgs) -> Result<ExitCode> {
    let source = build_source(config, &args)?;
    let repository = Arc::new(open_repository(config).await?);
    let options = sync_options(config, &args);
    info!("Sync options: {:?}", options);

    let run = SyncUseCase::new(source, repository, options).run().await;

    if args.print_plan {
        if let Some(outcome) = &run.outcome {
            println!("{}", serde_json::to_string_pretty(outcome)?);
        }
    }

    Ok(if run.summary.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
