use clap::Parser;
use std::process::ExitCode;
use tracing::error;

use catalog_sync::cli::Cli;
use catalog_sync::commands;
use catalog_sync::infrastructure::config::AppConfig;
use catalog_sync::infrastructure::logging::{init_logging_with_config, log_system_info};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match AppConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };
    cli.apply_overrides(&mut config);
    if let Err(e) = config.validate() {
        eprintln!("Configuration error: {e}");
        return ExitCode::FAILURE;
    }

    if let Err(e) = init_logging_with_config(&config.logging) {
        eprintln!("Failed to initialize logging: {e:#}");
        return ExitCode::FAILURE;
    }
    log_system_info();

    match commands::dispatch(cli.command, &config).await {
        Ok(code) => code,
        Err(e) => {
            error!("❌ {:#}", e);
            ExitCode::FAILURE
        }
    }
}
