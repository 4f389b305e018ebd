//! Logging system configuration and initialization
//!
//! - Console output on stderr (stdout is reserved for command output)
//! - Optional daily-rotated log file
//! - Optional JSON formatting
//! - `RUST_LOG` overrides the configured filter

use anyhow::{Result, anyhow};
use once_cell::sync::OnceCell;
use std::path::PathBuf;
use tracing::info;
use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub use crate::infrastructure::config::LoggingConfig;
use crate::infrastructure::config::default_log_dir;

/// Rolling log file name prefix
pub const LOG_FILE_NAME: &str = "catalog-sync.log";

// Keeps the non-blocking file writer alive for the whole process
static LOG_GUARD: OnceCell<WorkerGuard> = OnceCell::new();

/// Directory the file layer writes into
pub fn get_log_directory(config: &LoggingConfig) -> PathBuf {
    config.log_dir.clone().unwrap_or_else(default_log_dir)
}

/// Builds the level filter.
///
/// Unless `trace` is requested, SQL statements and HTTP internals are kept quiet.
/// `RUST_LOG`, when set, wins over everything here:
/// ```bash
/// RUST_LOG="debug,sqlx::query=debug" catalog-sync sync
/// ```
pub fn build_env_filter(level: &str) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    let mut filter = EnvFilter::try_new(level)
        .map_err(|e| anyhow!("Invalid log level '{}': {}", level, e))?;

    if !level.to_lowercase().contains("trace") {
        for directive in [
            "sqlx::query=warn",
            "sqlx::sqlite=warn",
            "reqwest=info",
            "hyper=warn",
            "hyper_util=warn",
            "h2=warn",
            "html5ever=warn",
            "selectors=warn",
        ] {
            filter = filter.add_directive(directive.parse()?);
        }
    }

    Ok(filter)
}

/// Initialize logging with custom configuration.
///
/// Calling this twice is harmless: the second call finds a global subscriber
/// already installed and returns `Ok`.
pub fn init_logging_with_config(config: &LoggingConfig) -> Result<()> {
    if !config.console_output && !config.file_output {
        return Err(anyhow!("No logging output configured"));
    }

    let env_filter = build_env_filter(&config.level)?;
    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();

    let log_dir = get_log_directory(config);
    if config.file_output {
        std::fs::create_dir_all(&log_dir)
            .map_err(|e| anyhow!("Failed to create log directory {:?}: {}", log_dir, e))?;

        let (file_writer, guard) = non_blocking(rolling::daily(&log_dir, LOG_FILE_NAME));
        // Only the first initialization keeps its guard
        let _ = LOG_GUARD.set(guard);

        let file_layer = fmt::layer()
            .with_writer(file_writer)
            .with_ansi(false)
            .with_target(config.json_format)
            .with_file(false)
            .with_line_number(false);
        layers.push(if config.json_format {
            file_layer.json().boxed()
        } else {
            file_layer.boxed()
        });
    }

    if config.console_output {
        let console_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);
        layers.push(if config.json_format {
            console_layer.json().boxed()
        } else {
            console_layer.boxed()
        });
    }

    if tracing_subscriber::registry()
        .with(layers)
        .with(env_filter)
        .try_init()
        .is_err()
    {
        return Ok(());
    }

    info!("Logging system initialized");
    info!("Log level: {}", config.level);
    if config.file_output {
        info!("Log directory: {:?}", log_dir);
    }
    if config.level.to_lowercase().contains("trace") {
        info!("TRACE level active - SQL and HTTP internals will be shown");
    }

    Ok(())
}

/// Log system information for diagnostics
pub fn log_system_info() {
    info!("=== catalog-sync ===");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!("Operating system: {} ({})", std::env::consts::OS, std::env::consts::ARCH);
    if let Ok(current_dir) = std::env::current_dir() {
        info!("Working directory: {:?}", current_dir);
    }
}
