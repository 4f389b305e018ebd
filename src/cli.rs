//! Command line interface definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::infrastructure::config::AppConfig;

/// Extracts retailer product listings and keeps a product table in sync
#[derive(Parser, Debug)]
#[command(name = "catalog-sync", version, about)]
pub struct Cli {
    /// Config file (TOML/JSON); defaults to ./catalog-sync.toml when present
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Overrides database.url
    #[arg(long, global = true, env = "CATALOG_SYNC_DATABASE_URL", value_name = "URL")]
    pub database_url: Option<String>,

    /// Overrides logging.level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Global flags take precedence over file and environment settings
    pub fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(url) = &self.database_url {
            config.database.url.clone_from(url);
        }
        if let Some(level) = &self.log_level {
            config.logging.level.clone_from(level);
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Extract products and reconcile them with the store
    Sync(SyncArgs),

    /// Show catalog statistics
    Stats,

    /// List stored products, most recently seen first
    List {
        #[arg(long)]
        category: Option<String>,

        #[arg(long, default_value_t = 20)]
        limit: u32,
    },

    /// Export all stored products as JSON
    Export {
        /// Output file; stdout when omitted
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Delete products not seen for the given number of days
    Cleanup {
        #[arg(long)]
        days: Option<u32>,
    },

    /// Check database connectivity and schema
    Check,
}

#[derive(clap::Args, Debug, Default)]
pub struct SyncArgs {
    /// Listing page to extract (repeatable); overrides extraction.target_urls
    #[arg(long = "url", value_name = "URL", conflicts_with = "input")]
    pub urls: Vec<String>,

    /// Read records from a JSON file instead of fetching pages
    #[arg(long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Compute the plan without writing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Print the plan as JSON on stdout
    #[arg(long)]
    pub print_plan: bool,

    /// Skip retention cleanup after the sync
    #[arg(long)]
    pub no_cleanup: bool,

    /// Overrides sync.cleanup_days
    #[arg(long, value_name = "DAYS")]
    pub cleanup_days: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_sync_with_urls() {
        let cli = Cli::parse_from([
            "catalog-sync",
            "--database-url",
            "sqlite::memory:",
            "sync",
            "--url",
            "https://shop/a",
            "--url",
            "https://shop/b",
            "--dry-run",
        ]);
        assert_eq!(cli.database_url.as_deref(), Some("sqlite::memory:"));
        let Command::Sync(args) = cli.command else {
            panic!("expected sync");
        };
        assert_eq!(args.urls.len(), 2);
        assert!(args.dry_run);
        assert!(!args.print_plan);
    }

    #[test]
    fn test_url_and_input_conflict() {
        let result = Cli::try_parse_from([
            "catalog-sync",
            "sync",
            "--url",
            "https://shop/a",
            "--input",
            "products.json",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_global_flags_override_config() {
        let cli = Cli::parse_from(["catalog-sync", "stats", "--log-level", "debug"]);
        let mut config = AppConfig::default();
        let original_url = config.database.url.clone();

        cli.apply_overrides(&mut config);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.database.url, original_url);
    }

    #[test]
    fn test_list_defaults() {
        let cli = Cli::parse_from(["catalog-sync", "list", "--category", "Men"]);
        match cli.command {
            Command::List { category, limit } => {
                assert_eq!(category.as_deref(), Some("Men"));
                assert_eq!(limit, 20);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
