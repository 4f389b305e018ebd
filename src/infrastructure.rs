//! Infrastructure layer: configuration, logging, SQLite storage and the
//! extraction adapters

pub mod config;
pub mod database_connection;
pub mod extraction;
pub mod http_client;
pub mod logging;
pub mod memory_repository;
pub mod product_repository;

pub use config::{AppConfig, ConfigError};
pub use database_connection::DatabaseConnection;
pub use http_client::{HttpClient, HttpClientConfig};
pub use logging::init_logging_with_config;
pub use memory_repository::InMemoryProductRepository;
pub use product_repository::SqliteProductRepository;
