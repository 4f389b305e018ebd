//! Domain module - catalog records, change detection and the write plan
//!
//! Everything in here is storage-agnostic. The application layer wires the
//! ports in [`repositories`] to concrete adapters from `infrastructure`.

pub mod errors;
pub mod plan;
pub mod price;
pub mod product;
pub mod repositories;
pub mod services;
pub mod snapshot;
pub mod statistics;

pub use errors::{ExtractionError, SyncError};
pub use plan::{FieldChange, Plan, ProductField, ProductUpdate};
pub use price::{Price, PriceError};
pub use product::{PersistedProduct, ProductQuery, RejectedRecord, ScrapedProduct};
pub use repositories::{ExtractionBatch, ProductRepository, ProductSource};
pub use snapshot::{ProductLookup, ProductSnapshot};
pub use statistics::{CatalogStatistics, PriceBuckets};
