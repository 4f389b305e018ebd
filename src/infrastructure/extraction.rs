//! Extraction adapters: everything that turns the outside world into an
//! [`ExtractionBatch`](crate::domain::repositories::ExtractionBatch)

pub mod json_file_source;
pub mod listing_parser;
pub mod raw_product;
pub mod retry;
pub mod web_source;

pub use json_file_source::JsonFileSource;
pub use listing_parser::{ListingParser, ListingParserConfig};
pub use raw_product::{RawPrice, RawProduct, RecordDefaults};
pub use retry::RetryPolicy;
pub use web_source::WebListingSource;
