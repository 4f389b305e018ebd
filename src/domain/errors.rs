//! Error taxonomy of a sync run

use thiserror::Error;

use super::product::RejectedRecord;

/// Errors surfaced by reconciliation and plan application
#[derive(Error, Debug, Clone)]
pub enum SyncError {
    /// Record cannot be reconciled; it is skipped and the batch continues
    #[error("Invalid record: {0}")]
    InvalidRecord(RejectedRecord),

    /// Store unreachable while reading the snapshot; the whole batch is aborted
    #[error("Product lookup failed: {message}")]
    LookupFailure { message: String },

    /// A single insert/update failed at apply time
    #[error("Write failed for product '{id}': {reason}")]
    WriteFailure { id: String, reason: String },

    /// The extraction adapter could not produce a batch
    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractionError),
}

impl SyncError {
    pub fn lookup(message: impl Into<String>) -> Self {
        Self::LookupFailure {
            message: message.into(),
        }
    }
}

/// Errors raised by product sources
#[derive(Error, Debug, Clone)]
pub enum ExtractionError {
    #[error("HTTP request failed for {url}: {message}")]
    Request { url: String, message: String },

    #[error("HTTP {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("All {attempts} attempts failed for {url}")]
    RetriesExhausted { url: String, attempts: u32 },

    #[error("Failed to read input '{path}': {message}")]
    Input { path: String, message: String },

    #[error("Failed to parse input: {message}")]
    Parse { message: String },

    #[error("No listing page could be fetched ({failed} failed)")]
    AllPagesFailed { failed: usize },

    #[error("Source configuration error: {message}")]
    Configuration { message: String },
}
