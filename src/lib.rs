//! Catalog Sync - retail product listing extraction and store reconciliation
//!
//! Products are extracted from listing pages (or a JSON export), compared with
//! what the product table already holds, and only the differences are written.

pub mod application;
pub mod cli;
pub mod commands;
pub mod domain;
pub mod infrastructure;

pub use application::{SyncOptions, SyncRun, SyncSummary, SyncUseCase};
pub use domain::services::reconciler::{ReconcileOutcome, reconcile};
