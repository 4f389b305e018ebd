//! Domain services
//!
//! Business logic that doesn't belong to a single record.

pub mod reconciler;

pub use reconciler::{diff_product, reconcile, ReconcileOutcome};
