//! Application layer module
//!
//! Orchestrates the domain: runs the sync workflow and applies plans through
//! the repository port.

pub mod plan_executor;
pub mod summary;
pub mod sync_use_case;

pub use plan_executor::{ApplyReport, PlanExecutor};
pub use summary::{RunStatus, SyncSummary};
pub use sync_use_case::{SyncOptions, SyncRun, SyncUseCase};
