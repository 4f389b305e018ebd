//! Run summary of a sync

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::domain::errors::SyncError;

/// Final state of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Everything planned was applied (or computed, for a dry run)
    Succeeded,
    /// Some writes failed; the others were applied
    PartiallyFailed,
    /// Nothing was applied: extraction or snapshot lookup failed
    Aborted,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncSummary {
    pub run_id: Uuid,
    pub source: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub dry_run: bool,
    pub status: RunStatus,
    pub extracted: usize,
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub rejected: usize,
    pub duplicates: usize,
    pub failed: usize,
    pub seen_refreshed: u64,
    pub cleaned_up: u64,
    pub plan_fingerprint: Option<String>,
    pub errors: Vec<String>,
}

impl SyncSummary {
    pub fn start(source: impl Into<String>, dry_run: bool, started_at: DateTime<Utc>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            source: source.into(),
            started_at,
            finished_at: None,
            dry_run,
            status: RunStatus::Succeeded,
            extracted: 0,
            inserted: 0,
            updated: 0,
            unchanged: 0,
            rejected: 0,
            duplicates: 0,
            failed: 0,
            seen_refreshed: 0,
            cleaned_up: 0,
            plan_fingerprint: None,
            errors: Vec::new(),
        }
    }

    pub fn abort(&mut self, error: impl ToString) {
        self.status = RunStatus::Aborted;
        self.errors.push(error.to_string());
    }

    /// Skipped record: listed with the errors, the run stays successful
    pub fn record_rejection(&mut self, error: &SyncError) {
        self.rejected += 1;
        self.errors.push(error.to_string());
    }

    pub fn record_failure(&mut self, error: impl ToString) {
        self.failed += 1;
        if self.status == RunStatus::Succeeded {
            self.status = RunStatus::PartiallyFailed;
        }
        self.errors.push(error.to_string());
    }

    pub fn finish(&mut self, finished_at: DateTime<Utc>) {
        self.finished_at = Some(finished_at);
    }

    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Succeeded
    }

    pub fn duration_ms(&self) -> Option<i64> {
        self.finished_at
            .map(|end| (end - self.started_at).num_milliseconds())
    }

    /// Labels of the insert/update counters; a dry run only plans them
    pub const fn action_labels(&self) -> (&'static str, &'static str) {
        if self.dry_run {
            ("Planned inserts", "Planned updates")
        } else {
            ("Inserted", "Updated")
        }
    }

    /// Writes the fixed summary block to the log
    pub fn log(&self) {
        info!("=== SYNC SUMMARY ===");
        info!("Run: {} ({})", self.run_id, if self.dry_run { "dry run" } else { "applied" });
        info!("Source: {}", self.source);
        info!("Extracted: {}", self.extracted);
        let (inserted_label, updated_label) = self.action_labels();
        info!("{}: {}", inserted_label, self.inserted);
        info!("{}: {}", updated_label, self.updated);
        info!("Unchanged: {}", self.unchanged);
        info!("Rejected: {}", self.rejected);
        if self.duplicates > 0 {
            warn!("Duplicate identifiers: {}", self.duplicates);
        }
        info!("Failed: {}", self.failed);
        if self.seen_refreshed > 0 {
            info!("Last-seen refreshed: {}", self.seen_refreshed);
        }
        if self.cleaned_up > 0 {
            info!("Removed by retention: {}", self.cleaned_up);
        }
        if let Some(fingerprint) = &self.plan_fingerprint {
            info!("Plan fingerprint: {}", fingerprint);
        }
        if let Some(ms) = self.duration_ms() {
            info!("Duration: {}ms", ms);
        }
        for message in &self.errors {
            error!("  - {}", message);
        }
        match self.status {
            RunStatus::Succeeded => info!("Status: ✅ succeeded"),
            RunStatus::PartiallyFailed => warn!("Status: ⚠️ partially failed"),
            RunStatus::Aborted => error!("Status: ❌ aborted"),
        }
        info!("====================");
    }
}
