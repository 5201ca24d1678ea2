//! Spreadsheet → Google Calendar sync.
//!
//! Flow per cycle: change_detector → progress (read cursor) → reader →
//! transform → publisher → progress (commit cursor).
//!
//! Delivery is best-effort and at-most-once per successful cycle: a failed
//! calendar insert is logged and its row is still counted as processed. If the
//! cursor write fails, the next changed cycle re-reads the same rows and may
//! publish duplicates.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::google::GoogleError;

pub mod change_detector;
pub mod handlers;
pub mod job;
pub mod progress;
pub mod publisher;
pub mod reader;
pub mod scheduler;
pub mod transform;

#[cfg(test)]
pub(crate) mod testing;

pub use job::{SyncJob, SyncSettings};
pub use publisher::CalendarTargets;
pub use reader::SheetLayout;
pub use transform::TransformError;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Google API error: {0}")]
    Google(#[from] GoogleError),

    #[error("Transform error: {0}")]
    Transform(#[from] TransformError),

    #[error("Progress cell holds '{0}', expected a row count")]
    InvalidCursor(String),

    #[error("A sync cycle is already running")]
    AlreadyRunning,

    #[error("Sync cycle exceeded {0:?}")]
    Timeout(std::time::Duration),
}

/// Detection state carried between cycles. Lives only in memory: after a
/// restart the first cycle always sees the spreadsheet as changed, and the
/// persisted row cursor keeps that cycle from re-publishing old rows.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncState {
    pub last_modified: Option<DateTime<Utc>>,
}
