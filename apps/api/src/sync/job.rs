//! One sync cycle, end to end, plus the status kept between cycles.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info};

use super::change_detector::has_changed;
use super::progress::{commit, read_processed_count};
use super::publisher::{publish, CalendarTargets, PublishOutcome};
use super::reader::{read_rows, SheetLayout, FIRST_DATA_ROW};
use super::transform::transform_rows;
use super::{SyncError, SyncState};
use crate::config::SyncConfig;
use crate::google::{CalendarApi, SpreadsheetApi};

#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub sheet_id: String,
    pub layout: SheetLayout,
    pub targets: CalendarTargets,
    pub time_zone: Tz,
    pub cycle_timeout: Duration,
}

impl SyncSettings {
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            sheet_id: config.sheet_id.clone(),
            layout: SheetLayout {
                sheet_name: config.sheet_name.clone(),
                progress_cell: config.progress_cell.clone(),
            },
            targets: CalendarTargets {
                events: config.events_calendar_id.clone(),
                signups: config.signups_calendar_id.clone(),
            },
            time_zone: config.time_zone,
            cycle_timeout: config.cycle_timeout,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleOutcome {
    /// The spreadsheet was not modified since the last cycle.
    Unchanged,
    /// Modified, but no rows past the cursor.
    NoNewRows,
    Processed,
}

#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcome: CycleOutcome,
    pub start_row: Option<u32>,
    pub rows_processed: u32,
    pub published: Vec<PublishOutcome>,
}

impl CycleReport {
    fn empty(started_at: DateTime<Utc>, outcome: CycleOutcome, start_row: Option<u32>) -> Self {
        Self {
            started_at,
            finished_at: Utc::now(),
            outcome,
            start_row,
            rows_processed: 0,
            published: Vec::new(),
        }
    }

    pub fn failed_count(&self) -> usize {
        self.published.iter().filter(|p| !p.is_published()).count()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CycleFailure {
    pub at: DateTime<Utc>,
    pub message: String,
}

/// What `GET /api/v1/sync/status` reports.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncStatus {
    pub last_modified: Option<DateTime<Utc>>,
    pub last_report: Option<CycleReport>,
    pub last_error: Option<CycleFailure>,
}

/// Owns the detection state and runs cycles one at a time.
pub struct SyncJob {
    sheets: Arc<dyn SpreadsheetApi>,
    calendar: Arc<dyn CalendarApi>,
    settings: SyncSettings,
    /// Held for the whole cycle; doubles as the non-reentrant guard.
    state: Mutex<SyncState>,
    status: RwLock<SyncStatus>,
}

impl SyncJob {
    pub fn new(
        sheets: Arc<dyn SpreadsheetApi>,
        calendar: Arc<dyn CalendarApi>,
        settings: SyncSettings,
    ) -> Self {
        Self {
            sheets,
            calendar,
            settings,
            state: Mutex::new(SyncState::default()),
            status: RwLock::new(SyncStatus::default()),
        }
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    pub async fn status(&self) -> SyncStatus {
        self.status.read().await.clone()
    }

    /// Runs one cycle. Fails fast with `AlreadyRunning` instead of queueing
    /// behind a cycle that is still in flight.
    pub async fn run_cycle(&self) -> Result<CycleReport, SyncError> {
        let mut state = self.state.try_lock().map_err(|_| SyncError::AlreadyRunning)?;
        let started_at = Utc::now();
        let timeout = self.settings.cycle_timeout;

        let result = tokio::time::timeout(timeout, self.execute(&mut state, started_at))
            .await
            .unwrap_or(Err(SyncError::Timeout(timeout)));

        let mut status = self.status.write().await;
        status.last_modified = state.last_modified;
        match &result {
            Ok(report) => status.last_report = Some(report.clone()),
            Err(e) => {
                status.last_error = Some(CycleFailure {
                    at: Utc::now(),
                    message: e.to_string(),
                })
            }
        }
        result
    }

    /// Timer entry point: runs a cycle and logs the result.
    pub async fn tick(&self) {
        match self.run_cycle().await {
            Ok(report) if report.outcome == CycleOutcome::Processed => info!(
                "Sync cycle processed {} row(s) from row {:?}, {} publish failure(s)",
                report.rows_processed,
                report.start_row,
                report.failed_count()
            ),
            Ok(report) => debug!("Sync cycle finished: {:?}", report.outcome),
            Err(SyncError::AlreadyRunning) => debug!("Previous sync cycle still running; skipping"),
            Err(e) => error!("Sync cycle aborted: {e}"),
        }
    }

    async fn execute(
        &self,
        state: &mut SyncState,
        started_at: DateTime<Utc>,
    ) -> Result<CycleReport, SyncError> {
        let sheets = self.sheets.as_ref();
        let sheet_id = self.settings.sheet_id.as_str();

        if !has_changed(sheets, sheet_id, state).await? {
            return Ok(CycleReport::empty(started_at, CycleOutcome::Unchanged, None));
        }

        let cursor_cell = self.settings.layout.progress_range();
        let processed = read_processed_count(sheets, sheet_id, &cursor_cell).await?;
        let start_row = processed
            .checked_add(FIRST_DATA_ROW)
            .ok_or_else(|| SyncError::InvalidCursor(processed.to_string()))?;

        let Some(rows) = read_rows(sheets, sheet_id, &self.settings.layout, start_row).await? else {
            return Ok(CycleReport::empty(
                started_at,
                CycleOutcome::NoNewRows,
                Some(start_row),
            ));
        };

        let events = transform_rows(&rows, start_row, self.settings.time_zone)?;
        // Checked before publishing so an unusable cursor never publishes.
        let rows_processed = u32::try_from(rows.len())
            .ok()
            .and_then(|n| processed.checked_add(n).map(|total| (n, total)));
        let Some((rows_processed, new_count)) = rows_processed else {
            return Err(SyncError::InvalidCursor(processed.to_string()));
        };

        let published = publish(self.calendar.as_ref(), &self.settings.targets, &events).await;

        // Failed inserts still count as processed.
        commit(sheets, sheet_id, &cursor_cell, new_count).await?;

        Ok(CycleReport {
            started_at,
            finished_at: Utc::now(),
            outcome: CycleOutcome::Processed,
            start_row: Some(start_row),
            rows_processed,
            published,
        })
    }
}
