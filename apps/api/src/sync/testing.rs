//! In-memory stand-ins for the Google APIs used by the sync tests.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::google::{CalendarApi, EventPayload, GoogleError, SpreadsheetApi};

#[derive(Debug, Default)]
struct SheetData {
    modified: Option<DateTime<Utc>>,
    /// Data rows in B..J order; index 0 is sheet row 2.
    rows: Vec<[String; 9]>,
    cursor: Option<String>,
    absent_columns: HashSet<usize>,
    modified_calls: usize,
    column_requests: Vec<Vec<String>>,
    cursor_writes: Vec<String>,
}

/// A form-responses sheet. Writing the cursor bumps the modification time the
/// way Drive does.
#[derive(Debug, Default)]
pub struct FakeSheet {
    data: Mutex<SheetData>,
}

impl FakeSheet {
    pub fn new(modified: DateTime<Utc>) -> Self {
        Self {
            data: Mutex::new(SheetData {
                modified: Some(modified),
                ..SheetData::default()
            }),
        }
    }

    pub fn modified(&self) -> DateTime<Utc> {
        self.data.lock().unwrap().modified.unwrap()
    }

    pub fn touch(&self, by: Duration) {
        let mut data = self.data.lock().unwrap();
        data.modified = data.modified.map(|m| m + by);
    }

    /// Appends a submission and marks the sheet modified.
    pub fn push_row(&self, cells: [&str; 9]) {
        self.data
            .lock()
            .unwrap()
            .rows
            .push(cells.map(|c| c.to_string()));
        self.touch(Duration::seconds(1));
    }

    pub fn set_cursor(&self, value: &str) {
        self.data.lock().unwrap().cursor = Some(value.to_string());
    }

    pub fn drop_column(&self, index: usize) {
        self.data.lock().unwrap().absent_columns.insert(index);
    }

    pub fn cursor(&self) -> Option<String> {
        self.data.lock().unwrap().cursor.clone()
    }

    pub fn modified_calls(&self) -> usize {
        self.data.lock().unwrap().modified_calls
    }

    pub fn column_requests(&self) -> Vec<Vec<String>> {
        self.data.lock().unwrap().column_requests.clone()
    }

    pub fn cursor_writes(&self) -> Vec<String> {
        self.data.lock().unwrap().cursor_writes.clone()
    }
}

/// Splits `'Sheet'!C7:C` into (column index relative to B, start row).
fn parse_range(range: &str) -> (usize, usize) {
    let cell = range.rsplit('!').next().unwrap_or(range);
    let start = cell.split(':').next().unwrap_or(cell);
    let letters: String = start.chars().take_while(|c| c.is_ascii_alphabetic()).collect();
    let row: usize = start[letters.len()..].parse().unwrap();
    let column = (letters.as_bytes()[0] - b'B') as usize;
    (column, row)
}

#[async_trait]
impl SpreadsheetApi for FakeSheet {
    async fn modified_time(&self, _sheet_id: &str) -> Result<DateTime<Utc>, GoogleError> {
        let mut data = self.data.lock().unwrap();
        data.modified_calls += 1;
        data.modified.ok_or(GoogleError::Api {
            status: 404,
            message: "File not found".to_string(),
        })
    }

    async fn get_columns(
        &self,
        _sheet_id: &str,
        ranges: &[String],
    ) -> Result<Vec<Option<Vec<String>>>, GoogleError> {
        let mut data = self.data.lock().unwrap();
        data.column_requests.push(ranges.to_vec());
        let columns = ranges
            .iter()
            .map(|range| {
                let (column, row) = parse_range(range);
                if data.absent_columns.contains(&column) {
                    return None;
                }
                let mut values: Vec<String> = data
                    .rows
                    .iter()
                    .skip(row.saturating_sub(2))
                    .map(|cells| cells[column].clone())
                    .collect();
                while values.last().is_some_and(|v| v.is_empty()) {
                    values.pop();
                }
                (!values.is_empty()).then_some(values)
            })
            .collect();
        Ok(columns)
    }

    async fn get_cell(&self, _sheet_id: &str, _cell: &str) -> Result<Option<String>, GoogleError> {
        Ok(self.data.lock().unwrap().cursor.clone())
    }

    async fn update_cell(&self, _sheet_id: &str, _cell: &str, value: &str) -> Result<(), GoogleError> {
        {
            let mut data = self.data.lock().unwrap();
            data.cursor = Some(value.to_string());
            data.cursor_writes.push(value.to_string());
        }
        self.touch(Duration::seconds(1));
        Ok(())
    }
}

/// A calendar that accepts everything except the listed summaries.
#[derive(Debug, Default)]
pub struct FakeCalendar {
    fail_summaries: HashSet<String>,
    /// Each insert sleeps this long before answering.
    delay: Option<std::time::Duration>,
    inserted: Mutex<Vec<(String, EventPayload)>>,
}

impl FakeCalendar {
    pub fn failing_on(summaries: &[&str]) -> Self {
        Self {
            fail_summaries: summaries.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn slow(delay: std::time::Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn inserted(&self) -> Vec<(String, EventPayload)> {
        self.inserted.lock().unwrap().clone()
    }
}

#[async_trait]
impl CalendarApi for FakeCalendar {
    async fn insert_event(
        &self,
        calendar_id: &str,
        event: &EventPayload,
    ) -> Result<String, GoogleError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_summaries.contains(&event.summary) {
            return Err(GoogleError::Api {
                status: 503,
                message: "Backend Error".to_string(),
            });
        }
        let mut inserted = self.inserted.lock().unwrap();
        inserted.push((calendar_id.to_string(), event.clone()));
        Ok(format!("evt-{}", inserted.len()))
    }
}
