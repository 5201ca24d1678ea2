use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{GoogleClient, GoogleError};

/// Read/write access to the submissions spreadsheet.
#[async_trait]
pub trait SpreadsheetApi: Send + Sync {
    /// Last-modified instant of the spreadsheet file.
    async fn modified_time(&self, sheet_id: &str) -> Result<DateTime<Utc>, GoogleError>;

    /// Fetches several single-column ranges in one request. The result has
    /// one slot per requested range; `None` when the range holds no data.
    async fn get_columns(
        &self,
        sheet_id: &str,
        ranges: &[String],
    ) -> Result<Vec<Option<Vec<String>>>, GoogleError>;

    /// Reads one cell; `None` when the cell is empty.
    async fn get_cell(&self, sheet_id: &str, cell: &str) -> Result<Option<String>, GoogleError>;

    async fn update_cell(&self, sheet_id: &str, cell: &str, value: &str) -> Result<(), GoogleError>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    modified_time: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchGetResponse {
    #[serde(default)]
    value_ranges: Vec<ValueRange>,
}

#[derive(Debug, Default, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ValueUpdate<'a> {
    range: &'a str,
    major_dimension: &'a str,
    values: [[&'a str; 1]; 1],
}

/// Sheets renders most cells as strings; numbers and booleans only show up
/// with unformatted rendering, so they are stringified rather than rejected.
fn cell_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

impl ValueRange {
    /// First column of the range (ranges are requested column-major).
    fn into_column(self) -> Option<Vec<String>> {
        let column = self.values.into_iter().next()?;
        if column.is_empty() {
            return None;
        }
        Some(column.into_iter().map(cell_text).collect())
    }
}

#[async_trait]
impl SpreadsheetApi for GoogleClient {
    async fn modified_time(&self, sheet_id: &str) -> Result<DateTime<Utc>, GoogleError> {
        let url = Self::url(&self.endpoints.drive, &["files", sheet_id])?;
        let file: DriveFile = self
            .send_json(
                self.client
                    .get(url)
                    .query(&[("fields", "modifiedTime"), ("supportsAllDrives", "true")]),
            )
            .await?;
        Ok(file.modified_time)
    }

    async fn get_columns(
        &self,
        sheet_id: &str,
        ranges: &[String],
    ) -> Result<Vec<Option<Vec<String>>>, GoogleError> {
        let url = Self::url(
            &self.endpoints.sheets,
            &["spreadsheets", sheet_id, "values:batchGet"],
        )?;
        let mut query: Vec<(&str, &str)> = ranges.iter().map(|r| ("ranges", r.as_str())).collect();
        query.push(("majorDimension", "COLUMNS"));

        let response: BatchGetResponse = self.send_json(self.client.get(url).query(&query)).await?;

        // Google returns one valueRange per requested range, in order.
        let mut columns: Vec<Option<Vec<String>>> = response
            .value_ranges
            .into_iter()
            .map(ValueRange::into_column)
            .collect();
        columns.resize(ranges.len(), None);
        Ok(columns)
    }

    async fn get_cell(&self, sheet_id: &str, cell: &str) -> Result<Option<String>, GoogleError> {
        let url = Self::url(&self.endpoints.sheets, &["spreadsheets", sheet_id, "values", cell])?;
        let range: ValueRange = self
            .send_json(self.client.get(url).query(&[("majorDimension", "COLUMNS")]))
            .await?;
        Ok(range
            .into_column()
            .and_then(|column| column.into_iter().next())
            .filter(|value| !value.is_empty()))
    }

    async fn update_cell(&self, sheet_id: &str, cell: &str, value: &str) -> Result<(), GoogleError> {
        let url = Self::url(&self.endpoints.sheets, &["spreadsheets", sheet_id, "values", cell])?;
        let body = ValueUpdate {
            range: cell,
            major_dimension: "ROWS",
            values: [[value]],
        };
        let _: Value = self
            .send_json(
                self.client
                    .put(url)
                    .query(&[("valueInputOption", "RAW")])
                    .json(&body),
            )
            .await?;
        Ok(())
    }
}
