use tracing::debug;

use super::SyncError;
use crate::google::{GoogleError, SpreadsheetApi};

/// Reads the row cursor: how many data rows earlier cycles consumed.
/// An empty cell means nothing has been processed yet.
pub async fn read_processed_count(
    sheets: &dyn SpreadsheetApi,
    sheet_id: &str,
    cell: &str,
) -> Result<u32, SyncError> {
    match sheets.get_cell(sheet_id, cell).await? {
        None => Ok(0),
        Some(raw) => raw
            .trim()
            .parse::<u32>()
            .map_err(|_| SyncError::InvalidCursor(raw)),
    }
}

/// Writes the new cursor. No read-back: if this fails the next cycle starts
/// from the old cursor again.
pub async fn commit(
    sheets: &dyn SpreadsheetApi,
    sheet_id: &str,
    cell: &str,
    processed: u32,
) -> Result<(), GoogleError> {
    sheets
        .update_cell(sheet_id, cell, &processed.to_string())
        .await?;
    debug!("Row cursor {cell} set to {processed}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::sync::testing::FakeSheet;

    fn sheet() -> FakeSheet {
        FakeSheet::new(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap())
    }

    #[tokio::test]
    async fn test_empty_cursor_reads_zero() {
        assert_eq!(read_processed_count(&sheet(), "sheet", "L1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_cursor_round_trips_through_sheet() {
        let sheet = sheet();
        commit(&sheet, "sheet", "L1", 12).await.unwrap();
        assert_eq!(read_processed_count(&sheet, "sheet", "L1").await.unwrap(), 12);
        assert_eq!(sheet.cursor_writes(), vec!["12".to_string()]);
    }

    #[tokio::test]
    async fn test_garbage_cursor_is_rejected() {
        let sheet = sheet();
        sheet.set_cursor("twelve");
        let err = read_processed_count(&sheet, "sheet", "L1").await.unwrap_err();
        assert!(matches!(err, SyncError::InvalidCursor(raw) if raw == "twelve"));
    }
}
