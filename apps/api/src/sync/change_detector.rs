use tracing::debug;

use super::SyncState;
use crate::google::{GoogleError, SpreadsheetApi};

/// Returns whether the spreadsheet was modified since the last observation.
///
/// The new timestamp is stored before returning `true`, so a cycle that fails
/// later does not get retried until the sheet changes again.
pub async fn has_changed(
    sheets: &dyn SpreadsheetApi,
    sheet_id: &str,
    state: &mut SyncState,
) -> Result<bool, GoogleError> {
    let modified = sheets.modified_time(sheet_id).await?;
    if state.last_modified == Some(modified) {
        return Ok(false);
    }
    debug!(
        "Spreadsheet {sheet_id} modified at {modified} (previously {:?})",
        state.last_modified
    );
    state.last_modified = Some(modified);
    Ok(true)
}
