use crate::google::{GoogleError, SpreadsheetApi};

/// Row 1 holds the form's question headers.
pub const FIRST_DATA_ROW: u32 = 2;

/// Columns of the form-responses sheet, in `RawEventRow` field order.
/// Column A is the form's own submission timestamp and is not read.
const COLUMNS: [&str; 9] = ["B", "C", "D", "E", "F", "G", "H", "I", "J"];

const CREATOR: usize = 0;
const SIGNUP: usize = 7;
const DESCRIPTION: usize = 8;

/// One submission as it sits in the sheet. Every cell may be blank.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawEventRow {
    pub creator: Option<String>,
    pub summary: Option<String>,
    pub abbreviation: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub duration: Option<String>,
    pub location: Option<String>,
    pub signup: Option<String>,
    pub description: Option<String>,
}

/// Where the submissions and the row cursor live inside the spreadsheet.
#[derive(Debug, Clone)]
pub struct SheetLayout {
    pub sheet_name: String,
    pub progress_cell: String,
}

impl SheetLayout {
    /// A1 reference of the cursor cell, e.g. `'Form Responses 1'!L1`.
    pub fn progress_range(&self) -> String {
        format!("{}!{}", quote_sheet_name(&self.sheet_name), self.progress_cell)
    }

    /// One open-ended range per column, starting at `start_row`.
    pub fn column_ranges(&self, start_row: u32) -> Vec<String> {
        let sheet = quote_sheet_name(&self.sheet_name);
        COLUMNS
            .iter()
            .map(|col| format!("{sheet}!{col}{start_row}:{col}"))
            .collect()
    }
}

fn quote_sheet_name(name: &str) -> String {
    format!("'{}'", name.replace('\'', "''"))
}

/// Reads every submission from `start_row` down. `None` means there is
/// nothing new to process.
pub async fn read_rows(
    sheets: &dyn SpreadsheetApi,
    sheet_id: &str,
    layout: &SheetLayout,
    start_row: u32,
) -> Result<Option<Vec<RawEventRow>>, GoogleError> {
    let columns = sheets
        .get_columns(sheet_id, &layout.column_ranges(start_row))
        .await?;
    Ok(assemble_rows(columns))
}

/// Zips column-major cell data into rows. The creator column decides the row
/// count; signup and description columns may be missing entirely, which
/// reads as blank text rather than absent cells.
pub fn assemble_rows(mut columns: Vec<Option<Vec<String>>>) -> Option<Vec<RawEventRow>> {
    columns.resize(COLUMNS.len(), None);
    let row_count = columns[CREATOR].as_ref().map_or(0, Vec::len);
    if row_count == 0 {
        return None;
    }

    let cell = |col: usize, row: usize| -> Option<String> {
        match &columns[col] {
            Some(values) => values.get(row).filter(|v| !v.is_empty()).cloned(),
            None if col == SIGNUP || col == DESCRIPTION => Some(String::new()),
            None => None,
        }
    };

    let rows = (0..row_count)
        .map(|row| RawEventRow {
            creator: cell(0, row),
            summary: cell(1, row),
            abbreviation: cell(2, row),
            date: cell(3, row),
            time: cell(4, row),
            duration: cell(5, row),
            location: cell(6, row),
            signup: cell(SIGNUP, row),
            description: cell(DESCRIPTION, row),
        })
        .collect();
    Some(rows)
}
