use chrono::{Duration, NaiveDate};
use std::collections::HashSet;

/// A single spreadsheet cell. Carrier sheets mix text, numbers and blanks
/// freely, so every accessor here is lenient: malformed numeric text becomes
/// `None`, never a parse error.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl CellValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Text of the cell with trailing/leading whitespace removed, or "" for
    /// anything that is not text.
    pub fn text_or_empty(&self) -> String {
        match self {
            CellValue::Text(s) => s.trim().to_string(),
            _ => String::new(),
        }
    }

    /// Numeric value of the cell. Text is accepted after stripping thousands
    /// separators; "not applicable" and friends simply yield `None`.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) if n.is_finite() => Some(*n),
            CellValue::Text(s) => {
                let cleaned = s.replace(',', "");
                cleaned.trim().parse::<f64>().ok().filter(|n| n.is_finite())
            }
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

/// A merged-cell region, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergedRegion {
    pub start_row: usize,
    pub start_col: usize,
    pub end_row: usize,
    pub end_col: usize,
}

impl MergedRegion {
    pub fn contains(&self, row: usize, col: usize) -> bool {
        row >= self.start_row && row <= self.end_row && col >= self.start_col && col <= self.end_col
    }
}

/// One sheet as a dense 2-D grid of cells plus the merged-region list the
/// charge-block extractor needs to attribute merged values to spanned rows.
#[derive(Debug, Clone, Default)]
pub struct SheetGrid {
    pub rows: Vec<Vec<CellValue>>,
    pub merges: Vec<MergedRegion>,
    /// Row indices the extractors skip. The xlsx loader leaves this empty:
    /// calamine exposes cell contents only, not row visibility. Callers that
    /// know which rows are hidden populate it.
    pub hidden_rows: HashSet<usize>,
}

impl SheetGrid {
    pub fn new(rows: Vec<Vec<CellValue>>) -> Self {
        SheetGrid {
            rows,
            merges: Vec::new(),
            hidden_rows: HashSet::new(),
        }
    }

    pub fn cell(&self, row: usize, col: usize) -> &CellValue {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&CellValue::Empty)
    }

    /// Value at (row, col) with merged regions resolved: a cell inside a
    /// merged region reports the region's anchor value.
    pub fn merged_value(&self, row: usize, col: usize) -> &CellValue {
        for merge in &self.merges {
            if merge.contains(row, col) {
                return self.cell(merge.start_row, merge.start_col);
            }
        }
        self.cell(row, col)
    }

    pub fn row_is_empty(&self, row: usize) -> bool {
        match self.rows.get(row) {
            Some(cells) => cells.iter().all(|c| c.is_empty()),
            None => true,
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// A workbook: named sheets in file order.
#[derive(Debug, Clone, Default)]
pub struct Workbook {
    pub sheets: Vec<(String, SheetGrid)>,
}

impl Workbook {
    pub fn sheet(&self, name: &str) -> Option<&SheetGrid> {
        self.sheets
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, g)| g)
    }

    /// First sheet whose normalized name contains the keyword, e.g. "feeder"
    /// or "cover".
    pub fn find_sheet(&self, keyword: &str) -> Option<&SheetGrid> {
        let keyword = keyword.to_lowercase();
        self.sheets
            .iter()
            .find(|(n, _)| n.to_lowercase().contains(&keyword))
            .map(|(_, g)| g)
    }

    pub fn first_sheet(&self) -> Option<&SheetGrid> {
        self.sheets.first().map(|(_, g)| g)
    }
}

/// Excel serial date to a calendar date. Serial 25569 is 1970-01-01.
pub fn excel_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial <= 0.0 {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1)?;
    epoch.checked_add_signed(Duration::days(serial as i64 - 25569))
}

/// Date from a cell: Excel serials and ISO text are both accepted.
pub fn cell_date(cell: &CellValue) -> Option<NaiveDate> {
    match cell {
        CellValue::Number(n) => excel_date(*n),
        CellValue::Text(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok(),
        _ => None,
    }
}
