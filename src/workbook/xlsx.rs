use anyhow::{Context, Result};
use calamine::{Data, Reader, Xlsx, open_workbook};
use std::path::Path;
use tracing::info;

use super::grid::{CellValue, MergedRegion, SheetGrid, Workbook};

/// Load an xlsx file into the in-memory grid model the pipeline operates on.
/// All downstream processing is file-format agnostic; this is the only place
/// calamine types appear.
pub fn load_workbook(path: &Path) -> Result<Workbook> {
    let mut xlsx: Xlsx<_> = open_workbook(path)
        .with_context(|| format!("Failed to open workbook {}", path.display()))?;

    xlsx.load_merged_regions();

    let sheet_names = xlsx.sheet_names().to_vec();
    let mut sheets = Vec::with_capacity(sheet_names.len());

    for name in &sheet_names {
        let range = xlsx
            .worksheet_range(name)
            .with_context(|| format!("Failed to read sheet {name}"))?;

        let offset_row = range.start().map(|(r, _)| r as usize).unwrap_or(0);
        let offset_col = range.start().map(|(_, c)| c as usize).unwrap_or(0);
        let width = offset_col + range.width();

        // Rebuild absolute coordinates so merged regions line up with cells.
        let mut rows = vec![vec![CellValue::Empty; width]; offset_row];
        for row in range.rows() {
            let mut cells = vec![CellValue::Empty; offset_col];
            cells.extend(row.iter().map(convert_cell));
            rows.push(cells);
        }

        let merges = xlsx
            .merged_regions_by_sheet(name)
            .iter()
            .map(|(_, _, dims)| MergedRegion {
                start_row: dims.start.0 as usize,
                start_col: dims.start.1 as usize,
                end_row: dims.end.0 as usize,
                end_col: dims.end.1 as usize,
            })
            .collect();

        let mut grid = SheetGrid::new(rows);
        grid.merges = merges;
        sheets.push((name.clone(), grid));
    }

    info!("Loaded workbook {} with {} sheets", path.display(), sheets.len());

    Ok(Workbook { sheets })
}

fn convert_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(_) => CellValue::Empty,
    }
}
