pub mod grid;
pub mod xlsx;

pub use grid::{CellValue, MergedRegion, SheetGrid, Workbook, cell_date, excel_date};
pub use xlsx::load_workbook;
