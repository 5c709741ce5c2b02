use std::collections::HashMap;

use crate::config::{ColumnRole, RoleSpec};
use crate::diagnostics::DiagnosticsSink;
use crate::workbook::SheetGrid;

/// Header-text normalization used everywhere cell text is compared against
/// keywords: lowercase, punctuation stripped, whitespace collapsed.
pub fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase();
    let stripped: String = lowered
        .chars()
        .map(|c| if "()[],.".contains(c) { ' ' } else { c })
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Where the header row was found, and how.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderLocation {
    pub row: usize,
    pub found: bool,
}

/// Scan the grid for the header row. Keyword tiers are tried in priority
/// order; a tier matches on the first row where any cell's normalized text
/// contains any of its keywords. When every tier misses, fall back to the
/// variant's documented default row and report a recoverable warning.
pub async fn find_header_row(
    grid: &SheetGrid,
    tiers: &[Vec<String>],
    default_row: usize,
    diag: &dyn DiagnosticsSink,
) -> HeaderLocation {
    for (tier_index, tier) in tiers.iter().enumerate() {
        for (row_index, row) in grid.rows.iter().enumerate() {
            for cell in row {
                if let Some(text) = cell.as_text() {
                    let normalized = normalize(text);
                    if tier.iter().any(|kw| normalized.contains(kw.as_str())) {
                        return HeaderLocation {
                            row: row_index,
                            found: true,
                        };
                    }
                }
            }
        }
        diag.report(&format!(
            "Priority {} keywords for finding the header row not found",
            tier_index + 1
        ))
        .await;
    }

    diag.report(&format!(
        "Header row not found - using default row {default_row}"
    ))
    .await;

    HeaderLocation {
        row: default_row,
        found: false,
    }
}

/// Mapping from semantic column role to its zero-based column index. At most
/// one column per role; absent roles are a valid state the extractors handle.
#[derive(Debug, Clone, Default)]
pub struct ColumnRoleMap {
    columns: HashMap<ColumnRole, usize>,
}

impl ColumnRoleMap {
    pub fn get(&self, role: ColumnRole) -> Option<usize> {
        self.columns.get(&role).copied()
    }

    pub fn insert(&mut self, role: ColumnRole, col: usize) {
        self.columns.entry(role).or_insert(col);
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Resolve each role to the first column of the header row whose normalized
/// text contains one of the role's keyword variants. With two-line headers
/// the cell directly below is concatenated first. Missing roles fall back to
/// the configured default column, each with a recoverable warning.
pub async fn resolve_columns(
    grid: &SheetGrid,
    header_row: usize,
    roles: &[RoleSpec],
    two_line_headers: bool,
    diag: &dyn DiagnosticsSink,
) -> ColumnRoleMap {
    let width = grid.rows.get(header_row).map(|r| r.len()).unwrap_or(0);
    let mut map = ColumnRoleMap::default();

    for spec in roles {
        let mut resolved = None;
        for col in 0..width {
            let mut text = grid.cell(header_row, col).text_or_empty();
            if two_line_headers {
                let below = grid.cell(header_row + 1, col).text_or_empty();
                if !below.is_empty() {
                    text = format!("{text} {below}");
                }
            }
            if text.is_empty() {
                continue;
            }
            let normalized = normalize(&text);
            if spec.keywords.iter().any(|kw| normalized.contains(kw.as_str())) {
                resolved = Some(col);
                break;
            }
        }

        match resolved {
            Some(col) => map.insert(spec.role, col),
            None => {
                diag.report(&format!("Missing header key: {:?}", spec.role)).await;
                if let Some(col) = spec.default_col {
                    map.insert(spec.role, col);
                }
            }
        }
    }

    map
}

/// All rows containing the block-start marker. Unlike the header search this
/// returns every occurrence: charge sheets repeat the marker once per block.
pub fn find_marker_rows(grid: &SheetGrid, marker: &str) -> Vec<usize> {
    let marker = normalize(marker);
    let mut rows = Vec::new();
    for (row_index, row) in grid.rows.iter().enumerate() {
        for cell in row {
            if let Some(text) = cell.as_text() {
                if normalize(text).contains(&marker) {
                    rows.push(row_index);
                    break;
                }
            }
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VariantConfig;
    use crate::diagnostics::CollectingSink;
    use crate::workbook::CellValue;

    fn text_row(cells: &[&str]) -> Vec<CellValue> {
        cells.iter().map(|c| CellValue::Text(c.to_string())).collect()
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("  Load Port (POL), [CN] "), "load port pol cn");
        assert_eq!(normalize("Place Of\nDelivery"), "place of delivery");
    }

    #[tokio::test]
    async fn test_header_row_found_in_first_tier() {
        let grid = SheetGrid::new(vec![
            text_row(&["Carrier Ratesheet"]),
            text_row(&["", "Load Port", "Discharge Port"]),
        ]);
        let sink = CollectingSink::new();
        let config = VariantConfig::fak();

        let location = find_header_row(&grid, &config.headers.tiers, 5, &sink).await;
        assert_eq!(location.row, 1);
        assert!(location.found);
        assert_eq!(sink.count(), 0);
    }

    #[tokio::test]
    async fn test_header_row_falls_back_to_default() {
        let grid = SheetGrid::new(vec![text_row(&["nothing"]), text_row(&["useful"])]);
        let sink = CollectingSink::new();
        let config = VariantConfig::fak();

        let location = find_header_row(&grid, &config.headers.tiers, 5, &sink).await;
        assert_eq!(location.row, 5);
        assert!(!location.found);
        // One miss per tier plus the fallback notice.
        assert_eq!(sink.count(), config.headers.tiers.len() + 1);
    }

    #[tokio::test]
    async fn test_column_resolution_ignores_order() {
        let grid = SheetGrid::new(vec![text_row(&[
            "Discharge Port",
            "Place of Delivery",
            "Load Port",
            "20ST",
            "40ST",
        ])]);
        let sink = CollectingSink::new();
        let config = VariantConfig::fak();

        let map = resolve_columns(&grid, 0, &config.headers.roles, false, &sink).await;
        assert_eq!(map.get(ColumnRole::Origin), Some(2));
        assert_eq!(map.get(ColumnRole::Discharge), Some(0));
        assert_eq!(map.get(ColumnRole::Destination), Some(1));
        assert_eq!(map.get(ColumnRole::Rate20), Some(3));
        assert_eq!(map.get(ColumnRole::Rate40), Some(4));
    }

    #[tokio::test]
    async fn test_missing_role_uses_default_column() {
        let grid = SheetGrid::new(vec![text_row(&["Load Port", "Discharge Port"])]);
        let sink = CollectingSink::new();
        let config = VariantConfig::fak();

        let map = resolve_columns(&grid, 0, &config.headers.roles, false, &sink).await;
        // 45HC header absent: typed default applies and a warning is emitted.
        assert_eq!(map.get(ColumnRole::Rate45Hc), Some(14));
        assert!(sink.messages().iter().any(|m| m.contains("Rate45Hc")));
    }

    #[tokio::test]
    async fn test_two_line_headers_are_concatenated() {
        let grid = SheetGrid::new(vec![
            text_row(&["Place of"]),
            text_row(&["Delivery"]),
        ]);
        let sink = CollectingSink::new();
        let roles = vec![crate::config::RoleSpec {
            role: ColumnRole::Destination,
            keywords: vec!["place of delivery".to_string()],
            default_col: None,
        }];

        let map = resolve_columns(&grid, 0, &roles, true, &sink).await;
        assert_eq!(map.get(ColumnRole::Destination), Some(0));
    }

    #[test]
    fn test_marker_rows_finds_every_block() {
        let grid = SheetGrid::new(vec![
            text_row(&["Container Charges - Block A"]),
            text_row(&["data"]),
            text_row(&["CONTAINER CHARGES block B"]),
        ]);
        assert_eq!(find_marker_rows(&grid, "container charges"), vec![0, 2]);
    }
}
