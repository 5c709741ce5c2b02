use regex::Regex;
use tracing::info;

use crate::config::{ColumnRole, VariantConfig};
use crate::diagnostics::DiagnosticsSink;
use crate::models::{ContainerRates, ContainerSize, LegFlags, RateLeg};
use crate::processor::header_locator::{find_header_row, resolve_columns, ColumnRoleMap};
use crate::processor::location_matcher::LocationIndex;
use crate::processor::port_groups::expand_route;
use crate::workbook::{cell_date, SheetGrid};

/// The carrier's contract number quoted somewhere in the sheet's first rows.
/// Falls back to the configured literal when the scan pattern never matches.
pub fn find_contract_number(grid: &SheetGrid, config: &VariantConfig) -> String {
    let Ok(pattern) = Regex::new(&config.contract.number_pattern) else {
        return config.contract.number_fallback.clone();
    };
    for row in grid.rows.iter().take(config.contract.scan_rows) {
        for cell in row {
            if let Some(text) = cell.as_text() {
                if let Some(found) = pattern.find(text) {
                    return found.as_str().to_string();
                }
            }
        }
    }
    config.contract.number_fallback.clone()
}

/// Extract every rate leg from the main tariff table.
///
/// Rows below the header are projected through the role map. Hidden rows are
/// skipped; a row with neither origin nor discharge text terminates the
/// table. Multi-line origin cells and port-group short codes each fan out
/// into one leg per concrete port pair before any location resolution, so a
/// single sheet row can yield many legs sharing its row number.
pub async fn extract_rate_legs(
    grid: &SheetGrid,
    config: &VariantConfig,
    index: &LocationIndex,
    diag: &dyn DiagnosticsSink,
) -> Vec<RateLeg> {
    let location = find_header_row(
        grid,
        &config.headers.tiers,
        config.headers.default_row,
        diag,
    )
    .await;
    let columns = resolve_columns(
        grid,
        location.row,
        &config.headers.roles,
        config.headers.two_line_headers,
        diag,
    )
    .await;

    let mut legs = Vec::new();
    for row in (location.row + 1)..grid.row_count() {
        if grid.hidden_rows.contains(&row) {
            continue;
        }

        let origin_text = role_text(grid, &columns, row, ColumnRole::Origin);
        let discharge_text = role_text(grid, &columns, row, ColumnRole::Discharge);
        if origin_text.is_empty() && discharge_text.is_empty() {
            break;
        }

        let destination_text = {
            let text = role_text(grid, &columns, row, ColumnRole::Destination);
            if text.is_empty() {
                discharge_text.clone()
            } else {
                text
            }
        };

        let rates = read_rates(grid, &columns, row);
        let flags = LegFlags {
            shipper_owned: flag_set(grid, &columns, row, ColumnRole::ShipperOwned),
            hazardous: flag_set(grid, &columns, row, ColumnRole::Hazardous),
            non_reefer: flag_set(grid, &columns, row, ColumnRole::NonReefer),
        };
        let valid_from = columns
            .get(ColumnRole::ValidFrom)
            .and_then(|col| cell_date(grid.cell(row, col)));
        let valid_to = columns
            .get(ColumnRole::ValidTo)
            .and_then(|col| cell_date(grid.cell(row, col)));

        let origin_lines: Vec<&str> = origin_text
            .split('\n')
            .map(|l| l.trim())
            .filter(|l| !l.is_empty())
            .collect();

        for origin_line in origin_lines {
            for (origin_name, destination_name) in
                expand_route(origin_line, &destination_text, &config.port_groups)
            {
                let origin = resolve(index, &origin_name, "origin", row, diag).await;
                let discharge = resolve(index, &discharge_text, "discharge", row, diag).await;
                let destination =
                    resolve(index, &destination_name, "delivery", row, diag).await;

                legs.push(RateLeg {
                    row_number: row + 1,
                    origin,
                    discharge,
                    destination,
                    origin_name,
                    discharge_name: discharge_text.clone(),
                    destination_name,
                    rates,
                    valid_from,
                    valid_to,
                    flags,
                    service: None,
                    service_name: None,
                });
            }
        }
    }

    info!(
        "Extracted {} rate legs from the main table (header row {})",
        legs.len(),
        location.row + 1
    );
    legs
}

fn role_text(grid: &SheetGrid, columns: &ColumnRoleMap, row: usize, role: ColumnRole) -> String {
    columns
        .get(role)
        .map(|col| grid.merged_value(row, col).text_or_empty())
        .unwrap_or_default()
}

fn flag_set(grid: &SheetGrid, columns: &ColumnRoleMap, row: usize, role: ColumnRole) -> bool {
    columns
        .get(role)
        .map(|col| !grid.cell(row, col).is_empty())
        .unwrap_or(false)
}

fn read_rates(grid: &SheetGrid, columns: &ColumnRoleMap, row: usize) -> ContainerRates {
    let mut rates = ContainerRates::default();
    for (size, role) in [
        (ContainerSize::D20, ColumnRole::Rate20),
        (ContainerSize::D40, ColumnRole::Rate40),
        (ContainerSize::D40Hc, ColumnRole::Rate40Hc),
        (ContainerSize::D45Hc, ColumnRole::Rate45Hc),
    ] {
        if let Some(col) = columns.get(role) {
            rates.set(size, grid.cell(row, col).as_number());
        }
    }
    rates
}

async fn resolve(
    index: &LocationIndex,
    name: &str,
    role: &str,
    row: usize,
    diag: &dyn DiagnosticsSink,
) -> Option<i64> {
    if name.is_empty() {
        return None;
    }
    let outcome = index.resolve(name);
    if outcome.id.is_none() {
        match outcome.closest {
            Some(closest) => {
                diag.report(&format!(
                    "Row {}: unmatched {role} port '{name}' (closest: {closest})",
                    row + 1
                ))
                .await;
            }
            None => {
                diag.report(&format!("Row {}: unmatched {role} port '{name}'", row + 1))
                    .await;
            }
        }
    }
    outcome.id
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::variant::MatchingConfig;
    use crate::diagnostics::CollectingSink;
    use crate::models::CanonicalLocation;
    use crate::workbook::CellValue;
    use chrono::NaiveDate;

    fn text(value: &str) -> CellValue {
        CellValue::Text(value.to_string())
    }

    fn number(value: f64) -> CellValue {
        CellValue::Number(value)
    }

    fn index() -> LocationIndex {
        let locations = vec![
            CanonicalLocation::new(1, "Shanghai"),
            CanonicalLocation::new(2, "Ningbo"),
            CanonicalLocation::new(3, "Qingdao"),
            CanonicalLocation::new(4, "New York"),
            CanonicalLocation::new(5, "Los Angeles"),
        ];
        LocationIndex::new(&locations, &MatchingConfig::default())
    }

    fn variant() -> VariantConfig {
        VariantConfig::service_contract()
    }

    fn empty_row() -> Vec<CellValue> {
        vec![CellValue::Empty; 8]
    }

    fn grid() -> SheetGrid {
        SheetGrid::new(vec![
            vec![text("SVC-3118 Service Contract")],
            vec![
                text("POL"),
                text("POD"),
                text("Place of Delivery"),
                CellValue::Empty,
                text("D20"),
                text("D40"),
            ],
            vec![
                text("Shanghai"),
                text("Los Angeles"),
                CellValue::Empty,
                CellValue::Empty,
                number(1400.0),
                number(1600.0),
            ],
            vec![
                text("NCPRC BP EC"),
                text("New York"),
                text("New York"),
                CellValue::Empty,
                number(2400.0),
                number(2600.0),
            ],
            empty_row(),
            vec![text("this trailing note is never reached")],
        ])
    }

    #[test]
    fn test_contract_number_scan_and_fallback() {
        let config = variant();
        assert_eq!(find_contract_number(&grid(), &config), "SVC-3118");
        let blank = SheetGrid::new(vec![vec![text("no number here")]]);
        assert_eq!(find_contract_number(&blank, &config), "SVC3118");
    }

    #[tokio::test]
    async fn test_rows_project_through_role_map() {
        let sink = CollectingSink::new();
        let legs = extract_rate_legs(&grid(), &variant(), &index(), &sink).await;

        // Row 3: one direct leg. Row 4: the NCPRC BP EC group expands to
        // three origins.
        assert_eq!(legs.len(), 4);
        assert_eq!(legs[0].origin, Some(1));
        assert_eq!(legs[0].discharge, Some(5));
        // Destination cell empty: falls back to the discharge port.
        assert_eq!(legs[0].destination, Some(5));
        assert_eq!(legs[0].rates.d20, Some(1400.0));
        assert_eq!(legs[0].row_number, 3);
    }

    #[tokio::test]
    async fn test_port_group_expansion_happens_before_resolution() {
        let sink = CollectingSink::new();
        let legs = extract_rate_legs(&grid(), &variant(), &index(), &sink).await;

        let group_legs: Vec<_> = legs.iter().filter(|l| l.row_number == 4).collect();
        assert_eq!(group_legs.len(), 3);
        let origins: Vec<Option<i64>> = group_legs.iter().map(|l| l.origin).collect();
        assert_eq!(origins, vec![Some(1), Some(2), Some(3)]);
        assert!(group_legs.iter().all(|l| l.destination == Some(4)));
    }

    #[tokio::test]
    async fn test_empty_origin_and_discharge_terminates_the_table() {
        let sink = CollectingSink::new();
        let legs = extract_rate_legs(&grid(), &variant(), &index(), &sink).await;
        assert!(legs.iter().all(|l| l.row_number <= 4));
    }

    #[tokio::test]
    async fn test_hidden_rows_are_skipped() {
        let mut g = grid();
        g.hidden_rows.insert(2);
        let sink = CollectingSink::new();
        let legs = extract_rate_legs(&g, &variant(), &index(), &sink).await;
        assert!(legs.iter().all(|l| l.row_number != 3));
        assert_eq!(legs.len(), 3);
    }

    #[tokio::test]
    async fn test_multi_line_origin_splits_into_legs() {
        let mut g = grid();
        g.rows[2][0] = text("Shanghai\nNingbo");
        let sink = CollectingSink::new();
        let legs = extract_rate_legs(&g, &variant(), &index(), &sink).await;

        let row_legs: Vec<_> = legs.iter().filter(|l| l.row_number == 3).collect();
        assert_eq!(row_legs.len(), 2);
        assert_eq!(row_legs[0].origin, Some(1));
        assert_eq!(row_legs[1].origin, Some(2));
        // Both share the row's rates and discharge.
        assert!(row_legs.iter().all(|l| l.rates.d20 == Some(1400.0)));
    }

    #[tokio::test]
    async fn test_unmatched_port_keeps_leg_with_diagnostic() {
        let mut g = grid();
        g.rows[2][0] = text("Atlantis Harbor");
        let sink = CollectingSink::new();
        let legs = extract_rate_legs(&g, &variant(), &index(), &sink).await;

        let leg = legs.iter().find(|l| l.row_number == 3).unwrap();
        assert_eq!(leg.origin, None);
        assert_eq!(leg.origin_name, "Atlantis Harbor");
        assert!(sink
            .messages()
            .iter()
            .any(|m| m.contains("Atlantis Harbor")));
    }

    #[tokio::test]
    async fn test_validity_dates_read_when_columns_exist() {
        let mut config = VariantConfig::fak();
        config.headers.default_row = 0;
        // Narrow FAK layout for the test grid.
        for spec in &mut config.headers.roles {
            spec.default_col = None;
        }
        let g = SheetGrid::new(vec![
            vec![
                text("Load Port"),
                text("Discharge Port"),
                text("Valid From"),
                text("Valid To"),
                text("20ST"),
            ],
            vec![
                text("Shanghai"),
                text("Los Angeles"),
                number(45292.0),
                text("2024-06-30"),
                number(1000.0),
            ],
        ]);
        let sink = CollectingSink::new();
        let legs = extract_rate_legs(&g, &config, &index(), &sink).await;

        assert_eq!(legs.len(), 1);
        assert_eq!(legs[0].valid_from, NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(legs[0].valid_to, NaiveDate::from_ymd_opt(2024, 6, 30));
    }
}
