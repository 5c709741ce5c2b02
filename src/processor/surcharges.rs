use crate::diagnostics::DiagnosticsSink;
use crate::models::{ContainerRates, ContainerSize, MaintenanceCharge, RateLeg};
use crate::processor::header_locator::{find_marker_rows, normalize};
use crate::processor::location_matcher::LocationIndex;
use crate::workbook::SheetGrid;

/// Column layout of the standard-charges sheet. Located once per sheet from
/// its own header row; the main-table role map does not apply here.
#[derive(Debug, Clone, Copy)]
struct ChargeColumns {
    load: usize,
    discharge: usize,
    delivery: usize,
    description: usize,
    d20: usize,
    d40: usize,
    d40hc: usize,
    d45hc: usize,
}

const CHARGE_DESCRIPTION: &str = "container maintenance charge";
const ORIGINAL_DESCRIPTION: &str = "rate offer per container";

fn locate_columns(grid: &SheetGrid) -> Option<(usize, ChargeColumns)> {
    for (row_index, row) in grid.rows.iter().enumerate() {
        let mut load = None;
        let mut discharge = None;
        let mut delivery = None;
        let mut description = None;
        let mut d20 = None;
        let mut d40 = None;
        let mut d40hc = None;
        let mut d45hc = None;

        for (col, cell) in row.iter().enumerate() {
            let text = normalize(&cell.text_or_empty());
            if text.is_empty() {
                continue;
            }
            if text.contains("load port") {
                load.get_or_insert(col);
            } else if text.contains("discharge port") {
                discharge.get_or_insert(col);
            } else if text.contains("place of delivery") {
                delivery.get_or_insert(col);
            } else if text.contains("description") {
                description.get_or_insert(col);
            } else if text.contains("20st") {
                d20.get_or_insert(col);
            } else if text.contains("45hc") {
                d45hc.get_or_insert(col);
            } else if text.contains("40hc") {
                d40hc.get_or_insert(col);
            } else if text.contains("40st") {
                d40.get_or_insert(col);
            }
        }

        if let (Some(load), Some(discharge)) = (load, discharge) {
            return Some((
                row_index,
                ChargeColumns {
                    load,
                    discharge,
                    delivery: delivery.unwrap_or(discharge),
                    description: description.unwrap_or(0),
                    d20: d20.unwrap_or(load + 4),
                    d40: d40.unwrap_or(load + 5),
                    d40hc: d40hc.unwrap_or(load + 6),
                    d45hc: d45hc.unwrap_or(load + 7),
                },
            ));
        }
    }
    None
}

/// Port cells in charge blocks are merged across the block's rows and often
/// carry several lines (terminal notes, carrier codes). Load and discharge
/// take the last non-empty line, delivery takes the first.
fn port_line(text: &str, first: bool) -> Option<String> {
    let lines: Vec<&str> = text
        .split('\n')
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect();
    let chosen = if first { lines.first() } else { lines.last() };
    chosen.map(|l| l.to_string())
}

async fn resolve_port(
    index: &LocationIndex,
    name: Option<&str>,
    role: &str,
    block: usize,
    diag: &dyn DiagnosticsSink,
) -> Option<i64> {
    let name = name?;
    let outcome = index.resolve(name);
    if outcome.id.is_none() {
        diag.report(&format!(
            "Charge block {block}: unmatched {role} port '{name}'"
        ))
        .await;
    }
    outcome.id
}

/// Extract container-maintenance charge blocks from the standard-charges
/// sheet. Marker rows delimit blocks; everything after the last marker forms
/// the final block. A block is kept only when its "rate offer per container"
/// line quotes at least one original price, since without that constraint the
/// charge cannot be joined back onto a rate.
pub async fn extract_charges(
    grid: &SheetGrid,
    marker: &str,
    index: &LocationIndex,
    diag: &dyn DiagnosticsSink,
) -> Vec<MaintenanceCharge> {
    let Some((_, columns)) = locate_columns(grid) else {
        diag.report("Charges sheet: port columns not found").await;
        return Vec::new();
    };

    let marker_rows = find_marker_rows(grid, marker);
    if marker_rows.is_empty() {
        diag.report(&format!("Charges sheet: no '{marker}' blocks found"))
            .await;
        return Vec::new();
    }

    let mut charges = Vec::new();
    for (block_index, &start) in marker_rows.iter().enumerate() {
        let end = marker_rows
            .get(block_index + 1)
            .copied()
            .unwrap_or(grid.row_count());
        if let Some(charge) =
            extract_block(grid, &columns, index, block_index + 1, start, end, diag).await
        {
            charges.push(charge);
        }
    }
    charges
}

async fn extract_block(
    grid: &SheetGrid,
    columns: &ChargeColumns,
    index: &LocationIndex,
    block_number: usize,
    start: usize,
    end: usize,
    diag: &dyn DiagnosticsSink,
) -> Option<MaintenanceCharge> {
    // The port row is the first row in the block where the merged load-port
    // region yields text.
    let port_row = (start..end)
        .find(|&row| !grid.merged_value(row, columns.load).text_or_empty().is_empty())?;

    let load_text = grid.merged_value(port_row, columns.load).text_or_empty();
    let discharge_text = grid.merged_value(port_row, columns.discharge).text_or_empty();
    let delivery_text = grid.merged_value(port_row, columns.delivery).text_or_empty();

    let load_name = port_line(&load_text, false);
    let discharge_name = port_line(&discharge_text, false);
    let delivery_name = port_line(&delivery_text, true);

    let mut block_charges = ContainerRates::default();
    let mut original = ContainerRates::default();

    for row in start..end {
        let description = normalize(&grid.merged_value(row, columns.description).text_or_empty());
        if description.is_empty() {
            continue;
        }
        if description.contains(CHARGE_DESCRIPTION) {
            for (size, col) in size_columns(columns) {
                let value = grid.cell(row, col).as_number().unwrap_or(0.0);
                block_charges.set(size, Some(value));
            }
        } else if description.contains(ORIGINAL_DESCRIPTION) {
            for (size, col) in size_columns(columns) {
                original.set(size, grid.cell(row, col).as_number());
            }
        }
    }

    if !original.any_present() {
        return None;
    }

    Some(MaintenanceCharge {
        block_number,
        load_port: resolve_port(index, load_name.as_deref(), "load", block_number, diag).await,
        discharge_port: resolve_port(
            index,
            discharge_name.as_deref(),
            "discharge",
            block_number,
            diag,
        )
        .await,
        delivery: resolve_port(index, delivery_name.as_deref(), "delivery", block_number, diag)
            .await,
        charges: block_charges,
        original,
    })
}

fn size_columns(columns: &ChargeColumns) -> [(ContainerSize, usize); 4] {
    [
        (ContainerSize::D20, columns.d20),
        (ContainerSize::D40, columns.d40),
        (ContainerSize::D40Hc, columns.d40hc),
        (ContainerSize::D45Hc, columns.d45hc),
    ]
}

/// Add matched maintenance charges onto the rate legs in place. The first
/// applicable charge wins; blocks never stack onto the same leg. A charge
/// only touches sizes where the leg publishes a rate, so an absent rate
/// never becomes a bare surcharge. Returns how many legs received a charge.
pub fn apply_charges(legs: &mut [RateLeg], charges: &[MaintenanceCharge]) -> usize {
    let mut applied = 0;
    for leg in legs.iter_mut() {
        let Some(charge) = charges.iter().find(|c| c.applies_to(leg)) else {
            continue;
        };
        let mut touched = false;
        for size in ContainerSize::ALL {
            if let (Some(rate), Some(extra)) = (leg.rates.get(size), charge.charges.get(size)) {
                leg.rates.set(size, Some(rate + extra));
                touched = true;
            }
        }
        if touched {
            applied += 1;
        }
    }
    applied
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::variant::MatchingConfig;
    use crate::diagnostics::CollectingSink;
    use crate::models::{CanonicalLocation, LegFlags};
    use crate::workbook::{CellValue, MergedRegion};

    fn text(value: &str) -> CellValue {
        CellValue::Text(value.to_string())
    }

    fn number(value: f64) -> CellValue {
        CellValue::Number(value)
    }

    fn index() -> LocationIndex {
        let locations = vec![
            CanonicalLocation::new(1, "Shanghai"),
            CanonicalLocation::new(2, "Los Angeles"),
            CanonicalLocation::new(3, "Ningbo"),
        ];
        LocationIndex::new(&locations, &MatchingConfig::default())
    }

    fn charges_grid() -> SheetGrid {
        let mut grid = SheetGrid::new(vec![
            vec![
                text("Charge Description"),
                text("Load Port"),
                text("Discharge Port"),
                text("Place of Delivery"),
                text("20ST"),
                text("40ST"),
                text("40HC"),
                text("45HC"),
            ],
            vec![text("Container Charges")],
            vec![
                text("Rate offer per container"),
                text("CNSHA\nShanghai"),
                text("Los Angeles"),
                text("Los Angeles\nrail ramp"),
                number(100.0),
                number(150.0),
                number(160.0),
                number(180.0),
            ],
            vec![
                text("Container Maintenance Charge"),
                CellValue::Empty,
                CellValue::Empty,
                CellValue::Empty,
                number(25.0),
                number(50.0),
                number(50.0),
                CellValue::Empty,
            ],
            vec![text("Container Charges")],
            vec![
                text("Rate offer per container"),
                text("Ningbo"),
                text("Los Angeles"),
                text("Los Angeles"),
                number(90.0),
                number(140.0),
                CellValue::Empty,
                CellValue::Empty,
            ],
            vec![
                text("Container Maintenance Charge"),
                CellValue::Empty,
                CellValue::Empty,
                CellValue::Empty,
                number(30.0),
                number(60.0),
                CellValue::Empty,
                CellValue::Empty,
            ],
        ]);
        // Ports merged over the block's two data rows.
        grid.merges.push(MergedRegion {
            start_row: 2,
            start_col: 1,
            end_row: 3,
            end_col: 1,
        });
        grid
    }

    fn leg(origin: i64, d20: f64) -> RateLeg {
        RateLeg {
            row_number: 1,
            origin: Some(origin),
            discharge: Some(2),
            destination: Some(2),
            origin_name: "X".to_string(),
            discharge_name: "Y".to_string(),
            destination_name: "Y".to_string(),
            rates: ContainerRates {
                d20: Some(d20),
                d40: Some(150.0),
                d40hc: Some(160.0),
                d45hc: Some(180.0),
            },
            valid_from: None,
            valid_to: None,
            flags: LegFlags::default(),
            service: None,
            service_name: None,
        }
    }

    #[tokio::test]
    async fn test_two_marker_rows_yield_two_blocks() {
        let sink = CollectingSink::new();
        let charges =
            extract_charges(&charges_grid(), "container charges", &index(), &sink).await;

        assert_eq!(charges.len(), 2);
        assert_eq!(charges[0].load_port, Some(1));
        assert_eq!(charges[0].discharge_port, Some(2));
        assert_eq!(charges[0].delivery, Some(2));
        assert_eq!(charges[0].charges.d20, Some(25.0));
        assert_eq!(charges[0].original.d20, Some(100.0));
        // Trailing block after the last marker.
        assert_eq!(charges[1].load_port, Some(3));
        assert_eq!(charges[1].charges.d40, Some(60.0));
    }

    #[tokio::test]
    async fn test_multi_line_port_conventions() {
        let sink = CollectingSink::new();
        let charges =
            extract_charges(&charges_grid(), "container charges", &index(), &sink).await;

        // Load port cell "CNSHA\nShanghai": last line wins. Delivery cell
        // "Los Angeles\nrail ramp": first line wins.
        assert_eq!(charges[0].load_port, Some(1));
        assert_eq!(charges[0].delivery, Some(2));
    }

    #[tokio::test]
    async fn test_block_without_original_price_is_dropped() {
        let mut grid = charges_grid();
        // Blank out the second block's original-price row.
        grid.rows[5][4] = CellValue::Empty;
        grid.rows[5][5] = CellValue::Empty;

        let sink = CollectingSink::new();
        let charges = extract_charges(&grid, "container charges", &index(), &sink).await;
        assert_eq!(charges.len(), 1);
        assert_eq!(charges[0].load_port, Some(1));
    }

    #[tokio::test]
    async fn test_apply_charges_joins_on_exact_price() {
        let sink = CollectingSink::new();
        let charges =
            extract_charges(&charges_grid(), "container charges", &index(), &sink).await;

        // Matching leg: published rates equal the quoted original prices.
        let mut legs = vec![leg(1, 100.0), leg(1, 999.0)];
        let applied = apply_charges(&mut legs, &charges);

        assert_eq!(applied, 1);
        assert_eq!(legs[0].rates.d20, Some(125.0));
        assert_eq!(legs[0].rates.d40, Some(200.0));
        // The 45HC charge cell is blank, read as zero.
        assert_eq!(legs[0].rates.d45hc, Some(180.0));
        // Price mismatch: no augmentation.
        assert_eq!(legs[1].rates.d20, Some(999.0));
    }

    #[tokio::test]
    async fn test_identical_blocks_apply_once() {
        let sink = CollectingSink::new();
        let mut charges =
            extract_charges(&charges_grid(), "container charges", &index(), &sink).await;
        // A second block quoting the same ports and original prices.
        let duplicate = charges[0].clone();
        charges.push(duplicate);

        let mut legs = vec![leg(1, 100.0)];
        let applied = apply_charges(&mut legs, &charges);

        assert_eq!(applied, 1);
        assert_eq!(legs[0].rates.d20, Some(125.0));
        assert_eq!(legs[0].rates.d40, Some(200.0));
    }
}
