use std::collections::HashMap;

use tracing::info;

use crate::diagnostics::DiagnosticsSink;
use crate::models::{ContainerSize, FeederLeg};
use crate::processor::header_locator::normalize;
use crate::processor::location_matcher::LocationIndex;
use crate::workbook::SheetGrid;

/// Column layout of the feeder tariff book: long format, one row per
/// (out port, main port, equipment) with a single rate cell.
#[derive(Debug, Clone, Copy)]
struct FeederColumns {
    origin: usize,
    transshipment: usize,
    equipment: usize,
    rate: usize,
}

fn locate_columns(grid: &SheetGrid) -> Option<(usize, FeederColumns)> {
    for (row_index, row) in grid.rows.iter().enumerate() {
        let mut origin = None;
        let mut transshipment = None;
        let mut equipment = None;
        let mut rate = None;

        for (col, cell) in row.iter().enumerate() {
            let text = normalize(&cell.text_or_empty());
            if text.is_empty() {
                continue;
            }
            if text.contains("out port") {
                origin.get_or_insert(col);
            } else if text.contains("main pol") {
                transshipment.get_or_insert(col);
            } else if text == "eq" || text.contains("equipment") {
                equipment.get_or_insert(col);
            } else if text.contains("rate") {
                rate.get_or_insert(col);
            }
        }

        if let (Some(origin), Some(transshipment)) = (origin, transshipment) {
            return Some((
                row_index,
                FeederColumns {
                    origin,
                    transshipment,
                    equipment: equipment.unwrap_or(transshipment + 1),
                    rate: rate.unwrap_or(transshipment + 2),
                },
            ));
        }
    }
    None
}

fn is_port_code(line: &str) -> bool {
    line.len() == 5 && line.chars().all(|c| c.is_ascii_uppercase())
}

/// Resolve a feeder out-port cell. The first line often carries the port's
/// five-letter code; a known code short-circuits the fuzzy matcher entirely.
/// Otherwise the last non-empty line is matched, since the code line
/// precedes the city line.
fn resolve_origin(
    text: &str,
    index: &LocationIndex,
    port_codes: &HashMap<String, i64>,
) -> (Option<i64>, String) {
    let lines: Vec<&str> = text
        .split('\n')
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect();

    if let Some(first) = lines.first() {
        if is_port_code(first) {
            if let Some(&id) = port_codes.get(*first) {
                let name = lines.get(1).copied().unwrap_or(first);
                return (Some(id), name.to_string());
            }
        }
    }

    let name = lines.last().copied().unwrap_or("").to_string();
    (index.resolve(&name).id, name)
}

/// Extract feeder legs from the feeder tariff book sheet.
///
/// Rows repeating an (out port, main port, equipment) combination keep the
/// higher rate; the book lists seasonal tariffs and the conservative quote
/// wins. Rows whose out port cannot be resolved are dropped with a
/// diagnostic, since an unidentifiable origin can never merge with a base
/// rate.
pub async fn extract_feeder_legs(
    grid: &SheetGrid,
    index: &LocationIndex,
    port_codes: &HashMap<String, i64>,
    diag: &dyn DiagnosticsSink,
) -> Vec<FeederLeg> {
    let Some((header_row, columns)) = locate_columns(grid) else {
        diag.report("Feeder sheet: out port / main POL columns not found")
            .await;
        return Vec::new();
    };

    let mut legs: Vec<FeederLeg> = Vec::new();
    let mut by_route: HashMap<(String, String), usize> = HashMap::new();

    for row in (header_row + 1)..grid.row_count() {
        let origin_text = grid.merged_value(row, columns.origin).text_or_empty();
        let trans_text = grid.merged_value(row, columns.transshipment).text_or_empty();
        if origin_text.is_empty() && trans_text.is_empty() {
            continue;
        }

        let Some(size) =
            ContainerSize::from_equipment_code(&grid.cell(row, columns.equipment).text_or_empty())
        else {
            continue;
        };
        let Some(rate) = grid.cell(row, columns.rate).as_number() else {
            continue;
        };

        let (origin, origin_name) = resolve_origin(&origin_text, index, port_codes);
        if origin.is_none() {
            diag.report(&format!(
                "Feeder row {}: unmatched out port '{origin_name}'",
                row + 1
            ))
            .await;
            continue;
        }

        let trans_outcome = index.resolve(&trans_text);
        let key = (origin_name.clone(), trans_text.clone());
        let entry = match by_route.get(&key).copied() {
            Some(existing) => existing,
            None => {
                legs.push(FeederLeg {
                    row_number: row + 1,
                    origin,
                    origin_name,
                    transshipment: trans_outcome.id,
                    transshipment_name: trans_text.clone(),
                    rates: Default::default(),
                });
                by_route.insert(key, legs.len() - 1);
                legs.len() - 1
            }
        };

        let current = legs[entry].rates.get(size).unwrap_or(f64::MIN);
        if rate > current {
            legs[entry].rates.set(size, Some(rate));
        }
    }

    info!("Extracted {} feeder legs", legs.len());
    legs
}
