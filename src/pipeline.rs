use anyhow::{anyhow, Result};
use regex::Regex;
use tracing::info;

use crate::config::VariantConfig;
use crate::diagnostics::DiagnosticsSink;
use crate::output::{format_records, RateRecord};
use crate::processor::{
    apply_charges, cheapest_per_origin, dedupe_dominated, extract_charges, extract_feeder_legs,
    extract_rate_legs, find_contract_number, keep_last_occurrence, merge_feeder_rates,
};
use crate::reference::LookupContext;
use crate::workbook::{SheetGrid, Workbook};

/// What a run did, for the end-of-run summary log. Every excluded or
/// collapsed row is accounted for somewhere in here.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineSummary {
    pub extracted: usize,
    pub feeder_legs: usize,
    pub merged_from_feeders: usize,
    pub excluded_flagged: usize,
    pub excluded_unresolved: usize,
    pub restatements_collapsed: usize,
    pub duplicates_removed: usize,
    pub charges_applied: usize,
}

pub struct PipelineReport {
    pub contract_number: String,
    pub records: Vec<RateRecord>,
    pub summary: PipelineSummary,
}

/// Choose the contract template by inspecting the workbook itself: a cover
/// sheet mentioning a service contract selects the SVC template, a QHOF
/// contract number anywhere in the first sheet's scan window selects FAK.
/// FAK is the default when neither signal appears.
pub fn detect_variant(workbook: &Workbook) -> VariantConfig {
    if let Some(cover) = workbook.find_sheet("cover") {
        if grid_mentions(cover, "service contract") {
            return VariantConfig::service_contract();
        }
    }
    if let Some(first) = workbook.first_sheet() {
        if grid_mentions(first, "service contract") {
            return VariantConfig::service_contract();
        }
        let qhof = Regex::new(r"\bQHOF").ok();
        if let Some(pattern) = qhof {
            for row in first.rows.iter().take(10) {
                for cell in row {
                    if cell.as_text().map(|t| pattern.is_match(t)).unwrap_or(false) {
                        return VariantConfig::fak();
                    }
                }
            }
        }
    }
    VariantConfig::fak()
}

fn grid_mentions(grid: &SheetGrid, needle: &str) -> bool {
    grid.rows.iter().take(10).any(|row| {
        row.iter().any(|cell| {
            cell.as_text()
                .map(|t| t.to_lowercase().contains(needle))
                .unwrap_or(false)
        })
    })
}

pub struct Pipeline<'a> {
    config: &'a VariantConfig,
    context: &'a LookupContext,
    diag: &'a dyn DiagnosticsSink,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        config: &'a VariantConfig,
        context: &'a LookupContext,
        diag: &'a dyn DiagnosticsSink,
    ) -> Self {
        Pipeline {
            config,
            context,
            diag,
        }
    }

    /// Run the whole extraction over one workbook. Row-level anomalies are
    /// recovered locally and counted; only a workbook with no usable main
    /// sheet errors out.
    pub async fn run(&self, workbook: &Workbook) -> Result<PipelineReport> {
        let main_grid = workbook
            .sheets
            .iter()
            .find(|(name, _)| !name.to_lowercase().contains("cover"))
            .map(|(_, grid)| grid)
            .ok_or_else(|| anyhow!("Workbook has no rate sheet"))?;

        let mut summary = PipelineSummary::default();
        let contract_number = find_contract_number(main_grid, self.config);

        let mut legs =
            extract_rate_legs(main_grid, self.config, &self.context.locations, self.diag).await;
        summary.extracted = legs.len();

        // Sheet revisions restate routes in later rows.
        let before = legs.len();
        legs = keep_last_occurrence(legs);
        summary.restatements_collapsed = before - legs.len();

        for leg in legs.iter_mut() {
            if let Some((id, name)) = self
                .context
                .services
                .resolve(&leg.origin_name, &leg.discharge_name)
            {
                leg.service = Some(id);
                leg.service_name = Some(name);
            }
        }

        // Maintenance charges join on the published prices, so they are
        // applied before anything changes the rate vectors.
        if let Some(charges_grid) = workbook
            .sheet(&self.config.sheets.charges_sheet)
            .or_else(|| workbook.find_sheet("charges"))
        {
            let charges = extract_charges(
                charges_grid,
                &self.config.sheets.block_marker,
                &self.context.locations,
                self.diag,
            )
            .await;
            summary.charges_applied = apply_charges(&mut legs, &charges);
        }

        let before = legs.len();
        legs.retain(|leg| !leg.flags.any());
        summary.excluded_flagged = before - legs.len();

        let before = legs.len();
        legs.retain(|leg| leg.has_ports());
        summary.excluded_unresolved = before - legs.len();

        let (mut legs, removed) = dedupe_dominated(legs);
        summary.duplicates_removed = removed;

        if let Some(feeder_grid) = workbook.find_sheet(&self.config.sheets.feeder_keyword) {
            let feeders = extract_feeder_legs(
                feeder_grid,
                &self.context.locations,
                &self.context.port_codes,
                self.diag,
            )
            .await;
            summary.feeder_legs = feeders.len();

            let feeders = cheapest_per_origin(feeders);
            let mut merged =
                merge_feeder_rates(&legs, &feeders, self.config.merge.base_rate_floor);
            summary.merged_from_feeders = merged.len();
            legs.append(&mut merged);
        }

        let (mut legs, removed) = dedupe_dominated(legs);
        summary.duplicates_removed += removed;

        for leg in legs.iter_mut() {
            leg.rates.backfill();
        }

        let records = format_records(&legs, self.config, &contract_number);
        info!(
            "Pipeline finished: {} records from {} extracted legs ({} flagged, {} unresolved, {} restated, {} duplicates, {} feeder merges, {} charged)",
            records.len(),
            summary.extracted,
            summary.excluded_flagged,
            summary.excluded_unresolved,
            summary.restatements_collapsed,
            summary.duplicates_removed,
            summary.merged_from_feeders,
            summary.charges_applied,
        );

        Ok(PipelineReport {
            contract_number,
            records,
            summary,
        })
    }
}
