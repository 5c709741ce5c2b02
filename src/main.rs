use std::env;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{error, info, warn};

mod config;
mod diagnostics;
mod models;
mod output;
mod pipeline;
mod processor;
mod reference;
mod workbook;

use config::VariantConfig;
use diagnostics::TracingSink;
use output::{LoggingSink, RateSink};
use pipeline::{detect_variant, Pipeline};
use reference::{JsonFileSource, LookupContext};
use workbook::load_workbook;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    // Load environment variables
    dotenv::dotenv().ok();

    let workbooks: Vec<String> = env::args().skip(1).filter(|a| !a.starts_with('-')).collect();
    if workbooks.is_empty() {
        warn!("No workbook paths given; nothing to do");
        return Ok(());
    }

    info!("Starting ratesheet pipeline for {} workbook(s)", workbooks.len());

    let locations_path =
        env::var("RATESHEET_LOCATIONS").unwrap_or_else(|_| "data/locations.json".to_string());
    let services_path =
        env::var("RATESHEET_SERVICES").unwrap_or_else(|_| "data/services.json".to_string());
    let config_override = env::var("RATESHEET_CONFIG").ok();

    let location_source = JsonFileSource::new(&locations_path);
    let service_source = JsonFileSource::new(&services_path);

    // Reference sets load once; every workbook shares the same context.
    let matching = config_override
        .as_deref()
        .map(VariantConfig::from_file)
        .transpose()?
        .map(|c| c.matching)
        .unwrap_or_else(|| VariantConfig::default().matching);
    let context = LookupContext::load(&location_source, &service_source, &matching)
        .await
        .context("Failed to load reference datasets")?;

    let diag = TracingSink;
    let sink = LoggingSink;

    let mut total_records = 0;
    let mut successful = 0;

    for path in &workbooks {
        info!("=== Processing workbook: {} ===", path);

        if !Path::new(path).exists() {
            warn!("Workbook not found: {}", path);
            continue;
        }

        match process_workbook(path, config_override.as_deref(), &context, &diag, &sink).await {
            Ok(count) => {
                info!("Successfully processed {} with {} records", path, count);
                total_records += count;
                successful += 1;
            }
            Err(e) => {
                error!("Failed to process {}: {:#}", path, e);
                // Continue with other workbooks even if one fails
            }
        }
    }

    info!("=== Pipeline Summary ===");
    info!("Processed {} out of {} workbooks", successful, workbooks.len());
    info!("Total rate records: {}", total_records);

    if successful == 0 {
        warn!("No workbooks were processed successfully");
    }

    Ok(())
}

async fn process_workbook(
    path: &str,
    config_override: Option<&str>,
    context: &LookupContext,
    diag: &TracingSink,
    sink: &dyn RateSink,
) -> Result<usize> {
    let workbook = load_workbook(Path::new(path))?;

    let config = match config_override {
        Some(config_path) => VariantConfig::from_file(config_path)
            .with_context(|| format!("Failed to load variant config {config_path}"))?,
        None => detect_variant(&workbook),
    };
    info!("Using contract template: {}", config.contract.label);

    let pipeline = Pipeline::new(&config, context, diag);
    let report = pipeline.run(&workbook).await?;

    info!(
        "Contract {} ({}): {} records",
        report.contract_number,
        config.contract.contract_code,
        report.records.len()
    );
    sink.publish(&report.records).await?;

    Ok(report.records.len())
}
