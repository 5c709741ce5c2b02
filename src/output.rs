use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::VariantConfig;
use crate::models::{ContainerSize, RateLeg};

/// One normalized rate record, every field as text the way the downstream
/// platform ingests them. Ports are canonical location IDs; absent values
/// are empty strings, never "null".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateRecord {
    pub carrier: String,
    pub port_origin: String,
    pub port_discharge: String,
    pub port_destination: String,
    pub valid_from: String,
    pub valid_to: String,
    pub transit_time: String,
    pub rate_source: String,
    #[serde(rename = "20ft")]
    pub rate_20: String,
    #[serde(rename = "40ft")]
    pub rate_40: String,
    #[serde(rename = "40HC")]
    pub rate_40hc: String,
    #[serde(rename = "45HC")]
    pub rate_45hc: String,
    pub service: String,
    pub contract: String,
    pub carrier_contract_number: String,
}

/// Whole amounts print without a decimal point; backfilled ratios keep
/// their fraction.
fn fmt_rate(value: Option<f64>) -> String {
    match value {
        Some(v) if v.fract() == 0.0 => format!("{v:.0}"),
        Some(v) => format!("{v}"),
        None => String::new(),
    }
}

fn fmt_id(value: Option<i64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

impl RateRecord {
    pub fn from_leg(leg: &RateLeg, config: &VariantConfig, contract_number: &str) -> Self {
        RateRecord {
            carrier: config.contract.carrier_id.to_string(),
            port_origin: fmt_id(leg.origin),
            port_discharge: fmt_id(leg.discharge),
            port_destination: fmt_id(leg.destination),
            valid_from: leg
                .valid_from
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            valid_to: leg
                .valid_to
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            transit_time: String::new(),
            rate_source: config.contract.rate_source_id.to_string(),
            rate_20: fmt_rate(leg.rates.get(ContainerSize::D20)),
            rate_40: fmt_rate(leg.rates.get(ContainerSize::D40)),
            rate_40hc: fmt_rate(leg.rates.get(ContainerSize::D40Hc)),
            rate_45hc: fmt_rate(leg.rates.get(ContainerSize::D45Hc)),
            service: fmt_id(leg.service),
            contract: config.contract.contract_code.clone(),
            carrier_contract_number: contract_number.to_string(),
        }
    }
}

pub fn format_records(
    legs: &[RateLeg],
    config: &VariantConfig,
    contract_number: &str,
) -> Vec<RateRecord> {
    legs.iter()
        .map(|leg| RateRecord::from_leg(leg, config, contract_number))
        .collect()
}

/// Where finished records go. Delivery transport is a collaborator; the
/// pipeline only hands over the batch.
#[async_trait]
pub trait RateSink: Send + Sync {
    async fn publish(&self, records: &[RateRecord]) -> Result<()>;
}

/// Default sink: one structured log line per record.
pub struct LoggingSink;

#[async_trait]
impl RateSink for LoggingSink {
    async fn publish(&self, records: &[RateRecord]) -> Result<()> {
        for record in records {
            info!("rate record: {}", serde_json::to_string(record)?);
        }
        info!("Published {} rate records", records.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContainerRates, LegFlags};
    use chrono::NaiveDate;

    fn leg() -> RateLeg {
        RateLeg {
            row_number: 7,
            origin: Some(1),
            discharge: Some(2),
            destination: Some(2),
            origin_name: "SHANGHAI".to_string(),
            discharge_name: "LOS ANGELES".to_string(),
            destination_name: "LOS ANGELES".to_string(),
            rates: ContainerRates {
                d20: Some(1440.0),
                d40: Some(1600.0),
                d40hc: Some(1650.5),
                d45hc: None,
            },
            valid_from: NaiveDate::from_ymd_opt(2024, 1, 1),
            valid_to: None,
            flags: LegFlags::default(),
            service: Some(9),
            service_name: Some("Pacific Loop 1".to_string()),
        }
    }

    #[test]
    fn test_record_fields_are_text() {
        let config = VariantConfig::fak();
        let record = RateRecord::from_leg(&leg(), &config, "QHOF24001");

        assert_eq!(record.carrier, "653309");
        assert_eq!(record.port_origin, "1");
        assert_eq!(record.rate_20, "1440");
        assert_eq!(record.rate_40hc, "1650.5");
        assert_eq!(record.rate_45hc, "");
        assert_eq!(record.valid_from, "2024-01-01");
        assert_eq!(record.valid_to, "");
        assert_eq!(record.contract, "33");
        assert_eq!(record.carrier_contract_number, "QHOF24001");
        assert_eq!(record.service, "9");
    }

    #[test]
    fn test_size_fields_serialize_with_renames() {
        let config = VariantConfig::fak();
        let record = RateRecord::from_leg(&leg(), &config, "QHOF24001");
        let json = serde_json::to_string(&record).unwrap();

        assert!(json.contains("\"20ft\":\"1440\""));
        assert!(json.contains("\"40HC\":\"1650.5\""));
        assert!(json.contains("\"45HC\":\"\""));
    }
}
