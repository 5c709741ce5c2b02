use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Semantic column roles resolved against a header row. Column positions vary
/// between contract templates; only the role is stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ColumnRole {
    Origin,
    Discharge,
    Destination,
    ValidFrom,
    ValidTo,
    Rate20,
    Rate40,
    Rate40Hc,
    Rate45Hc,
    ShipperOwned,
    Hazardous,
    NonReefer,
}

/// One role's keyword variants plus the documented fallback column used when
/// no header cell matches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleSpec {
    pub role: ColumnRole,
    pub keywords: Vec<String>,
    #[serde(default)]
    pub default_col: Option<usize>,
}

impl RoleSpec {
    fn new(role: ColumnRole, keywords: &[&str], default_col: Option<usize>) -> Self {
        RoleSpec {
            role,
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            default_col,
        }
    }
}

/// Contract identity stamped onto every output record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractConfig {
    pub label: String,
    pub contract_code: String,
    pub carrier_id: i64,
    pub rate_source_id: i64,
    /// Regex scanned over the first `scan_rows` rows to pick up the carrier
    /// contract number from the sheet itself.
    pub number_pattern: String,
    pub number_fallback: String,
    pub scan_rows: usize,
}

/// Header detection tables: keyword tiers tried in priority order, the
/// documented default row when nothing matches, and the role keyword table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeaderConfig {
    pub tiers: Vec<Vec<String>>,
    pub default_row: usize,
    /// Some templates split headers over two rows; when set, the cell below
    /// each header cell is concatenated before keyword matching.
    pub two_line_headers: bool,
    pub roles: Vec<RoleSpec>,
}

/// Location-matcher tuning: hand-maintained alias spellings and the generic
/// tokens that disqualify a segment from standalone matching.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchingConfig {
    #[serde(default)]
    pub aliases: HashMap<String, String>,
    #[serde(default)]
    pub generic_words: Vec<String>,
}

/// Where the ancillary tables live inside the workbook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetConfig {
    pub feeder_keyword: String,
    pub charges_sheet: String,
    pub block_marker: String,
}

/// Feeder-merge behavior that differs between templates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MergeConfig {
    /// When set, a base rate at or below this floor is treated as "not
    /// offered" and contributes 0 to the merged through-rate instead of
    /// being summed with the feeder charge.
    #[serde(default)]
    pub base_rate_floor: Option<f64>,
}

/// Everything that varies per contract template, kept as data rather than
/// per-variant code forks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantConfig {
    pub contract: ContractConfig,
    pub headers: HeaderConfig,
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub port_groups: HashMap<String, Vec<String>>,
    pub sheets: SheetConfig,
    #[serde(default)]
    pub merge: MergeConfig,
}

impl VariantConfig {
    /// Load configuration from TOML file
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read variant config {path}"))?;
        let config: VariantConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse variant config {path}"))?;
        Ok(config)
    }

    /// FAK ("freight all kinds") contract template: single main sheet with a
    /// wide header block, feeder tariff book and standard-charges sheets.
    pub fn fak() -> Self {
        VariantConfig {
            contract: ContractConfig {
                label: "QHOF FAK".to_string(),
                contract_code: "33".to_string(),
                carrier_id: 653309,
                rate_source_id: 653309,
                number_pattern: r"\bQHOF\w*".to_string(),
                number_fallback: "QHOF-Contract".to_string(),
                scan_rows: 8,
            },
            headers: HeaderConfig {
                tiers: vec![
                    vec![
                        "soc".to_string(),
                        "nor".to_string(),
                        "haz".to_string(),
                        "load".to_string(),
                        "discharge".to_string(),
                        "delivery".to_string(),
                    ],
                    vec!["dg".to_string(), "nref".to_string()],
                ],
                default_row: 5,
                two_line_headers: false,
                roles: vec![
                    RoleSpec::new(ColumnRole::Origin, &["load", "origin"], Some(2)),
                    RoleSpec::new(ColumnRole::Discharge, &["discharge", "unloading"], Some(3)),
                    RoleSpec::new(
                        ColumnRole::Destination,
                        &["delivery", "destination", "arrival"],
                        Some(4),
                    ),
                    RoleSpec::new(
                        ColumnRole::ShipperOwned,
                        &["soc", "shipper owned container"],
                        Some(5),
                    ),
                    RoleSpec::new(ColumnRole::NonReefer, &["nor", "non-reff", "nref"], Some(6)),
                    RoleSpec::new(ColumnRole::Hazardous, &["haz", "hazardous", "dg"], Some(7)),
                    RoleSpec::new(
                        ColumnRole::ValidFrom,
                        &["valid from", "start date", "effective date"],
                        Some(8),
                    ),
                    RoleSpec::new(
                        ColumnRole::ValidTo,
                        &["valid to", "end date", "expiry date"],
                        Some(9),
                    ),
                    RoleSpec::new(ColumnRole::Rate20, &["20st", "20 standard", "20"], Some(11)),
                    RoleSpec::new(ColumnRole::Rate40, &["40st", "40 standard"], Some(12)),
                    RoleSpec::new(
                        ColumnRole::Rate40Hc,
                        &["40hc", "40 high container"],
                        Some(13),
                    ),
                    RoleSpec::new(
                        ColumnRole::Rate45Hc,
                        &["45hc", "45 high container", "45"],
                        Some(14),
                    ),
                ],
            },
            matching: MatchingConfig {
                aliases: HashMap::new(),
                generic_words: vec!["port".to_string(), "tanjung".to_string(), "st".to_string()],
            },
            port_groups: HashMap::new(),
            sheets: SheetConfig {
                feeder_keyword: "feeder".to_string(),
                charges_sheet: "Standard charges".to_string(),
                block_marker: "container charges".to_string(),
            },
            merge: MergeConfig {
                base_rate_floor: None,
            },
        }
    }

    /// Service-contract template: POL/POD/Place-of-Delivery headers, port
    /// groups standing in for coast-wide base-port lists, and the base>floor
    /// rule on feeder merging.
    pub fn service_contract() -> Self {
        let mut port_groups = HashMap::new();
        for (code, ports) in [
            ("BP BAL", vec!["XIAMEN", "HONG KONG", "YANTIAN"]),
            ("SE ASIA BP GCFL", vec!["VUNG TAU", "SINGAPORE"]),
            ("GULF", vec!["HOUSTON", "MOBILE", "NEW ORLEANS"]),
            (
                "BP JAPAN",
                vec![
                    "NAGOYA",
                    "SHIMIZU",
                    "TOKYO",
                    "KOBE",
                    "YOKOHAMA",
                    "OSAKA",
                    "HIROSHIMA",
                    "MOJI",
                    "HAKATA/FUKUOKA",
                ],
            ),
            ("NCPRC BP EC", vec!["SHANGHAI", "NINGBO", "QINGDAO"]),
            (
                "SE ASIA BP EC",
                vec!["VUNG TAU", "PORT KLANG", "SINGAPORE", "HAIPHONG"],
            ),
            (
                "BP MIA",
                vec![
                    "PORT KLANG",
                    "HAIPHONG",
                    "YANTIAN",
                    "NINGBO",
                    "SHANGHAI",
                    "XIAMEN",
                ],
            ),
            ("SPRC BP EC", vec!["YANTIAN", "SHEKOU", "XIAMEN", "HONG KONG"]),
            (
                "BP GCFL",
                vec!["NINGBO", "SHANGHAI", "XIAMEN", "YANTIAN", "SHEKOU"],
            ),
            ("BP BOS", vec!["SHANGHAI", "NINGBO", "QINGDAO"]),
            (
                "FAK GCFL",
                vec!["NINGBO", "SHANGHAI", "XIAMEN", "YANTIAN", "SHEKOU"],
            ),
        ] {
            port_groups.insert(
                code.to_string(),
                ports.into_iter().map(|p| p.to_string()).collect(),
            );
        }

        VariantConfig {
            contract: ContractConfig {
                label: "SVC Service Contract".to_string(),
                contract_code: "38".to_string(),
                carrier_id: 653309,
                rate_source_id: 653309,
                number_pattern: r"\bSVC\s?-?\d+".to_string(),
                number_fallback: "SVC3118".to_string(),
                scan_rows: 10,
            },
            headers: HeaderConfig {
                tiers: vec![vec![
                    "pol".to_string(),
                    "pod".to_string(),
                    "place of delivery".to_string(),
                ]],
                default_row: 3,
                two_line_headers: false,
                roles: vec![
                    RoleSpec::new(ColumnRole::Origin, &["pol"], Some(0)),
                    RoleSpec::new(ColumnRole::Discharge, &["pod"], Some(1)),
                    RoleSpec::new(ColumnRole::Destination, &["place of delivery"], Some(2)),
                    RoleSpec::new(ColumnRole::Rate20, &["d20", "20st"], Some(4)),
                    RoleSpec::new(ColumnRole::Rate40, &["d40", "40st"], Some(5)),
                    RoleSpec::new(ColumnRole::Rate40Hc, &["40hc"], None),
                    RoleSpec::new(ColumnRole::Rate45Hc, &["45hc"], None),
                    RoleSpec::new(ColumnRole::ValidFrom, &["effective"], None),
                    RoleSpec::new(ColumnRole::ValidTo, &["expiration"], None),
                ],
            },
            matching: MatchingConfig {
                aliases: HashMap::new(),
                generic_words: vec!["port".to_string(), "tanjung".to_string(), "st".to_string()],
            },
            port_groups,
            sheets: SheetConfig {
                feeder_keyword: "feeder".to_string(),
                charges_sheet: "Standard charges".to_string(),
                block_marker: "container charges".to_string(),
            },
            merge: MergeConfig {
                base_rate_floor: Some(1.0),
            },
        }
    }

    pub fn role(&self, role: ColumnRole) -> Option<&RoleSpec> {
        self.headers.roles.iter().find(|spec| spec.role == role)
    }
}

impl Default for VariantConfig {
    fn default() -> Self {
        VariantConfig::fak()
    }
}
