use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// The four container sizes every rate carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContainerSize {
    D20,
    D40,
    D40Hc,
    D45Hc,
}

impl ContainerSize {
    pub const ALL: [ContainerSize; 4] = [
        ContainerSize::D20,
        ContainerSize::D40,
        ContainerSize::D40Hc,
        ContainerSize::D45Hc,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ContainerSize::D20 => "20ft",
            ContainerSize::D40 => "40ft",
            ContainerSize::D40Hc => "40HC",
            ContainerSize::D45Hc => "45HC",
        }
    }

    /// Equipment codes as they appear in feeder tariff tables.
    pub fn from_equipment_code(code: &str) -> Option<ContainerSize> {
        match code.trim().to_uppercase().as_str() {
            "20ST" | "D20" => Some(ContainerSize::D20),
            "40ST" | "D40" => Some(ContainerSize::D40),
            "40HC" => Some(ContainerSize::D40Hc),
            "45HC" => Some(ContainerSize::D45Hc),
            _ => None,
        }
    }
}

/// Per-container-size rates. A value is a non-negative amount or absent;
/// NaN never enters this struct (cell parsing already filters it).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainerRates {
    pub d20: Option<f64>,
    pub d40: Option<f64>,
    pub d40hc: Option<f64>,
    pub d45hc: Option<f64>,
}

impl ContainerRates {
    pub fn get(&self, size: ContainerSize) -> Option<f64> {
        match size {
            ContainerSize::D20 => self.d20,
            ContainerSize::D40 => self.d40,
            ContainerSize::D40Hc => self.d40hc,
            ContainerSize::D45Hc => self.d45hc,
        }
    }

    pub fn set(&mut self, size: ContainerSize, value: Option<f64>) {
        match size {
            ContainerSize::D20 => self.d20 = value,
            ContainerSize::D40 => self.d40 = value,
            ContainerSize::D40Hc => self.d40hc = value,
            ContainerSize::D45Hc => self.d45hc = value,
        }
    }

    pub fn is_empty(&self) -> bool {
        ContainerSize::ALL.iter().all(|s| self.get(*s).is_none())
    }

    pub fn any_present(&self) -> bool {
        !self.is_empty()
    }

    /// 20ft + 40ft sum with absent treated as zero. Used to pick the
    /// cheapest feeder candidate per origin.
    pub fn total_20_40(&self) -> f64 {
        self.d20.unwrap_or(0.0) + self.d40.unwrap_or(0.0)
    }

    /// True when both vectors are identical, including absence.
    pub fn exact_eq(&self, other: &ContainerRates) -> bool {
        ContainerSize::ALL
            .iter()
            .all(|s| self.get(*s) == other.get(*s))
    }

    /// Element-wise >= across all four sizes. Absent-vs-absent counts as
    /// equal; absent against a present value on either side breaks the
    /// ordering, so partially-populated pairs are incomparable.
    pub fn dominates(&self, other: &ContainerRates) -> bool {
        ContainerSize::ALL.iter().all(|s| {
            match (self.get(*s), other.get(*s)) {
                (None, None) => true,
                (Some(a), Some(b)) => a >= b,
                _ => false,
            }
        })
    }

    /// Back-fill absent or zero 20ft and 45HC from the 40ft rate using the
    /// fixed contract ratios. Only applies when a 40ft rate exists.
    pub fn backfill(&mut self) {
        if let Some(d40) = self.d40 {
            if self.d20.unwrap_or(0.0) == 0.0 {
                self.d20 = Some(0.9 * d40);
            }
            if self.d45hc.unwrap_or(0.0) == 0.0 {
                self.d45hc = Some(1.2 * d40);
            }
        }
    }
}

/// Exclusion markers read from the main rate table: a non-empty cell under
/// any of these headers takes the row out of the standard FAK offering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LegFlags {
    pub shipper_owned: bool,
    pub hazardous: bool,
    pub non_reefer: bool,
}

impl LegFlags {
    pub fn any(&self) -> bool {
        self.shipper_owned || self.hazardous || self.non_reefer
    }
}

/// One extracted tariff line: a long-haul base rate, or a feeder-derived
/// through-rate after merging.
#[derive(Debug, Clone, PartialEq)]
pub struct RateLeg {
    pub row_number: usize,
    pub origin: Option<i64>,
    pub discharge: Option<i64>,
    pub destination: Option<i64>,
    pub origin_name: String,
    pub discharge_name: String,
    pub destination_name: String,
    pub rates: ContainerRates,
    pub valid_from: Option<NaiveDate>,
    pub valid_to: Option<NaiveDate>,
    pub flags: LegFlags,
    pub service: Option<i64>,
    pub service_name: Option<String>,
}

impl RateLeg {
    /// A leg without resolved origin, discharge and destination IDs is
    /// disqualified from output.
    pub fn has_ports(&self) -> bool {
        self.origin.is_some() && self.discharge.is_some() && self.destination.is_some()
    }

    pub fn route_key(&self) -> RouteKey {
        RouteKey {
            service: self.service,
            origin: self.origin,
            discharge: self.discharge,
            destination: self.destination,
        }
    }
}

/// Deduplication identity: two legs with the same key and the same rate
/// vector are duplicates; same key with ordered rates are
/// dominance-comparable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RouteKey {
    pub service: Option<i64>,
    pub origin: Option<i64>,
    pub discharge: Option<i64>,
    pub destination: Option<i64>,
}

/// A short-haul leg from a true origin into a transshipment port that itself
/// appears as an origin in the base-rate table.
#[derive(Debug, Clone, PartialEq)]
pub struct FeederLeg {
    pub row_number: usize,
    pub origin: Option<i64>,
    pub origin_name: String,
    pub transshipment: Option<i64>,
    pub transshipment_name: String,
    pub rates: ContainerRates,
}

/// A container-maintenance charge block from the standard-charges sheet.
/// `original` holds the published rate the charge was quoted against; it is
/// the exact-equality join key back onto a rate leg.
#[derive(Debug, Clone, PartialEq)]
pub struct MaintenanceCharge {
    pub block_number: usize,
    pub load_port: Option<i64>,
    pub discharge_port: Option<i64>,
    pub delivery: Option<i64>,
    pub charges: ContainerRates,
    pub original: ContainerRates,
}

impl MaintenanceCharge {
    /// The join rule: ports must match, and for every size where the quoted
    /// original price is a nonzero number, the leg's published rate must
    /// equal it exactly. A zero or absent original price is no constraint.
    pub fn applies_to(&self, leg: &RateLeg) -> bool {
        if self.load_port != leg.origin
            || self.discharge_port != leg.discharge
            || self.delivery != leg.destination
        {
            return false;
        }
        ContainerSize::ALL.iter().all(|size| {
            match self.original.get(*size) {
                Some(price) if price != 0.0 => leg.rates.get(*size) == Some(price),
                _ => true,
            }
        })
    }
}
