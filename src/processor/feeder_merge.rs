use std::collections::{HashMap, HashSet};

use crate::models::{ContainerSize, FeederLeg, RateLeg};

/// Keep only the cheapest feeder candidate (lowest 20ft+40ft sum) per true
/// origin, so one physical origin never produces several competing
/// feeder-derived through-rates. Earlier rows win ties.
pub fn cheapest_per_origin(feeders: Vec<FeederLeg>) -> Vec<FeederLeg> {
    let mut best: HashMap<String, usize> = HashMap::new();
    for (index, feeder) in feeders.iter().enumerate() {
        let total = feeder.rates.total_20_40();
        let cheaper = match best.get(&feeder.origin_name) {
            Some(&current) => total < feeders[current].rates.total_20_40(),
            None => true,
        };
        if cheaper {
            best.insert(feeder.origin_name.clone(), index);
        }
    }

    let keep: HashSet<usize> = best.into_values().collect();
    feeders
        .into_iter()
        .enumerate()
        .filter_map(|(index, feeder)| keep.contains(&index).then_some(feeder))
        .collect()
}

/// Combine feeder legs with base rates into through-rates.
///
/// A feeder whose true origin already has a direct base rate is suppressed:
/// direct rates take precedence. Otherwise every base rate departing from
/// the feeder's transshipment port yields a merged leg whose origin is the
/// feeder's true origin and whose per-size rates are the sum of both legs
/// (absent values count as zero). With `base_rate_floor` set, a base rate at
/// or below the floor is treated as "not offered" and the merged value for
/// that size is 0 rather than the bare feeder charge.
pub fn merge_feeder_rates(
    base_rates: &[RateLeg],
    feeders: &[FeederLeg],
    base_rate_floor: Option<f64>,
) -> Vec<RateLeg> {
    let direct_origins: HashSet<i64> = base_rates.iter().filter_map(|r| r.origin).collect();

    let mut merged = Vec::new();
    for feeder in feeders {
        let (Some(feeder_origin), Some(transshipment)) = (feeder.origin, feeder.transshipment)
        else {
            continue;
        };
        if direct_origins.contains(&feeder_origin) {
            continue;
        }

        for base in base_rates.iter().filter(|b| b.origin == Some(transshipment)) {
            let mut through = base.clone();
            through.origin = Some(feeder_origin);
            through.origin_name = feeder.origin_name.clone();
            for size in ContainerSize::ALL {
                let base_value = base.rates.get(size);
                let feeder_value = feeder.rates.get(size).unwrap_or(0.0);
                let summed = match base_rate_floor {
                    Some(floor) => {
                        if base_value.unwrap_or(0.0) > floor {
                            base_value.unwrap_or(0.0) + feeder_value
                        } else {
                            0.0
                        }
                    }
                    None => base_value.unwrap_or(0.0) + feeder_value,
                };
                through.rates.set(size, Some(summed));
            }
            merged.push(through);
        }
    }

    merged
}
