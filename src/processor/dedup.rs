use std::collections::HashMap;

use crate::models::RateLeg;

/// Collapse competing entries for the same route. Exact duplicates (same
/// route key, identical rate vector) keep the earlier entry. When one
/// entry's rates are element-wise >= the other's across all four sizes, the
/// dominated (more expensive) entry is dropped. Pairs that are cheaper on
/// some sizes and costlier on others are deliberately both retained: the
/// pipeline over-reports ambiguous alternatives rather than discarding a
/// possibly-correct rate.
///
/// Builds a fresh collection; the input is never mutated while being
/// compared.
pub fn dedupe_dominated(rates: Vec<RateLeg>) -> (Vec<RateLeg>, usize) {
    let mut keep = vec![true; rates.len()];

    for i in 0..rates.len() {
        if !keep[i] {
            continue;
        }
        for j in (i + 1)..rates.len() {
            if !keep[j] {
                continue;
            }
            if rates[i].route_key() != rates[j].route_key() {
                continue;
            }
            if rates[i].rates.exact_eq(&rates[j].rates) {
                keep[j] = false;
            } else if rates[i].rates.dominates(&rates[j].rates) {
                // Entry i is at least as expensive on every size.
                keep[i] = false;
                break;
            } else if rates[j].rates.dominates(&rates[i].rates) {
                keep[j] = false;
            }
        }
    }

    let removed = keep.iter().filter(|k| !**k).count();
    let kept = rates
        .into_iter()
        .zip(keep)
        .filter_map(|(rate, k)| k.then_some(rate))
        .collect();
    (kept, removed)
}

/// Row-level restatement handling: when a sheet revision repeats a route in
/// a later row with an updated price, the last occurrence wins
/// unconditionally. Keyed by the original route names, ignoring prices.
pub fn keep_last_occurrence(rates: Vec<RateLeg>) -> Vec<RateLeg> {
    let mut last_index: HashMap<(String, String, String), usize> = HashMap::new();
    for (index, rate) in rates.iter().enumerate() {
        let key = (
            rate.origin_name.clone(),
            rate.discharge_name.clone(),
            rate.destination_name.clone(),
        );
        last_index.insert(key, index);
    }

    rates
        .into_iter()
        .enumerate()
        .filter_map(|(index, rate)| {
            let key = (
                rate.origin_name.clone(),
                rate.discharge_name.clone(),
                rate.destination_name.clone(),
            );
            (last_index[&key] == index).then_some(rate)
        })
        .collect()
}
