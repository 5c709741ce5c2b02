use regex::Regex;
use std::collections::HashMap;

use super::header_locator::normalize;
use crate::config::variant::MatchingConfig;
use crate::models::CanonicalLocation;

/// Outcome of a resolution attempt. A miss is not an error: `id` is `None`
/// and `closest` carries the nearest candidate for diagnostics when one
/// exists within the edit-distance threshold's neighborhood.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MatchOutcome {
    pub id: Option<i64>,
    pub closest: Option<String>,
}

impl MatchOutcome {
    fn hit(id: i64) -> Self {
        MatchOutcome {
            id: Some(id),
            closest: None,
        }
    }

    fn miss(closest: Option<String>) -> Self {
        MatchOutcome { id: None, closest }
    }
}

const MAX_EDIT_DISTANCE: usize = 3;

struct Entry {
    id: i64,
    display_name: String,
    normalized: String,
    tokens: Vec<String>,
}

/// Resolves free-text place names against the canonical reference set.
/// Strategies are tried in order, short-circuiting on the first hit:
/// alias table, exact, city-only, token subset, bounded edit distance.
pub struct LocationIndex {
    entries: Vec<Entry>,
    aliases: HashMap<String, String>,
    generic_words: Vec<String>,
    region_code: Regex,
}

impl LocationIndex {
    pub fn new(locations: &[CanonicalLocation], matching: &MatchingConfig) -> Self {
        let entries = locations
            .iter()
            .map(|loc| {
                let normalized = normalize(&loc.name);
                let tokens = normalized.split_whitespace().map(|t| t.to_string()).collect();
                Entry {
                    id: loc.id,
                    display_name: loc.name.clone(),
                    normalized,
                    tokens,
                }
            })
            .collect();

        let aliases = matching
            .aliases
            .iter()
            .map(|(alias, canonical)| (normalize(alias), canonical.clone()))
            .collect();

        LocationIndex {
            entries,
            aliases,
            generic_words: matching
                .generic_words
                .iter()
                .map(|w| w.to_lowercase())
                .collect(),
            // A region/state code is two trailing capitals after a comma or
            // space ("Vancouver, BC"), not just any uppercase suffix.
            region_code: Regex::new(r"[,\s][A-Z]{2}$").unwrap(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Resolve a raw cell value to a canonical location id.
    pub fn resolve(&self, text: &str) -> MatchOutcome {
        let Some(segment) = self.pick_segment(text) else {
            return MatchOutcome::miss(None);
        };
        // City part before the first comma is the actual matching text;
        // carriers append countries, region codes and terminal names there.
        let city = segment.split(',').next().unwrap_or("").trim();
        if city.is_empty() {
            return MatchOutcome::miss(None);
        }

        let normalized_segment = normalize(&segment);
        let normalized_city = normalize(city);

        if self.is_generic(&normalized_city) {
            return MatchOutcome::miss(None);
        }

        // Hand-maintained alias spellings redirect to a canonical name.
        let lookup = match self.aliases.get(&normalized_city) {
            Some(canonical) => normalize(canonical),
            None => normalized_city.clone(),
        };

        // Exact match on the full segment, then city-only.
        for candidate in [normalized_segment.as_str(), lookup.as_str()] {
            if let Some(entry) = self.entries.iter().find(|e| e.normalized == candidate) {
                return MatchOutcome::hit(entry.id);
            }
        }

        if let Some(entry) = self.token_subset_match(&lookup) {
            return MatchOutcome::hit(entry.id);
        }

        self.edit_distance_match(&lookup)
    }

    /// Multi-line cells carry carrier codes or terminal names on their own
    /// lines. Prefer the line ending in a two-letter region code, else the
    /// first non-empty line.
    fn pick_segment(&self, text: &str) -> Option<String> {
        let segments: Vec<&str> = text
            .split('\n')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect();
        if segments.is_empty() {
            return None;
        }
        let chosen = segments
            .iter()
            .find(|s| self.region_code.is_match(s))
            .unwrap_or(&segments[0]);
        Some(chosen.to_string())
    }

    fn is_generic(&self, normalized_city: &str) -> bool {
        normalized_city
            .split_whitespace()
            .any(|token| self.generic_words.iter().any(|w| w == token))
    }

    /// Every input token must appear among the reference name's tokens. A
    /// single-token reference name only needs to equal the first input
    /// token. The direction is deliberate: "Yantian" matches "Yantian,
    /// China" but never a lone generic reference like "Port".
    fn token_subset_match(&self, normalized_city: &str) -> Option<&Entry> {
        let input_tokens: Vec<&str> = normalized_city.split_whitespace().collect();
        if input_tokens.is_empty() {
            return None;
        }
        self.entries.iter().find(|entry| {
            if entry.tokens.len() == 1 {
                input_tokens[0] == entry.tokens[0]
            } else {
                input_tokens
                    .iter()
                    .all(|token| entry.tokens.iter().any(|t| t == token))
            }
        })
    }

    fn edit_distance_match(&self, normalized_city: &str) -> MatchOutcome {
        let mut best: Option<(&Entry, usize)> = None;
        for entry in &self.entries {
            let distance = strsim::levenshtein(normalized_city, &entry.normalized);
            if best.map(|(_, d)| distance < d).unwrap_or(true) {
                best = Some((entry, distance));
            }
        }
        match best {
            Some((entry, distance)) if distance <= MAX_EDIT_DISTANCE => MatchOutcome::hit(entry.id),
            Some((entry, _)) => MatchOutcome::miss(Some(entry.display_name.clone())),
            None => MatchOutcome::miss(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> LocationIndex {
        let locations = vec![
            CanonicalLocation::new(1, "Shanghai"),
            CanonicalLocation::new(2, "Los Angeles"),
            CanonicalLocation::new(3, "Yantian, China"),
            CanonicalLocation::new(4, "Port"),
            CanonicalLocation::new(5, "Prince Rupert"),
        ];
        let matching = MatchingConfig {
            aliases: HashMap::from([("Pusan".to_string(), "Busan".to_string())]),
            generic_words: vec!["port".to_string(), "tanjung".to_string()],
        };
        LocationIndex::new(&locations, &matching)
    }

    #[test]
    fn test_exact_match() {
        assert_eq!(index().resolve("Shanghai").id, Some(1));
        assert_eq!(index().resolve("SHANGHAI").id, Some(1));
    }

    #[test]
    fn test_city_only_match_truncates_at_comma() {
        assert_eq!(index().resolve("Shanghai, CN").id, Some(1));
        assert_eq!(index().resolve("Los Angeles, US (USLAX)").id, Some(2));
    }

    #[test]
    fn test_token_subset_direction() {
        // All input tokens covered by the reference name: match.
        assert_eq!(index().resolve("Yantian").id, Some(3));
        // A generic token never matches standalone even though a
        // single-token reference "Port" exists.
        assert_eq!(index().resolve("Port").id, None);
    }

    #[test]
    fn test_multi_line_cell_prefers_region_code_line() {
        // Carrier code line first, city line carries the region code.
        assert_eq!(index().resolve("CNSHA\nShanghai, CN").id, Some(1));
        // No region code anywhere: first line wins.
        assert_eq!(index().resolve("Shanghai\nsome terminal note").id, Some(1));
    }

    #[test]
    fn test_edit_distance_within_threshold() {
        assert_eq!(index().resolve("Shangai").id, Some(1)); // one deletion
        assert_eq!(index().resolve("Prince Ruprt").id, Some(5));
    }

    #[test]
    fn test_edit_distance_above_threshold_reports_closest_only() {
        let outcome = index().resolve("Shangdong Terminal");
        assert_eq!(outcome.id, None);
        assert!(outcome.closest.is_some());
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let idx = index();
        let first = idx.resolve("Yantian, China");
        let second = idx.resolve("Yantian, China");
        assert_eq!(first, second);
        assert_eq!(first.id, Some(3));
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(index().resolve("").id, None);
        assert_eq!(index().resolve("\n\n").id, None);
    }
}
