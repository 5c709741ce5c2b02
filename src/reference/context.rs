use std::collections::HashMap;

use anyhow::{bail, Result};
use futures::try_join;
use tracing::info;

use crate::config::variant::MatchingConfig;
use crate::processor::header_locator::normalize;
use crate::processor::LocationIndex;
use crate::reference::sources::{LocationSource, ServiceRoute, ServiceSource};

/// Resolves a rate leg's route to the service loop carrying it. Port names
/// on sheets rarely match the reference spelling exactly, so matching is
/// lenient: full normalized equality, shared first word, or one name's words
/// all contained in the other's.
#[derive(Debug, Default)]
pub struct ServiceDirectory {
    routes: Vec<ServiceRoute>,
}

impl ServiceDirectory {
    pub fn new(routes: Vec<ServiceRoute>) -> Self {
        ServiceDirectory { routes }
    }

    pub fn resolve(&self, origin: &str, discharge: &str) -> Option<(i64, String)> {
        self.routes
            .iter()
            .find(|route| {
                route.origins.iter().any(|p| port_match(origin, p))
                    && route.destinations.iter().any(|p| port_match(discharge, p))
            })
            .map(|route| (route.id, route.name.clone()))
    }
}

fn port_match(sheet_name: &str, service_port: &str) -> bool {
    let a = normalize(sheet_name);
    let b = normalize(service_port);
    if a.is_empty() || b.is_empty() {
        return false;
    }
    if a == b {
        return true;
    }
    let a_words: Vec<&str> = a.split_whitespace().collect();
    let b_words: Vec<&str> = b.split_whitespace().collect();
    if a_words[0] == b_words[0] {
        return true;
    }
    a_words.iter().all(|w| b_words.contains(w)) || b_words.iter().all(|w| a_words.contains(w))
}

/// Every reference lookup a run needs, built once up front and passed by
/// reference into the extractors. Nothing here mutates after construction.
pub struct LookupContext {
    pub locations: LocationIndex,
    pub port_codes: HashMap<String, i64>,
    pub services: ServiceDirectory,
}

impl LookupContext {
    /// Load both reference sets in parallel and index them. An empty
    /// location set makes every resolution a miss, so it aborts the run.
    pub async fn load(
        location_source: &dyn LocationSource,
        service_source: &dyn ServiceSource,
        matching: &MatchingConfig,
    ) -> Result<Self> {
        let (locations, services) =
            try_join!(location_source.list_all(), service_source.list_all())?;

        if locations.is_empty() {
            bail!("Location reference set is empty; cannot resolve any ports");
        }
        info!(
            "Loaded {} locations and {} service routes",
            locations.len(),
            services.len()
        );

        let port_codes = locations
            .iter()
            .filter_map(|loc| loc.code.clone().map(|code| (code.to_uppercase(), loc.id)))
            .collect();

        Ok(LookupContext {
            locations: LocationIndex::new(&locations, matching),
            port_codes,
            services: ServiceDirectory::new(services),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CanonicalLocation;
    use crate::reference::sources::StaticSource;

    fn route() -> ServiceRoute {
        ServiceRoute {
            id: 9,
            name: "Pacific Loop 1".to_string(),
            origins: vec!["Shanghai".to_string(), "Ningbo".to_string()],
            destinations: vec!["Los Angeles".to_string(), "Oakland".to_string()],
        }
    }

    #[test]
    fn test_service_resolution_is_lenient() {
        let directory = ServiceDirectory::new(vec![route()]);
        assert_eq!(
            directory.resolve("SHANGHAI", "Los Angeles, CA"),
            Some((9, "Pacific Loop 1".to_string()))
        );
        // Shared first word.
        assert!(directory.resolve("Ningbo Beilun", "Los Angeles").is_some());
        assert_eq!(directory.resolve("Qingdao", "Los Angeles"), None);
    }

    #[tokio::test]
    async fn test_context_load_builds_indexes() {
        let mut location = CanonicalLocation::new(2, "Ningbo");
        location.code = Some("CNNBO".to_string());
        let source = StaticSource {
            locations: vec![CanonicalLocation::new(1, "Shanghai"), location],
            services: vec![route()],
        };

        let context = LookupContext::load(&source, &source, &MatchingConfig::default())
            .await
            .unwrap();
        assert_eq!(context.locations.len(), 2);
        assert_eq!(context.port_codes.get("CNNBO"), Some(&2));
        assert!(context.services.resolve("Shanghai", "Oakland").is_some());
    }

    #[tokio::test]
    async fn test_empty_location_set_is_fatal() {
        let source = StaticSource {
            locations: Vec::new(),
            services: Vec::new(),
        };
        let result = LookupContext::load(&source, &source, &MatchingConfig::default()).await;
        assert!(result.is_err());
    }
}
