use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::CanonicalLocation;

/// One service loop from the reference dataset: which ports it calls on each
/// side, plus the identity stamped onto matched rate records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceRoute {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub origins: Vec<String>,
    #[serde(default)]
    pub destinations: Vec<String>,
}

/// Read-only provider of the canonical location reference set.
#[async_trait]
pub trait LocationSource: Send + Sync {
    async fn list_all(&self) -> Result<Vec<CanonicalLocation>>;
}

/// Read-only provider of the service-route reference set.
#[async_trait]
pub trait ServiceSource: Send + Sync {
    async fn list_all(&self) -> Result<Vec<ServiceRoute>>;
}

/// JSON-file implementation of both reference sources, the shape the
/// datasets are exported in.
pub struct JsonFileSource {
    path: String,
}

impl JsonFileSource {
    pub fn new(path: &str) -> Self {
        JsonFileSource {
            path: path.to_string(),
        }
    }

    async fn read<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read reference file {}", self.path))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse reference file {}", self.path))
    }
}

#[async_trait]
impl LocationSource for JsonFileSource {
    async fn list_all(&self) -> Result<Vec<CanonicalLocation>> {
        self.read().await
    }
}

#[async_trait]
impl ServiceSource for JsonFileSource {
    async fn list_all(&self) -> Result<Vec<ServiceRoute>> {
        self.read().await
    }
}

/// In-memory sources for tests and for runs without a service dataset.
pub struct StaticSource {
    pub locations: Vec<CanonicalLocation>,
    pub services: Vec<ServiceRoute>,
}

#[async_trait]
impl LocationSource for StaticSource {
    async fn list_all(&self) -> Result<Vec<CanonicalLocation>> {
        Ok(self.locations.clone())
    }
}

#[async_trait]
impl ServiceSource for StaticSource {
    async fn list_all(&self) -> Result<Vec<ServiceRoute>> {
        Ok(self.services.clone())
    }
}
