/// Hot-reload service catalog using ArcSwap
///
/// Provides lock-free reads of the known services. A reload parses the whole
/// catalog file and swaps the pointer in one step, so concurrent readers see
/// either the old or the new catalog, never a mix.

use crate::catalog::types::ServiceEntry;
use anyhow::{Context, Result};
use arc_swap::ArcSwap;
use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    sync::Arc,
};

/// Read-only view of the service catalog
pub trait ServiceCatalog: Send + Sync + std::fmt::Debug {
    /// All known services, in catalog order
    fn list_services(&self) -> Vec<ServiceEntry>;
}

/// Lock-free catalog registry, optionally backed by a JSON file
#[derive(Debug)]
pub struct CatalogRegistry {
    /// Thread-safe atomic pointer to the service list
    services: ArcSwap<Vec<ServiceEntry>>,

    /// File re-read by [`CatalogRegistry::reload`]
    source: Option<PathBuf>,
}

impl CatalogRegistry {
    /// Registry with a fixed in-memory service list
    pub fn new(services: Vec<ServiceEntry>) -> Result<Self> {
        validate(&services)?;
        Ok(Self {
            services: ArcSwap::new(Arc::new(services)),
            source: None,
        })
    }

    pub fn empty() -> Self {
        Self {
            services: ArcSwap::new(Arc::new(Vec::new())),
            source: None,
        }
    }

    /// Load the catalog from a JSON file holding an array of entries
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let services = load_entries(&path).await?;

        tracing::info!("📚 Loaded {} services from {}", services.len(), path.display());

        Ok(Self {
            services: ArcSwap::new(Arc::new(services)),
            source: Some(path),
        })
    }

    /// Re-read the backing file and atomically swap the catalog
    ///
    /// On any error the current catalog stays in place. Returns the number of
    /// services now loaded.
    pub async fn reload(&self) -> Result<usize> {
        let Some(path) = &self.source else {
            return Ok(self.services.load().len());
        };

        let services = load_entries(path).await?;
        let count = services.len();
        self.services.store(Arc::new(services));

        tracing::info!("🔥 Hot-reloaded service catalog: {} services", count);
        Ok(count)
    }

    /// Look up one service by name (lock-free read)
    pub fn get(&self, name: &str) -> Option<ServiceEntry> {
        self.services.load().iter().find(|s| s.name == name).cloned()
    }

    pub fn len(&self) -> usize {
        self.services.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.load().is_empty()
    }
}

impl ServiceCatalog for CatalogRegistry {
    fn list_services(&self) -> Vec<ServiceEntry> {
        self.services.load().iter().cloned().collect()
    }
}

async fn load_entries(path: &Path) -> Result<Vec<ServiceEntry>> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read service catalog {}", path.display()))?;
    let services: Vec<ServiceEntry> = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid service catalog {}", path.display()))?;
    validate(&services)?;
    Ok(services)
}

/// Reject entries with no name/endpoint and duplicate names
fn validate(services: &[ServiceEntry]) -> Result<()> {
    let mut seen = HashSet::new();
    for service in services {
        if service.name.trim().is_empty() || service.endpoint.trim().is_empty() {
            return Err(anyhow::anyhow!("Service entry needs a name and an endpoint: {:?}", service.name));
        }
        if !seen.insert(service.name.as_str()) {
            return Err(anyhow::anyhow!("Duplicate service in catalog: {}", service.name));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn write_catalog(file: &tempfile::NamedTempFile, value: serde_json::Value) {
        std::fs::write(file.path(), value.to_string()).unwrap();
    }

    #[tokio::test]
    async fn loads_and_hot_reloads_from_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        write_catalog(
            &file,
            json!([{ "name": "geocode", "endpoint": "http://geo/v1", "fallback": "http://geo/v0" }]),
        );

        let registry = CatalogRegistry::from_file(file.path()).await.unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.get("geocode").and_then(|s| s.fallback),
            Some("http://geo/v0".to_string())
        );

        write_catalog(
            &file,
            json!([
                { "name": "geocode", "endpoint": "http://geo/v2" },
                { "name": "weather", "endpoint": "http://wx", "cost_profile": { "ms": 40 } }
            ]),
        );
        assert_eq!(registry.reload().await.unwrap(), 2);
        let names: Vec<String> = registry.list_services().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["geocode", "weather"]);
        assert_eq!(registry.get("geocode").unwrap().endpoint, "http://geo/v2");
    }

    #[tokio::test]
    async fn failed_reload_keeps_current_catalog() {
        let file = tempfile::NamedTempFile::new().unwrap();
        write_catalog(&file, json!([{ "name": "a", "endpoint": "http://a" }]));
        let registry = CatalogRegistry::from_file(file.path()).await.unwrap();

        write_catalog(
            &file,
            json!([{ "name": "a", "endpoint": "http://a" }, { "name": "a", "endpoint": "http://b" }]),
        );
        assert!(registry.reload().await.is_err());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn in_memory_catalog_rejects_blank_entries() {
        let entry = ServiceEntry {
            name: "x".to_string(),
            endpoint: " ".to_string(),
            input_schema: json!({}),
            output_schema: json!({}),
            cost_profile: json!(null),
            fallback: None,
        };
        assert!(CatalogRegistry::new(vec![entry]).is_err());
        assert!(CatalogRegistry::empty().is_empty());
    }
}
