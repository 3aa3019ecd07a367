use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One entry of the support-service catalog. Loaded once at startup and
/// shared read-only; never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceDefinition {
    pub key: String,
    pub service_name: String,
    pub keywords: Vec<String>,
    pub reason_template: String,
    pub contact: String,
    pub timeline: String,
    pub next_steps: String,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed reading catalog file {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("catalog is not valid JSON")]
    Parse(#[from] serde_json::Error),
    #[error("catalog contains no services")]
    Empty,
    #[error("service entry at position {index} has an empty key")]
    EmptyKey { index: usize },
    #[error("duplicate service key {key}")]
    DuplicateKey { key: String },
    #[error("service {key} has an empty display name")]
    EmptyName { key: String },
    #[error("service {key} declares no keywords")]
    NoKeywords { key: String },
}

/// Validated service registry. Declaration order in the source file is the
/// keyword matcher's iteration order, so the file format is a JSON array.
#[derive(Debug, Clone)]
pub struct ServiceCatalog {
    services: Vec<ServiceDefinition>,
}

impl ServiceCatalog {
    pub fn from_services(services: Vec<ServiceDefinition>) -> Result<Self, CatalogError> {
        if services.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut seen = HashSet::new();
        for (index, service) in services.iter().enumerate() {
            if service.key.trim().is_empty() {
                return Err(CatalogError::EmptyKey { index });
            }
            if !seen.insert(service.key.clone()) {
                return Err(CatalogError::DuplicateKey {
                    key: service.key.clone(),
                });
            }
            if service.service_name.trim().is_empty() {
                return Err(CatalogError::EmptyName {
                    key: service.key.clone(),
                });
            }
            if service.keywords.iter().all(|keyword| keyword.trim().is_empty()) {
                return Err(CatalogError::NoKeywords {
                    key: service.key.clone(),
                });
            }
        }

        Ok(Self { services })
    }

    pub fn from_json_str(raw: &str) -> Result<Self, CatalogError> {
        let services: Vec<ServiceDefinition> = serde_json::from_str(raw)?;
        Self::from_services(services)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    /// The catalog shipped with the binary, used when no override path is
    /// configured. Still validated so a bad edit fails at startup.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_json_str(include_str!("../../../catalog/services.json"))
    }

    pub fn services(&self) -> &[ServiceDefinition] {
        &self.services
    }

    pub fn get(&self, key: &str) -> Option<&ServiceDefinition> {
        self.services.iter().find(|service| service.key == key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.services.iter().map(|service| service.key.as_str())
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(key: &str) -> ServiceDefinition {
        ServiceDefinition {
            key: key.to_string(),
            service_name: format!("{key} service"),
            keywords: vec!["help".to_string()],
            reason_template: "reason".to_string(),
            contact: "contact".to_string(),
            timeline: "soon".to_string(),
            next_steps: "steps".to_string(),
        }
    }

    #[test]
    fn builtin_catalog_is_valid_and_ordered() {
        let catalog = ServiceCatalog::builtin().expect("builtin catalog should validate");
        let keys: Vec<_> = catalog.keys().collect();
        assert_eq!(keys, vec!["disability_support", "financial_aid", "counselling"]);
    }

    #[test]
    fn rejects_duplicate_keys() {
        let result = ServiceCatalog::from_services(vec![entry("a"), entry("a")]);
        assert!(matches!(result, Err(CatalogError::DuplicateKey { .. })));
    }

    #[test]
    fn rejects_empty_catalog() {
        assert!(matches!(
            ServiceCatalog::from_services(Vec::new()),
            Err(CatalogError::Empty)
        ));
    }

    #[test]
    fn rejects_service_without_keywords() {
        let mut bad = entry("a");
        bad.keywords = vec!["  ".to_string()];
        assert!(matches!(
            ServiceCatalog::from_services(vec![bad]),
            Err(CatalogError::NoKeywords { .. })
        ));
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(ServiceCatalog::from_json_str("{not json").is_err());
    }
}
