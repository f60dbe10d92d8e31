//! Typed compose document.
//!
//! Maps are `IndexMap` (insertion order) or `BTreeMap` (key order) so the
//! serialized YAML only depends on the order the generator inserts entries.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposeFile {
    pub services: IndexMap<String, ComposeService>,
    #[serde(default)]
    pub networks: IndexMap<String, ComposeNetwork>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub volumes: IndexMap<String, NamedVolume>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposeService {
    pub image: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub environment: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub networks: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposeNetwork {
    pub driver: String,
}

impl ComposeNetwork {
    pub fn bridge() -> Self {
        Self {
            driver: "bridge".to_string(),
        }
    }
}

/// A runtime-managed volume; serialized as `{}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedVolume {}

impl ComposeFile {
    pub fn to_yaml(&self) -> Result<String, serde_yaml_ng::Error> {
        serde_yaml_ng::to_string(self)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml_ng::Error> {
        serde_yaml_ng::from_str(yaml)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_collections_are_omitted() {
        let mut file = ComposeFile::default();
        file.services.insert(
            "db".to_string(),
            ComposeService {
                image: "mysql:8".to_string(),
                networks: vec!["net".to_string()],
                ..ComposeService::default()
            },
        );
        file.networks
            .insert("net".to_string(), ComposeNetwork::bridge());

        let yaml = file.to_yaml().unwrap();
        assert!(!yaml.contains("ports"));
        assert!(!yaml.contains("depends_on"));
        assert!(!yaml.contains("volumes"));
        assert!(yaml.contains("driver: bridge"));
        assert_eq!(ComposeFile::from_yaml(&yaml).unwrap(), file);
    }

    #[test]
    fn test_named_volume_renders_as_empty_mapping() {
        let mut file = ComposeFile::default();
        file.volumes
            .insert("mysql8_data".to_string(), NamedVolume::default());
        let yaml = file.to_yaml().unwrap();
        assert!(yaml.contains("mysql8_data: {}"));
    }
}
