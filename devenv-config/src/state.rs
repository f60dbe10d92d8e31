//! Persisted entity state (`state.json`).

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use devenv_core::file_system::write_atomic;
use devenv_core::Result;

use crate::model::{Project, Service};

/// Snapshot of every service and project.
///
/// Services are keyed by name and projects by slug. Both maps keep insertion
/// order, which the generator relies on for ties.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityState {
    #[serde(default)]
    pub revision: u64,
    #[serde(default)]
    pub services: IndexMap<String, Service>,
    #[serde(default)]
    pub projects: IndexMap<String, Project>,
}

impl EntityState {
    /// Load state, starting empty when nothing has been saved yet.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No entity state at {}", path.display());
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)?;
        let state: EntityState = serde_json::from_str(&contents)?;
        info!(
            "Loaded {} service(s) and {} project(s) at revision {}",
            state.services.len(),
            state.projects.len(),
            state.revision
        );
        Ok(state)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        write_atomic(path, json.as_bytes())?;
        debug!("Saved entity state revision {}", self.revision);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_load_missing_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let state = EntityState::load(&dir.path().join("state.json")).unwrap();
        assert_eq!(state, EntityState::default());
    }

    #[test]
    fn test_save_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config").join("state.json");

        let mut state = EntityState {
            revision: 3,
            ..EntityState::default()
        };
        for name in ["zeta", "alpha", "mid"] {
            state
                .services
                .insert(name.to_string(), Service::new(name, "busybox"));
        }
        let project = Project::new("Shop", BTreeMap::new(), "localhost").unwrap();
        state.projects.insert(project.slug.clone(), project);

        state.save(&path).unwrap();
        let loaded = EntityState::load(&path).unwrap();

        assert_eq!(loaded, state);
        let names: Vec<&str> = loaded.services.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_corrupt_file_is_a_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            EntityState::load(&path),
            Err(devenv_core::DevEnvError::Serialization(_))
        ));
    }
}
