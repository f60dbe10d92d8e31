//! Locations of devenv's persisted state.
//!
//! By default the layout follows the platform directories:
//! - configuration and entity state: `~/.config/devenv` (or the platform equivalent)
//! - generated compose document: `~/.local/share/devenv/docker`
//! - logs and the state lock: `~/.local/share/devenv`
//!
//! Setting `DEVENV_HOME` moves everything under a single root, which is what
//! tests and throwaway environments use.

use std::env;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Environment variable that relocates all devenv state under one directory.
pub const HOME_ENV: &str = "DEVENV_HOME";

pub const STATE_FILE: &str = "state.json";
pub const SETTINGS_FILE: &str = "settings.yaml";
pub const COMPOSE_FILE: &str = "docker-compose.yml";
pub const LOCK_FILE: &str = "state.lock";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevEnvPaths {
    pub config_dir: PathBuf,
    pub compose_dir: PathBuf,
    /// Survives a reset: holds logs and the state lock.
    pub data_dir: PathBuf,
}

impl DevEnvPaths {
    /// Resolve paths from `DEVENV_HOME`, falling back to the platform directories.
    pub fn discover() -> Result<Self> {
        if let Ok(home) = env::var(HOME_ENV) {
            if !home.trim().is_empty() {
                return Ok(Self::under(home));
            }
        }

        let config_dir = dirs::config_dir()
            .ok_or_else(|| missing_dir("configuration"))?
            .join("devenv");
        let data_dir = dirs::data_dir()
            .ok_or_else(|| missing_dir("data"))?
            .join("devenv");

        Ok(Self {
            config_dir,
            compose_dir: data_dir.join("docker"),
            data_dir,
        })
    }

    /// All state rooted under `root`.
    pub fn under(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            config_dir: root.join("config"),
            compose_dir: root.join("docker"),
            data_dir: root.to_path_buf(),
        }
    }

    pub fn state_path(&self) -> PathBuf {
        self.config_dir.join(STATE_FILE)
    }

    pub fn settings_path(&self) -> PathBuf {
        self.config_dir.join(SETTINGS_FILE)
    }

    pub fn compose_path(&self) -> PathBuf {
        self.compose_dir.join(COMPOSE_FILE)
    }

    /// Directory scaffolded for a project's entry container.
    pub fn project_dir(&self, slug: &str) -> PathBuf {
        self.compose_dir.join("projects").join(slug)
    }

    pub fn lock_path(&self) -> PathBuf {
        self.data_dir.join(LOCK_FILE)
    }

    pub fn log_path(&self) -> PathBuf {
        self.data_dir.join("logs").join("devenv.log")
    }
}

fn missing_dir(which: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("Could not determine the user {which} directory"),
    )
}
