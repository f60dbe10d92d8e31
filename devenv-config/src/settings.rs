//! User settings for the generated environment.
//!
//! Stored in `<config_dir>/settings.yaml`. Every field has a default, so a
//! missing file, an empty file and a partial file are all valid.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use devenv_core::{DevEnvError, Result, ValidationError};

/// Root structure of `settings.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Domain that project and service hosts are built on (`<slug>.<base_domain>`).
    pub base_domain: String,

    /// Name of the shared bridge network joining every container.
    pub network: String,

    /// Compose project name (`-p`), which prefixes container and volume names.
    pub project_name: String,

    /// Image used for each project's entry container.
    pub project_image: String,

    /// Command that runs compose, e.g. `docker compose` or `docker-compose`.
    pub compose_command: String,

    pub proxy: ProxySettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxySettings {
    pub image: String,
    pub http_port: u16,
    pub dashboard_port: u16,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_domain: "localhost".to_string(),
            network: "devenv_network".to_string(),
            project_name: "devenv".to_string(),
            project_image: "nginx:latest".to_string(),
            compose_command: "docker compose".to_string(),
            proxy: ProxySettings::default(),
        }
    }
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            image: "traefik:v3.1".to_string(),
            http_port: 80,
            dashboard_port: 8080,
        }
    }
}

impl Settings {
    /// Load settings, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)?;
        let settings: Settings = if contents.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml_ng::from_str(&contents)?
        };
        settings.validate()?;
        debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let yaml = serde_yaml_ng::to_string(self)?;
        devenv_core::file_system::write_atomic(path, yaml.as_bytes())?;
        Ok(())
    }

    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        let domain = self.base_domain.trim();
        if domain.is_empty() || domain.starts_with('.') || domain.contains(char::is_whitespace) {
            return Err(ValidationError::invalid(
                "base domain",
                &self.base_domain,
                "expected a host name such as 'localhost'",
            ));
        }
        if self.network.trim().is_empty() {
            return Err(ValidationError::invalid("network", &self.network, "must not be empty"));
        }
        if self.project_name.trim().is_empty() {
            return Err(ValidationError::invalid(
                "compose project name",
                &self.project_name,
                "must not be empty",
            ));
        }
        if self.compose_command.split_whitespace().next().is_none() {
            return Err(ValidationError::invalid(
                "compose command",
                &self.compose_command,
                "must name a program",
            ));
        }
        Ok(())
    }

    /// Program and leading arguments of the compose command.
    pub fn compose_program(&self) -> std::result::Result<(String, Vec<String>), DevEnvError> {
        let mut parts = self.compose_command.split_whitespace().map(str::to_string);
        let program = parts.next().ok_or_else(|| {
            ValidationError::invalid("compose command", &self.compose_command, "must name a program")
        })?;
        Ok((program, parts.collect()))
    }
}
