//! Services and projects.
//!
//! Projects refer to services by name only. The store owns both collections and
//! repairs project references whenever a service disappears or turns global.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use devenv_core::ValidationError;

/// A reusable containerized component.
///
/// `config` is a `BTreeMap` so every rendering of it is key-ordered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub name: String,
    pub image: String,
    #[serde(default)]
    pub ports: Vec<String>,
    #[serde(default)]
    pub volumes: Vec<String>,
    #[serde(default)]
    pub global: bool,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub config: BTreeMap<String, String>,
    /// Container port the reverse proxy routes `<name>.<base_domain>` to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_port: Option<u16>,
}

impl Service {
    pub fn new(name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            ports: Vec::new(),
            volumes: Vec::new(),
            global: false,
            dependencies: Vec::new(),
            config: BTreeMap::new(),
            proxy_port: None,
        }
    }

    pub fn with_port(mut self, mapping: impl Into<String>) -> Self {
        self.ports.push(mapping.into());
        self
    }

    pub fn with_volume(mut self, mapping: impl Into<String>) -> Self {
        self.volumes.push(mapping.into());
        self
    }

    pub fn with_dependency(mut self, name: impl Into<String>) -> Self {
        self.dependencies.push(name.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

    pub fn global(mut self, global: bool) -> Self {
        self.global = global;
        self
    }

    pub fn depends_on(&self, name: &str) -> bool {
        self.dependencies.iter().any(|d| d == name)
    }

    /// Drop repeated dependency names, keeping first occurrences.
    pub fn dedup_dependencies(&mut self) {
        let mut seen = std::collections::HashSet::new();
        self.dependencies.retain(|d| seen.insert(d.clone()));
    }
}

/// An application stack consuming a subset of services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub services: Vec<String>,
    pub url: String,
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
}

impl Project {
    pub fn new(
        name: impl Into<String>,
        environment: BTreeMap<String, String>,
        base_domain: &str,
    ) -> Result<Self, ValidationError> {
        let name = name.into();
        let slug = slug_for(&name)?;
        let url = project_url(&slug, base_domain);

        Ok(Self {
            name,
            slug,
            services: Vec::new(),
            url,
            environment,
        })
    }

    /// Change the display name; slug and url follow.
    pub fn rename(&mut self, name: impl Into<String>, base_domain: &str) -> Result<(), ValidationError> {
        let name = name.into();
        let slug = slug_for(&name)?;
        self.url = project_url(&slug, base_domain);
        self.slug = slug;
        self.name = name;
        Ok(())
    }

    pub fn uses(&self, service: &str) -> bool {
        self.services.iter().any(|s| s == service)
    }

    /// Name of the project-scoped entry container in the generated document.
    pub fn container_name(&self) -> String {
        format!("{}{}", crate::validate::PROJECT_CONTAINER_PREFIX, self.slug)
    }
}

fn slug_for(name: &str) -> Result<String, ValidationError> {
    let slug = normalize_slug(name);
    if slug.is_empty() {
        return Err(ValidationError::invalid(
            "project name",
            name,
            "must contain at least one letter or digit",
        ));
    }
    Ok(slug)
}

/// Lowercase `input`, fold common accented letters, and collapse every run of
/// other characters into a single `-`.
pub fn normalize_slug(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_separator = false;

    for c in input.to_lowercase().chars() {
        let c = fold_accent(c);
        if c.is_ascii_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.push(c);
        } else {
            pending_separator = true;
        }
    }

    slug
}

fn fold_accent(c: char) -> char {
    match c {
        'à' | 'á' | 'â' | 'ä' | 'ã' | 'å' => 'a',
        'è' | 'é' | 'ê' | 'ë' => 'e',
        'ì' | 'í' | 'î' | 'ï' => 'i',
        'ò' | 'ó' | 'ô' | 'ö' | 'õ' => 'o',
        'ù' | 'ú' | 'û' | 'ü' => 'u',
        'ý' | 'ÿ' => 'y',
        'ç' => 'c',
        'ñ' => 'n',
        other => other,
    }
}

/// Externally reachable host for a routed service.
pub fn service_host(name: &str, base_domain: &str) -> String {
    format!("{}.{base_domain}", name.to_lowercase())
}

/// Externally reachable host for a project.
pub fn project_url(slug: &str, base_domain: &str) -> String {
    format!("{slug}.{base_domain}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_slug() {
        assert_eq!(normalize_slug("Shop"), "shop");
        assert_eq!(normalize_slug("  My Great  App!! "), "my-great-app");
        assert_eq!(normalize_slug("Café Crème"), "cafe-creme");
        assert_eq!(normalize_slug("api--v2__beta"), "api-v2-beta");
        assert_eq!(normalize_slug("---"), "");
    }

    #[test]
    fn test_project_derives_slug_and_url() {
        let project = Project::new("My Shop", BTreeMap::new(), "localhost").unwrap();
        assert_eq!(project.slug, "my-shop");
        assert_eq!(project.url, "my-shop.localhost");
        assert_eq!(project.container_name(), "project-my-shop");
    }

    #[test]
    fn test_project_rejects_name_without_slug() {
        let err = Project::new("!!!", BTreeMap::new(), "localhost").unwrap_err();
        assert!(matches!(err, ValidationError::InvalidField { .. }));
    }

    #[test]
    fn test_rename_regenerates_slug() {
        let mut project = Project::new("shop", BTreeMap::new(), "localhost").unwrap();
        project.rename("Web Shop", "test").unwrap();
        assert_eq!(project.slug, "web-shop");
        assert_eq!(project.url, "web-shop.test");
    }

    #[test]
    fn test_dedup_dependencies_keeps_first() {
        let mut service = Service::new("api", "api:1")
            .with_dependency("db")
            .with_dependency("cache")
            .with_dependency("db");
        service.dedup_dependencies();
        assert_eq!(service.dependencies, vec!["db", "cache"]);
    }
}
