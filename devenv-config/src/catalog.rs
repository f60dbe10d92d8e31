//! Predefined service templates.
//!
//! The catalog is static for the lifetime of the process. Instantiating a
//! template yields a global [`Service`]; whether a second copy may exist is the
//! store's concern, not the catalog's.

use std::collections::BTreeMap;

use serde::Serialize;

use devenv_core::{DevEnvError, EntityKind};

use crate::model::Service;

/// A known service that can be added by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Template {
    pub name: &'static str,
    pub image: &'static str,
    pub description: &'static str,
    /// Port the service listens on inside its container.
    pub port: Option<u16>,
    pub volumes: &'static [&'static str],
    pub environment: &'static [(&'static str, &'static str)],
    /// Routed through the reverse proxy instead of being reachable only by name.
    pub requires_proxy: bool,
}

impl Template {
    pub fn to_service(&self) -> Service {
        let config: BTreeMap<String, String> = self
            .environment
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        Service {
            name: self.name.to_string(),
            image: self.image.to_string(),
            ports: Vec::new(),
            volumes: self.volumes.iter().map(|v| v.to_string()).collect(),
            global: true,
            dependencies: Vec::new(),
            config,
            proxy_port: if self.requires_proxy { self.port } else { None },
        }
    }
}

static TEMPLATES: &[Template] = &[
    Template {
        name: "mysql8",
        image: "mysql:8",
        description: "MySQL 8 database server",
        port: Some(3306),
        volumes: &["mysql8_data:/var/lib/mysql"],
        environment: &[
            ("MYSQL_ROOT_PASSWORD", "root_password"),
            ("MYSQL_DATABASE", "dev_db"),
            ("MYSQL_USER", "dev_user"),
            ("MYSQL_PASSWORD", "dev_password"),
            ("MYSQL_ROOT_HOST", "%"),
        ],
        requires_proxy: false,
    },
    Template {
        name: "redis",
        image: "redis:latest",
        description: "Redis key-value store",
        port: Some(6379),
        volumes: &[],
        environment: &[],
        requires_proxy: false,
    },
    Template {
        name: "phpmyadmin",
        image: "phpmyadmin/phpmyadmin",
        description: "phpMyAdmin web console for MySQL",
        port: Some(80),
        volumes: &[],
        environment: &[
            ("PMA_HOSTS", "mysql8"),
            ("MYSQL_ROOT_PASSWORD", "root_password"),
        ],
        requires_proxy: true,
    },
    Template {
        name: "mailhog",
        image: "mailhog/mailhog",
        description: "SMTP server that captures outgoing mail",
        port: Some(8025),
        volumes: &[],
        environment: &[],
        requires_proxy: true,
    },
];

pub fn list() -> &'static [Template] {
    TEMPLATES
}

/// Template names match case-insensitively.
pub fn find(name: &str) -> Option<&'static Template> {
    TEMPLATES.iter().find(|t| t.name.eq_ignore_ascii_case(name.trim()))
}

pub fn instantiate(name: &str) -> Result<Service, DevEnvError> {
    find(name)
        .map(Template::to_service)
        .ok_or_else(|| DevEnvError::not_found(EntityKind::Template, name))
}
