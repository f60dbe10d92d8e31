//! Field validation for services and environment maps.
//!
//! Structural checks (uniqueness, references, cycles) live in the store and the
//! resolver; this module only answers "is this value well formed".

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;

use devenv_core::ValidationError;

use crate::model::Service;

/// Service name of the generated reverse proxy.
pub const PROXY_SERVICE: &str = "traefik";

/// Prefix of generated per-project entry containers.
pub const PROJECT_CONTAINER_PREFIX: &str = "project-";

static SERVICE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9_.-]*$").expect("valid regex"));

static PORT_MAPPING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:(?:\d{1,3}\.){3}\d{1,3}:)?(\d{1,5})(?:-(\d{1,5}))?:(\d{1,5})(?:-(\d{1,5}))?(?:/(?:tcp|udp))?$")
        .expect("valid regex")
});

static HOST_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?$").expect("valid regex")
});

static ENV_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid regex"));

pub fn validate_service_name(name: &str) -> Result<(), ValidationError> {
    if !SERVICE_NAME.is_match(name) {
        return Err(ValidationError::invalid(
            "service name",
            name,
            "use letters, digits, '_', '.' or '-', starting with a letter or digit",
        ));
    }
    if name == PROXY_SERVICE || name.starts_with(PROJECT_CONTAINER_PREFIX) {
        return Err(ValidationError::ReservedName(name.to_string()));
    }
    Ok(())
}

/// A routed service is reachable as `<name>.<base_domain>` and its name is the
/// proxy router id, so it must be a single host label.
pub fn validate_routable_name(name: &str) -> Result<(), ValidationError> {
    if HOST_LABEL.is_match(name) {
        Ok(())
    } else {
        Err(ValidationError::invalid(
            "service name",
            name,
            "services with a proxy port may only use letters, digits and inner '-'",
        ))
    }
}

/// Every routed host must reach exactly one container. Hosts compare
/// case-insensitively.
pub fn check_unique_hosts<'a>(
    routes: impl IntoIterator<Item = (String, &'a str)>,
) -> Result<(), ValidationError> {
    let mut seen: BTreeMap<String, &str> = BTreeMap::new();
    for (host, target) in routes {
        let host = host.to_lowercase();
        if let Some(previous) = seen.get(&host) {
            return Err(ValidationError::invalid(
                "host",
                host,
                format!("routed to both '{previous}' and '{target}'"),
            ));
        }
        seen.insert(host, target);
    }
    Ok(())
}

/// `[ip:]host:container[/proto]`, where host and container may be ranges.
pub fn validate_port_mapping(mapping: &str) -> Result<(), ValidationError> {
    let captures = PORT_MAPPING.captures(mapping).ok_or_else(|| {
        ValidationError::invalid("port mapping", mapping, "expected 'host:container'")
    })?;

    for group in captures.iter().skip(1).flatten() {
        match group.as_str().parse::<u32>() {
            Ok(port) if (1..=65535).contains(&port) => {}
            _ => {
                return Err(ValidationError::invalid(
                    "port mapping",
                    mapping,
                    format!("port {} is outside 1-65535", group.as_str()),
                ))
            }
        }
    }
    Ok(())
}

/// `source:target[:ro|:rw]` with an absolute container target.
pub fn validate_volume_mapping(mapping: &str) -> Result<(), ValidationError> {
    let parts: Vec<&str> = mapping.split(':').collect();
    let invalid = |reason: &str| ValidationError::invalid("volume mapping", mapping, reason);

    match parts.as_slice() {
        [source, target] | [source, target, "ro" | "rw"] => {
            if source.is_empty() {
                return Err(invalid("source is empty"));
            }
            if !target.starts_with('/') {
                return Err(invalid("container target must be an absolute path"));
            }
            Ok(())
        }
        _ => Err(invalid("expected 'source:target'")),
    }
}

pub fn validate_env_key(key: &str) -> Result<(), ValidationError> {
    if ENV_KEY.is_match(key) {
        Ok(())
    } else {
        Err(ValidationError::invalid(
            "environment variable",
            key,
            "must start with a letter or '_' and contain only letters, digits and '_'",
        ))
    }
}

pub fn validate_environment(environment: &BTreeMap<String, String>) -> Result<(), ValidationError> {
    environment.keys().try_for_each(|key| validate_env_key(key))
}

/// Everything about a service that can be checked without the rest of the store.
pub fn validate_service_fields(service: &Service) -> Result<(), ValidationError> {
    validate_service_name(&service.name)?;

    if service.image.trim().is_empty() {
        return Err(ValidationError::invalid(
            "image",
            &service.image,
            "image reference is empty",
        ));
    }
    if service.depends_on(&service.name) {
        return Err(ValidationError::SelfDependency(service.name.clone()));
    }
    if service.proxy_port == Some(0) {
        return Err(ValidationError::invalid("proxy port", "0", "must be 1-65535"));
    }
    if service.proxy_port.is_some() {
        validate_routable_name(&service.name)?;
    }

    service
        .ports
        .iter()
        .try_for_each(|p| validate_port_mapping(p))?;
    service
        .volumes
        .iter()
        .try_for_each(|v| validate_volume_mapping(v))?;
    validate_environment(&service.config)
}

/// The host side of a volume mapping.
pub fn volume_source(mapping: &str) -> &str {
    mapping.split(':').next().unwrap_or(mapping)
}

/// Named volumes are managed by the runtime and must be declared at top level;
/// bind mounts start with `.`, `/` or `~`.
pub fn is_named_volume(mapping: &str) -> bool {
    let source = volume_source(mapping);
    !source.is_empty() && !source.starts_with(['.', '/', '~'])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_names() {
        assert!(validate_service_name("db").is_ok());
        assert!(validate_service_name("mysql8.primary_1-a").is_ok());
        assert!(validate_service_name("-db").is_err());
        assert!(validate_service_name("my db").is_err());
        assert_eq!(
            validate_service_name("traefik"),
            Err(ValidationError::ReservedName("traefik".into()))
        );
        assert_eq!(
            validate_service_name("project-shop"),
            Err(ValidationError::ReservedName("project-shop".into()))
        );
    }

    #[test]
    fn test_port_mappings() {
        assert!(validate_port_mapping("3306:3306").is_ok());
        assert!(validate_port_mapping("127.0.0.1:8080:80").is_ok());
        assert!(validate_port_mapping("5353:53/udp").is_ok());
        assert!(validate_port_mapping("9000-9002:9000-9002").is_ok());
        assert!(validate_port_mapping("3306").is_err());
        assert!(validate_port_mapping("70000:80").is_err());
        assert!(validate_port_mapping("0:80").is_err());
        assert!(validate_port_mapping("http:80").is_err());
    }

    #[test]
    fn test_volume_mappings() {
        assert!(validate_volume_mapping("mysql_data:/var/lib/mysql").is_ok());
        assert!(validate_volume_mapping("./src:/app:ro").is_ok());
        assert!(validate_volume_mapping("/data").is_err());
        assert!(validate_volume_mapping(":/data").is_err());
        assert!(validate_volume_mapping("data:relative").is_err());
        assert!(validate_volume_mapping("a:/b:rx").is_err());
    }

    #[test]
    fn test_named_volume_detection() {
        assert!(is_named_volume("mysql8_data:/var/lib/mysql"));
        assert!(!is_named_volume("./projects/shop:/var/www/html"));
        assert!(!is_named_volume("/var/run/docker.sock:/var/run/docker.sock"));
        assert!(!is_named_volume("~/code:/code"));
    }

    #[test]
    fn test_env_keys() {
        assert!(validate_env_key("MYSQL_ROOT_PASSWORD").is_ok());
        assert!(validate_env_key("_private").is_ok());
        assert!(validate_env_key("1ST").is_err());
        assert!(validate_env_key("WITH-DASH").is_err());
    }

    #[test]
    fn test_service_fields_reject_self_dependency() {
        let service = Service::new("db", "mysql:8").with_dependency("db");
        assert_eq!(
            validate_service_fields(&service),
            Err(ValidationError::SelfDependency("db".into()))
        );
    }

    #[test]
    fn test_routed_service_names_must_be_host_labels() {
        let routed = |name: &str| {
            let mut service = Service::new(name, "mailhog/mailhog");
            service.proxy_port = Some(8025);
            validate_service_fields(&service)
        };

        assert!(routed("mail-hog").is_ok());
        assert!(routed("mail_hog").is_err());
        assert!(routed("mail.hog").is_err());
        assert!(routed("mail-").is_err());
        // Unrouted services keep the wider name alphabet.
        assert!(validate_service_fields(&Service::new("mail_hog", "mailhog/mailhog")).is_ok());
    }

    #[test]
    fn test_duplicate_hosts_are_rejected() {
        let routes = vec![
            ("mail.localhost".to_string(), "mail"),
            ("shop.localhost".to_string(), "project-shop"),
        ];
        assert!(check_unique_hosts(routes).is_ok());

        let routes = vec![
            ("Mail.localhost".to_string(), "Mail"),
            ("mail.localhost".to_string(), "project-mail"),
        ];
        assert!(matches!(
            check_unique_hosts(routes),
            Err(ValidationError::InvalidField { field: "host", .. })
        ));
    }

    #[test]
    fn test_service_fields_reject_empty_image() {
        let service = Service::new("db", "  ");
        assert!(validate_service_fields(&service).is_err());
    }
}
