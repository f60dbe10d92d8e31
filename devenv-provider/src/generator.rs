//! Compose document generation.
//!
//! `generate` is pure: the same services and projects, in the same order,
//! always produce byte-identical YAML. Structural problems (dangling
//! references, cycles, duplicate names) fail the whole generation instead of
//! dropping the offending entry.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use indexmap::IndexMap;
use serde::Serialize;
use tracing::debug;

use devenv_config::settings::{ProxySettings, Settings};
use devenv_config::validate::{
    check_unique_hosts, is_named_volume, validate_environment, validate_service_fields,
    volume_source, PROXY_SERVICE,
};
use devenv_config::{service_host, DependencyGraph, Project, Service};
use devenv_core::error::Result;
use devenv_core::{DevEnvError, EntityKind, ValidationError};

use crate::compose::{ComposeFile, ComposeNetwork, ComposeService, NamedVolume};

const HEADER: &str = "# Generated by devenv. Manual changes are overwritten on the next save.\n";

/// Port served by each project's entry container.
const PROJECT_HTTP_PORT: u16 = 80;

/// Document root mounted into each project's entry container.
const PROJECT_WEB_ROOT: &str = "/usr/share/nginx/html";

/// Generation inputs that come from settings rather than entities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeOptions {
    pub base_domain: String,
    pub network: String,
    pub project_image: String,
    pub proxy: ProxySettings,
}

impl From<&Settings> for ComposeOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            base_domain: settings.base_domain.clone(),
            network: settings.network.clone(),
            project_image: settings.project_image.clone(),
            proxy: settings.proxy.clone(),
        }
    }
}

impl Default for ComposeOptions {
    fn default() -> Self {
        Self::from(&Settings::default())
    }
}

/// Maps an external host name to a container port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoutingRule {
    pub host: String,
    /// Compose service the host is routed to.
    pub target: String,
    pub port: u16,
}

impl RoutingRule {
    /// Targets are host labels (routed services) or `project-<slug>`, and
    /// hosts are unique per document, so the lowercased target is unique too.
    fn router_id(&self) -> String {
        self.target.to_lowercase()
    }

    /// Reverse proxy labels for the target container.
    pub fn labels(&self) -> Vec<String> {
        let id = self.router_id();
        vec![
            "traefik.enable=true".to_string(),
            format!("traefik.http.routers.{id}.rule=Host(`{}`)", self.host),
            format!("traefik.http.routers.{id}.entrypoints=web"),
            format!(
                "traefik.http.services.{id}.loadbalancer.server.port={}",
                self.port
            ),
        ]
    }
}

/// Output of one generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigurationDocument {
    /// YAML text written to `docker-compose.yml`.
    pub content: String,
    pub compose: ComposeFile,
    pub routing: Vec<RoutingRule>,
    /// Effective services of each project (keyed by project name), dependencies first.
    pub effective_services: IndexMap<String, Vec<String>>,
    /// Every emitted service, dependencies first.
    pub start_order: Vec<String>,
}

pub fn generate<'a, S, P>(services: S, projects: P) -> Result<ConfigurationDocument>
where
    S: IntoIterator<Item = &'a Service>,
    P: IntoIterator<Item = &'a Project>,
{
    generate_with(services, projects, &ComposeOptions::default())
}

pub fn generate_with<'a, S, P>(
    services: S,
    projects: P,
    options: &ComposeOptions,
) -> Result<ConfigurationDocument>
where
    S: IntoIterator<Item = &'a Service>,
    P: IntoIterator<Item = &'a Project>,
{
    let services: Vec<&Service> = services.into_iter().collect();
    let projects: Vec<&Project> = projects.into_iter().collect();

    let by_name = index_services(&services)?;
    check_projects(&projects, &by_name)?;

    let graph = DependencyGraph::from_services(services.iter().copied());
    graph.check_references()?;
    let order = graph.topological_order()?;

    let globals: Vec<&str> = services
        .iter()
        .filter(|s| s.global)
        .map(|s| s.name.as_str())
        .collect();

    let mut emitted: HashSet<String> = graph.closure(globals.iter().copied())?.into_iter().collect();
    let mut effective_services = IndexMap::with_capacity(projects.len());
    for project in &projects {
        let roots = project
            .services
            .iter()
            .map(String::as_str)
            .chain(globals.iter().copied());
        let effective = graph.closure(roots)?;
        emitted.extend(effective.iter().cloned());
        debug!("Project '{}' uses {:?}", project.name, effective);
        effective_services.insert(project.name.clone(), effective);
    }

    let start_order: Vec<String> = order.into_iter().filter(|n| emitted.contains(n)).collect();
    let position: HashMap<&str, usize> = start_order
        .iter()
        .enumerate()
        .map(|(i, n)| (n.as_str(), i))
        .collect();

    let mut routing = Vec::new();
    let mut service_rules = HashMap::new();
    for name in &start_order {
        if let Some(port) = by_name.get(name.as_str()).and_then(|s| s.proxy_port) {
            let rule = RoutingRule {
                host: service_host(name, &options.base_domain),
                target: name.clone(),
                port,
            };
            service_rules.insert(name.as_str(), routing.len());
            routing.push(rule);
        }
    }
    for project in &projects {
        routing.push(RoutingRule {
            host: project.url.clone(),
            target: project.container_name(),
            port: PROJECT_HTTP_PORT,
        });
    }

    check_unique_hosts(routing.iter().map(|r| (r.host.clone(), r.target.as_str())))?;

    let mut compose = ComposeFile::default();
    if !routing.is_empty() {
        compose
            .services
            .insert(PROXY_SERVICE.to_string(), proxy_service(options));
    }

    let mut named_volumes = BTreeSet::new();
    for name in &start_order {
        let Some(service) = by_name.get(name.as_str()) else {
            continue;
        };

        let mut depends_on = service.dependencies.clone();
        depends_on.sort_by_key(|d| position.get(d.as_str()).copied().unwrap_or(usize::MAX));
        depends_on.dedup();

        named_volumes.extend(
            service
                .volumes
                .iter()
                .filter(|v| is_named_volume(v))
                .map(|v| volume_source(v).to_string()),
        );

        let labels = service_rules
            .get(name.as_str())
            .map(|&i| routing[i].labels())
            .unwrap_or_default();

        compose.services.insert(
            name.clone(),
            ComposeService {
                image: service.image.clone(),
                ports: service.ports.clone(),
                volumes: service.volumes.clone(),
                environment: service.config.clone(),
                labels,
                depends_on,
                networks: vec![options.network.clone()],
                ..ComposeService::default()
            },
        );
    }

    for project in &projects {
        let effective = effective_services
            .get(&project.name)
            .cloned()
            .unwrap_or_default();
        let container = project.container_name();
        let labels = routing
            .iter()
            .find(|r| r.target == container)
            .map(RoutingRule::labels)
            .unwrap_or_default();

        compose.services.insert(
            container,
            ComposeService {
                image: options.project_image.clone(),
                volumes: vec![format!("./projects/{}:{PROJECT_WEB_ROOT}", project.slug)],
                environment: project_environment(project, &effective, &by_name),
                labels,
                depends_on: effective,
                networks: vec![options.network.clone()],
                ..ComposeService::default()
            },
        );
    }

    compose
        .networks
        .insert(options.network.clone(), ComposeNetwork::bridge());
    compose.volumes = named_volumes
        .into_iter()
        .map(|v| (v, NamedVolume::default()))
        .collect();

    let content = format!("{HEADER}{}", compose.to_yaml()?);
    debug!(
        "Generated {} compose service(s) with {} routing rule(s)",
        compose.services.len(),
        routing.len()
    );

    Ok(ConfigurationDocument {
        content,
        compose,
        routing,
        effective_services,
        start_order,
    })
}

fn index_services<'a>(services: &[&'a Service]) -> Result<HashMap<&'a str, &'a Service>> {
    let mut by_name = HashMap::with_capacity(services.len());
    for &service in services {
        validate_service_fields(service)?;
        if by_name.insert(service.name.as_str(), service).is_some() {
            return Err(ValidationError::DuplicateName {
                kind: EntityKind::Service,
                name: service.name.clone(),
            }
            .into());
        }
    }
    Ok(by_name)
}

fn check_projects(projects: &[&Project], by_name: &HashMap<&str, &Service>) -> Result<()> {
    let mut names = HashSet::new();
    let mut slugs: HashMap<&str, &str> = HashMap::new();

    for project in projects {
        if !names.insert(project.name.as_str()) {
            return Err(ValidationError::DuplicateName {
                kind: EntityKind::Project,
                name: project.name.clone(),
            }
            .into());
        }
        if let Some(existing) = slugs.insert(project.slug.as_str(), project.name.as_str()) {
            return Err(ValidationError::DuplicateSlug {
                slug: project.slug.clone(),
                existing: existing.to_string(),
            }
            .into());
        }
        validate_environment(&project.environment)?;

        for name in &project.services {
            match by_name.get(name.as_str()) {
                None => return Err(DevEnvError::not_found(EntityKind::Service, name)),
                Some(service) if service.global => {
                    return Err(ValidationError::GlobalInProjectList {
                        project: project.name.clone(),
                        service: name.clone(),
                    }
                    .into())
                }
                Some(_) => {}
            }
        }
    }
    Ok(())
}

/// Service configs in dependency order, then the project's own values on top.
fn project_environment(
    project: &Project,
    effective: &[String],
    by_name: &HashMap<&str, &Service>,
) -> BTreeMap<String, String> {
    let mut environment = BTreeMap::new();
    for name in effective {
        if let Some(service) = by_name.get(name.as_str()) {
            environment.extend(service.config.clone());
        }
    }
    environment.extend(project.environment.clone());
    environment
}

fn proxy_service(options: &ComposeOptions) -> ComposeService {
    ComposeService {
        image: options.proxy.image.clone(),
        command: vec![
            "--api.insecure=true".to_string(),
            "--providers.docker=true".to_string(),
            "--providers.docker.exposedbydefault=false".to_string(),
            format!("--providers.docker.network={}", options.network),
            "--entrypoints.web.address=:80".to_string(),
        ],
        ports: vec![
            format!("{}:80", options.proxy.http_port),
            format!("{}:8080", options.proxy.dashboard_port),
        ],
        volumes: vec!["/var/run/docker.sock:/var/run/docker.sock:ro".to_string()],
        networks: vec![options.network.clone()],
        ..ComposeService::default()
    }
}
