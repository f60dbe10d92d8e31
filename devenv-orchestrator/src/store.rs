//! The entity store: canonical services and projects.
//!
//! Every mutation runs against a copy of the current state. The copy is only
//! committed once field checks, references and whole-graph acyclicity all
//! pass, so a failed call leaves the store exactly as it was.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use tracing::{debug, info};

use devenv_config::validate::{check_unique_hosts, validate_environment, validate_service_fields};
use devenv_config::{
    catalog, normalize_slug, service_host, DependencyGraph, EntityState, Project, Service,
};
use devenv_core::error::Result;
use devenv_core::{DevEnvError, EntityKind, ValidationError};

#[derive(Debug, Clone)]
pub struct EntityStore {
    state: EntityState,
    base_domain: String,
}

impl EntityStore {
    pub fn new(base_domain: impl Into<String>) -> Self {
        Self {
            state: EntityState::default(),
            base_domain: base_domain.into(),
        }
    }

    /// Adopt persisted state after checking every invariant.
    ///
    /// Slugs and urls are derived data: they are recomputed from each name and
    /// the current base domain, so a changed domain applies on the next open.
    pub fn from_state(mut state: EntityState, base_domain: impl Into<String>) -> Result<Self> {
        let base_domain = base_domain.into();
        state.projects = derive_project_keys(std::mem::take(&mut state.projects), &base_domain)?;
        check_invariants(&state, &base_domain)?;
        Ok(Self { state, base_domain })
    }

    pub fn state(&self) -> &EntityState {
        &self.state
    }

    pub fn revision(&self) -> u64 {
        self.state.revision
    }

    pub fn base_domain(&self) -> &str {
        &self.base_domain
    }

    pub fn services(&self) -> impl Iterator<Item = &Service> {
        self.state.services.values()
    }

    pub fn projects(&self) -> impl Iterator<Item = &Project> {
        self.state.projects.values()
    }

    pub fn get_service(&self, name: &str) -> Result<&Service> {
        self.state
            .services
            .get(name)
            .ok_or_else(|| DevEnvError::not_found(EntityKind::Service, name))
    }

    /// Projects are looked up by the slug of `name`, so `"My Shop"` and
    /// `"my-shop"` find the same project.
    pub fn get_project(&self, name: &str) -> Result<&Project> {
        self.state
            .projects
            .get(&normalize_slug(name))
            .ok_or_else(|| DevEnvError::not_found(EntityKind::Project, name))
    }

    pub fn create_service(&mut self, service: Service) -> Result<Service> {
        self.commit(|state| {
            let mut service = service;
            service.dedup_dependencies();
            validate_service_fields(&service)?;

            if state.services.contains_key(&service.name) {
                return Err(ValidationError::DuplicateName {
                    kind: EntityKind::Service,
                    name: service.name,
                }
                .into());
            }

            state.services.insert(service.name.clone(), service.clone());
            info!("Created service '{}'", service.name);
            Ok(service)
        })
    }

    /// Replace everything but the name. Turning a service global drops it from
    /// every project's explicit list.
    pub fn update_service(&mut self, service: Service) -> Result<Service> {
        self.commit(|state| {
            let mut service = service;
            service.dedup_dependencies();

            let Some(slot) = state.services.get_mut(&service.name) else {
                return Err(DevEnvError::not_found(EntityKind::Service, &service.name));
            };
            validate_service_fields(&service)?;
            *slot = service.clone();

            if service.global {
                let detached = detach_everywhere(state, &service.name);
                if detached > 0 {
                    info!(
                        "Service '{}' is now global; removed from {} project list(s)",
                        service.name, detached
                    );
                }
            }
            info!("Updated service '{}'", service.name);
            Ok(service)
        })
    }

    /// Rejected while other services depend on `name`; otherwise the service
    /// is also detached from every project.
    pub fn remove_service(&mut self, name: &str) -> Result<Service> {
        self.commit(|state| {
            if !state.services.contains_key(name) {
                return Err(DevEnvError::not_found(EntityKind::Service, name));
            }

            let dependents = DependencyGraph::from_services(state.services.values()).dependents_of(name);
            if !dependents.is_empty() {
                return Err(ValidationError::DependentsExist {
                    service: name.to_string(),
                    dependents,
                }
                .into());
            }

            let detached = detach_everywhere(state, name);
            let removed = state
                .services
                .shift_remove(name)
                .ok_or_else(|| DevEnvError::not_found(EntityKind::Service, name))?;
            info!("Removed service '{name}' (detached from {detached} project(s))");
            Ok(removed)
        })
    }

    pub fn instantiate(&mut self, template: &str) -> Result<Service> {
        let service = catalog::instantiate(template)?;
        self.create_service(service)
    }

    pub fn create_project(
        &mut self,
        name: &str,
        environment: BTreeMap<String, String>,
    ) -> Result<Project> {
        let base_domain = self.base_domain.clone();
        self.commit(|state| {
            validate_environment(&environment)?;
            let project = Project::new(name, environment, &base_domain)?;
            ensure_unique_project(state, &project, None)?;

            state.projects.insert(project.slug.clone(), project.clone());
            info!("Created project '{}' at {}", project.name, project.url);
            Ok(project)
        })
    }

    /// Replace the project's environment map.
    pub fn update_project(
        &mut self,
        name: &str,
        environment: BTreeMap<String, String>,
    ) -> Result<Project> {
        self.commit(|state| {
            validate_environment(&environment)?;
            let project = project_mut(state, name)?;
            project.environment = environment;
            debug!("Updated environment of project '{}'", project.name);
            Ok(project.clone())
        })
    }

    /// Rename a project; its slug and url follow and it keeps its position.
    pub fn rename_project(&mut self, name: &str, new_name: &str) -> Result<Project> {
        let base_domain = self.base_domain.clone();
        self.commit(|state| {
            let old_slug = normalize_slug(name);
            let Some(index) = state.projects.get_index_of(&old_slug) else {
                return Err(DevEnvError::not_found(EntityKind::Project, name));
            };

            let mut project = state.projects[index].clone();
            project.rename(new_name, &base_domain)?;
            ensure_unique_project(state, &project, Some(old_slug.as_str()))?;

            state.projects.shift_remove_index(index);
            state
                .projects
                .shift_insert(index, project.slug.clone(), project.clone());
            info!("Renamed project '{name}' to '{}'", project.name);
            Ok(project)
        })
    }

    pub fn remove_project(&mut self, name: &str) -> Result<Project> {
        self.commit(|state| {
            let removed = state
                .projects
                .shift_remove(&normalize_slug(name))
                .ok_or_else(|| DevEnvError::not_found(EntityKind::Project, name))?;
            info!("Removed project '{}'", removed.name);
            Ok(removed)
        })
    }

    pub fn attach_service(&mut self, project: &str, service: &str) -> Result<Project> {
        self.commit(|state| {
            let target = state
                .services
                .get(service)
                .ok_or_else(|| DevEnvError::not_found(EntityKind::Service, service))?;
            let is_global = target.global;

            let entry = project_mut(state, project)?;
            if is_global {
                return Err(ValidationError::GlobalInProjectList {
                    project: entry.name.clone(),
                    service: service.to_string(),
                }
                .into());
            }
            if entry.uses(service) {
                return Err(ValidationError::AlreadyAttached {
                    project: entry.name.clone(),
                    service: service.to_string(),
                }
                .into());
            }

            entry.services.push(service.to_string());
            info!("Attached service '{service}' to project '{}'", entry.name);
            Ok(entry.clone())
        })
    }

    pub fn detach_service(&mut self, project: &str, service: &str) -> Result<Project> {
        self.commit(|state| {
            let entry = project_mut(state, project)?;
            let Some(pos) = entry.services.iter().position(|s| s == service) else {
                return Err(ValidationError::NotAttached {
                    project: entry.name.clone(),
                    service: service.to_string(),
                }
                .into());
            };

            entry.services.remove(pos);
            info!("Detached service '{service}' from project '{}'", entry.name);
            Ok(entry.clone())
        })
    }

    /// Apply `change` to a copy of the state and commit it, with a bumped
    /// revision, only if every invariant still holds.
    fn commit<T>(&mut self, change: impl FnOnce(&mut EntityState) -> Result<T>) -> Result<T> {
        let mut candidate = self.state.clone();
        let out = change(&mut candidate)?;
        check_invariants(&candidate, &self.base_domain)?;

        candidate.revision += 1;
        self.state = candidate;
        debug!("Entity store at revision {}", self.state.revision);
        Ok(out)
    }
}

fn project_mut<'s>(state: &'s mut EntityState, name: &str) -> Result<&'s mut Project> {
    state
        .projects
        .get_mut(&normalize_slug(name))
        .ok_or_else(|| DevEnvError::not_found(EntityKind::Project, name))
}

/// Remove `service` from every project list; returns how many lists changed.
fn detach_everywhere(state: &mut EntityState, service: &str) -> usize {
    let mut detached = 0;
    for project in state.projects.values_mut() {
        let before = project.services.len();
        project.services.retain(|s| s != service);
        if project.services.len() != before {
            detached += 1;
        }
    }
    detached
}

/// `previous_slug` is the key the project is stored under when renaming.
fn ensure_unique_project(
    state: &EntityState,
    project: &Project,
    previous_slug: Option<&str>,
) -> Result<()> {
    for (slug, other) in &state.projects {
        if Some(slug.as_str()) == previous_slug {
            continue;
        }
        if other.name == project.name {
            return Err(ValidationError::DuplicateName {
                kind: EntityKind::Project,
                name: project.name.clone(),
            }
            .into());
        }
        if *slug == project.slug {
            return Err(ValidationError::DuplicateSlug {
                slug: project.slug.clone(),
                existing: other.name.clone(),
            }
            .into());
        }
    }
    Ok(())
}

/// Rebuild the slug-keyed project map from each project's name.
fn derive_project_keys(
    projects: IndexMap<String, Project>,
    base_domain: &str,
) -> Result<IndexMap<String, Project>> {
    let mut derived: IndexMap<String, Project> = IndexMap::with_capacity(projects.len());
    for (_, mut project) in projects {
        let name = project.name.clone();
        project.rename(name, base_domain)?;
        if let Some(existing) = derived.get(&project.slug) {
            return Err(ValidationError::DuplicateSlug {
                slug: project.slug.clone(),
                existing: existing.name.clone(),
            }
            .into());
        }
        derived.insert(project.slug.clone(), project);
    }
    Ok(derived)
}

/// Whole-state checks: service references resolve, the dependency graph is
/// acyclic, routed hosts are unique, and project lists only name existing
/// non-global services.
fn check_invariants(state: &EntityState, base_domain: &str) -> Result<()> {
    let graph = DependencyGraph::from_services(state.services.values());
    graph.check_references()?;
    graph.topological_order()?;

    let service_hosts = state
        .services
        .values()
        .filter(|s| s.proxy_port.is_some())
        .map(|s| (service_host(&s.name, base_domain), s.name.as_str()));
    let project_hosts = state
        .projects
        .values()
        .map(|p| (p.url.clone(), p.slug.as_str()));
    check_unique_hosts(service_hosts.chain(project_hosts))?;

    for project in state.projects.values() {
        for name in &project.services {
            match state.services.get(name) {
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
