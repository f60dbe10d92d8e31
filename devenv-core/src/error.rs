//! Error taxonomy shared by every devenv crate.
//!
//! Entity and generator failures are always caller-correctable and leave state
//! untouched. Runtime and I/O failures come from the outside world and are
//! surfaced verbatim.

use std::fmt::{self, Display, Formatter};
use thiserror::Error;

/// The kind of entity a lookup or uniqueness check was about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Project,
    Service,
    Template,
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            EntityKind::Project => write!(f, "Project"),
            EntityKind::Service => write!(f, "Service"),
            EntityKind::Template => write!(f, "Predefined service"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{kind} with name '{name}' already exists")]
    DuplicateName { kind: EntityKind, name: String },

    #[error("Project slug '{slug}' is already used by project '{existing}'")]
    DuplicateSlug { slug: String, existing: String },

    #[error("Service '{service}' depends on '{dependency}', which does not exist")]
    UnknownReference { service: String, dependency: String },

    #[error("Service '{0}' cannot depend on itself ({0} -> {0})")]
    SelfDependency(String),

    #[error("Service '{service}' is global and is implicitly part of project '{project}'")]
    GlobalInProjectList { project: String, service: String },

    #[error("Service '{service}' is already attached to project '{project}'")]
    AlreadyAttached { project: String, service: String },

    #[error("Service '{service}' is not attached to project '{project}'")]
    NotAttached { project: String, service: String },

    #[error(
        "Service '{service}' is a dependency for: {}. Remove these dependencies first.",
        .dependents.join(", ")
    )]
    DependentsExist {
        service: String,
        dependents: Vec<String>,
    },

    #[error("Invalid {field} '{value}': {reason}")]
    InvalidField {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("'{0}' is reserved for generated containers")]
    ReservedName(String),
}

impl ValidationError {
    pub fn invalid(field: &'static str, value: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidField {
            field,
            value: value.into(),
            reason: reason.into(),
        }
    }
}

/// A dependency cycle. `path` starts and ends with the same service name.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Dependency cycle detected: {}", .path.join(" -> "))]
pub struct CycleError {
    pub path: Vec<String>,
}

impl CycleError {
    pub fn new(path: Vec<String>) -> Self {
        Self { path }
    }
}

#[derive(Error, Debug)]
pub enum DevEnvError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Cycle(#[from] CycleError),

    #[error("{kind} '{name}' does not exist")]
    NotFound { kind: EntityKind, name: String },

    #[error("Runtime error: {0}")]
    Runtime(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl DevEnvError {
    pub fn not_found(kind: EntityKind, name: impl Into<String>) -> Self {
        DevEnvError::NotFound {
            kind,
            name: name.into(),
        }
    }

    /// Errors the caller can fix by changing its input.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            DevEnvError::Validation(_) | DevEnvError::Cycle(_) | DevEnvError::NotFound { .. }
        )
    }
}

impl From<serde_yaml_ng::Error> for DevEnvError {
    fn from(err: serde_yaml_ng::Error) -> Self {
        DevEnvError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for DevEnvError {
    fn from(err: serde_json::Error) -> Self {
        DevEnvError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DevEnvError>;
