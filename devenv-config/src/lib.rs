//! Entity model and static configuration for devenv.
//!
//! - [`model`]: services, projects and slug derivation
//! - [`validate`]: field-level checks shared by the store and the generator
//! - [`resolver`]: dependency graph ordering and cycle detection
//! - [`catalog`]: predefined service templates
//! - [`settings`]: user settings (`settings.yaml`)
//! - [`state`]: persisted entity state (`state.json`)

pub mod catalog;
pub mod model;
pub mod resolver;
pub mod settings;
pub mod state;
pub mod validate;

pub use catalog::Template;
pub use model::{normalize_slug, project_url, service_host, Project, Service};
pub use resolver::{validate_acyclic, DependencyGraph};
pub use settings::Settings;
pub use state::EntityState;
