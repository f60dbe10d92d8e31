//! Environment orchestration for devenv.
//!
//! This crate owns the canonical services and projects ([`EntityStore`]), the
//! lifecycle of the single environment ([`EnvironmentController`]) and the
//! aggregate that ties them together ([`Environment`]). Callers such as the
//! CLI talk to it through [`DevEnvService`].

pub mod controller;
pub mod environment;
pub mod error;
mod scaffold;
pub mod service;
pub mod store;

pub use controller::{EnvironmentController, EnvironmentState};
pub use environment::Environment;
pub use error::{DevEnvError, Result};
pub use service::DevEnvService;
pub use store::EntityStore;
