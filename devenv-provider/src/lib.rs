//! Compose document generation and container runtime backends.
//!
//! The generator is a pure function from services and projects to a
//! [`ConfigurationDocument`]. A [`Runtime`] takes the written document and
//! brings the environment up or down; [`docker::ComposeRuntime`] drives
//! `docker compose`, and `mock::MockRuntime` (feature `test-helpers`) records
//! calls in memory.

use std::path::Path;

use devenv_core::error::Result;

pub mod compose;
pub mod error;
pub mod generator;

#[cfg(feature = "docker")]
pub mod docker;

#[cfg(feature = "test-helpers")]
pub mod mock;

pub use compose::ComposeFile;
pub use error::ProviderError;
pub use generator::{
    generate, generate_with, ComposeOptions, ConfigurationDocument, RoutingRule,
};

/// Executes up/down intents for a written compose document.
///
/// Every call blocks until the underlying tool returns; async callers should
/// run them on a blocking thread.
pub trait Runtime: Send + Sync {
    fn name(&self) -> &'static str;

    /// Create and start every container in `compose_file`.
    ///
    /// `start_order` lists services dependencies first. Backends that resolve
    /// ordering themselves may only log it.
    fn up(&self, compose_file: &Path, start_order: &[String]) -> Result<()>;

    /// Stop and remove every container in `compose_file`.
    fn down(&self, compose_file: &Path) -> Result<()>;

    /// Whether any container of the environment is running.
    fn is_running(&self, compose_file: &Path) -> Result<bool>;
}
