pub mod error;
pub mod file_system;
pub mod output_macros;
pub mod user_paths;

pub use error::{CycleError, DevEnvError, EntityKind, Result, ValidationError};
pub use user_paths::DevEnvPaths;
