pub use devenv_core::error::{CycleError, DevEnvError, EntityKind, Result, ValidationError};
