//! Errors raised while driving the container runtime.

use thiserror::Error;

use devenv_core::DevEnvError;

#[derive(Error, Debug)]
pub enum ProviderError {
    /// The tool ran and exited non-zero; `stderr` is kept verbatim.
    #[error("{stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("Could not run '{program}': {reason}")]
    DependencyNotFound { program: String, reason: String },
}

impl ProviderError {
    /// A hint for common environment problems, if one applies.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::CommandFailed { stderr, .. }
                if stderr.contains("Cannot connect to the Docker daemon")
                    || stderr.contains("connection refused") =>
            {
                Some("Start Docker and try again")
            }
            Self::CommandFailed { stderr, .. } if stderr.contains("is not a docker command") => {
                Some("Install the compose plugin or set compose_command: docker-compose in settings.yaml")
            }
            Self::DependencyNotFound { .. } => Some("Install Docker and make sure it is on PATH"),
            _ => None,
        }
    }
}

impl From<ProviderError> for DevEnvError {
    fn from(err: ProviderError) -> Self {
        DevEnvError::Runtime(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stderr_is_kept_verbatim() {
        let err = ProviderError::CommandFailed {
            command: "docker compose up -d".into(),
            stderr: "Error response from daemon: port is already allocated".into(),
        };
        let runtime: DevEnvError = err.into();
        assert_eq!(
            runtime.to_string(),
            "Runtime error: Error response from daemon: port is already allocated"
        );
    }

    #[test]
    fn test_daemon_down_has_suggestion() {
        let err = ProviderError::CommandFailed {
            command: "docker compose ps -q".into(),
            stderr: "Cannot connect to the Docker daemon at unix:///var/run/docker.sock".into(),
        };
        assert_eq!(err.suggestion(), Some("Start Docker and try again"));
    }
}
