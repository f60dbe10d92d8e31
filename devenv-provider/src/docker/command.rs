//! Compose command builder.
//!
//! Every invocation targets one compose file and one compose project name, so
//! the builder always starts with `-f <file> -p <project>` and callers only add
//! the subcommand and its flags.

use std::path::Path;

use anyhow::Context;
use tracing::debug;

use crate::error::ProviderError;

#[derive(Debug, Clone)]
pub struct ComposeCommand {
    program: String,
    args: Vec<String>,
}

/// Result of a compose run that exited successfully.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

impl ComposeCommand {
    /// `program` and `base_args` come from the configured compose command
    /// (`docker` + `compose`, or `docker-compose` alone).
    pub fn new(program: &str, base_args: &[String], compose_file: &Path, project_name: &str) -> Self {
        let mut args = base_args.to_vec();
        args.push("-f".to_string());
        args.push(compose_file.display().to_string());
        args.push("-p".to_string());
        args.push(project_name.to_string());
        Self {
            program: program.to_string(),
            args,
        }
    }

    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn display(&self) -> String {
        format!("{} {}", self.program, self.args.join(" "))
    }

    /// Run to completion, capturing both streams. A non-zero exit becomes
    /// [`ProviderError::CommandFailed`] carrying stderr verbatim.
    pub fn run(&self) -> Result<CommandOutput, ProviderError> {
        debug!("Executing: {}", self.display());

        let output = self.spawn().map_err(|e| ProviderError::DependencyNotFound {
            program: self.program.clone(),
            reason: format!("{e:#}"),
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).trim_end().to_string();

        if output.status.success() {
            Ok(CommandOutput { stdout, stderr })
        } else {
            let stderr = if stderr.is_empty() {
                format!("'{}' exited with {}", self.display(), output.status)
            } else {
                stderr
            };
            Err(ProviderError::CommandFailed {
                command: self.display(),
                stderr,
            })
        }
    }

    fn spawn(&self) -> anyhow::Result<std::process::Output> {
        duct::cmd(&self.program, &self.args)
            .stdout_capture()
            .stderr_capture()
            .unchecked()
            .run()
            .with_context(|| format!("failed to start '{}'", self.program))
    }
}
