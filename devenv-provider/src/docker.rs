//! `docker compose` backend.

use std::path::Path;

use tracing::{debug, info, warn};

use devenv_config::Settings;
use devenv_core::error::Result;

use crate::Runtime;

pub mod command;

use command::ComposeCommand;

/// Drives the environment through the compose CLI.
#[derive(Debug, Clone)]
pub struct ComposeRuntime {
    program: String,
    base_args: Vec<String>,
    project_name: String,
}

impl ComposeRuntime {
    pub fn new(settings: &Settings) -> Result<Self> {
        let (program, base_args) = settings.compose_program()?;
        Ok(Self {
            program,
            base_args,
            project_name: settings.project_name.clone(),
        })
    }

    fn command(&self, compose_file: &Path) -> ComposeCommand {
        ComposeCommand::new(&self.program, &self.base_args, compose_file, &self.project_name)
    }

    fn run(&self, command: ComposeCommand) -> Result<String> {
        match command.run() {
            Ok(output) => Ok(output.stdout),
            Err(e) => {
                if let Some(hint) = e.suggestion() {
                    warn!("{hint}");
                }
                Err(e.into())
            }
        }
    }
}

impl Runtime for ComposeRuntime {
    fn name(&self) -> &'static str {
        "docker"
    }

    fn up(&self, compose_file: &Path, start_order: &[String]) -> Result<()> {
        debug!("Start order: {}", start_order.join(", "));
        self.run(
            self.command(compose_file)
                .arg("up")
                .args(["-d", "--remove-orphans"]),
        )?;
        info!("Environment '{}' is up", self.project_name);
        Ok(())
    }

    fn down(&self, compose_file: &Path) -> Result<()> {
        self.run(self.command(compose_file).arg("down"))?;
        info!("Environment '{}' is down", self.project_name);
        Ok(())
    }

    fn is_running(&self, compose_file: &Path) -> Result<bool> {
        if !compose_file.exists() {
            return Ok(false);
        }
        let stdout = self.run(self.command(compose_file).args(["ps", "-q"]))?;
        Ok(stdout.lines().any(|l| !l.trim().is_empty()))
    }
}
