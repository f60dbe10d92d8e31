// Environment lifecycle commands

use anyhow::Result;

use devenv_core::{devenv_println, devenv_success};
use devenv_orchestrator::{DevEnvService, Environment};

use crate::cli::EnvSubcommand;

pub async fn handle_env_command(env: &Environment, command: EnvSubcommand) -> Result<()> {
    match command {
        EnvSubcommand::Start => {
            let state = env.start_environment().await?;
            devenv_success!("Environment is {state}");
            Ok(())
        }
        EnvSubcommand::Stop => {
            // A fresh process assumes stopped; ask the runtime first.
            env.check_environment_running().await?;
            let state = env.stop_environment().await?;
            devenv_success!("Environment is {state}");
            Ok(())
        }
        EnvSubcommand::Restart => {
            env.check_environment_running().await?;
            let state = env.restart_environment().await?;
            devenv_success!("Environment is {state}");
            Ok(())
        }
        EnvSubcommand::Status => {
            let running = env.check_environment_running().await?;
            devenv_println!("{}", if running { "running" } else { "stopped" });
            if let Some(error) = env.last_error().await {
                devenv_println!("Last error: {error}");
            }
            Ok(())
        }
    }
}
