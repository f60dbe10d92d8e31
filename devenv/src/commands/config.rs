// Compose document commands

use anyhow::{bail, Result};

use devenv_core::{devenv_println, devenv_success};
use devenv_orchestrator::{DevEnvService, Environment};

use crate::cli::ConfigSubcommand;

pub async fn handle_config_command(env: &Environment, command: ConfigSubcommand) -> Result<()> {
    match command {
        ConfigSubcommand::Generate => {
            let content = env.generate_configuration().await?;
            print!("{content}");
            Ok(())
        }
        ConfigSubcommand::Save => {
            let content = env.generate_configuration().await?;
            env.save_configuration(&content).await?;
            devenv_success!("Wrote {}", env.paths().compose_path().display());
            Ok(())
        }
        ConfigSubcommand::Exists => {
            let exists = env.check_config_exists().await?;
            devenv_println!("{exists}");
            Ok(())
        }
        ConfigSubcommand::Reset { yes } => {
            if !yes {
                bail!("Reset deletes every service, project and the compose document; pass --yes to confirm");
            }
            env.reset_configuration().await?;
            devenv_success!("Reset all devenv state");
            Ok(())
        }
    }
}
