// Command handlers

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::debug;

use devenv_config::Settings;
use devenv_core::DevEnvPaths;
use devenv_orchestrator::{DevEnvService, Environment};
use devenv_provider::docker::ComposeRuntime;

use crate::cli::{Args, Command};

pub mod config;
pub mod env;
pub mod project;
pub mod service;

/// Main command dispatcher
pub async fn execute_command(args: Args, paths: DevEnvPaths) -> Result<()> {
    let env = open_environment(paths)?;

    match args.command {
        Command::Project { command } => {
            debug!("Handling project command");
            project::handle_project_command(&env, command).await
        }
        Command::Service { command } => {
            debug!("Handling service command");
            service::handle_service_command(&env, command).await
        }
        Command::Config { command } => {
            debug!("Handling config command");
            config::handle_config_command(&env, command).await
        }
        Command::Env { command } => {
            debug!("Handling env command");
            env::handle_env_command(&env, command).await
        }
    }
}

fn open_environment(paths: DevEnvPaths) -> Result<Environment> {
    let settings = Settings::load(&paths.settings_path())
        .with_context(|| format!("Failed to load {}", paths.settings_path().display()))?;
    let runtime = Arc::new(ComposeRuntime::new(&settings)?);
    let env = Environment::with_settings(paths, settings, runtime)?;
    Ok(env)
}

/// Each invocation starts with a fresh controller. Before a change that may
/// restart the environment, ask the runtime whether it is actually up.
pub(crate) async fn sync_runtime_state(env: &Environment) {
    if !env.check_config_exists().await.unwrap_or(false) {
        return;
    }
    if let Err(e) = env.check_environment_running().await {
        debug!("Could not query the runtime: {e}");
    }
}

/// Parse repeated `KEY=VALUE` arguments.
pub(crate) fn parse_env_pairs(pairs: &[String]) -> Result<BTreeMap<String, String>> {
    let mut map = BTreeMap::new();
    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            bail!("Invalid environment variable '{pair}': expected KEY=VALUE");
        };
        map.insert(key.trim().to_string(), value.to_string());
    }
    Ok(map)
}

pub(crate) fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env_pairs() {
        let pairs = vec!["DB_HOST=db".to_string(), "URL=http://x?a=b".to_string()];
        let map = parse_env_pairs(&pairs).unwrap();
        assert_eq!(map["DB_HOST"], "db");
        assert_eq!(map["URL"], "http://x?a=b");
        assert!(parse_env_pairs(&["NOVALUE".to_string()]).is_err());
    }
}
