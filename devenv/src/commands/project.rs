// Project commands

use anyhow::Result;
use tracing::debug;

use devenv_core::{devenv_println, devenv_success};
use devenv_orchestrator::{DevEnvService, Environment};

use super::{parse_env_pairs, print_json};
use crate::cli::ProjectSubcommand;

pub async fn handle_project_command(env: &Environment, command: ProjectSubcommand) -> Result<()> {
    match command {
        ProjectSubcommand::List { json } => {
            let projects = env.list_projects().await?;
            if json {
                return print_json(&projects);
            }
            if projects.is_empty() {
                devenv_println!("No projects defined");
                return Ok(());
            }
            devenv_println!("{:<24} {:<36} SERVICES", "NAME", "URL");
            for project in &projects {
                devenv_println!(
                    "{:<24} {:<36} {}",
                    project.name,
                    project.url,
                    project.services.join(", ")
                );
            }
            Ok(())
        }
        ProjectSubcommand::Add { name, env: pairs } => {
            let environment = parse_env_pairs(&pairs)?;
            let project = env.add_project(&name, environment).await?;
            devenv_success!("Created project '{}' at {}", project.name, project.url);
            Ok(())
        }
        ProjectSubcommand::Update { name, env: pairs } => {
            let environment = parse_env_pairs(&pairs)?;
            let project = env.update_project(&name, environment).await?;
            debug!("Project '{}' now has {} variables", project.name, project.environment.len());
            devenv_success!("Updated project '{}'", project.name);
            Ok(())
        }
        ProjectSubcommand::Rename { name, new_name } => {
            let project = env.rename_project(&name, &new_name).await?;
            devenv_success!("Renamed project '{name}' to '{}' ({})", project.name, project.url);
            Ok(())
        }
        ProjectSubcommand::Remove { name } => {
            env.remove_project(&name).await?;
            devenv_success!("Removed project '{name}'");
            Ok(())
        }
        ProjectSubcommand::Attach { project, service } => {
            let updated = env.attach_service(&project, &service).await?;
            devenv_success!(
                "Attached '{service}' to '{}' (services: {})",
                updated.name,
                updated.services.join(", ")
            );
            Ok(())
        }
        ProjectSubcommand::Detach { project, service } => {
            let updated = env.detach_service(&project, &service).await?;
            devenv_success!("Detached '{service}' from '{}'", updated.name);
            Ok(())
        }
    }
}
