// Service commands

use anyhow::Result;

use devenv_config::Service;
use devenv_core::{devenv_println, devenv_success, devenv_warning};
use devenv_orchestrator::{DevEnvService, Environment};

use super::{parse_env_pairs, print_json, sync_runtime_state};
use crate::cli::{ServiceSpec, ServiceSubcommand};

pub async fn handle_service_command(env: &Environment, command: ServiceSubcommand) -> Result<()> {
    match command {
        ServiceSubcommand::List { json } => {
            let services = env.list_services().await?;
            if json {
                return print_json(&services);
            }
            if services.is_empty() {
                devenv_println!("No services defined");
                return Ok(());
            }
            devenv_println!("{:<20} {:<32} {:<7} DEPENDS ON", "NAME", "IMAGE", "GLOBAL");
            for service in &services {
                devenv_println!(
                    "{:<20} {:<32} {:<7} {}",
                    service.name,
                    service.image,
                    if service.global { "yes" } else { "no" },
                    service.dependencies.join(", ")
                );
            }
            Ok(())
        }
        ServiceSubcommand::Add(spec) => {
            let service = build_service(spec)?;
            sync_runtime_state(env).await;
            let service = env.add_service(service).await?;
            devenv_success!("Added service '{}' ({})", service.name, service.image);
            report_hook_error(env).await;
            Ok(())
        }
        ServiceSubcommand::Update(spec) => {
            let service = build_service(spec)?;
            sync_runtime_state(env).await;
            let service = env.update_service(service).await?;
            devenv_success!("Updated service '{}'", service.name);
            report_hook_error(env).await;
            Ok(())
        }
        ServiceSubcommand::Remove { name } => {
            sync_runtime_state(env).await;
            env.remove_service(&name).await?;
            devenv_success!("Removed service '{name}'");
            report_hook_error(env).await;
            Ok(())
        }
        ServiceSubcommand::Catalog { json } => {
            let templates = env.list_predefined_services().await?;
            if json {
                return print_json(&templates);
            }
            devenv_println!("{:<14} {:<28} DESCRIPTION", "NAME", "IMAGE");
            for template in &templates {
                devenv_println!(
                    "{:<14} {:<28} {}",
                    template.name,
                    template.image,
                    template.description
                );
            }
            Ok(())
        }
        ServiceSubcommand::Instantiate { name } => {
            sync_runtime_state(env).await;
            let service = env.instantiate_predefined_service(&name).await?;
            devenv_success!("Added service '{}' from the catalog", service.name);
            report_hook_error(env).await;
            Ok(())
        }
    }
}

fn build_service(spec: ServiceSpec) -> Result<Service> {
    let mut service = Service::new(spec.name, spec.image).global(spec.global);
    service.ports = spec.ports;
    service.volumes = spec.volumes;
    service.dependencies = spec.depends_on;
    service.config = parse_env_pairs(&spec.env)?;
    service.proxy_port = spec.proxy_port;
    Ok(service)
}

/// The change is committed even when applying it to the environment failed.
async fn report_hook_error(env: &Environment) {
    if let Some(error) = env.last_error().await {
        devenv_warning!("Saved, but the environment was not updated: {error}");
    }
}
