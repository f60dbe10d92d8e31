//! The command surface: one async method per user-facing command.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tracing::info;

use devenv_config::catalog::{self, Template};
use devenv_config::{normalize_slug, Project, Service};
use devenv_core::error::Result;

use crate::controller::EnvironmentState;
use crate::environment::{Environment, Mutation};

#[async_trait]
pub trait DevEnvService: Send + Sync {
    async fn list_projects(&self) -> Result<Vec<Project>>;
    async fn get_project(&self, name: &str) -> Result<Project>;
    async fn add_project(&self, name: &str, environment: BTreeMap<String, String>) -> Result<Project>;
    async fn update_project(
        &self,
        name: &str,
        environment: BTreeMap<String, String>,
    ) -> Result<Project>;
    async fn rename_project(&self, name: &str, new_name: &str) -> Result<Project>;
    async fn remove_project(&self, name: &str) -> Result<()>;

    async fn list_services(&self) -> Result<Vec<Service>>;
    async fn get_service(&self, name: &str) -> Result<Service>;
    async fn add_service(&self, service: Service) -> Result<Service>;
    async fn update_service(&self, service: Service) -> Result<Service>;
    async fn remove_service(&self, name: &str) -> Result<()>;

    async fn attach_service(&self, project: &str, service: &str) -> Result<Project>;
    async fn detach_service(&self, project: &str, service: &str) -> Result<Project>;

    async fn list_predefined_services(&self) -> Result<Vec<Template>>;
    async fn instantiate_predefined_service(&self, name: &str) -> Result<Service>;

    async fn generate_configuration(&self) -> Result<String>;
    async fn save_configuration(&self, content: &str) -> Result<()>;
    async fn check_config_exists(&self) -> Result<bool>;
    async fn reset_configuration(&self) -> Result<()>;

    async fn start_environment(&self) -> Result<EnvironmentState>;
    async fn stop_environment(&self) -> Result<EnvironmentState>;
    async fn restart_environment(&self) -> Result<EnvironmentState>;
    async fn check_environment_running(&self) -> Result<bool>;
}

#[async_trait]
impl DevEnvService for Environment {
    async fn list_projects(&self) -> Result<Vec<Project>> {
        Ok(self.read(|store| store.projects().cloned().collect()).await)
    }

    async fn get_project(&self, name: &str) -> Result<Project> {
        self.read(|store| store.get_project(name).cloned()).await
    }

    async fn add_project(&self, name: &str, environment: BTreeMap<String, String>) -> Result<Project> {
        let project = self
            .mutate(Mutation::Cosmetic, |store| {
                store.create_project(name, environment)
            })
            .await?;
        self.scaffold_project(&project);
        Ok(project)
    }

    async fn update_project(
        &self,
        name: &str,
        environment: BTreeMap<String, String>,
    ) -> Result<Project> {
        self.mutate(Mutation::Cosmetic, |store| {
            store.update_project(name, environment)
        })
        .await
    }

    async fn rename_project(&self, name: &str, new_name: &str) -> Result<Project> {
        let old_slug = normalize_slug(name);
        let project = self
            .mutate(Mutation::Cosmetic, |store| store.rename_project(name, new_name))
            .await?;
        self.move_project_dir(&old_slug, &project);
        Ok(project)
    }

    async fn remove_project(&self, name: &str) -> Result<()> {
        let removed = self
            .mutate(Mutation::Cosmetic, |store| store.remove_project(name))
            .await?;
        self.remove_project_dir(&removed);
        Ok(())
    }

    async fn list_services(&self) -> Result<Vec<Service>> {
        Ok(self.read(|store| store.services().cloned().collect()).await)
    }

    async fn get_service(&self, name: &str) -> Result<Service> {
        self.read(|store| store.get_service(name).cloned()).await
    }

    async fn add_service(&self, service: Service) -> Result<Service> {
        self.mutate(Mutation::Structural, |store| store.create_service(service))
            .await
    }

    async fn update_service(&self, service: Service) -> Result<Service> {
        self.mutate(Mutation::Structural, |store| store.update_service(service))
            .await
    }

    async fn remove_service(&self, name: &str) -> Result<()> {
        self.mutate(Mutation::Structural, |store| store.remove_service(name))
            .await
            .map(|_| ())
    }

    async fn attach_service(&self, project: &str, service: &str) -> Result<Project> {
        self.mutate(Mutation::Cosmetic, |store| {
            store.attach_service(project, service)
        })
        .await
    }

    async fn detach_service(&self, project: &str, service: &str) -> Result<Project> {
        self.mutate(Mutation::Cosmetic, |store| {
            store.detach_service(project, service)
        })
        .await
    }

    async fn list_predefined_services(&self) -> Result<Vec<Template>> {
        Ok(catalog::list().to_vec())
    }

    async fn instantiate_predefined_service(&self, name: &str) -> Result<Service> {
        self.mutate(Mutation::Structural, |store| store.instantiate(name))
            .await
    }

    async fn generate_configuration(&self) -> Result<String> {
        Ok(self.generate().await?.content)
    }

    async fn save_configuration(&self, content: &str) -> Result<()> {
        self.save_document(content).await
    }

    async fn check_config_exists(&self) -> Result<bool> {
        Ok(self.config_exists().await)
    }

    async fn reset_configuration(&self) -> Result<()> {
        self.reset().await
    }

    async fn start_environment(&self) -> Result<EnvironmentState> {
        let state = self.start().await?;
        info!("Environment is {state}");
        Ok(state)
    }

    async fn stop_environment(&self) -> Result<EnvironmentState> {
        let state = self.stop().await?;
        info!("Environment is {state}");
        Ok(state)
    }

    async fn restart_environment(&self) -> Result<EnvironmentState> {
        self.restart().await
    }

    async fn check_environment_running(&self) -> Result<bool> {
        self.refresh().await
    }
}
