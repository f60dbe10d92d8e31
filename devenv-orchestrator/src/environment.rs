//! The `Environment` aggregate.
//!
//! Holds the committed entity store, the lifecycle controller and the paths
//! they persist to. The controller mutex is the one serialization point: every
//! entity mutation and every lifecycle transition takes it first. The store
//! lives behind its own `RwLock`, which writers only hold to swap in a fully
//! validated candidate, so readers never wait on the runtime.
//!
//! Across processes, `state.lock` in the data directory guards every
//! load-mutate-save cycle; a mutation always starts from what is on disk.

use std::sync::Arc;

use tokio::sync::{watch, Mutex, MutexGuard, RwLock};
use tracing::{debug, info, warn};

use devenv_config::{EntityState, Project, Settings};
use devenv_core::error::Result;
use devenv_core::file_system::{reset_dir, FileLock};
use devenv_core::{DevEnvError, DevEnvPaths};
use devenv_provider::{generate_with, ComposeOptions, ConfigurationDocument, Runtime};

use crate::controller::{EnvironmentController, EnvironmentState};
use crate::scaffold;
use crate::store::EntityStore;

/// How a committed mutation affects the running environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mutation {
    /// Changes what containers exist: regenerate, and restart if running.
    Structural,
    /// Regenerate the saved document, if there is one; never restart.
    Cosmetic,
}

pub struct Environment {
    paths: DevEnvPaths,
    settings: Settings,
    options: ComposeOptions,
    store: RwLock<EntityStore>,
    controller: Mutex<EnvironmentController>,
    status: watch::Receiver<EnvironmentState>,
}

impl Environment {
    /// Load settings and persisted state from `paths`.
    pub fn open(paths: DevEnvPaths, runtime: Arc<dyn Runtime>) -> Result<Self> {
        let settings = Settings::load(&paths.settings_path())?;
        Self::with_settings(paths, settings, runtime)
    }

    pub fn with_settings(
        paths: DevEnvPaths,
        settings: Settings,
        runtime: Arc<dyn Runtime>,
    ) -> Result<Self> {
        settings.validate()?;
        let state = EntityState::load(&paths.state_path())?;
        let store = EntityStore::from_state(state, settings.base_domain.clone())?;
        let controller = EnvironmentController::new(runtime, paths.compose_path());
        let status = controller.subscribe();

        debug!(
            "Opened environment at {} with the {} runtime",
            paths.config_dir.display(),
            controller.runtime_name()
        );

        Ok(Self {
            options: ComposeOptions::from(&settings),
            paths,
            settings,
            store: RwLock::new(store),
            controller: Mutex::new(controller),
            status,
        })
    }

    pub fn paths(&self) -> &DevEnvPaths {
        &self.paths
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Last known lifecycle state; does not wait for in-flight transitions.
    pub fn status(&self) -> EnvironmentState {
        *self.status.borrow()
    }

    pub async fn last_error(&self) -> Option<String> {
        self.controller.lock().await.last_error().map(str::to_string)
    }

    pub async fn revision(&self) -> u64 {
        self.store.read().await.revision()
    }

    /// Read access to the committed store.
    pub(crate) async fn read<T>(&self, f: impl FnOnce(&EntityStore) -> T) -> T {
        let store = self.store.read().await;
        f(&store)
    }

    /// Generate the document for the committed state without touching disk.
    pub async fn generate(&self) -> Result<ConfigurationDocument> {
        let store = self.store.read().await;
        generate_with(store.services(), store.projects(), &self.options)
    }

    /// Run `change` against the persisted state, save the result and swap it
    /// in, then run the post-mutation hook.
    pub(crate) async fn mutate<T>(
        &self,
        mutation: Mutation,
        change: impl FnOnce(&mut EntityStore) -> Result<T>,
    ) -> Result<T> {
        let mut controller = self.controller.lock().await;

        let out = {
            let _lock = self.lock_state().await?;
            let mut candidate = self.load_committed()?;
            let out = change(&mut candidate)?;
            candidate.state().save(&self.paths.state_path())?;
            *self.store.write().await = candidate;
            out
        };

        self.after_mutation(&mut controller, mutation).await;
        Ok(out)
    }

    /// Another process may have committed since this one last looked.
    fn load_committed(&self) -> Result<EntityStore> {
        let state = EntityState::load(&self.paths.state_path())?;
        EntityStore::from_state(state, self.settings.base_domain.clone())
    }

    async fn lock_state(&self) -> Result<FileLock> {
        let path = self.paths.lock_path();
        tokio::task::spawn_blocking(move || FileLock::acquire(&path))
            .await
            .map_err(|e| DevEnvError::Runtime(format!("state lock task failed: {e}")))?
            .map_err(DevEnvError::from)
    }

    /// A failed hook never undoes the committed mutation.
    async fn after_mutation(&self, controller: &mut EnvironmentController, mutation: Mutation) {
        if let Err(e) = self.apply_mutation(controller, mutation).await {
            warn!("Could not apply change to the environment: {e}");
            controller.record_error(e.to_string());
        }
    }

    async fn apply_mutation(
        &self,
        controller: &mut EnvironmentController,
        mutation: Mutation,
    ) -> Result<()> {
        if mutation == Mutation::Cosmetic && !controller.config_exists() {
            return Ok(());
        }

        let document = self.generate().await?;
        if mutation == Mutation::Structural && controller.state() == EnvironmentState::Running {
            controller.restart(&document).await?;
        } else {
            controller.save(&document.content)?;
        }
        Ok(())
    }

    async fn lifecycle(&self) -> MutexGuard<'_, EnvironmentController> {
        self.controller.lock().await
    }

    pub async fn start(&self) -> Result<EnvironmentState> {
        let mut controller = self.lifecycle().await;
        let document = self.generate().await?;
        controller.start(&document).await
    }

    pub async fn stop(&self) -> Result<EnvironmentState> {
        self.lifecycle().await.stop().await
    }

    pub async fn restart(&self) -> Result<EnvironmentState> {
        let mut controller = self.lifecycle().await;
        let document = self.generate().await?;
        controller.restart(&document).await
    }

    /// Ask the runtime whether the environment is up and adopt its answer.
    pub async fn refresh(&self) -> Result<bool> {
        self.lifecycle().await.refresh().await
    }

    pub async fn save_document(&self, content: &str) -> Result<()> {
        self.lifecycle().await.save(content)
    }

    pub async fn config_exists(&self) -> bool {
        self.lifecycle().await.config_exists()
    }

    /// Stop the environment if the runtime reports it up, empty both state
    /// directories and start over with an empty store. Nothing is deleted
    /// unless the stop succeeded.
    pub async fn reset(&self) -> Result<()> {
        let mut controller = self.lifecycle().await;
        controller.refresh().await?;
        if controller.state() != EnvironmentState::Stopped {
            controller.stop().await?;
        }

        let _lock = self.lock_state().await?;
        reset_dir(&self.paths.config_dir)?;
        reset_dir(&self.paths.compose_dir)?;
        *self.store.write().await = EntityStore::new(self.settings.base_domain.clone());
        info!("Reset all devenv state");
        Ok(())
    }

    /// Project directories are served by the project containers. Failing to
    /// manage one never fails the command.
    pub(crate) fn scaffold_project(&self, project: &Project) {
        if let Err(e) = scaffold::create(&self.paths, project) {
            warn!("Could not create the directory for project '{}': {e}", project.name);
        }
    }

    pub(crate) fn move_project_dir(&self, old_slug: &str, project: &Project) {
        if let Err(e) = scaffold::rename(&self.paths, old_slug, project) {
            warn!("Could not move the directory for project '{}': {e}", project.name);
        }
    }

    pub(crate) fn remove_project_dir(&self, project: &Project) {
        if let Err(e) = scaffold::remove(&self.paths, &project.slug) {
            warn!("Could not remove the directory for project '{}': {e}", project.name);
        }
    }
}
