//! Environment lifecycle state machine.
//!
//! `Stopped -> Starting -> Running -> Stopping -> Stopped`. A failed start
//! falls back to `Stopped`, a failed stop stays `Running`; neither is retried.
//! Runtime calls block, so they run on tokio's blocking pool.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use devenv_core::error::Result;
use devenv_core::file_system::write_atomic;
use devenv_core::DevEnvError;
use devenv_provider::{ConfigurationDocument, Runtime};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvironmentState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

impl fmt::Display for EnvironmentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EnvironmentState::Stopped => "stopped",
            EnvironmentState::Starting => "starting",
            EnvironmentState::Running => "running",
            EnvironmentState::Stopping => "stopping",
        };
        f.write_str(s)
    }
}

pub struct EnvironmentController {
    runtime: Arc<dyn Runtime>,
    compose_path: PathBuf,
    state: EnvironmentState,
    state_tx: watch::Sender<EnvironmentState>,
    last_error: Option<String>,
    last_transition: Option<DateTime<Utc>>,
}

impl EnvironmentController {
    pub fn new(runtime: Arc<dyn Runtime>, compose_path: PathBuf) -> Self {
        let (state_tx, _) = watch::channel(EnvironmentState::Stopped);
        Self {
            runtime,
            compose_path,
            state: EnvironmentState::Stopped,
            state_tx,
            last_error: None,
            last_transition: None,
        }
    }

    pub fn state(&self) -> EnvironmentState {
        self.state
    }

    /// Observe state changes without holding the controller.
    pub fn subscribe(&self) -> watch::Receiver<EnvironmentState> {
        self.state_tx.subscribe()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn last_transition(&self) -> Option<DateTime<Utc>> {
        self.last_transition
    }

    pub fn compose_path(&self) -> &Path {
        &self.compose_path
    }

    pub fn runtime_name(&self) -> &'static str {
        self.runtime.name()
    }

    pub fn config_exists(&self) -> bool {
        self.compose_path.is_file()
    }

    /// Overwrite the compose document on disk.
    pub fn save(&self, content: &str) -> Result<()> {
        write_atomic(&self.compose_path, content.as_bytes())?;
        info!("Saved compose document to {}", self.compose_path.display());
        Ok(())
    }

    pub fn record_error(&mut self, message: impl Into<String>) {
        self.last_error = Some(message.into());
    }

    /// Write `document` and bring the environment up. A no-op when already
    /// running or starting.
    pub async fn start(&mut self, document: &ConfigurationDocument) -> Result<EnvironmentState> {
        if matches!(
            self.state,
            EnvironmentState::Running | EnvironmentState::Starting
        ) {
            debug!("start() while {}; nothing to do", self.state);
            return Ok(self.state);
        }

        self.transition(EnvironmentState::Starting);
        if let Err(e) = self.save(&document.content) {
            return Err(self.fail(EnvironmentState::Stopped, e));
        }

        let path = self.compose_path.clone();
        let order = document.start_order.clone();
        match self.blocking(move |rt| rt.up(&path, &order)).await {
            Ok(()) => {
                self.last_error = None;
                self.transition(EnvironmentState::Running);
                Ok(self.state)
            }
            Err(e) => Err(self.fail(EnvironmentState::Stopped, e)),
        }
    }

    /// Bring the environment down. A no-op when already stopped.
    pub async fn stop(&mut self) -> Result<EnvironmentState> {
        if self.state == EnvironmentState::Stopped {
            debug!("stop() while stopped; nothing to do");
            return Ok(self.state);
        }

        self.transition(EnvironmentState::Stopping);
        let path = self.compose_path.clone();
        match self.blocking(move |rt| rt.down(&path)).await {
            Ok(()) => {
                self.last_error = None;
                self.transition(EnvironmentState::Stopped);
                Ok(self.state)
            }
            Err(e) => Err(self.fail(EnvironmentState::Running, e)),
        }
    }

    pub async fn restart(&mut self, document: &ConfigurationDocument) -> Result<EnvironmentState> {
        info!("Restarting environment");
        if self.state != EnvironmentState::Stopped {
            self.stop().await?;
        }
        self.start(document).await
    }

    /// Align the state with what the runtime reports.
    pub async fn refresh(&mut self) -> Result<bool> {
        if !self.config_exists() {
            if self.state != EnvironmentState::Stopped {
                self.transition(EnvironmentState::Stopped);
            }
            return Ok(false);
        }

        let path = self.compose_path.clone();
        let running = self.blocking(move |rt| rt.is_running(&path)).await?;
        let observed = if running {
            EnvironmentState::Running
        } else {
            EnvironmentState::Stopped
        };
        if observed != self.state {
            info!("Runtime reports {observed}; was {}", self.state);
            self.transition(observed);
        }
        Ok(running)
    }

    fn transition(&mut self, next: EnvironmentState) {
        debug!("Environment {} -> {}", self.state, next);
        self.state = next;
        self.last_transition = Some(Utc::now());
        self.state_tx.send_replace(next);
    }

    fn fail(&mut self, fallback: EnvironmentState, err: DevEnvError) -> DevEnvError {
        warn!("Environment transition failed: {err}");
        self.last_error = Some(err.to_string());
        self.transition(fallback);
        err
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn Runtime) -> Result<T> + Send + 'static,
    {
        let runtime = Arc::clone(&self.runtime);
        tokio::task::spawn_blocking(move || f(runtime.as_ref()))
            .await
            .map_err(|e| DevEnvError::Runtime(format!("runtime task failed: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devenv_config::Service;
    use devenv_provider::generate;
    use devenv_provider::mock::MockRuntime;

    fn setup() -> (tempfile::TempDir, Arc<MockRuntime>, EnvironmentController) {
        let dir = tempfile::tempdir().unwrap();
        let runtime = Arc::new(MockRuntime::new());
        let controller = EnvironmentController::new(
            runtime.clone(),
            dir.path().join("docker").join("docker-compose.yml"),
        );
        (dir, runtime, controller)
    }

    fn document() -> ConfigurationDocument {
        let services = vec![Service::new("redis", "redis:latest").global(true)];
        generate(&services, &[] as &[devenv_config::Project]).unwrap()
    }

    #[tokio::test]
    async fn test_start_writes_document_then_runs() {
        let (_dir, runtime, mut controller) = setup();
        let doc = document();

        assert_eq!(controller.start(&doc).await.unwrap(), EnvironmentState::Running);
        assert!(controller.config_exists());
        assert_eq!(
            std::fs::read_to_string(controller.compose_path()).unwrap(),
            doc.content
        );
        assert_eq!(runtime.up_count(), 1);
    }

    #[tokio::test]
    async fn test_start_while_running_is_a_noop() {
        let (_dir, runtime, mut controller) = setup();
        let doc = document();

        controller.start(&doc).await.unwrap();
        controller.start(&doc).await.unwrap();
        assert_eq!(runtime.up_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_start_returns_to_stopped() {
        let (_dir, runtime, mut controller) = setup();
        runtime.fail_up(Some("port 80 is already allocated"));

        let err = controller.start(&document()).await.unwrap_err();
        assert!(matches!(err, DevEnvError::Runtime(_)));
        assert_eq!(controller.state(), EnvironmentState::Stopped);
        assert_eq!(
            controller.last_error(),
            Some("Runtime error: port 80 is already allocated")
        );
    }

    #[tokio::test]
    async fn test_failed_stop_stays_running() {
        let (_dir, runtime, mut controller) = setup();
        controller.start(&document()).await.unwrap();
        runtime.fail_down(Some("daemon went away"));

        assert!(controller.stop().await.is_err());
        assert_eq!(controller.state(), EnvironmentState::Running);

        runtime.fail_down(None);
        assert_eq!(controller.stop().await.unwrap(), EnvironmentState::Stopped);
        assert_eq!(controller.stop().await.unwrap(), EnvironmentState::Stopped);
        assert_eq!(runtime.down_count(), 2);
    }

    #[tokio::test]
    async fn test_restart_is_stop_then_start() {
        let (_dir, runtime, mut controller) = setup();
        let doc = document();
        controller.start(&doc).await.unwrap();

        let mut rx = controller.subscribe();
        controller.restart(&doc).await.unwrap();

        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), EnvironmentState::Running);
        assert_eq!(runtime.up_count(), 2);
        assert_eq!(runtime.down_count(), 1);
    }

    #[tokio::test]
    async fn test_refresh_follows_runtime() {
        let (_dir, runtime, mut controller) = setup();
        assert!(!controller.refresh().await.unwrap());

        controller.save(&document().content).unwrap();
        runtime.set_running(true);
        assert!(controller.refresh().await.unwrap());
        assert_eq!(controller.state(), EnvironmentState::Running);
    }
}
