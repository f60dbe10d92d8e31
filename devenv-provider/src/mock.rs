//! In-memory runtime for tests.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use devenv_core::error::Result;
use devenv_core::DevEnvError;

use crate::Runtime;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeCall {
    Up {
        compose_file: PathBuf,
        start_order: Vec<String>,
    },
    Down,
    IsRunning,
}

#[derive(Debug, Default)]
struct MockState {
    calls: Vec<RuntimeCall>,
    running: bool,
    fail_up: Option<String>,
    fail_down: Option<String>,
}

/// Records every call and tracks a running flag. Failures can be injected per
/// operation and stay active until cleared.
#[derive(Debug, Default)]
pub struct MockRuntime {
    state: Mutex<MockState>,
}

impl MockRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn fail_up(&self, message: Option<&str>) {
        self.state().fail_up = message.map(str::to_string);
    }

    pub fn fail_down(&self, message: Option<&str>) {
        self.state().fail_down = message.map(str::to_string);
    }

    /// Simulate containers started or stopped behind the engine's back.
    pub fn set_running(&self, running: bool) {
        self.state().running = running;
    }

    pub fn calls(&self) -> Vec<RuntimeCall> {
        self.state().calls.clone()
    }

    pub fn up_count(&self) -> usize {
        self.count(|c| matches!(c, RuntimeCall::Up { .. }))
    }

    pub fn down_count(&self) -> usize {
        self.count(|c| matches!(c, RuntimeCall::Down))
    }

    fn count(&self, pred: impl Fn(&RuntimeCall) -> bool) -> usize {
        self.state().calls.iter().filter(|c| pred(c)).count()
    }
}

impl Runtime for MockRuntime {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn up(&self, compose_file: &Path, start_order: &[String]) -> Result<()> {
        let mut state = self.state();
        state.calls.push(RuntimeCall::Up {
            compose_file: compose_file.to_path_buf(),
            start_order: start_order.to_vec(),
        });
        if let Some(message) = &state.fail_up {
            return Err(DevEnvError::Runtime(message.clone()));
        }
        state.running = true;
        Ok(())
    }

    fn down(&self, _compose_file: &Path) -> Result<()> {
        let mut state = self.state();
        state.calls.push(RuntimeCall::Down);
        if let Some(message) = &state.fail_down {
            return Err(DevEnvError::Runtime(message.clone()));
        }
        state.running = false;
        Ok(())
    }

    fn is_running(&self, _compose_file: &Path) -> Result<bool> {
        let mut state = self.state();
        state.calls.push(RuntimeCall::IsRunning);
        Ok(state.running)
    }
}
