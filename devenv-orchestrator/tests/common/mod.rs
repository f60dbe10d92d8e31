use std::sync::Arc;

use devenv_config::Settings;
use devenv_core::DevEnvPaths;
use devenv_orchestrator::Environment;
use devenv_provider::mock::MockRuntime;
use tempfile::TempDir;

pub struct TestEnv {
    pub dir: TempDir,
    pub runtime: Arc<MockRuntime>,
    pub env: Arc<Environment>,
}

impl TestEnv {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let runtime = Arc::new(MockRuntime::new());
        let env = open(&dir, runtime.clone());
        Self { dir, runtime, env }
    }

    pub fn paths(&self) -> DevEnvPaths {
        DevEnvPaths::under(self.dir.path())
    }

    /// A second environment over the same directories, as a new process would see it.
    pub fn reopen(&self) -> Environment {
        self.reopen_with(Arc::new(MockRuntime::new()))
    }

    pub fn reopen_with(&self, runtime: Arc<MockRuntime>) -> Environment {
        Environment::open(self.paths(), runtime).expect("reopen environment")
    }
}

fn open(dir: &TempDir, runtime: Arc<MockRuntime>) -> Arc<Environment> {
    let env = Environment::with_settings(DevEnvPaths::under(dir.path()), Settings::default(), runtime)
        .expect("open environment");
    Arc::new(env)
}
