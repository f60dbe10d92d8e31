// CLI integration tests. Nothing here starts containers.

use anyhow::Result;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::TempDir;

/// Runs `devenv` with all state rooted in a temporary directory. The compose
/// command is `true`, so the environment always reads as stopped.
struct CliTestFixture {
    temp_dir: TempDir,
}

impl CliTestFixture {
    fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let config_dir = temp_dir.path().join("config");
        fs::create_dir_all(&config_dir)?;
        fs::write(config_dir.join("settings.yaml"), "compose_command: \"true\"\n")?;
        Ok(Self { temp_dir })
    }

    fn cmd(&self) -> Result<Command> {
        let mut cmd = Command::cargo_bin("devenv")?;
        cmd.env("DEVENV_HOME", self.temp_dir.path())
            .env("LOG_OUTPUT", "off")
            .env_remove("RUST_LOG");
        Ok(cmd)
    }

    fn run(&self, args: &[&str]) -> Result<std::process::Output> {
        Ok(self.cmd()?.args(args).output()?)
    }

    fn compose_path(&self) -> PathBuf {
        self.temp_dir.path().join("docker").join("docker-compose.yml")
    }

    fn project_dir(&self, slug: &str) -> PathBuf {
        self.temp_dir.path().join("docker").join("projects").join(slug)
    }

    fn state_path(&self) -> PathBuf {
        self.temp_dir.path().join("config").join("state.json")
    }
}

fn stdout(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

#[test]
fn test_project_add_and_list_json() -> Result<()> {
    let fixture = CliTestFixture::new()?;

    fixture
        .cmd()?
        .args(["project", "add", "My Shop", "-e", "APP_ENV=local"])
        .assert()
        .success();

    let output = fixture.run(&["project", "list", "--json"])?;
    assert!(output.status.success());
    let projects: serde_json::Value = serde_json::from_str(&stdout(&output))?;
    assert_eq!(projects[0]["name"], "My Shop");
    assert_eq!(projects[0]["slug"], "my-shop");
    assert_eq!(projects[0]["url"], "my-shop.localhost");
    assert_eq!(projects[0]["environment"]["APP_ENV"], "local");
    assert!(fixture.state_path().exists());
    Ok(())
}

#[test]
fn test_duplicate_project_is_rejected() -> Result<()> {
    let fixture = CliTestFixture::new()?;
    fixture.cmd()?.args(["project", "add", "shop"]).assert().success();

    fixture
        .cmd()?
        .args(["project", "add", "shop"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
    Ok(())
}

#[test]
fn test_generate_orders_services_by_dependency() -> Result<()> {
    let fixture = CliTestFixture::new()?;
    fixture
        .cmd()?
        .args(["service", "add", "cache", "--image", "redis:7", "--depends-on", "db"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));

    fixture
        .cmd()?
        .args(["service", "add", "db", "--image", "postgres:16", "-p", "5432:5432"])
        .assert()
        .success();
    fixture
        .cmd()?
        .args(["service", "add", "cache", "--image", "redis:7", "-d", "db"])
        .assert()
        .success();
    fixture.cmd()?.args(["project", "add", "shop"]).assert().success();
    fixture
        .cmd()?
        .args(["project", "attach", "shop", "cache"])
        .assert()
        .success();
    let saved = fs::read_to_string(fixture.compose_path())?;

    let output = fixture.run(&["config", "generate"])?;
    assert!(output.status.success());
    let yaml = stdout(&output);
    let db = yaml.find("\n  db:").expect("db service");
    let cache = yaml.find("\n  cache:").expect("cache service");
    let shop = yaml.find("\n  project-shop:").expect("project container");
    assert!(db < cache && cache < shop);
    assert!(yaml.contains("postgres:16"));

    // Generating never writes the document.
    assert_eq!(fs::read_to_string(fixture.compose_path())?, saved);
    Ok(())
}

#[test]
fn test_self_dependency_fails() -> Result<()> {
    let fixture = CliTestFixture::new()?;
    fixture
        .cmd()?
        .args(["service", "add", "db", "--image", "postgres", "-d", "db"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("db -> db"));

    let output = fixture.run(&["service", "list", "--json"])?;
    assert_eq!(stdout(&output).trim(), "[]");
    Ok(())
}

#[test]
fn test_update_creating_cycle_fails() -> Result<()> {
    let fixture = CliTestFixture::new()?;
    fixture
        .cmd()?
        .args(["service", "add", "db", "--image", "postgres"])
        .assert()
        .success();
    fixture
        .cmd()?
        .args(["service", "add", "api", "--image", "node", "-d", "db"])
        .assert()
        .success();

    fixture
        .cmd()?
        .args(["service", "update", "db", "--image", "postgres", "-d", "api"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cycle"));
    Ok(())
}

#[test]
fn test_remove_service_with_dependents_fails() -> Result<()> {
    let fixture = CliTestFixture::new()?;
    fixture
        .cmd()?
        .args(["service", "add", "db", "--image", "postgres"])
        .assert()
        .success();
    fixture
        .cmd()?
        .args(["service", "add", "api", "--image", "node", "-d", "db"])
        .assert()
        .success();

    fixture
        .cmd()?
        .args(["service", "remove", "db"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("api"));
    Ok(())
}

#[test]
fn test_catalog_and_instantiate() -> Result<()> {
    let fixture = CliTestFixture::new()?;

    fixture
        .cmd()?
        .args(["service", "catalog"])
        .assert()
        .success()
        .stdout(predicate::str::contains("mysql8").and(predicate::str::contains("mailhog")));

    fixture
        .cmd()?
        .args(["service", "instantiate", "redis"])
        .assert()
        .success();
    fixture
        .cmd()?
        .args(["service", "instantiate", "redis"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
    fixture
        .cmd()?
        .args(["service", "instantiate", "oracle"])
        .assert()
        .failure();

    let output = fixture.run(&["service", "list", "--json"])?;
    let services: serde_json::Value = serde_json::from_str(&stdout(&output))?;
    assert_eq!(services[0]["name"], "redis");
    assert_eq!(services[0]["global"], true);
    Ok(())
}

#[test]
fn test_rename_project_updates_url() -> Result<()> {
    let fixture = CliTestFixture::new()?;
    fixture.cmd()?.args(["project", "add", "shop"]).assert().success();
    fixture
        .cmd()?
        .args(["project", "rename", "shop", "Web Store"])
        .assert()
        .success();

    let output = fixture.run(&["project", "list", "--json"])?;
    let projects: serde_json::Value = serde_json::from_str(&stdout(&output))?;
    assert_eq!(projects.as_array().map(Vec::len), Some(1));
    assert_eq!(projects[0]["url"], "web-store.localhost");
    assert!(fixture.project_dir("web-store").join("index.html").exists());
    assert!(!fixture.project_dir("shop").exists());
    Ok(())
}

#[test]
fn test_save_exists_and_reset() -> Result<()> {
    let fixture = CliTestFixture::new()?;
    fixture
        .cmd()?
        .args(["config", "exists"])
        .assert()
        .success()
        .stdout("false\n");

    fixture.cmd()?.args(["project", "add", "shop"]).assert().success();
    fixture.cmd()?.args(["config", "save"]).assert().success();
    assert!(fixture.compose_path().exists());

    // Project changes rewrite an existing document.
    fixture.cmd()?.args(["project", "add", "blog"]).assert().success();
    let written = fs::read_to_string(fixture.compose_path())?;
    assert!(written.contains("project-blog"));

    fixture
        .cmd()?
        .args(["config", "reset"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--yes"));
    assert!(fixture.compose_path().exists());

    fixture
        .cmd()?
        .args(["config", "reset", "--yes"])
        .assert()
        .success();
    assert!(!fixture.compose_path().exists());
    assert!(!fixture.state_path().exists());
    assert!(!fixture.project_dir("shop").exists());

    let output = fixture.run(&["project", "list", "--json"])?;
    assert_eq!(stdout(&output).trim(), "[]");
    Ok(())
}

#[test]
fn test_status_without_document_is_stopped() -> Result<()> {
    let fixture = CliTestFixture::new()?;
    fixture
        .cmd()?
        .args(["env", "status"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("stopped"));
    Ok(())
}

#[test]
fn test_malformed_env_pair_fails() -> Result<()> {
    let fixture = CliTestFixture::new()?;
    fixture
        .cmd()?
        .args(["project", "add", "shop", "-e", "NOPE"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("KEY=VALUE"));
    Ok(())
}
