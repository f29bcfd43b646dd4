#![allow(clippy::unwrap_used)]
//! CLI smoke tests to verify basic command functionality.
//!
//! Every test points `XDG_CONFIG_HOME` at a temporary directory so the
//! user's real settings are never read or written.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

#[allow(deprecated)]
fn chatline(config_home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("chatline").unwrap();
    cmd.env("XDG_CONFIG_HOME", config_home.path());
    cmd.env_remove("CHATLINE_LOG");
    cmd
}

#[test]
fn test_help_displays_usage() {
    let home = TempDir::new().unwrap();
    chatline(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Chat with LLM backends"))
        .stdout(predicate::str::contains("services"))
        .stdout(predicate::str::contains("--verbose"));
}

#[test]
fn test_version_displays_version() {
    let home = TempDir::new().unwrap();
    chatline(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_services_lists_every_backend() {
    let home = TempDir::new().unwrap();
    chatline(&home)
        .arg("services")
        .assert()
        .success()
        .stdout(predicate::str::contains("Ollama"))
        .stdout(predicate::str::contains("OpenAI"))
        .stdout(predicate::str::contains("AzureOpenAI"))
        .stdout(predicate::str::contains("Google"))
        .stdout(predicate::str::contains("Mistral"))
        .stdout(predicate::str::contains("https://api.mistral.ai/v1"));
}

#[test]
fn test_config_path_uses_xdg_config_home() {
    let home = TempDir::new().unwrap();
    let expected = home.path().join("chatline").join("config.json");
    chatline(&home)
        .args(["config", "--path"])
        .assert()
        .success()
        .stdout(predicate::str::contains(expected.display().to_string()));
}

#[test]
fn test_config_writes_defaults_on_first_run() {
    let home = TempDir::new().unwrap();
    chatline(&home)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("Ollama"));

    let written = home.path().join("chatline").join("config.json");
    assert!(written.exists());
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(written).unwrap()).unwrap();
    assert_eq!(json["history"], 6);
}

#[test]
fn test_config_replaces_corrupt_file() {
    let home = TempDir::new().unwrap();
    let dir = home.path().join("chatline");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("config.json"), "{ not json").unwrap();

    chatline(&home).arg("config").assert().success();

    let content = std::fs::read_to_string(dir.join("config.json")).unwrap();
    assert!(serde_json::from_str::<serde_json::Value>(&content).is_ok());
}

#[test]
fn test_unknown_subcommand_fails() {
    let home = TempDir::new().unwrap();
    chatline(&home)
        .arg("translate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}
