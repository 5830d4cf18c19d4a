//! Integration tests for the `postline config` command.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn postline(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("postline").unwrap();
    cmd.current_dir(home.path())
        .env("HOME", home.path())
        .env_remove("GEMINI_API_KEY")
        .env_remove("BLOG_DIR")
        .env_remove("POSTLINE_BASE_URL");
    cmd
}

#[test]
fn test_config_show_prints_defaults() {
    let temp_dir = TempDir::new().unwrap();

    postline(&temp_dir)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[generation]"))
        .stdout(predicate::str::contains("gemini-flash-latest"))
        .stdout(predicate::str::contains("https://tech.mdeeno.com"));
}

#[test]
fn test_config_show_applies_local_file_and_env() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join(".postlinerc"), "[site]\nbase_url = \"https://blog.example.test\"\n").unwrap();

    postline(&temp_dir)
        .env("BLOG_DIR", "/srv/site")
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("https://blog.example.test"))
        .stdout(predicate::str::contains("/srv/site"));
}

#[test]
fn test_config_show_missing_explicit_file_fails() {
    let temp_dir = TempDir::new().unwrap();

    postline(&temp_dir)
        .args(["config", "show", "--config", "missing.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing.toml"));
}

#[test]
fn test_config_init_writes_file_once() {
    let temp_dir = TempDir::new().unwrap();

    postline(&temp_dir)
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains(".postlinerc"));

    let written = fs::read_to_string(temp_dir.path().join(".postlinerc")).unwrap();
    assert!(written.contains("[publish]"));

    postline(&temp_dir)
        .args(["config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));

    postline(&temp_dir).args(["config", "init", "--force"]).assert().success();
}
