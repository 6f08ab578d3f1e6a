#[path = "common/mod.rs"]
mod common;

use std::fs;

use assert_cmd::Command;
use common::Fixture;
use predicates::boolean::PredicateBooleanExt;
use predicates::str::contains;
use tempfile::tempdir;

#[test]
fn render_writes_both_configs_without_starting_anything() {
    let temp = tempdir().expect("failed to create tempdir");
    let dir = temp.path();
    let started = dir.join("started");
    let fixture = Fixture::new(
        dir,
        &format!("touch {}", started.display()),
        &format!("touch {}", started.display()),
    );

    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("tandem"));
    cmd.arg("render")
        .arg("--config")
        .arg(fixture.config_path())
        .assert()
        .success()
        .stdout(contains("app:").and(contains("proxy:")));

    let socket = fixture.endpoint().display().to_string();
    assert_eq!(
        fs::read_to_string(dir.join("app.conf")).unwrap(),
        format!("listen = {socket}\n")
    );
    let proxy = fs::read_to_string(dir.join("proxy.conf")).unwrap();
    assert!(!proxy.contains("{{sock}}"));
    assert_eq!(proxy.matches(&socket).count(), 2);
    assert!(dir.join("logs/proxy").is_dir());
    assert!(!started.exists());
}

#[test]
fn missing_template_fails_before_launch() {
    let temp = tempdir().expect("failed to create tempdir");
    let dir = temp.path();
    let started = dir.join("started");
    let fixture = Fixture::new(
        dir,
        &format!("touch {}", started.display()),
        &format!("touch {}", started.display()),
    );
    fs::remove_file(dir.join("proxy.conf.tpl")).unwrap();

    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("tandem"));
    cmd.arg("run")
        .arg("--config")
        .arg(fixture.config_path())
        .assert()
        .failure()
        .stdout(contains("Failed to read template"));

    assert!(!started.exists());
}

#[test]
fn invalid_config_is_rejected() {
    let temp = tempdir().expect("failed to create tempdir");
    let config = temp.path().join("tandem.yaml");
    fs::write(&config, "probe:\n  interval: soon\n").unwrap();

    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("tandem"));
    cmd.arg("run")
        .arg("-c")
        .arg(&config)
        .assert()
        .failure()
        .stdout(contains("Invalid duration value"));
}

#[test]
fn missing_config_file_is_rejected() {
    let temp = tempdir().expect("failed to create tempdir");

    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("tandem"));
    cmd.arg("render")
        .arg("-c")
        .arg(temp.path().join("absent.yaml"))
        .assert()
        .failure()
        .stdout(contains("Failed to read config file"));
}
