//! Integration tests for the `fieldmap config` commands.
//!
//! These run the built binary against temporary config files. No network
//! access is needed.

use std::fs;
use std::process::{Command, Output};

use tempfile::TempDir;

/// Run a CLI command and capture output.
fn run_cli(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_fieldmap"))
        .args(args)
        .output()
        .expect("Failed to execute CLI command")
}

/// Assert a command succeeded.
fn assert_success(output: &Output, context: &str) {
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        panic!("{} failed:\nstdout: {}\nstderr: {}", context, stdout, stderr);
    }
}

#[test]
fn test_show_defaults() {
    let output = run_cli(&["config", "show", "--defaults"]);
    assert_success(&output, "config show --defaults");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("[map]"));
    assert!(stdout.contains("default_zoom = 13"));
    assert!(stdout.contains("interval_secs = 300"));
}

#[test]
fn test_init_then_show() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let path = temp.path().join("config.ini");
    let path_str = path.to_str().unwrap();

    let output = run_cli(&["config", "init", "--config", path_str]);
    assert_success(&output, "config init");
    assert!(path.exists());

    let output = run_cli(&["config", "show", "--config", path_str]);
    assert_success(&output, "config show");
    assert!(String::from_utf8_lossy(&output.stdout).contains("[refresh]"));
}

#[test]
fn test_init_refuses_to_overwrite() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let path = temp.path().join("config.ini");
    fs::write(&path, "[map]\nfix_zoom = 18\n").unwrap();
    let path_str = path.to_str().unwrap();

    let output = run_cli(&["config", "init", "--config", path_str]);
    assert!(!output.status.success());
    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "[map]\nfix_zoom = 18\n"
    );

    let output = run_cli(&["config", "init", "--config", path_str, "--force"]);
    assert_success(&output, "config init --force");
    assert!(fs::read_to_string(&path).unwrap().contains("fix_zoom = 16"));
}

#[test]
fn test_invalid_value_exits_with_hint() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let path = temp.path().join("config.ini");
    fs::write(&path, "[map]\ndefault_latitude = 123\n").unwrap();

    let output = run_cli(&["config", "show", "--config", path.to_str().unwrap()]);
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("default_latitude"));
    assert!(stderr.contains("config show --defaults"));
}
