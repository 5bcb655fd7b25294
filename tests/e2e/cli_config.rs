//! Config command E2E tests.

use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn workspace_root() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .parent()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .unwrap_or_else(|| manifest_dir.to_path_buf())
}

fn fixture_path(relative: &str) -> PathBuf {
    workspace_root()
        .join("tests")
        .join("e2e")
        .join("fixtures")
        .join(relative)
}

fn nozzle(args: &[&str], envs: &[(&str, &str)]) -> io::Result<Output> {
    Command::new(env!("CARGO_BIN_EXE_nozzle"))
        .env_clear()
        .envs(envs.iter().copied())
        .args(args)
        .output()
}

fn json_stdout(output: &Output) -> io::Result<serde_json::Value> {
    serde_json::from_slice(&output.stdout).map_err(io::Error::other)
}

fn str_at<'a>(value: &'a serde_json::Value, pointer: &str) -> io::Result<&'a str> {
    value
        .pointer(pointer)
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| io::Error::other(format!("missing {pointer}")))
}

#[test]
fn config_check_accepts_toml_file() -> io::Result<()> {
    let path = fixture_path("nozzle.valid.toml");
    let path = path.to_string_lossy();
    let output = nozzle(&["--json", "config", "check", "--path", &path], &[])?;
    assert!(output.status.success());

    let value = json_stdout(&output)?;
    assert_eq!(str_at(&value, "/status")?, "ok");
    assert_eq!(
        value.pointer("/heartbeatRateSecs"),
        Some(&serde_json::json!(3600))
    );
    Ok(())
}

#[test]
fn config_show_redacts_the_password() -> io::Result<()> {
    let path = fixture_path("nozzle.valid.toml");
    let path = path.to_string_lossy();

    let output = nozzle(&["--json", "config", "show", "--path", &path], &[])?;
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!stdout.contains("hunter2"));
    let value = json_stdout(&output)?;
    assert_eq!(str_at(&value, "/effectiveConfig/nozzle/zone")?, "us-east1-b");

    let output = nozzle(&["config", "show", "--path", &path], &[])?;
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("status: ok\n"));
    assert!(!stdout.contains("hunter2"));
    Ok(())
}

#[test]
fn env_overrides_file_values() -> io::Result<()> {
    let path = fixture_path("nozzle.valid.toml");
    let path = path.to_string_lossy();
    let output = nozzle(
        &["--json", "config", "show", "--path", &path],
        &[("NOZZLE_ZONE", "europe-west1-c"), ("HEARTBEAT_RATE", "15")],
    )?;
    assert!(output.status.success());

    let value = json_stdout(&output)?;
    assert_eq!(
        str_at(&value, "/effectiveConfig/nozzle/zone")?,
        "europe-west1-c"
    );
    assert_eq!(
        value.pointer("/effectiveConfig/nozzle/heartbeatRateSecs"),
        Some(&serde_json::json!(15))
    );
    Ok(())
}

#[test]
fn config_from_env_only() -> io::Result<()> {
    let output = nozzle(
        &["--json", "config", "check"],
        &[
            ("FIREHOSE_ENDPOINT", "https://doppler.example.com"),
            ("FIREHOSE_SUBSCRIPTION_ID", "sub"),
            ("FIREHOSE_EVENTS_TO_STACKDRIVER_MONITORING", "ValueMetric"),
        ],
    )?;
    assert!(output.status.success());
    let value = json_stdout(&output)?;
    assert_eq!(str_at(&value, "/eventsToMonitoring/0")?, "ValueMetric");
    Ok(())
}

#[test]
fn invalid_configs_exit_with_invalid_input() -> io::Result<()> {
    for fixture in ["nozzle.no_events.json", "nozzle.bad_endpoint.json"] {
        let path = fixture_path(fixture);
        let path = path.to_string_lossy();
        let output = nozzle(&["--json", "config", "check", "--path", &path], &[])?;
        assert_eq!(output.status.code(), Some(2), "{fixture}");

        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(!stdout.contains("secret"), "{fixture}");
        let value = json_stdout(&output)?;
        assert_eq!(str_at(&value, "/status")?, "error");
        assert!(!str_at(&value, "/error/code")?.is_empty());
    }
    Ok(())
}

#[test]
fn invalid_env_value_is_rejected() -> io::Result<()> {
    let path = fixture_path("nozzle.valid.toml");
    let path = path.to_string_lossy();
    let output = nozzle(
        &["config", "check", "--path", &path],
        &[("HEARTBEAT_RATE", "soon")],
    )?;
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stdout).starts_with("status: error\n"));
    Ok(())
}

#[test]
fn info_reports_versions() -> io::Result<()> {
    let output = nozzle(&["--json", "info"], &[])?;
    assert!(output.status.success());
    let value = json_stdout(&output)?;
    assert_eq!(str_at(&value, "/build/name")?, "nozzle-cli");
    Ok(())
}
