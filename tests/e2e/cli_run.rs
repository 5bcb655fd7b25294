//! Run command E2E tests: envelopes in, metric lines out.

use serde_json::Value;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

fn workspace_root() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .parent()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .unwrap_or_else(|| manifest_dir.to_path_buf())
}

fn e2e_fixture(relative: &str) -> PathBuf {
    workspace_root()
        .join("tests")
        .join("e2e")
        .join("fixtures")
        .join(relative)
}

fn adapters_fixture(relative: &str) -> PathBuf {
    workspace_root()
        .join("crates")
        .join("adapters")
        .join("tests")
        .join("fixtures")
        .join(relative)
}

fn run_nozzle(
    extra: &[&Path],
    flags: &[&str],
    envs: &[(&str, &str)],
) -> io::Result<Output> {
    let mut command = Command::new(env!("CARGO_BIN_EXE_nozzle"));
    command
        .env_clear()
        .envs(envs.iter().copied())
        .arg("run")
        .arg("--config")
        .arg(e2e_fixture("nozzle.valid.toml"));
    for (flag, path) in flags.iter().zip(extra) {
        command.arg(flag).arg(path);
    }
    command.output()
}

fn json_lines(bytes: &[u8]) -> io::Result<Vec<Value>> {
    String::from_utf8_lossy(bytes)
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).map_err(io::Error::other))
        .collect()
}

fn metric<'a>(metrics: &'a [Value], name: &str) -> io::Result<&'a Value> {
    metrics
        .iter()
        .find(|metric| metric.get("name").and_then(Value::as_str) == Some(name))
        .ok_or_else(|| io::Error::other(format!("missing metric {name}")))
}

fn label<'a>(metric: &'a Value, key: &str) -> Option<&'a str> {
    metric.get("labels")?.get(key)?.as_str()
}

#[test]
fn run_emits_metrics_and_heartbeats() -> io::Result<()> {
    let envelopes = adapters_fixture("envelopes.jsonl");
    let output = run_nozzle(&[&envelopes], &["--input"], &[])?;
    assert!(output.status.success());

    let metrics = json_lines(&output.stdout)?;
    // 1 value metric + 6 container metrics + 2 counter metrics + 2 heartbeats.
    assert_eq!(metrics.len(), 11);
    assert!(
        metrics
            .iter()
            .all(|metric| metric.get("type").and_then(Value::as_str) == Some("metric"))
    );

    let cpus = metric(&metrics, "numCPUS")?;
    assert_eq!(cpus.get("value").and_then(Value::as_f64), Some(4.0));
    assert_eq!(label(cpus, "origin"), Some("rep"));
    assert_eq!(label(cpus, "job"), Some("diego_cell"));
    assert_eq!(label(cpus, "eventType"), Some("ValueMetric"));
    assert_eq!(
        cpus.get("eventTimeNanos").and_then(Value::as_i64),
        Some(1_500_000_000_000_000_000)
    );

    let total = metric(&metrics, "dropsondeListener.receivedEnvelopes.total")?;
    assert_eq!(total.get("value").and_then(Value::as_f64), Some(1005.0));

    let received = metric(&metrics, "heartbeat.nozzle.events.received")?;
    assert_eq!(received.get("value").and_then(Value::as_f64), Some(6.0));
    assert_eq!(label(received, "instance"), Some("metrics-nozzle"));
    assert_eq!(label(received, "zone"), Some("us-east1-b"));

    let unrecognized = metric(&metrics, "heartbeat.nozzle.metrics.unrecognized")?;
    assert_eq!(unrecognized.get("value").and_then(Value::as_f64), Some(1.0));

    let logs = json_lines(&output.stderr)?;
    let forwarded = logs
        .iter()
        .filter(|log| log.get("event").and_then(Value::as_str) == Some("nozzle.envelope.log"))
        .count();
    assert_eq!(forwarded, 2);
    Ok(())
}

#[test]
fn app_info_enriches_container_metrics() -> io::Result<()> {
    let envelopes = adapters_fixture("envelopes.jsonl");
    let app_info = adapters_fixture("app_info.json");
    let output = run_nozzle(
        &[&envelopes, &app_info],
        &["--input", "--app-info"],
        &[("RESOLVE_APP_METADATA", "true")],
    )?;
    assert!(output.status.success());

    let metrics = json_lines(&output.stdout)?;
    let memory = metric(&metrics, "memoryBytes")?;
    assert_eq!(
        label(memory, "applicationId"),
        Some("f47ac10b-58cc-4372-a567-0e02b2c3d479")
    );
    assert_eq!(label(memory, "appName"), Some("MyApp"));
    assert_eq!(label(memory, "orgName"), Some("MyOrg"));

    let cpus = metric(&metrics, "numCPUS")?;
    assert_eq!(label(cpus, "appName"), None);

    let output = run_nozzle(&[&envelopes, &app_info], &["--input", "--app-info"], &[])?;
    assert!(output.status.success());
    let metrics = json_lines(&output.stdout)?;
    let memory = metric(&metrics, "memoryBytes")?;
    assert_eq!(label(memory, "appName"), None);
    Ok(())
}

#[test]
fn run_reads_stdin_and_skips_bad_lines() -> io::Result<()> {
    let mut child = Command::new(env!("CARGO_BIN_EXE_nozzle"))
        .env_clear()
        .arg("run")
        .arg("--config")
        .arg(e2e_fixture("nozzle.valid.toml"))
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    {
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| io::Error::other("missing stdin"))?;
        stdin.write_all(
            b"{\"eventType\":\"ValueMetric\",\"valueMetric\":{\"name\":\"latency\",\"value\":12,\"unit\":\"ms\"}}\n\
              this is not json\n\
              \n\
              {\"eventType\":\"ValueMetric\"}\n",
        )?;
    }

    let output = child.wait_with_output()?;
    assert!(output.status.success());

    let metrics = json_lines(&output.stdout)?;
    let latency = metric(&metrics, "latency")?;
    assert_eq!(latency.get("unit").and_then(Value::as_str), Some("ms"));

    let failed = metric(&metrics, "heartbeat.nozzle.envelope.decode_failed")?;
    assert_eq!(failed.get("value").and_then(Value::as_f64), Some(2.0));

    let logs = json_lines(&output.stderr)?;
    let completed = logs
        .iter()
        .find(|log| log.get("event").and_then(Value::as_str) == Some("nozzle.run.completed"))
        .ok_or_else(|| io::Error::other("missing completion log"))?;
    assert_eq!(
        completed.pointer("/fields/decodeFailed").and_then(Value::as_u64),
        Some(2)
    );
    Ok(())
}

#[test]
fn missing_input_file_fails_with_io_exit_code() -> io::Result<()> {
    let missing = e2e_fixture("no-such-input.jsonl");
    let output = run_nozzle(&[&missing], &["--input"], &[])?;
    assert_eq!(output.status.code(), Some(3));
    assert!(String::from_utf8_lossy(&output.stdout).starts_with("status: error\n"));
    Ok(())
}

#[test]
fn run_without_config_fails_validation() -> io::Result<()> {
    let output = Command::new(env!("CARGO_BIN_EXE_nozzle"))
        .env_clear()
        .args(["--json", "run"])
        .stdin(Stdio::null())
        .output()?;
    assert_eq!(output.status.code(), Some(2));
    let value: Value = serde_json::from_slice(&output.stdout).map_err(io::Error::other)?;
    assert_eq!(value.get("status").and_then(Value::as_str), Some("error"));
    Ok(())
}
