//! The `primer` binary: exit codes and output streams

mod helpers;

use helpers::write_file;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn primer(workdir: &Path, args: &[&str]) -> Output {
    let config = workdir.join("primer.toml");
    std::fs::write(&config, "[logging]\nlevel = \"warn\"\n").unwrap();

    Command::new(env!("CARGO_BIN_EXE_primer"))
        .arg("--config")
        .arg(&config)
        .arg("--database")
        .arg(workdir.join("primer.db"))
        .args(args)
        .env_remove("RUST_LOG")
        .env_remove("PRIMER_EXTRACTOR")
        .env_remove("PRIMER_APPROVAL_THRESHOLD")
        .env_remove("PRIMER_EXPECTED_FILES")
        .output()
        .unwrap()
}

#[test]
fn test_ready_run_exits_zero() {
    let work = TempDir::new().unwrap();
    let root = TempDir::new().unwrap();
    write_file(root.path(), "README.md", "Releases must be tagged.\n");

    let output = primer(work.path(), &["run-init", "--root", root.path().to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(0), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("approval required: no"));
}

#[test]
fn test_approval_required_exits_two_and_json_is_parseable() {
    let work = TempDir::new().unwrap();
    let root = TempDir::new().unwrap();
    write_file(root.path(), ".env", "OPENAI_API_KEY=abc123\n");

    let output = primer(
        work.path(),
        &["run-init", "--root", root.path().to_str().unwrap(), "--format", "json"],
    );

    assert_eq!(output.status.code(), Some(2));
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["approvalRequired"], serde_json::json!(true));
    assert_eq!(report["securityStatus"], serde_json::json!("issues_detected"));

    let shown = primer(work.path(), &["report", "--verbose"]);
    assert_eq!(shown.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&shown.stdout).contains("credential_sanity"));
}

#[test]
fn test_missing_root_exits_one() {
    let work = TempDir::new().unwrap();
    let missing = work.path().join("nowhere");

    let output = primer(work.path(), &["run-init", "--root", missing.to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("nowhere"));
}

#[test]
fn test_report_without_runs_exits_one() {
    let work = TempDir::new().unwrap();
    let output = primer(work.path(), &["report"]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_missing_config_file_warning_is_logged() {
    let work = TempDir::new().unwrap();
    let root = TempDir::new().unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_primer"))
        .arg("--database")
        .arg(work.path().join("primer.db"))
        .args(["run-init", "--root", root.path().to_str().unwrap()])
        .env("XDG_CONFIG_HOME", work.path().join("no-config"))
        .env("HOME", work.path())
        .env("RUST_LOG", "warn")
        .env_remove("PRIMER_CONFIG")
        .env_remove("PRIMER_EXTRACTOR")
        .env_remove("PRIMER_APPROVAL_THRESHOLD")
        .env_remove("PRIMER_EXPECTED_FILES")
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(0), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(String::from_utf8_lossy(&output.stderr).contains("No configuration file found"));
}

#[test]
fn test_exclude_help_describes_directory_pruning() {
    let output = Command::new(env!("CARGO_BIN_EXE_primer"))
        .args(["run-init", "--help"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&output.stdout).contains("Directory names to prune"));
}
