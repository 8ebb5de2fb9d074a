//! Exit status and error banner of the `pfield` binary.

use std::process::Command;

use pfield_test_utils::ParamsBuilder;
use serde_json::json;
use tempfile::TempDir;

fn pfield() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_pfield"));
    cmd.env("RUST_LOG", "warn");
    cmd
}

#[test]
fn successful_run_exits_zero_and_checkpoints() {
    let dir = TempDir::new().unwrap();
    let params = ParamsBuilder::new()
        .steps(0.01, 3)
        .scalar("u", "EXPLICIT_TIME_DEPENDENT", json!({ "model": "frozen" }))
        .set("output", json!({ "directory": dir.path() }))
        .to_json();
    let path = dir.path().join("parameters.json");
    std::fs::write(&path, params).unwrap();

    let out = pfield().arg(&path).arg("--threads").arg("1").output().unwrap();
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert!(dir.path().join("checkpoint-00000003.pfck").exists());

    let out = pfield().arg(&path).arg("--restart").output().unwrap();
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
}

#[test]
fn missing_parameter_file_prints_banner_and_exits_one() {
    let dir = TempDir::new().unwrap();
    let out = pfield()
        .arg(dir.path().join("absent.json"))
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("Exception on processing:"), "{stderr}");
    assert!(stderr.contains("Aborting!"));
}

#[test]
fn invalid_parameters_exit_one() {
    let dir = TempDir::new().unwrap();
    let params = ParamsBuilder::new().without("time").to_json();
    let path = dir.path().join("parameters.json");
    std::fs::write(&path, params).unwrap();
    let out = pfield().arg(&path).output().unwrap();
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("time"));
}
