#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::fs;
use std::process::{Command, Output};

fn brrtv(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_brrtv"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("run brrtv")
}

fn workspace() -> (tempfile::TempDir, String) {
    let dir = tempfile::tempdir().unwrap();
    let spec = dir.path().join("petstore.yaml");
    fs::write(&spec, common::PETSTORE).unwrap();
    let spec = spec.to_str().unwrap().to_string();
    (dir, spec)
}

#[test]
fn test_cli_routes_lists_operations() {
    let (_dir, spec) = workspace();
    let out = brrtv(&["routes", "--spec", &spec]);
    assert_eq!(out.status.code(), Some(0));
    let stdout = String::from_utf8(out.stdout).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(
        lines,
        vec![
            "GET /api/v3/pets",
            "POST /api/v3/pets",
            "GET /api/v3/pets/{petId}",
            "DELETE /api/v3/pets/{petId}",
        ]
    );
}

#[test]
fn test_cli_check_exit_codes() {
    let (dir, spec) = workspace();

    let good = dir.path().join("good.json");
    fs::write(
        &good,
        r#"{"request": {"method": "GET", "path": "/api/v3/pets/12"},
            "response": {"status": 200, "headers": {"content-type": "application/json"},
                         "body": {"id": 12, "name": "rex", "status": "sold"}}}"#,
    )
    .unwrap();
    let out = brrtv(&["check", "--spec", &spec, "--exchange", good.to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(0), "{}", String::from_utf8_lossy(&out.stdout));

    let bad = dir.path().join("bad.json");
    fs::write(
        &bad,
        r#"{"request": {"method": "GET", "path": "/api/v3/pets?status=lost"}}"#,
    )
    .unwrap();
    let out = brrtv(&[
        "check", "--spec", &spec, "--exchange", bad.to_str().unwrap(), "--format", "json",
    ]);
    assert_eq!(out.status.code(), Some(1));
    let errors: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(errors[0]["validationType"], "query");
    assert_eq!(errors[0]["validationSubType"], "enum");
    assert_eq!(errors[0]["parameterName"], "status");
}

#[test]
fn test_cli_input_errors_exit_two() {
    let (dir, spec) = workspace();

    let out = brrtv(&["routes", "--spec", dir.path().join("missing.yaml").to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&out.stderr).contains("failed to read OpenAPI document"));

    let garbage = dir.path().join("garbage.json");
    fs::write(&garbage, "not json").unwrap();
    let out = brrtv(&["check", "--spec", &spec, "--exchange", garbage.to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(2));
}

#[test]
fn test_cli_resolve_unknown_path() {
    let (_dir, spec) = workspace();
    let out = brrtv(&["resolve", "--spec", &spec, "--path", "/api/v3/owners"]);
    assert_eq!(out.status.code(), Some(1));
    let stdout = String::from_utf8(out.stdout).unwrap();
    assert!(stdout.contains("[retrieval]"));
}
