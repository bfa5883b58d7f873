//! Smoke tests for the parkgate binary's argument handling

use assert_cmd::Command;
use predicates::prelude::*;

fn parkgate() -> Command {
    let mut cmd = Command::cargo_bin("parkgate").unwrap();
    for var in [
        "APP_PORT",
        "APP_HOST",
        "CLIENT_URL",
        "NODE_ENV",
        "DATABASE_URL",
        "DATABASE_MAX_CONNECTIONS",
        "DATABASE_MIGRATIONS",
        "BODY_LIMIT",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn test_help_lists_environment_fallbacks() {
    parkgate()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("CLIENT_URL"))
        .stdout(predicate::str::contains("APP_PORT"))
        .stdout(predicate::str::contains("NODE_ENV"));
}

#[test]
fn test_version() {
    parkgate()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("parkgate"));
}

#[test]
fn test_client_url_is_required() {
    parkgate()
        .args(["--database-url", "postgres://localhost/parking"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--client-url"));
}

#[test]
fn test_invalid_client_url_fails_before_binding() {
    parkgate()
        .args([
            "--client-url",
            "not a url",
            "--database-url",
            "postgres://localhost/parking",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a valid origin"));
}

#[test]
fn test_rejects_bad_port() {
    parkgate()
        .args([
            "--port",
            "not-a-port",
            "--client-url",
            "http://localhost:5173",
            "--database-url",
            "postgres://localhost/parking",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--port"));
}
