//! CLI integration tests against a mock backend.

mod common;

use serde_json::{Value, json};
use tempfile::TempDir;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use std::time::Duration;

use common::{Line, jwt_expiring_in, run_cli, run_cli_success, spawn_cli, stored_entries};

async fn mount_login(server: &MockServer, access: &str) {
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/login"))
        .and(body_json(json!({
            "email": "admin@unicorn.test",
            "password": "hunter2"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accessToken": access,
            "refreshToken": "refresh-1",
            "user": {
                "id": "6f1c2a9e",
                "email": "admin@unicorn.test",
                "role": "ADMIN",
                "status": "ACTIVE",
                "displayName": "Ada Admin"
            }
        })))
        .mount(server)
        .await;
}

const LOGIN_ARGS: [&str; 5] = [
    "login",
    "--email",
    "admin@unicorn.test",
    "--password",
    "hunter2",
];

#[tokio::test(flavor = "multi_thread")]
async fn login_stores_session_and_whoami_reads_it() {
    let server = MockServer::start().await;
    let access = jwt_expiring_in(3600);
    mount_login(&server, &access).await;
    let data_dir = TempDir::new().unwrap();

    let stdout = run_cli_success(&LOGIN_ARGS, data_dir.path(), &server.uri());
    assert!(stdout.contains("Logged in as Ada Admin"), "{stdout}");

    let entries = stored_entries(data_dir.path()).expect("session file written");
    assert_eq!(entries["token"], access.as_str());
    assert_eq!(entries["refreshToken"], "refresh-1");
    assert!(entries["user"].as_str().unwrap().contains("6f1c2a9e"));

    let stdout = run_cli_success(&["whoami"], data_dir.path(), &server.uri());
    assert!(stdout.contains("Ada Admin"));
    assert!(stdout.contains("ADMIN"));
    assert!(stdout.contains("in 59m") || stdout.contains("in 1h0m"), "{stdout}");
}

#[tokio::test(flavor = "multi_thread")]
async fn whoami_json_output() {
    let server = MockServer::start().await;
    mount_login(&server, &jwt_expiring_in(3600)).await;
    let data_dir = TempDir::new().unwrap();

    run_cli_success(&LOGIN_ARGS, data_dir.path(), &server.uri());
    let stdout = run_cli_success(&["whoami", "--json"], data_dir.path(), &server.uri());

    let value: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(value["user"]["id"], "6f1c2a9e");
    assert_eq!(value["user"]["displayName"], "Ada Admin");
    assert!(value["expiresAt"].is_string());
}

#[tokio::test(flavor = "multi_thread")]
async fn login_with_bad_password_stores_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/login"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "status": 401,
            "error": "Unauthorized",
            "message": "Bad credentials"
        })))
        .mount(&server)
        .await;
    let data_dir = TempDir::new().unwrap();

    let output = run_cli(&LOGIN_ARGS, data_dir.path(), &server.uri());
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Failed to login"), "{stderr}");
    assert!(stored_entries(data_dir.path()).is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn logout_clears_session_and_is_idempotent() {
    let server = MockServer::start().await;
    mount_login(&server, &jwt_expiring_in(3600)).await;
    let data_dir = TempDir::new().unwrap();

    run_cli_success(&LOGIN_ARGS, data_dir.path(), &server.uri());

    let stdout = run_cli_success(&["logout"], data_dir.path(), &server.uri());
    assert!(stdout.contains("Logged out"));
    assert!(stored_entries(data_dir.path()).is_none());

    let stdout = run_cli_success(&["logout"], data_dir.path(), &server.uri());
    assert!(stdout.contains("No active session"));

    let output = run_cli(&["whoami"], data_dir.path(), &server.uri());
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("No active session"));
}

#[tokio::test(flavor = "multi_thread")]
async fn refresh_replaces_access_token() {
    let server = MockServer::start().await;
    mount_login(&server, &jwt_expiring_in(3600)).await;
    let renewed = jwt_expiring_in(7200);
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/refresh-token"))
        .and(body_json(json!({ "token": "refresh-1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accessToken": renewed,
            "refreshToken": "refresh-2"
        })))
        .expect(1)
        .mount(&server)
        .await;
    let data_dir = TempDir::new().unwrap();

    run_cli_success(&LOGIN_ARGS, data_dir.path(), &server.uri());
    let stdout = run_cli_success(&["refresh"], data_dir.path(), &server.uri());
    assert!(stdout.contains("Session refreshed"));

    let entries = stored_entries(data_dir.path()).unwrap();
    assert_eq!(entries["token"], renewed.as_str());
    assert_eq!(entries["refreshToken"], "refresh-2");
    assert!(entries["user"].as_str().unwrap().contains("Ada Admin"));
}

#[tokio::test(flavor = "multi_thread")]
async fn refresh_without_session_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/refresh-token"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let data_dir = TempDir::new().unwrap();

    let output = run_cli(&["refresh"], data_dir.path(), &server.uri());
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("No active session"));
}

#[tokio::test(flavor = "multi_thread")]
async fn rejected_refresh_keeps_stored_session() {
    let server = MockServer::start().await;
    let access = jwt_expiring_in(3600);
    mount_login(&server, &access).await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/refresh-token"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    let data_dir = TempDir::new().unwrap();

    run_cli_success(&LOGIN_ARGS, data_dir.path(), &server.uri());
    let output = run_cli(&["refresh"], data_dir.path(), &server.uri());
    assert!(!output.status.success());

    let entries = stored_entries(data_dir.path()).unwrap();
    assert_eq!(entries["token"], access.as_str());
}

#[test]
fn invalid_api_url_is_reported() {
    let data_dir = TempDir::new().unwrap();
    let output = run_cli(&["whoami"], data_dir.path(), "http://dashboard.unicorn.test");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Invalid API URL"));
}

#[tokio::test(flavor = "multi_thread")]
async fn watch_reports_login_from_another_process() {
    let server = MockServer::start().await;
    let access = jwt_expiring_in(3600);
    mount_login(&server, &access).await;
    let data_dir = TempDir::new().unwrap();

    let watcher = spawn_cli(&["watch", "--json"], data_dir.path(), &server.uri());
    watcher.wait_for(Duration::from_secs(10), |line| {
        matches!(line, Line::Stderr(text) if text.contains("Press Ctrl+C to stop."))
    });

    run_cli_success(&LOGIN_ARGS, data_dir.path(), &server.uri());

    let Line::Stdout(text) = watcher.wait_for(Duration::from_secs(10), |line| {
        matches!(line, Line::Stdout(text) if text.contains(r#""event":"synced""#))
    }) else {
        unreachable!()
    };
    let event: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(event["user"], "6f1c2a9e");
    assert!(event["expiresAt"].is_string());
}
