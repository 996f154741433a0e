mod common;

use std::time::Duration;

use common::*;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[test]
fn version_exits_zero() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("policy-audit");
    cmd.env("RUST_LOG", "warn")
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn missing_config_file_is_config_error() {
    let env = TestEnv::new();
    env.cmd("audit", &[])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("fatal:"))
        .stderr(predicate::str::contains("config.json"));
}

#[test]
fn config_missing_field_is_config_error() {
    let env = TestEnv::new();
    env.write_raw_config(&json!({
        "salesforce": {
            "salesforceUrl": "http://127.0.0.1:9",
            "clientId": "cid",
            "clientUserName": "user",
            "clientPassword": "pass",
            "version": "v52.0"
        }
    }));

    env.cmd("fetch", &[])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("clientSecret"));
}

#[test]
fn config_empty_field_is_config_error() {
    let env = TestEnv::new();
    env.write_raw_config(&json!({
        "salesforce": {
            "salesforceUrl": "http://127.0.0.1:9",
            "clientId": "cid",
            "clientSecret": "",
            "clientUserName": "user",
            "clientPassword": "pass",
            "version": "v52.0"
        }
    }));

    env.cmd("audit", &[])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("clientSecret"));
}

#[tokio::test(flavor = "multi_thread")]
async fn rejected_credentials_exit_three() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/services/oauth2/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "authentication failure"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(QUERY_PATH))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let env = TestEnv::new();
    env.write_config(&server.uri());

    let output = env.run("audit", &[]).await;
    assert_eq!(output.status.code(), Some(3));
    assert!(stderr(&output).contains("authentication failure"));
}

#[tokio::test(flavor = "multi_thread")]
async fn listing_server_error_exits_four() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("GET"))
        .and(path(QUERY_PATH))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let env = TestEnv::new();
    env.write_config(&server.uri());

    let output = env.run("audit", &["--max-retries", "0"]).await;
    assert_eq!(output.status.code(), Some(4));
}

#[tokio::test(flavor = "multi_thread")]
async fn deadline_exceeded_exits_four() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("GET"))
        .and(path(QUERY_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(result_set(json!([])))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let env = TestEnv::new();
    env.write_config(&server.uri());

    let output = env.run("audit", &["--deadline-secs", "1"]).await;
    assert_eq!(output.status.code(), Some(4));
    assert!(stderr(&output).contains("deadline"));
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_snapshot_exits_five() {
    let server = MockServer::start().await;
    mount_token(&server).await;

    let env = TestEnv::new();
    env.write_config(&server.uri());

    let output = env.run("audit", &["--load", "-l", "3"]).await;
    assert_eq!(output.status.code(), Some(5));
    assert!(stderr(&output).contains("policies_3_none.json"));
}
