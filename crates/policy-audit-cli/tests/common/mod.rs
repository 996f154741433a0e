#![allow(dead_code)]

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use serde_json::{json, Value};
use std::fs;
use std::path::PathBuf;
use std::process::Output;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

pub const QUERY_PATH: &str = "/services/data/v52.0/query";

/// Matches query requests whose `q` parameter contains the given text.
pub struct SoqlContains(pub &'static str);

impl Match for SoqlContains {
    fn matches(&self, request: &Request) -> bool {
        request
            .url
            .query_pairs()
            .any(|(k, v)| k == "q" && v.contains(self.0))
    }
}

pub struct TestEnv {
    _tmp: TempDir,
    pub config: PathBuf,
    pub cache_dir: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let tmp = TempDir::new().expect("create temp dir");
        let config = tmp.path().join("config.json");
        let cache_dir = tmp.path().join("data");
        Self {
            _tmp: tmp,
            config,
            cache_dir,
        }
    }

    pub fn write_config(&self, url: &str) {
        self.write_raw_config(&json!({
            "salesforce": {
                "salesforceUrl": url,
                "clientId": "cid",
                "clientSecret": "csecret",
                "clientUserName": "auditor@example.com",
                "clientPassword": "pass",
                "version": "v52.0"
            }
        }));
    }

    pub fn write_raw_config(&self, doc: &Value) {
        fs::write(&self.config, doc.to_string()).expect("write config");
    }

    pub fn write_snapshot(&self, name: &str, doc: &Value) {
        fs::create_dir_all(&self.cache_dir).expect("create cache dir");
        fs::write(self.cache_dir.join(name), doc.to_string()).expect("write snapshot");
    }

    pub fn read_snapshot(&self, name: &str) -> Value {
        let path = self.cache_dir.join(name);
        let text = fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("{} missing: {e}", path.display()));
        serde_json::from_str(&text).expect("snapshot is JSON")
    }

    /// `policy-audit <subcommand> --config .. --cache-dir .. <args>`
    pub fn cmd(&self, subcommand: &str, args: &[&str]) -> Command {
        let mut cmd = cargo_bin_cmd!("policy-audit");
        cmd.env("RUST_LOG", "warn")
            .env_remove("POLICY_AUDIT_CONFIG")
            .env_remove("POLICY_AUDIT_CACHE_DIR")
            .env_remove("POLICY_AUDIT_TIMEOUT")
            .env_remove("POLICY_AUDIT_MAX_RETRIES")
            .arg(subcommand)
            .arg("--config")
            .arg(&self.config)
            .arg("--cache-dir")
            .arg(&self.cache_dir)
            .args(args);
        cmd
    }

    /// Run off the async runtime so the mock server keeps serving.
    pub async fn run(&self, subcommand: &str, args: &[&str]) -> Output {
        let mut cmd = self.cmd(subcommand, args);
        tokio::task::spawn_blocking(move || cmd.output().expect("spawn policy-audit"))
            .await
            .expect("join command")
    }
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

pub fn result_set(records: Value) -> Value {
    let total = records.as_array().map(|a| a.len()).unwrap_or(0);
    json!({"totalSize": total, "done": true, "records": records})
}

pub async fn mount_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/services/oauth2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token_type": "Bearer",
            "access_token": "tok",
            "instance_url": server.uri(),
        })))
        .mount(server)
        .await;
}

pub async fn mount_query(server: &MockServer, soql: &'static str, body: Value) {
    Mock::given(method("GET"))
        .and(path(QUERY_PATH))
        .and(SoqlContains(soql))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

pub fn listing_row(id: &str, year: &str, policy: &str, partner: &str) -> Value {
    json!({
        "Id": id,
        "Rally_Launch_Year__c": year,
        "Primary_Policy_Number__c": policy,
        "Partner_Name__c": partner
    })
}

pub fn implementation(id: &str, year: &str, affiliations: Value) -> Value {
    json!({
        "Id": id,
        "Rally_Launch_Year__c": year,
        "Client_Affiliations__r": result_set(affiliations)
    })
}
