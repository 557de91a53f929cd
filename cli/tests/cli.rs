//! End-to-end runs of the `tcli` binary against the mock server.
//!
//! Every command gets a private config directory so a developer's real
//! config file never leaks into the run.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use tempfile::TempDir;

/// Bind the mock server to a random port and serve it from a background thread.
fn start_server(api_key: Option<&str>) -> String {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();
    let api_key = api_key.map(str::to_string);

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener, api_key).await
        })
        .unwrap();
    });

    format!("http://{addr}")
}

fn closed_port_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

struct Env {
    home: TempDir,
    base_url: Option<String>,
    api_key: Option<String>,
}

impl Env {
    fn new(base_url: Option<String>) -> Self {
        Self {
            home: TempDir::new().unwrap(),
            base_url,
            api_key: None,
        }
    }

    fn tcli(&self, args: &[&str]) -> Command {
        let mut cmd = Command::cargo_bin("tcli").unwrap();
        cmd.args(args)
            .env("HOME", self.home.path())
            .env("XDG_CONFIG_HOME", self.home.path().join("config"))
            .env_remove("TAPI_URL")
            .env_remove("TAPI_KEY")
            .env_remove("TAPI_TIMEOUT")
            .env_remove("RUST_LOG");
        if let Some(url) = &self.base_url {
            cmd.env("TAPI_URL", url);
        }
        if let Some(key) = &self.api_key {
            cmd.env("TAPI_KEY", key);
        }
        cmd
    }

    /// Run with `--json` and parse stdout.
    fn json(&self, args: &[&str]) -> Value {
        let mut full = args.to_vec();
        full.push("--json");
        let output = self.tcli(&full).assert().success().get_output().stdout.clone();
        serde_json::from_slice(&output).unwrap()
    }

    /// Run with `--json`, expect failure, and parse the error from stderr.
    fn json_error(&self, args: &[&str]) -> Value {
        let mut full = args.to_vec();
        full.push("--json");
        let output = self.tcli(&full).assert().failure().get_output().stderr.clone();
        let value: Value = serde_json::from_slice(&output).unwrap();
        value["error"].clone()
    }
}

#[test]
fn todo_lifecycle() {
    let env = Env::new(Some(start_server(None)));

    let created = env.json(&["create", "Write quarterly report", "-p", "2", "--tags", "q3", "--work"]);
    assert_eq!(created["title"], "Write quarterly report");
    assert_eq!(created["priority"], 2);
    assert_eq!(created["tags"], serde_json::json!(["q3", "work"]));
    assert_eq!(created["status"], "todo");
    let id = created["id"].as_str().unwrap().to_string();

    env.json(&["add", "--title", "Buy milk", "--due-at", "2025-06-01"]);

    let fetched = env.json(&["get", &id]);
    assert_eq!(fetched, created);

    let updated = env.json(&["update", &id, "--priority", "1", "--description", "numbers"]);
    assert_eq!(updated["priority"], 1);
    assert_eq!(updated["description"], "numbers");
    assert_eq!(updated["title"], "Write quarterly report");

    let cleared = env.json(&["edit", "quarterly", "--description", ""]);
    assert!(cleared["description"].is_null());

    let done = env.json(&["done", "quarterly"]);
    assert_eq!(done["status"], "done");

    let open = env.json(&["list"]);
    let titles: Vec<&str> = open.as_array().unwrap().iter().map(|t| t["title"].as_str().unwrap()).collect();
    assert_eq!(titles, vec!["Buy milk"]);
    assert_eq!(env.json(&["list", "--all"]).as_array().unwrap().len(), 2);
    assert_eq!(env.json(&["list", "--status", "done"]).as_array().unwrap().len(), 1);

    env.tcli(&["delete", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("deleted"));

    env.tcli(&["get", &id])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn table_output_is_plain_when_piped() {
    let env = Env::new(Some(start_server(None)));
    env.tcli(&["create", "Water plants"]).assert().success();

    env.tcli(&[])
        .assert()
        .success()
        .stdout(predicate::str::contains("Water plants"))
        .stdout(predicate::str::contains("Priority"))
        .stdout(predicate::str::contains("\u{1b}[").not());
}

#[test]
fn empty_list_says_so() {
    let env = Env::new(Some(start_server(None)));
    env.tcli(&["list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No todos found."));
}

#[test]
fn server_validation_errors_are_rendered_per_field() {
    let env = Env::new(Some(start_server(None)));
    let long_title = "x".repeat(300);

    let error = env.json_error(&["create", &long_title]);
    assert_eq!(error["kind"], "validation");
    assert_eq!(error["fields"][0]["field"], "title");

    env.tcli(&["create", &long_title])
        .assert()
        .failure()
        .stderr(predicate::str::contains("validation failed: title"))
        .stderr(predicate::str::contains("\u{1b}[").not());
}

#[test]
fn local_validation_never_reaches_the_network() {
    // Any request would fail with a transport error instead.
    let env = Env::new(Some(closed_port_url()));

    assert_eq!(env.json_error(&["list", "--limit", "5000"])["kind"], "validation");
    assert_eq!(env.json_error(&["create", "x", "--priority", "9"])["fields"][0]["field"], "priority");
    assert_eq!(env.json_error(&["create", "x", "--due-at", "someday"])["kind"], "invalid_input");
    assert_eq!(env.json_error(&["update", "x"])["message"], "validation failed: no fields to update");
    assert_eq!(env.json_error(&["get", "not-a-uuid"])["kind"], "invalid_input");
}

#[test]
fn unreachable_server_is_a_retryable_failure() {
    let env = Env::new(Some(closed_port_url()));
    let error = env.json_error(&["health"]);
    assert_eq!(error["kind"], "transport");
    assert_eq!(error["retryable"], true);
}

#[test]
fn ambiguous_title_fails_without_a_terminal() {
    let env = Env::new(Some(start_server(None)));
    env.tcli(&["create", "Report draft"]).assert().success();
    env.tcli(&["create", "Report final"]).assert().success();

    let error = env.json_error(&["delete", "report"]);
    assert_eq!(error["kind"], "ambiguous");
    assert_eq!(error["candidates"].as_array().unwrap().len(), 2);

    assert_eq!(env.json_error(&["delete", "zzzz"])["kind"], "no_match");
}

#[test]
fn api_key_comes_from_the_environment() {
    let mut env = Env::new(Some(start_server(Some("sesame"))));

    let error = env.json_error(&["list"]);
    assert_eq!(error["kind"], "auth");

    env.api_key = Some("sesame".to_string());
    assert!(env.json(&["list"]).as_array().unwrap().is_empty());
}

#[test]
fn config_init_then_show() {
    let env = Env::new(None);

    let written = env.json(&["config", "init", "--base-url", "http://todo.example:9000", "--api-key", "secret-1234"]);
    let path = written["written"].as_str().unwrap().to_string();
    assert!(path.ends_with("config.yaml"));

    let shown = env.json(&["config", "show"]);
    assert_eq!(shown["base_url"], "http://todo.example:9000");
    assert_eq!(shown["api_key"], "****1234");
    assert_eq!(shown["config_file_exists"], true);

    env.tcli(&["config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
    env.tcli(&["config", "init", "--force"]).assert().success();
    assert_eq!(env.json(&["config", "show"])["api_key"], Value::Null);
}

#[test]
fn environment_overrides_config_file() {
    let env = Env::new(Some("http://from-env:1".to_string()));
    env.json(&["config", "init", "--base-url", "http://from-file:2"]);
    assert_eq!(env.json(&["config", "show"])["base_url"], "http://from-env:1");
}

#[test]
fn explicit_config_path_is_used() {
    let env = Env::new(None);
    let file = env.home.path().join("custom.yaml");
    std::fs::write(&file, "api:\n  base_url: http://custom:3\n  timeout_seconds: 5\n").unwrap();
    let file = file.to_str().unwrap();

    let shown = env.json(&["config", "show", "--config", file]);
    assert_eq!(shown["base_url"], "http://custom:3");
    assert_eq!(shown["timeout_seconds"], 5);
}

#[test]
fn malformed_config_file_is_reported() {
    let env = Env::new(None);
    let file = env.home.path().join("broken.yaml");
    std::fs::write(&file, "api: [unclosed\n").unwrap();

    let error = env.json_error(&["list", "--config", file.to_str().unwrap()]);
    assert_eq!(error["kind"], "config");
}

#[cfg(unix)]
#[test]
fn unrelated_non_utf8_variable_is_ignored() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let env = Env::new(None);
    let output = env
        .tcli(&["config", "show", "--json"])
        .env("UNRELATED_VAR", OsStr::from_bytes(b"caf\xe9"))
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let shown: Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(shown["base_url"], "http://localhost:8000");
}
