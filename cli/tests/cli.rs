//! Runs the binary against a throwaway config directory. None of these
//! commands reach a MongoDB server.

use std::process::{Command, Output};

use serde_json::Value;
use tempfile::TempDir;

fn agent_mongo(config_home: &TempDir, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_agent-mongo"))
        .args(args)
        .env("XDG_CONFIG_HOME", config_home.path())
        .env("AGENT_MONGO_DISABLE_KEYRING", "1")
        .env_remove("AGENT_MONGO_CONNECTION")
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

fn stdout_json(output: &Output) -> Value {
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    serde_json::from_slice(&output.stdout).unwrap()
}

fn stderr_error(output: &Output) -> String {
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    let envelope: Value = serde_json::from_slice(&output.stderr).unwrap();
    envelope["error"].as_str().unwrap().to_string()
}

#[test]
fn test_config_round_trip() {
    let home = TempDir::new().unwrap();

    let set = stdout_json(&agent_mongo(&home, &["config", "set", "query.timeout", "5000"]));
    assert_eq!(set, serde_json::json!({ "ok": true, "key": "query.timeout", "value": 5000 }));

    let get = stdout_json(&agent_mongo(&home, &["config", "get", "query.timeout"]));
    assert_eq!(get["value"], 5000);
    assert_eq!(get["default"], 30000);

    let on_disk = std::fs::read_to_string(home.path().join("agent-mongo").join("config.json")).unwrap();
    assert!(on_disk.ends_with('\n'));

    let err = stderr_error(&agent_mongo(&home, &["config", "set", "query.timeout", "10"]));
    assert_eq!(err, "\"query.timeout\" minimum is 1000. Got: 10");
}

#[test]
fn test_write_stages_rejected_before_connecting() {
    let home = TempDir::new().unwrap();
    let err = stderr_error(&agent_mongo(
        &home,
        &["query", "aggregate", "shop", "orders", r#"[{"$match":{}},{"$out":"copy"}]"#],
    ));
    assert!(err.contains("$out"));
    assert!(err.contains("read-only"));
}

#[test]
fn test_missing_connection_is_reported() {
    let home = TempDir::new().unwrap();
    let err = stderr_error(&agent_mongo(&home, &["query", "find", "shop", "orders"]));
    assert!(err.starts_with("No connection specified. Available: (none)."));
}

#[test]
fn test_connection_and_credential_management() {
    let home = TempDir::new().unwrap();

    let added = stdout_json(&agent_mongo(
        &home,
        &["credential", "add", "acme", "--username", "deploy", "--password", "s3cret"],
    ));
    assert_eq!(added["storage"], "inline");

    let added = stdout_json(&agent_mongo(
        &home,
        &["connection", "add", "prod", "mongodb://db.example.net/orders", "--credential", "acme"],
    ));
    assert_eq!(added["isDefault"], true);
    assert_eq!(added["database"], "orders");

    let err = stderr_error(&agent_mongo(&home, &["credential", "remove", "acme"]));
    assert!(err.contains("used by connections: prod"));

    let listed = stdout_json(&agent_mongo(&home, &["credential", "list"]));
    assert_eq!(listed["credentials"][0]["password"], "***");

    let removed = stdout_json(&agent_mongo(&home, &["credential", "remove", "acme", "--force"]));
    assert_eq!(removed["clearedFrom"], serde_json::json!(["prod"]));

    let connections = stdout_json(&agent_mongo(&home, &["connection", "list"]));
    assert_eq!(connections["connections"][0]["alias"], "prod");
    assert!(connections["connections"][0].get("credential").is_none());
}

#[test]
fn test_usage_is_plain_text() {
    let home = TempDir::new().unwrap();
    let output = agent_mongo(&home, &["query", "usage"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).starts_with("query - Document retrieval"));
}
