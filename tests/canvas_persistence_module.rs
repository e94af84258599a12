use pipewright::canvas::{
    ConfigStore, NodeRole, PersistenceError, Selection, SessionStore, SESSION_FORMAT_VERSION,
};
use pipewright::shared::logging::EventLog;
use serde_json::Value;
use std::fs;
use std::path::Path;

fn log_events(path: &Path) -> Vec<Value> {
    fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(|line| serde_json::from_str(line).expect("json line"))
        .collect()
}

fn event_names(events: &[Value]) -> Vec<String> {
    events
        .iter()
        .filter_map(|event| event["event"].as_str().map(str::to_string))
        .collect()
}

#[test]
fn saved_sessions_carry_version_fingerprint_and_id() {
    let temp = tempfile::tempdir().expect("tempdir");
    let log_path = temp.path().join("logs/pipewright.log");
    let store = SessionStore::new(
        temp.path().join("session.json"),
        EventLog::to_file(&log_path),
    );

    let mut canvas = ConfigStore::new();
    canvas.select_node(NodeRole::Source, Selection::named("Stripe"));
    canvas.set_field(NodeRole::Source, "apiKey", "sk_live_1");
    store.save("s-42", canvas.state()).expect("save");

    let raw: Value =
        serde_json::from_str(&fs::read_to_string(store.path()).expect("read")).expect("json");
    assert_eq!(raw["version"], u64::from(SESSION_FORMAT_VERSION));
    assert_eq!(raw["sessionId"], "s-42");
    assert_eq!(raw["fingerprint"], canvas.state().fingerprint());
    assert_eq!(raw["state"]["selectedSource"], "Stripe");
    assert_eq!(raw["state"]["selectedDestination"], Value::Null);
    assert_eq!(raw["state"]["nodeValues"]["source"]["apiKey"], "sk_live_1");

    let loaded = store.load().expect("load").expect("session");
    assert_eq!(&loaded.state, canvas.state());

    let events = log_events(&log_path);
    assert_eq!(event_names(&events), vec!["session_persisted", "session_restored"]);
    assert_eq!(events[0]["session_id"], "s-42");
}

#[test]
fn older_envelopes_are_reported_as_migrated() {
    let temp = tempfile::tempdir().expect("tempdir");
    let log_path = temp.path().join("events.log");
    let store = SessionStore::new(temp.path().join("session.json"), EventLog::to_file(&log_path));
    fs::write(
        store.path(),
        r#"{
  "version": 1,
  "sessionId": "old",
  "state": {
    "selectedSource": "Dummy Source",
    "selectedTransform": "Cleanse",
    "selectedDestination": "Google BigQuery",
    "nodeValues": { "destination": { "projectId": "acme-analytics" } },
    "transformByType": {}
  }
}"#,
    )
    .expect("seed");

    let loaded = store.load().expect("load").expect("session");
    assert!(loaded.migrated);
    assert_eq!(loaded.session_id.as_deref(), Some("old"));
    assert!(loaded.state.selection(NodeRole::Source).is_unselected());
    assert_eq!(
        loaded.state.values(NodeRole::Destination).get("projectId"),
        Some("acme-analytics")
    );
    assert!(event_names(&log_events(&log_path)).contains(&"session_migrated".to_string()));
}

#[test]
fn tampered_sessions_still_load_but_are_flagged() {
    let temp = tempfile::tempdir().expect("tempdir");
    let log_path = temp.path().join("events.log");
    let store = SessionStore::new(temp.path().join("session.json"), EventLog::to_file(&log_path));

    let mut canvas = ConfigStore::new();
    canvas.select_node(NodeRole::Destination, Selection::named("Webhook"));
    store.save("s-1", canvas.state()).expect("save");

    let mut raw: Value =
        serde_json::from_str(&fs::read_to_string(store.path()).expect("read")).expect("json");
    raw["state"]["nodeValues"]["destination"]["webhookUrl"] =
        Value::String("https://hooks.example.com".to_string());
    fs::write(store.path(), raw.to_string()).expect("tamper");

    let loaded = store.load().expect("load").expect("session");
    assert_eq!(
        loaded.state.values(NodeRole::Destination).get("webhookUrl"),
        Some("https://hooks.example.com")
    );
    let events = log_events(&log_path);
    let mismatch = events
        .iter()
        .find(|event| event["event"] == "session_fingerprint_mismatch")
        .expect("mismatch warning");
    assert_eq!(mismatch["level"], "warn");
}

#[test]
fn corrupt_and_invalid_files_surface_typed_errors() {
    let temp = tempfile::tempdir().expect("tempdir");
    let store = SessionStore::new(temp.path().join("session.json"), EventLog::disabled());

    fs::write(store.path(), "{ truncated").expect("seed");
    assert!(matches!(store.load(), Err(PersistenceError::Parse { .. })));

    fs::write(
        store.path(),
        r#"{"nodes": {"source": {"name": "Stripe", "credentials": {}}}}"#,
    )
    .expect("seed");
    match store.load() {
        Err(PersistenceError::Document { source, .. }) => {
            assert!(source.to_string().contains("nodes.destination"));
        }
        other => panic!("expected document error, got {other:?}"),
    }

    store.start_fresh().expect("fresh");
    assert!(!store.path().exists());
    store.start_fresh().expect("fresh twice");
}
