use pipewright::app::command_handlers::{run_cli, run_cli_with_context};
use pipewright::app::command_support::AppContext;
use pipewright::config::Settings;
use std::fs;
use std::path::Path;

fn context_in(root: &Path) -> AppContext {
    AppContext::from_settings(Settings {
        state_root: Some(root.to_path_buf()),
        ..Settings::default()
    })
    .expect("context")
}

fn run(context: &AppContext, args: &[&str]) -> Result<String, String> {
    let args = args.iter().map(|arg| arg.to_string()).collect::<Vec<_>>();
    run_cli_with_context(&args, context)
}

const STRIPE_TO_WEBHOOK: &str = r#"{
  "nodes": {
    "source": { "name": "Stripe", "credentials": { "apiKey": "sk_live_1" } },
    "destination": { "name": "Webhook", "credentials": {} },
    "transform": { "name": "Cleanse", "credentials": {} }
  }
}"#;

#[test]
fn help_and_unknown_commands_need_no_state() {
    let help = run_cli(Vec::new()).expect("help");
    assert!(help.contains("Commands:"));
    assert_eq!(run_cli(vec!["--help".to_string()]), Ok(help));
    let err = run_cli(vec!["launch".to_string()]).expect_err("unknown");
    assert!(err.contains("unknown command `launch`"));
}

#[test]
fn status_on_a_fresh_state_root_shows_the_empty_pipeline() {
    let temp = tempfile::tempdir().expect("tempdir");
    let context = context_in(temp.path());

    let status = run(&context, &["status"]).expect("status");
    assert!(status.starts_with("session_id="));
    assert!(status.contains("Dummy Source -> Dummy Transform -> Dummy Destination (0% complete)"));
    assert!(status.contains("next: Which system should the data come from?"));
    assert!(!context.paths.session_path().exists());
    assert_eq!(run(&context, &["status", "extra"]), Err("usage: status".to_string()));
}

#[test]
fn import_then_status_export_and_reset() {
    let temp = tempfile::tempdir().expect("tempdir");
    let context = context_in(temp.path());
    let input = temp.path().join("pipeline.json");
    fs::write(&input, STRIPE_TO_WEBHOOK).expect("write input");

    let imported = run(&context, &["import", input.to_str().expect("utf8")]).expect("import");
    assert!(imported.starts_with("imported configuration from"));
    assert!(imported.contains("Stripe -> Cleanse -> Webhook"));
    assert!(context.paths.session_path().exists());

    let status = run(&context, &["status"]).expect("status");
    assert!(status.contains("source: Stripe [complete] 1/1 required fields"));
    assert!(status.contains("destination: Webhook [pending] 0/1 required fields"));

    let printed = run(&context, &["export"]).expect("export");
    let document: serde_json::Value = serde_json::from_str(&printed).expect("json");
    assert_eq!(document["nodes"]["source"]["credentials"]["apiKey"], "sk_live_1");

    let output = temp.path().join("out/pipeline.json");
    let written = run(&context, &["export", output.to_str().expect("utf8")]).expect("export");
    assert!(written.starts_with("exported configuration to"));
    let on_disk: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&output).expect("read")).expect("json");
    assert_eq!(on_disk, document);

    assert_eq!(run(&context, &["reset"]), Ok("session reset".to_string()));
    assert!(!context.paths.session_path().exists());
    let status = run(&context, &["status"]).expect("status");
    assert!(status.contains("(0% complete)"));

    let log = fs::read_to_string(context.paths.log_path()).expect("log");
    for event in ["configuration_imported", "configuration_exported", "session_reset"] {
        assert!(log.contains(event), "missing {event}");
    }
}

#[test]
fn invalid_imports_list_issues_and_keep_the_saved_canvas() {
    let temp = tempfile::tempdir().expect("tempdir");
    let context = context_in(temp.path());
    let good = temp.path().join("good.json");
    fs::write(&good, STRIPE_TO_WEBHOOK).expect("write");
    run(&context, &["import", good.to_str().expect("utf8")]).expect("import");
    let saved = fs::read_to_string(context.paths.session_path()).expect("session");

    let bad = temp.path().join("bad.json");
    fs::write(&bad, r#"{"nodes": {"source": {"name": "", "credentials": {}}}}"#).expect("write");
    let err = run(&context, &["import", bad.to_str().expect("utf8")]).expect_err("invalid");
    assert!(err.contains("is not a valid configuration"));
    assert!(err.contains("  - `nodes.source.name` must be a non-empty string"));
    assert!(err.contains("  - `nodes.destination` is required"));
    assert_eq!(
        fs::read_to_string(context.paths.session_path()).expect("session"),
        saved
    );

    assert_eq!(
        run(&context, &["import"]),
        Err("usage: import <path>".to_string())
    );
}

#[test]
fn catalog_lists_connectors_by_role() {
    let temp = tempfile::tempdir().expect("tempdir");
    let context = context_in(temp.path());

    let all = run(&context, &["catalog"]).expect("catalog");
    assert!(all.contains("sources:"));
    assert!(all.contains("transforms:"));
    assert!(all.contains("destinations:"));
    assert!(all.contains("no configuration needed"));

    let destinations = run(&context, &["catalog", "destination"]).expect("catalog");
    assert!(destinations.starts_with("destinations:"));
    assert!(destinations.contains("Webhook"));
    assert!(destinations.contains("required: webhookUrl; optional: secret"));
    assert!(!destinations.contains("Shopify"));

    assert!(run(&context, &["catalog", "sink"]).is_err());
}

#[test]
fn suggest_reports_the_local_guess() {
    let temp = tempfile::tempdir().expect("tempdir");
    let context = context_in(temp.path());

    let output = run(&context, &["suggest", "copy", "shopify", "orders", "into", "snowflake"])
        .expect("suggest");
    let lines = output.lines().collect::<Vec<_>>();
    assert_eq!(lines[0], "source=Shopify");
    assert_eq!(lines[1], "transform=-");
    assert_eq!(lines[2], "destination=Snowflake");

    assert_eq!(
        run(&context, &["suggest"]),
        Err("usage: suggest <text>".to_string())
    );
}
