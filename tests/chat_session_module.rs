use pipewright::app::command_support::AppContext;
use pipewright::canvas::{parse_document, NodeRole};
use pipewright::chat::{run_chat_session_lines, ChatMessage, Speaker};
use pipewright::collection::StepKind;
use pipewright::config::Settings;
use pipewright::progress::ProgressStep;
use pipewright::status::NodeStatus;
use std::fs;
use std::io::Cursor;
use std::path::Path;

fn context_in(root: &Path) -> AppContext {
    AppContext::from_settings(Settings {
        state_root: Some(root.to_path_buf()),
        ..Settings::default()
    })
    .expect("context")
}

fn last_text(messages: &[ChatMessage]) -> &str {
    messages.last().map(|message| message.text.as_str()).unwrap_or("")
}

#[test]
fn a_conversation_survives_a_restart() {
    let temp = tempfile::tempdir().expect("tempdir");
    let context = context_in(temp.path());
    let mut session = context.open_session().expect("session");
    let session_id = session.session_id().to_string();

    let opening = session.opening_messages();
    assert!(last_text(&opening).starts_with("Which system should the data come from?"));

    let reply = session.handle_message("move payments from stripe to google bigquery");
    assert_eq!(
        reply[0].text,
        "Got it. source: Stripe, destination: Google BigQuery."
    );
    assert!(last_text(&reply).contains("What is the apiKey for Stripe?"));

    let reply = session.handle_message("sk_live_1");
    assert_eq!(reply[0].text, "Saved apiKey.");
    let step = session.current_step().expect("optional step");
    assert_eq!(step.kind, StepKind::OptionalField);
    assert_eq!(step.field.as_deref(), Some("accountId"));

    let reply = session.handle_message("skip");
    assert_eq!(reply[0].text, "Skipped accountId.");
    assert_eq!(
        session.current_step().map(|step| (step.node, step.kind)),
        Some((NodeRole::Transform, StepKind::NodeName))
    );

    let reply = session.handle_message("data analysis");
    assert_eq!(reply[0].text, "Data Analysis selected as your transform.");
    assert!(last_text(&reply).contains("What is the projectId for Google BigQuery?"));

    let reply = session.handle_message("/set destination projectId = acme-analytics");
    assert_eq!(reply[0].speaker, Speaker::System);
    assert_eq!(reply[0].text, "Canvas updated.");
    assert!(last_text(&reply).contains("What is the dataset for Google BigQuery?"));

    session.handle_message("warehouse");
    let view = session.canvas_view();
    assert_eq!(view.nodes[2].status, NodeStatus::Partial);
    assert_eq!(view.nodes[2].mandatory_filled, 2);
    assert!(view.nodes[2].is_active);
    drop(session);

    let mut restored = context.open_session().expect("restored session");
    assert_eq!(restored.session_id(), session_id);
    assert_eq!(
        restored.state().values(NodeRole::Destination).get("dataset"),
        Some("warehouse")
    );
    let opening = restored.opening_messages();
    assert!(opening[0].text.starts_with("Welcome back."));
    // Skips live only for the conversation that made them.
    assert!(last_text(&opening).contains("accountId"));
    let reply = restored.handle_message("no thanks");
    assert!(last_text(&reply).contains("What is the serviceAccountJson for Google BigQuery?"));

    let reply = restored.handle_message(r#"{"type": "service_account"}"#);
    assert_eq!(reply[0].text, "Saved serviceAccountJson.");
    assert_eq!(
        restored.current_step().and_then(|step| step.field.as_deref()),
        Some("location")
    );
    restored.handle_message("n/a");
    assert!(restored.current_step().is_none());
    assert_eq!(restored.progress().current_step, ProgressStep::Complete);
    assert!(restored
        .status_summary()
        .starts_with("Stripe -> Data Analysis -> Google BigQuery (100% complete)"));

    let log = fs::read_to_string(context.paths.log_path()).expect("log");
    for event in [
        "session_started",
        "intent_applied",
        "step_skipped",
        "canvas_edited",
        "session_persisted",
        "session_restored",
        "collection_complete",
    ] {
        assert!(log.contains(event), "missing {event}");
    }
}

#[test]
fn canvas_edits_elsewhere_keep_the_open_optional_question() {
    let temp = tempfile::tempdir().expect("tempdir");
    let context = context_in(temp.path());
    let mut session = context.open_session().expect("session");
    session.opening_messages();
    for answer in [
        "stripe",
        "sk_live_1",
        "skip",
        "cleanse",
        "webhook",
        "https://hooks.example.com/in",
    ] {
        session.handle_message(answer);
    }
    let open_question = |session: &pipewright::chat::ChatSession| {
        session
            .current_step()
            .map(|step| (step.node, step.kind, step.field.clone()))
    };
    let secret = Some((
        NodeRole::Destination,
        StepKind::OptionalField,
        Some("secret".to_string()),
    ));
    assert_eq!(open_question(&session), secret);

    let messages = session.apply_canvas_edit(NodeRole::Source, "accountId", "acct_1");
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].text, "Canvas updated.");
    assert_eq!(open_question(&session), secret);

    let reply = session.handle_message("whsec_1");
    assert_eq!(reply[0].text, "Saved secret.");
    assert!(session.current_step().is_none());
    assert!(last_text(&reply).starts_with("All set. Stripe -> Cleanse -> Webhook"));
}

#[test]
fn values_typed_in_chat_survive_export_and_import() {
    let temp = tempfile::tempdir().expect("tempdir");
    let context = context_in(temp.path());
    let mut session = context.open_session().expect("session");
    session.opening_messages();
    session.handle_message("stripe");

    let reply = session.handle_message("sk<live>\u{7}x");
    assert_eq!(reply[0].text, "Saved apiKey.");
    assert_eq!(
        session.state().values(NodeRole::Source).get("apiKey"),
        Some("sklivex")
    );
    session.handle_message("/set source accountId = acct<1>");
    assert_eq!(
        session.state().values(NodeRole::Source).get("accountId"),
        Some("acct1")
    );

    let exported = session.export_json().expect("export");
    let reimported = parse_document(&exported).expect("import");
    assert_eq!(&reimported, session.state());
}

#[test]
fn reset_in_chat_forgets_the_saved_session() {
    let temp = tempfile::tempdir().expect("tempdir");
    let context = context_in(temp.path());
    let mut session = context.open_session().expect("session");
    session.opening_messages();
    session.handle_message("sync from hubspot into slack");
    assert!(context.paths.session_path().exists());

    let reply = session.handle_message("/reset");
    assert_eq!(reply[0].text, "Starting over with an empty canvas.");
    assert!(session.state().is_pristine());
    assert!(!context.paths.session_path().exists());
}

#[test]
fn line_mode_drives_a_whole_session() {
    let temp = tempfile::tempdir().expect("tempdir");
    let context = context_in(temp.path());
    let mut session = context.open_session().expect("session");

    let script = "\
from shopify to webhook\n\
acme.myshopify.com\n\
shpat_1\n\
cleanse\n\
hooks.example.com\n\
https://hooks.example.com/in\n\
skip\n\
/exit\n";
    let mut output = Vec::new();
    run_chat_session_lines(&mut session, Cursor::new(script), &mut output).expect("chat");
    let transcript = String::from_utf8(output).expect("utf8");

    assert!(transcript.contains("assistant> Cleanse selected as your transform."));
    assert!(transcript.contains("webhookUrl must be a URL starting with http:// or https://"));
    assert!(transcript.contains("assistant> Skipped secret."));
    assert!(transcript.contains("assistant> All set. Shopify -> Cleanse -> Webhook"));

    let restored = context.open_session().expect("restored");
    assert_eq!(
        restored.state().values(NodeRole::Destination).get("webhookUrl"),
        Some("https://hooks.example.com/in")
    );
    assert_eq!(restored.progress().current_step, ProgressStep::Complete);
}
