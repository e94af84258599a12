use crate::canvas::{
    export_document, sanitize_credential_value, CanvasState, ConfigStore, NodeRole, Selection,
    SessionStore, StoreEvent, NODE_ORDER,
};
use crate::catalog::Catalog;
use crate::collection::{
    create_collection_plan, get_next_step, process_input, CollectionLedger, CollectionStep,
    ProcessResult, StepKind,
};
use crate::intent::IntentParser;
use crate::progress::{progress_snapshot, ProgressSnapshot};
use crate::shared::logging::EventLog;
use crate::status::{node_status, NodeStatus};
use serde::Serialize;
use serde_json::json;
use std::sync::mpsc::Receiver;
use std::sync::Arc;

pub const CHAT_EXIT_COMMANDS: &[&str] = &["/exit", "exit", "quit"];

const HELP_TEXT: &str = "Describe your pipeline (\"move orders from Shopify to Snowflake\") \
or answer the current question. Commands: /status shows progress, /export prints the \
configuration JSON, /set <role> <field> = <value> edits a node directly, /use <role> <name> \
picks a connector, /reset starts over, /exit quits.";

pub fn is_chat_exit_command(message: &str) -> bool {
    CHAT_EXIT_COMMANDS
        .iter()
        .any(|command| message.trim().eq_ignore_ascii_case(command))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    Assistant,
    User,
    System,
}

impl Speaker {
    pub fn label(self) -> &'static str {
        match self {
            Self::Assistant => "assistant",
            Self::User => "you",
            Self::System => "system",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub speaker: Speaker,
    pub text: String,
}

impl ChatMessage {
    fn assistant(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Assistant,
            text: text.into(),
        }
    }

    fn system(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::System,
            text: text.into(),
        }
    }
}

/// One node box on the canvas strip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeView {
    pub role: NodeRole,
    pub name: String,
    pub status: NodeStatus,
    pub mandatory_filled: usize,
    pub mandatory_total: usize,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanvasView {
    pub nodes: Vec<NodeView>,
}

/// Conversational surface over the config store and the collection
/// orchestrator. The active question is always re-derived from the live
/// canvas, so answers and direct canvas edits can interleave freely.
pub struct ChatSession {
    session_id: String,
    catalog: Catalog,
    store: ConfigStore,
    ledger: CollectionLedger,
    intent: Arc<dyn IntentParser>,
    persistence: Option<SessionStore>,
    log: EventLog,
    active_step: Option<CollectionStep>,
}

impl ChatSession {
    pub fn new(
        session_id: impl Into<String>,
        catalog: Catalog,
        intent: Arc<dyn IntentParser>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            catalog,
            store: ConfigStore::new(),
            ledger: CollectionLedger::new(),
            intent,
            persistence: None,
            log: EventLog::disabled(),
            active_step: None,
        }
    }

    pub fn with_log(mut self, log: EventLog) -> Self {
        self.log = log;
        self
    }

    pub fn with_state(mut self, state: CanvasState) -> Self {
        self.store = ConfigStore::with_state(state);
        self
    }

    pub fn with_persistence(mut self, persistence: SessionStore) -> Self {
        self.persistence = Some(persistence);
        self
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn state(&self) -> &CanvasState {
        self.store.state()
    }

    pub fn intent_parser(&self) -> Arc<dyn IntentParser> {
        Arc::clone(&self.intent)
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub fn subscribe(&mut self) -> Receiver<StoreEvent> {
        self.store.subscribe()
    }

    pub fn current_step(&self) -> Option<&CollectionStep> {
        self.active_step.as_ref()
    }

    pub fn progress(&self) -> ProgressSnapshot {
        progress_snapshot(self.store.state(), &self.catalog)
    }

    pub fn canvas_view(&self) -> CanvasView {
        let state = self.store.state();
        let active = self.active_step.as_ref().map(|step| step.node);
        let nodes = NODE_ORDER
            .iter()
            .map(|role| {
                let selection = state.selection(*role);
                let mandatory = self.catalog.mandatory_fields(*role, selection);
                NodeView {
                    role: *role,
                    name: selection.wire_name(*role).to_string(),
                    status: node_status(state, &self.catalog, *role),
                    mandatory_filled: state.values(*role).filled_count(mandatory),
                    mandatory_total: mandatory.len(),
                    is_active: active == Some(*role),
                }
            })
            .collect();
        CanvasView { nodes }
    }

    pub fn export_json(&self) -> Result<String, String> {
        export_document(self.store.state())
            .to_json_pretty()
            .map_err(|err| err.to_string())
    }

    /// Greeting plus the first outstanding question.
    pub fn opening_messages(&mut self) -> Vec<ChatMessage> {
        self.log.info(
            "session_started",
            &[
                ("session_id", json!(self.session_id)),
                ("pristine", json!(self.store.state().is_pristine())),
            ],
        );
        let mut messages = vec![ChatMessage::assistant(if self.store.state().is_pristine() {
            "Let's build a pipeline. Tell me where the data comes from and where it should go, \
             for example \"move orders from Shopify to Snowflake\"."
                .to_string()
        } else {
            format!(
                "Welcome back. Your pipeline is {:.0}% configured.",
                self.progress().total
            )
        })];
        match self.refresh() {
            Ok(()) => messages.extend(self.prompt_for_active_step()),
            Err(message) => messages.push(ChatMessage::system(message)),
        }
        messages
    }

    pub fn handle_message(&mut self, text: &str) -> Vec<ChatMessage> {
        let trimmed = text.trim();
        if let Some(command) = trimmed.strip_prefix('/') {
            return self.handle_command(command);
        }

        if self.store.state().is_pristine() && !trimmed.is_empty() {
            if let Some(messages) = self.try_intent(trimmed) {
                return messages;
            }
        }

        let Some(step) = self.active_step.clone() else {
            return vec![ChatMessage::assistant(
                "Your pipeline is fully configured. Use /export to see it or /reset to start over.",
            )];
        };

        // Field answers get the same cleaning an imported document does.
        let answer = match step.kind {
            StepKind::NodeName => trimmed.to_string(),
            StepKind::MandatoryField | StepKind::OptionalField => sanitize_credential_value(trimmed),
        };
        match process_input(&answer, &step, &self.catalog) {
            ProcessResult::Rejected { message } => {
                self.log.info(
                    "answer_rejected",
                    &[
                        ("node", json!(step.node)),
                        ("field", json!(step.field)),
                        ("message", json!(message)),
                    ],
                );
                vec![ChatMessage::assistant(message)]
            }
            ProcessResult::Skipped => {
                self.ledger.record_skip(&step);
                self.log.info(
                    "step_skipped",
                    &[("node", json!(step.node)), ("field", json!(step.field))],
                );
                let mut messages = vec![ChatMessage::assistant(format!(
                    "Skipped {}.",
                    step.field.as_deref().unwrap_or("that")
                ))];
                messages.extend(self.advance_after(&step));
                messages
            }
            ProcessResult::Applied { update } => {
                self.store.apply_update(&update);
                self.ledger.record_completed(&step);
                self.log.info(
                    "answer_applied",
                    &[("node", json!(step.node)), ("update", json!(update))],
                );
                let mut messages = vec![ChatMessage::assistant(acknowledgement(
                    &step,
                    self.store.state(),
                ))];
                messages.extend(self.persist());
                messages.extend(self.advance_after(&step));
                messages
            }
        }
    }

    /// A value typed straight into a canvas node.
    pub fn apply_canvas_edit(
        &mut self,
        role: NodeRole,
        field: &str,
        value: &str,
    ) -> Vec<ChatMessage> {
        let value = sanitize_credential_value(value);
        if !self.store.set_field(role, field, &value) {
            return Vec::new();
        }
        self.log.info(
            "canvas_edited",
            &[("node", json!(role)), ("field", json!(field))],
        );
        self.after_canvas_change()
    }

    /// A connector picked straight on the canvas.
    pub fn select_on_canvas(&mut self, role: NodeRole, selection: Selection) -> Vec<ChatMessage> {
        if !self.store.select_node(role, selection) {
            return Vec::new();
        }
        self.log.info(
            "canvas_selected",
            &[
                ("node", json!(role)),
                ("name", json!(self.store.state().selection(role).wire_name(role))),
            ],
        );
        self.after_canvas_change()
    }

    fn after_canvas_change(&mut self) -> Vec<ChatMessage> {
        let previous = self.active_step.as_ref().map(question_key);
        let mut messages = vec![ChatMessage::system("Canvas updated.")];
        messages.extend(self.persist());
        if let Err(message) = self.refresh() {
            messages.push(ChatMessage::system(message));
            return messages;
        }
        if self.active_step.as_ref().map(question_key) != previous {
            messages.extend(self.prompt_for_active_step());
        }
        messages
    }

    fn handle_command(&mut self, command: &str) -> Vec<ChatMessage> {
        let (verb, rest) = command
            .trim()
            .split_once(char::is_whitespace)
            .unwrap_or((command.trim(), ""));
        match verb.to_ascii_lowercase().as_str() {
            "reset" => self.reset(),
            "set" => self.canvas_set_command(rest),
            "use" => self.canvas_use_command(rest),
            "status" => vec![ChatMessage::assistant(self.status_summary())],
            "export" => match self.export_json() {
                Ok(json) => vec![ChatMessage::assistant(json)],
                Err(err) => vec![ChatMessage::system(format!("export failed: {err}"))],
            },
            "help" => vec![ChatMessage::assistant(HELP_TEXT)],
            other => vec![ChatMessage::system(format!(
                "unknown command `/{other}`; try /help"
            ))],
        }
    }

    /// `/set <role> <field> = <value>`, the terminal stand-in for a canvas input widget.
    fn canvas_set_command(&mut self, rest: &str) -> Vec<ChatMessage> {
        let usage = || {
            vec![ChatMessage::system(
                "usage: /set <source|transform|destination> <field> = <value>",
            )]
        };
        let Some((role, assignment)) = rest.trim().split_once(char::is_whitespace) else {
            return usage();
        };
        let Ok(role) = NodeRole::parse(role) else {
            return usage();
        };
        let Some((field, value)) = assignment.split_once('=') else {
            return usage();
        };
        let field = field.trim();
        if field.is_empty() {
            return usage();
        }
        let messages = self.apply_canvas_edit(role, field, value.trim());
        if messages.is_empty() {
            return vec![ChatMessage::system("Canvas unchanged.")];
        }
        messages
    }

    /// `/use <role> <connector>`, the terminal stand-in for picking a node on the canvas.
    fn canvas_use_command(&mut self, rest: &str) -> Vec<ChatMessage> {
        let Some((role, name)) = rest.trim().split_once(char::is_whitespace) else {
            return vec![ChatMessage::system("usage: /use <source|transform|destination> <name>")];
        };
        let Ok(role) = NodeRole::parse(role) else {
            return vec![ChatMessage::system("usage: /use <source|transform|destination> <name>")];
        };
        let Some(resolved) = crate::catalog::resolve_node_name(&self.catalog, role, name) else {
            return vec![ChatMessage::system(format!("no {role} matches \"{}\"", name.trim()))];
        };
        let messages = self.select_on_canvas(role, Selection::named(resolved));
        if messages.is_empty() {
            return vec![ChatMessage::system("Canvas unchanged.")];
        }
        messages
    }

    fn reset(&mut self) -> Vec<ChatMessage> {
        self.store.reset_store();
        self.ledger.clear();
        self.active_step = None;
        self.log.info("session_reset", &[("session_id", json!(self.session_id))]);
        let mut messages = vec![ChatMessage::assistant("Starting over with an empty canvas.")];
        if let Some(persistence) = &self.persistence {
            if let Err(err) = persistence.start_fresh() {
                self.log.error("session_reset_failed", &[("error", json!(err.to_string()))]);
                messages.push(ChatMessage::system(format!("failed to clear saved session: {err}")));
            }
        }
        match self.refresh() {
            Ok(()) => messages.extend(self.prompt_for_active_step()),
            Err(message) => messages.push(ChatMessage::system(message)),
        }
        messages
    }

    fn try_intent(&mut self, text: &str) -> Option<Vec<ChatMessage>> {
        let guess = match self.intent.parse_intent(text) {
            Ok(guess) if !guess.is_empty() => guess,
            Ok(_) => return None,
            Err(err) => {
                self.log.warn("intent_failed", &[("error", json!(err.to_string()))]);
                return None;
            }
        };
        if !self.store.batch_update_canvas(guess.to_batch_update()) {
            return None;
        }
        self.log.info("intent_applied", &[("guess", json!(guess))]);

        let picked = NODE_ORDER
            .iter()
            .filter_map(|role| guess.get(*role).map(|name| format!("{role}: {name}")))
            .collect::<Vec<_>>()
            .join(", ");
        let mut messages = vec![ChatMessage::assistant(format!("Got it. {picked}."))];
        messages.extend(self.persist());
        match self.refresh() {
            Ok(()) => messages.extend(self.prompt_for_active_step()),
            Err(message) => messages.push(ChatMessage::system(message)),
        }
        Some(messages)
    }

    fn advance_after(&mut self, completed: &CollectionStep) -> Vec<ChatMessage> {
        match get_next_step(completed, self.store.state(), &self.catalog, &self.ledger) {
            Ok(next) => {
                self.active_step = next;
                self.prompt_for_active_step()
            }
            Err(err) => {
                self.active_step = None;
                self.log.error("collection_invariant", &[("error", json!(err.to_string()))]);
                vec![ChatMessage::system(err.to_string())]
            }
        }
    }

    /// Re-derives the active question from the live canvas. While a question
    /// is open its node is finished first, the same as after a chat answer.
    pub fn refresh(&mut self) -> Result<(), String> {
        let next = match &self.active_step {
            Some(active) => get_next_step(active, self.store.state(), &self.catalog, &self.ledger),
            None => create_collection_plan(self.store.state(), &self.catalog, &self.ledger)
                .map(|plan| plan.current_step),
        };
        match next {
            Ok(step) => {
                self.active_step = step;
                Ok(())
            }
            Err(err) => {
                self.active_step = None;
                self.log.error("collection_invariant", &[("error", json!(err.to_string()))]);
                Err(err.to_string())
            }
        }
    }

    fn prompt_for_active_step(&self) -> Vec<ChatMessage> {
        match &self.active_step {
            Some(step) => {
                self.log.info(
                    "step_asked",
                    &[
                        ("node", json!(step.node)),
                        ("kind", json!(step.kind)),
                        ("field", json!(step.field)),
                    ],
                );
                vec![ChatMessage::assistant(step.question.clone())]
            }
            None => {
                self.log.info(
                    "collection_complete",
                    &[("fingerprint", json!(self.store.state().fingerprint()))],
                );
                vec![ChatMessage::assistant(format!(
                    "All set. {} Use /export to get the configuration.",
                    self.pipeline_line()
                ))]
            }
        }
    }

    fn persist(&self) -> Vec<ChatMessage> {
        let Some(persistence) = &self.persistence else {
            return Vec::new();
        };
        match persistence.save(&self.session_id, self.store.state()) {
            Ok(()) => Vec::new(),
            Err(err) => {
                self.log.error("session_persist_failed", &[("error", json!(err.to_string()))]);
                vec![ChatMessage::system(format!("failed to save session: {err}"))]
            }
        }
    }

    fn pipeline_line(&self) -> String {
        let state = self.store.state();
        NODE_ORDER
            .iter()
            .map(|role| state.selection(*role).wire_name(*role).to_string())
            .collect::<Vec<_>>()
            .join(" -> ")
    }

    pub fn status_summary(&self) -> String {
        let progress = self.progress();
        let view = self.canvas_view();
        let mut lines = vec![format!(
            "{} ({:.0}% complete)",
            self.pipeline_line(),
            progress.total
        )];
        for node in &view.nodes {
            lines.push(format!(
                "{}: {} [{}] {}/{} required fields",
                node.role, node.name, node.status, node.mandatory_filled, node.mandatory_total
            ));
        }
        if let Some(step) = &self.active_step {
            lines.push(format!("next: {}", step.question));
        }
        lines.join("\n")
    }
}

fn question_key(step: &CollectionStep) -> (NodeRole, StepKind, Option<String>) {
    (step.node, step.kind, step.field.clone())
}

fn acknowledgement(step: &CollectionStep, state: &CanvasState) -> String {
    match step.kind {
        StepKind::NodeName => format!(
            "{} selected as your {}.",
            state.selection(step.node).wire_name(step.node),
            step.node
        ),
        StepKind::MandatoryField | StepKind::OptionalField => format!(
            "Saved {}.",
            step.field.as_deref().unwrap_or("that value")
        ),
    }
}
