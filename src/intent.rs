//! Free-text intent parsing and autocomplete.
//!
//! Both collaborators are plain `text -> guess` transforms from the caller's
//! point of view. A remote model may back them, but the local matcher must
//! always be able to answer on its own.

pub mod local;
pub mod remote;
pub mod sequencing;

pub use local::LocalIntentParser;
pub use remote::RemoteIntentParser;
pub use sequencing::{Debouncer, RequestSequencer, RequestToken};

use crate::canvas::{BatchUpdate, NodeRole, NodeUpdate, Selection};
use crate::shared::logging::EventLog;
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum IntentError {
    #[error("intent request failed: {0}")]
    Request(String),
    #[error("intent response was invalid: {0}")]
    Response(String),
}

/// Best guess of the three node names. Every name is a catalog name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentGuess {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub transform: Option<String>,
    #[serde(default)]
    pub destination: Option<String>,
}

impl IntentGuess {
    pub fn get(&self, role: NodeRole) -> Option<&str> {
        match role {
            NodeRole::Source => self.source.as_deref(),
            NodeRole::Transform => self.transform.as_deref(),
            NodeRole::Destination => self.destination.as_deref(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_none() && self.transform.is_none() && self.destination.is_none()
    }

    /// One batch that selects every guessed node at once.
    pub fn to_batch_update(&self) -> BatchUpdate {
        let mut batch = BatchUpdate::default();
        for role in crate::canvas::NODE_ORDER {
            if let Some(name) = self.get(role) {
                batch.set(role, NodeUpdate::select(Selection::named(name)));
            }
        }
        batch
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionKind {
    Connector,
    Transform,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub name: String,
    pub kind: SuggestionKind,
    pub score: f32,
}

pub trait IntentParser: Send + Sync {
    fn parse_intent(&self, text: &str) -> Result<IntentGuess, IntentError>;
    fn suggest(&self, partial: &str, limit: usize) -> Result<Vec<Suggestion>, IntentError>;
}

/// Tries the primary parser and answers locally whenever it fails.
pub struct FallbackIntentParser {
    primary: Option<Box<dyn IntentParser>>,
    local: LocalIntentParser,
    log: EventLog,
}

impl FallbackIntentParser {
    pub fn new(
        primary: Option<Box<dyn IntentParser>>,
        local: LocalIntentParser,
        log: EventLog,
    ) -> Self {
        Self {
            primary,
            local,
            log,
        }
    }

    pub fn local_only(local: LocalIntentParser) -> Self {
        Self::new(None, local, EventLog::disabled())
    }

    fn note_fallback(&self, operation: &str, err: &IntentError) {
        self.log.warn(
            "intent_fallback",
            &[
                ("operation", json!(operation)),
                ("error", json!(err.to_string())),
            ],
        );
    }
}

impl IntentParser for FallbackIntentParser {
    fn parse_intent(&self, text: &str) -> Result<IntentGuess, IntentError> {
        if let Some(primary) = &self.primary {
            match primary.parse_intent(text) {
                Ok(guess) => return Ok(guess),
                Err(err) => self.note_fallback("parse_intent", &err),
            }
        }
        self.local.parse_intent(text)
    }

    fn suggest(&self, partial: &str, limit: usize) -> Result<Vec<Suggestion>, IntentError> {
        if let Some(primary) = &self.primary {
            match primary.suggest(partial, limit) {
                Ok(suggestions) => return Ok(suggestions),
                Err(err) => self.note_fallback("suggest", &err),
            }
        }
        self.local.suggest(partial, limit)
    }
}
