use super::document::{import_document, DocumentError};
use super::state::{CanvasState, FieldValues, NodeRole, Selection};
use crate::shared::fs_atomic::{atomic_write_json, remove_if_exists};
use crate::shared::logging::EventLog;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const SESSION_FORMAT_VERSION: u32 = 2;

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("failed to read session {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write session {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid session json in {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("session {path} embeds an invalid configuration: {source}")]
    Document {
        path: String,
        #[source]
        source: DocumentError,
    },
    #[error("session {path} uses unsupported format version {version}")]
    UnsupportedVersion { path: String, version: u64 },
    #[error("session {path} has an unrecognized shape")]
    UnrecognizedShape { path: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedSession {
    pub session_id: Option<String>,
    pub state: CanvasState,
    /// True when the file was in an older shape and has been upgraded in memory.
    pub migrated: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionEnvelope {
    version: u32,
    #[serde(default)]
    session_id: Option<String>,
    #[serde(default)]
    saved_at: Option<String>,
    #[serde(default)]
    fingerprint: Option<String>,
    state: PersistedState,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedState {
    #[serde(default)]
    selected_source: Selection,
    #[serde(default)]
    selected_transform: Selection,
    #[serde(default)]
    selected_destination: Selection,
    #[serde(default)]
    node_values: PersistedNodeValues,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    transform_by_type: Option<BTreeMap<String, BTreeMap<String, String>>>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PersistedNodeValues {
    #[serde(default)]
    source: BTreeMap<String, String>,
    #[serde(default)]
    destination: BTreeMap<String, String>,
    #[serde(default)]
    transform: BTreeMap<String, String>,
}

impl PersistedState {
    fn from_state(state: &CanvasState) -> Self {
        Self {
            selected_source: state.selection(NodeRole::Source).clone(),
            selected_transform: state.selection(NodeRole::Transform).clone(),
            selected_destination: state.selection(NodeRole::Destination).clone(),
            node_values: PersistedNodeValues {
                source: state.values(NodeRole::Source).as_map().clone(),
                destination: state.values(NodeRole::Destination).as_map().clone(),
                transform: state.values(NodeRole::Transform).as_map().clone(),
            },
            transform_by_type: Some(
                state
                    .transform_by_type()
                    .iter()
                    .map(|(kind, values)| (kind.clone(), values.as_map().clone()))
                    .collect(),
            ),
        }
    }

    /// Returns the state and whether defaults had to be filled in.
    fn into_state(self) -> (CanvasState, bool) {
        let transform_key = self
            .selected_transform
            .wire_name(NodeRole::Transform)
            .to_string();
        let migrated = self.transform_by_type.is_none();
        let mut by_type: BTreeMap<String, FieldValues> = self
            .transform_by_type
            .unwrap_or_default()
            .into_iter()
            .map(|(kind, values)| (kind, values.into_iter().collect()))
            .collect();
        if !self.node_values.transform.is_empty() && !by_type.contains_key(&transform_key) {
            by_type.insert(
                transform_key,
                self.node_values.transform.into_iter().collect(),
            );
        }
        let state = CanvasState::from_parts(
            [
                self.selected_source,
                self.selected_transform,
                self.selected_destination,
            ],
            self.node_values.source.into_iter().collect(),
            self.node_values.destination.into_iter().collect(),
            by_type,
        );
        (state, migrated)
    }
}

/// File-backed canvas session. One JSON document holds the whole state.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
    log: EventLog,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>, log: EventLog) -> Self {
        Self {
            path: path.into(),
            log,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<LoadedSession>, PersistenceError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(PersistenceError::Read {
                    path: self.display_path(),
                    source,
                })
            }
        };
        let value: Value =
            serde_json::from_str(&raw).map_err(|source| PersistenceError::Parse {
                path: self.display_path(),
                source,
            })?;
        let loaded = self.migrate(value)?;
        if loaded.migrated {
            self.log.info(
                "session_migrated",
                &[("path", json!(self.display_path()))],
            );
        }
        self.log.info(
            "session_restored",
            &[
                ("path", json!(self.display_path())),
                ("fingerprint", json!(loaded.state.fingerprint())),
            ],
        );
        Ok(Some(loaded))
    }

    pub fn save(&self, session_id: &str, state: &CanvasState) -> Result<(), PersistenceError> {
        let fingerprint = state.fingerprint();
        let envelope = SessionEnvelope {
            version: SESSION_FORMAT_VERSION,
            session_id: Some(session_id.to_string()),
            saved_at: Some(chrono::Utc::now().to_rfc3339()),
            fingerprint: Some(fingerprint.clone()),
            state: PersistedState::from_state(state),
        };
        atomic_write_json(&self.path, &envelope).map_err(|source| PersistenceError::Write {
            path: self.display_path(),
            source,
        })?;
        self.log.info(
            "session_persisted",
            &[
                ("session_id", json!(session_id)),
                ("fingerprint", json!(fingerprint)),
            ],
        );
        Ok(())
    }

    /// Forgets the persisted session so the next load starts from scratch.
    pub fn start_fresh(&self) -> Result<(), PersistenceError> {
        let removed = remove_if_exists(&self.path).map_err(|source| PersistenceError::Write {
            path: self.display_path(),
            source,
        })?;
        self.log.info(
            "session_reset",
            &[
                ("path", json!(self.display_path())),
                ("removed", json!(removed)),
            ],
        );
        Ok(())
    }

    fn migrate(&self, value: Value) -> Result<LoadedSession, PersistenceError> {
        if let Some(version) = value.get("version").and_then(Value::as_u64) {
            if version > u64::from(SESSION_FORMAT_VERSION) {
                return Err(PersistenceError::UnsupportedVersion {
                    path: self.display_path(),
                    version,
                });
            }
            let envelope: SessionEnvelope =
                serde_json::from_value(value).map_err(|source| PersistenceError::Parse {
                    path: self.display_path(),
                    source,
                })?;
            let stored_fingerprint = envelope.fingerprint.clone();
            let (state, filled_defaults) = envelope.state.into_state();
            if let Some(stored) = stored_fingerprint {
                if stored != state.fingerprint() {
                    self.log.warn(
                        "session_fingerprint_mismatch",
                        &[("path", json!(self.display_path()))],
                    );
                }
            }
            return Ok(LoadedSession {
                session_id: envelope.session_id,
                migrated: filled_defaults || version < u64::from(SESSION_FORMAT_VERSION),
                state,
            });
        }

        let document = value
            .get("configuration")
            .filter(|configuration| configuration.get("nodes").is_some())
            .or_else(|| value.get("nodes").map(|_| &value));
        if let Some(document) = document {
            let state = import_document(document).map_err(|source| PersistenceError::Document {
                path: self.display_path(),
                source,
            })?;
            return Ok(LoadedSession {
                session_id: None,
                state,
                migrated: true,
            });
        }

        let is_legacy_state = [
            "selectedSource",
            "selectedTransform",
            "selectedDestination",
            "nodeValues",
        ]
        .iter()
        .any(|key| value.get(key).is_some());
        if is_legacy_state {
            let legacy: PersistedState =
                serde_json::from_value(value).map_err(|source| PersistenceError::Parse {
                    path: self.display_path(),
                    source,
                })?;
            let (state, _) = legacy.into_state();
            return Ok(LoadedSession {
                session_id: None,
                state,
                migrated: true,
            });
        }

        Err(PersistenceError::UnrecognizedShape {
            path: self.display_path(),
        })
    }

    fn display_path(&self) -> String {
        self.path.display().to_string()
    }
}
