use crate::canvas::{CanvasState, SessionStore};
use crate::catalog::Catalog;
use crate::chat::ChatSession;
use crate::config::{load_global_settings, ConfigError, Settings, StatePaths};
use crate::intent::{FallbackIntentParser, IntentParser, LocalIntentParser, RemoteIntentParser};
use crate::shared::ids::new_session_id;
use crate::shared::logging::EventLog;
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

pub fn map_config_err(err: ConfigError) -> String {
    err.to_string()
}

/// Everything a command needs, resolved once from settings.
#[derive(Debug, Clone)]
pub struct AppContext {
    pub settings: Settings,
    pub paths: StatePaths,
    pub catalog: Catalog,
    pub log: EventLog,
}

impl AppContext {
    pub fn from_settings(settings: Settings) -> Result<Self, String> {
        settings.validate().map_err(map_config_err)?;
        let paths = settings.state_paths().map_err(map_config_err)?;
        let catalog = settings
            .load_catalog()
            .map_err(|err| format!("failed to load connector catalog: {err}"))?;
        let log = EventLog::to_file(paths.log_path());
        Ok(Self {
            settings,
            paths,
            catalog,
            log,
        })
    }

    pub fn session_store(&self) -> SessionStore {
        SessionStore::new(self.paths.session_path(), self.log.clone())
    }

    /// Remote parser when an endpoint is configured, always backed by local matching.
    pub fn intent_parser(&self) -> Arc<dyn IntentParser> {
        let local = LocalIntentParser::new(self.catalog.clone());
        let intent = &self.settings.intent;
        let primary = intent.endpoint.as_deref().map(|endpoint| {
            Box::new(RemoteIntentParser::new(
                endpoint,
                intent.api_key(),
                Duration::from_millis(intent.timeout_ms),
                self.catalog.clone(),
            )) as Box<dyn IntentParser>
        });
        Arc::new(FallbackIntentParser::new(primary, local, self.log.clone()))
    }

    /// Saved canvas, or an empty one when nothing has been saved yet.
    pub fn load_state(&self) -> Result<CanvasState, String> {
        Ok(self
            .session_store()
            .load()
            .map_err(|err| err.to_string())?
            .map(|loaded| loaded.state)
            .unwrap_or_default())
    }

    /// Restores the saved session, upgrading older files in place.
    pub fn open_session(&self) -> Result<ChatSession, String> {
        let store = self.session_store();
        let loaded = store.load().map_err(|err| err.to_string())?;
        let (session_id, state, migrated) = match loaded {
            Some(loaded) => (loaded.session_id, loaded.state, loaded.migrated),
            None => (None, CanvasState::default(), false),
        };
        let session_id = match session_id {
            Some(id) => id,
            None => new_session_id(now_secs())?,
        };
        if migrated {
            store
                .save(&session_id, &state)
                .map_err(|err| err.to_string())?;
            self.log
                .info("session_upgraded", &[("session_id", json!(session_id))]);
        }

        let mut session = ChatSession::new(session_id, self.catalog.clone(), self.intent_parser())
            .with_log(self.log.clone())
            .with_state(state)
            .with_persistence(store);
        session.refresh()?;
        Ok(session)
    }
}

pub fn load_context() -> Result<AppContext, String> {
    let settings = load_global_settings().map_err(map_config_err)?;
    AppContext::from_settings(settings)
}
