pub mod document;
pub mod persistence;
pub mod state;
pub mod store;

pub use document::{
    export_document, import_document, parse_document, sanitize_credential_value, CanvasDocument,
    DocumentError, NodeDocument,
};
pub use persistence::{LoadedSession, PersistenceError, SessionStore, SESSION_FORMAT_VERSION};
pub use state::{
    is_sentinel_name, reduce, BatchUpdate, CanvasAction, CanvasState, FieldValues, NodeRole,
    NodeUpdate, Selection, NODE_ORDER,
};
pub use store::{ConfigStore, StoreEvent};
