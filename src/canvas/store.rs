use super::state::{
    reduce, BatchUpdate, CanvasAction, CanvasState, FieldValues, NodeRole, Selection,
};
use crate::collection::CanvasUpdate;
use std::sync::mpsc::{self, Receiver, Sender};

/// Emitted once per effective state transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreEvent {
    pub action: &'static str,
    pub fingerprint: String,
    pub state: CanvasState,
}

/// Single authoritative container for canvas selections and values.
///
/// Both input surfaces (chat answers and direct canvas edits) mutate the
/// canvas only through [`ConfigStore::dispatch`], and every action is an
/// idempotent "select" or "set" so the two surfaces need no coordination.
#[derive(Debug, Default)]
pub struct ConfigStore {
    state: CanvasState,
    subscribers: Vec<Sender<StoreEvent>>,
}

impl ConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: CanvasState) -> Self {
        Self {
            state,
            subscribers: Vec::new(),
        }
    }

    pub fn state(&self) -> &CanvasState {
        &self.state
    }

    pub fn subscribe(&mut self) -> Receiver<StoreEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    /// Applies `action` as one transition. Returns whether the state changed;
    /// subscribers hear nothing about no-op transitions.
    pub fn dispatch(&mut self, action: CanvasAction) -> bool {
        let next = reduce(&self.state, &action);
        if next == self.state {
            return false;
        }
        self.state = next;
        self.notify(action.as_str());
        true
    }

    pub fn select_node(&mut self, role: NodeRole, selection: Selection) -> bool {
        self.dispatch(CanvasAction::SelectNode { role, selection })
    }

    pub fn set_field(&mut self, role: NodeRole, field: &str, value: &str) -> bool {
        self.dispatch(CanvasAction::SetField {
            role,
            field: field.to_string(),
            value: value.to_string(),
        })
    }

    pub fn clear_field(&mut self, role: NodeRole, field: &str) -> bool {
        self.dispatch(CanvasAction::ClearField {
            role,
            field: field.to_string(),
        })
    }

    pub fn apply_update(&mut self, update: &CanvasUpdate) -> bool {
        match update {
            CanvasUpdate::NodeName {
                node_type,
                node_name,
            } => self.select_node(*node_type, Selection::named(node_name.clone())),
            CanvasUpdate::FieldValue {
                node_type,
                field_name,
                field_value,
            } => self.set_field(*node_type, field_name, field_value),
        }
    }

    pub fn batch_update_canvas(&mut self, updates: BatchUpdate) -> bool {
        if updates.is_empty() {
            return false;
        }
        self.dispatch(CanvasAction::Batch(updates))
    }

    pub fn update_transform_values_by_type(&mut self, kind: &str, values: FieldValues) -> bool {
        self.dispatch(CanvasAction::SetTransformValues {
            kind: kind.to_string(),
            values,
        })
    }

    pub fn get_transform_values_by_type(&self, kind: &str) -> FieldValues {
        self.state.transform_values_for(kind).clone()
    }

    pub fn reset_store(&mut self) -> bool {
        self.dispatch(CanvasAction::Reset)
    }

    fn notify(&mut self, action: &'static str) {
        if self.subscribers.is_empty() {
            return;
        }
        let event = StoreEvent {
            action,
            fingerprint: self.state.fingerprint(),
            state: self.state.clone(),
        };
        self.subscribers
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }
}
