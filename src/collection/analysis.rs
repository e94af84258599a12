use crate::canvas::{CanvasState, NodeRole};
use crate::catalog::Catalog;
use crate::status::is_auto_complete_transform;
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasAnalysis {
    pub needs_source_name: bool,
    pub needs_source_fields: bool,
    pub needs_transform_name: bool,
    pub needs_transform_fields: bool,
    pub needs_destination_name: bool,
    pub needs_destination_fields: bool,
    /// Display only; control flow never reads it.
    pub total_steps_needed: usize,
}

impl CanvasAnalysis {
    pub fn needs_name(&self, role: NodeRole) -> bool {
        match role {
            NodeRole::Source => self.needs_source_name,
            NodeRole::Transform => self.needs_transform_name,
            NodeRole::Destination => self.needs_destination_name,
        }
    }

    pub fn needs_fields(&self, role: NodeRole) -> bool {
        match role {
            NodeRole::Source => self.needs_source_fields,
            NodeRole::Transform => self.needs_transform_fields,
            NodeRole::Destination => self.needs_destination_fields,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.total_steps_needed == 0
    }
}

pub fn analyze_canvas_for_collection(state: &CanvasState, catalog: &Catalog) -> CanvasAnalysis {
    let source = role_needs(state, catalog, NodeRole::Source);
    let transform = role_needs(state, catalog, NodeRole::Transform);
    let destination = role_needs(state, catalog, NodeRole::Destination);
    let flags = [
        source.0,
        source.1,
        transform.0,
        transform.1,
        destination.0,
        destination.1,
    ];
    CanvasAnalysis {
        needs_source_name: source.0,
        needs_source_fields: source.1,
        needs_transform_name: transform.0,
        needs_transform_fields: transform.1,
        needs_destination_name: destination.0,
        needs_destination_fields: destination.1,
        total_steps_needed: flags.iter().filter(|flag| **flag).count(),
    }
}

/// `(needs name, needs mandatory fields)` for one role.
fn role_needs(state: &CanvasState, catalog: &Catalog, role: NodeRole) -> (bool, bool) {
    let Some(name) = state.selection(role).name() else {
        return (true, false);
    };
    if role == NodeRole::Transform && is_auto_complete_transform(name) {
        return (false, false);
    }
    let values = state.values(role);
    let needs_fields = catalog
        .fields_for(role, name)
        .map(|fields| fields.mandatory.iter().any(|field| !values.is_filled(field)))
        .unwrap_or(false);
    (false, needs_fields)
}
