use crate::canvas::{CanvasState, FieldValues, NodeRole, Selection};
use crate::catalog::Catalog;
use serde::{Deserialize, Serialize};

/// Transform kinds that need no field collection and count as complete as
/// soon as they are selected.
pub const AUTO_COMPLETE_TRANSFORMS: [&str; 3] = ["Map & Validate", "Cleanse", "Data Analysis"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Pending,
    Partial,
    Complete,
    Error,
}

impl NodeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Partial => "partial",
            Self::Complete => "complete",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

pub fn is_auto_complete_transform(name: &str) -> bool {
    AUTO_COMPLETE_TRANSFORMS.contains(&name)
}

/// Completion state of one node. Pure: derived only from its arguments.
pub fn compute_node_status(
    role: NodeRole,
    selection: &Selection,
    mandatory_fields: &[String],
    values: &FieldValues,
) -> NodeStatus {
    let Some(name) = selection.name() else {
        return NodeStatus::Pending;
    };

    if role == NodeRole::Transform {
        if is_auto_complete_transform(name) || values.has_any_value() {
            return NodeStatus::Complete;
        }
        return NodeStatus::Pending;
    }

    if mandatory_fields.is_empty() {
        return NodeStatus::Complete;
    }
    match values.filled_count(mandatory_fields) {
        0 => NodeStatus::Pending,
        filled if filled < mandatory_fields.len() => NodeStatus::Partial,
        _ => NodeStatus::Complete,
    }
}

pub fn node_status(state: &CanvasState, catalog: &Catalog, role: NodeRole) -> NodeStatus {
    let selection = state.selection(role);
    compute_node_status(
        role,
        selection,
        catalog.mandatory_fields(role, selection),
        state.values(role),
    )
}
