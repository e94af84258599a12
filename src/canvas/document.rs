use super::state::{CanvasState, FieldValues, NodeRole, Selection};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("canvas document is not valid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("canvas document is invalid: {}", .issues.join("; "))]
    Invalid { issues: Vec<String> },
}

/// Import/export shape of a canvas configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasDocument {
    pub nodes: DocumentNodes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentNodes {
    pub source: NodeDocument,
    pub destination: NodeDocument,
    pub transform: NodeDocument,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeDocument {
    pub name: String,
    pub credentials: BTreeMap<String, String>,
}

const DOCUMENT_ROLES: [NodeRole; 3] = [
    NodeRole::Source,
    NodeRole::Destination,
    NodeRole::Transform,
];

impl CanvasDocument {
    pub fn to_json_pretty(&self) -> Result<String, DocumentError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

pub fn export_document(state: &CanvasState) -> CanvasDocument {
    let node = |role: NodeRole| NodeDocument {
        name: state.selection(role).wire_name(role).to_string(),
        credentials: state.values(role).as_map().clone(),
    };
    CanvasDocument {
        nodes: DocumentNodes {
            source: node(NodeRole::Source),
            destination: node(NodeRole::Destination),
            transform: node(NodeRole::Transform),
        },
    }
}

pub fn parse_document(raw: &str) -> Result<CanvasState, DocumentError> {
    let value: Value = serde_json::from_str(raw)?;
    import_document(&value)
}

/// Validates and loads a canvas document. Every violation is reported, not
/// just the first, and every credential value is sanitized.
pub fn import_document(value: &Value) -> Result<CanvasState, DocumentError> {
    let Some(nodes) = value.get("nodes").and_then(Value::as_object) else {
        return Err(DocumentError::Invalid {
            issues: vec!["`nodes` must be an object".to_string()],
        });
    };

    let mut issues = Vec::new();
    let mut selections = BTreeMap::new();
    let mut credentials = BTreeMap::new();
    for role in DOCUMENT_ROLES {
        let key = role.as_str();
        let Some(node) = nodes.get(key) else {
            issues.push(format!("`nodes.{key}` is required"));
            continue;
        };
        let Some(node) = node.as_object() else {
            issues.push(format!("`nodes.{key}` must be an object"));
            continue;
        };

        match node.get("name").and_then(Value::as_str).map(Selection::parse) {
            Some(Ok(selection)) => {
                selections.insert(role, selection);
            }
            _ => issues.push(format!("`nodes.{key}.name` must be a non-empty string")),
        }

        match node.get("credentials").and_then(Value::as_object) {
            Some(raw) => {
                let mut values = FieldValues::new();
                for (field, value) in raw {
                    match value.as_str() {
                        Some(text) => values.set(field, &sanitize_credential_value(text)),
                        None => issues.push(format!(
                            "`nodes.{key}.credentials.{field}` must be a string"
                        )),
                    }
                }
                credentials.insert(role, values);
            }
            None => issues.push(format!("`nodes.{key}.credentials` must be an object")),
        }
    }

    if !issues.is_empty() {
        return Err(DocumentError::Invalid { issues });
    }

    let mut take_selection = |role: NodeRole| selections.remove(&role).unwrap_or_default();
    let source = take_selection(NodeRole::Source);
    let transform = take_selection(NodeRole::Transform);
    let destination = take_selection(NodeRole::Destination);
    let mut take_values = |role: NodeRole| credentials.remove(&role).unwrap_or_default();
    let source_values = take_values(NodeRole::Source);
    let destination_values = take_values(NodeRole::Destination);
    let transform_values = take_values(NodeRole::Transform);

    let transform_by_type = BTreeMap::from_iter([(
        transform.wire_name(NodeRole::Transform).to_string(),
        transform_values,
    )]);
    Ok(CanvasState::from_parts(
        [source, transform, destination],
        source_values,
        destination_values,
        transform_by_type,
    ))
}

/// Strips control characters and angle brackets from a credential value.
pub fn sanitize_credential_value(raw: &str) -> String {
    raw.chars()
        .filter(|ch| !ch.is_control() && *ch != '<' && *ch != '>')
        .collect()
}
