use crate::shared::digest::sha256_hex;
use crate::shared::serde_ext::parse_nullable_via_string;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeRole {
    Source,
    Transform,
    Destination,
}

/// Fixed collection and rendering order.
pub const NODE_ORDER: [NodeRole; 3] = [
    NodeRole::Source,
    NodeRole::Transform,
    NodeRole::Destination,
];

const SOURCE_SENTINEL: &str = "Dummy Source";
const TRANSFORM_SENTINEL: &str = "Dummy Transform";
const DESTINATION_SENTINEL: &str = "Dummy Destination";

impl NodeRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::Transform => "transform",
            Self::Destination => "destination",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, String> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "source" => Ok(Self::Source),
            "transform" => Ok(Self::Transform),
            "destination" => Ok(Self::Destination),
            _ => Err("node role must be one of: source, transform, destination".to_string()),
        }
    }

    /// Placeholder name used on the wire for a role with nothing selected.
    pub fn sentinel_name(self) -> &'static str {
        match self {
            Self::Source => SOURCE_SENTINEL,
            Self::Transform => TRANSFORM_SENTINEL,
            Self::Destination => DESTINATION_SENTINEL,
        }
    }
}

impl std::fmt::Display for NodeRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

pub fn is_sentinel_name(raw: &str) -> bool {
    let trimmed = raw.trim();
    [SOURCE_SENTINEL, TRANSFORM_SENTINEL, DESTINATION_SENTINEL]
        .iter()
        .any(|sentinel| sentinel.eq_ignore_ascii_case(trimmed))
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum Selection {
    #[default]
    Unselected,
    Named(String),
}

impl Selection {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    /// Sentinel names collapse to [`Selection::Unselected`].
    pub fn parse(raw: &str) -> Result<Self, String> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err("node name must be non-empty".to_string());
        }
        if is_sentinel_name(trimmed) {
            return Ok(Self::Unselected);
        }
        Ok(Self::Named(trimmed.to_string()))
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Unselected => None,
            Self::Named(name) => Some(name.as_str()),
        }
    }

    pub fn is_unselected(&self) -> bool {
        matches!(self, Self::Unselected)
    }

    pub fn wire_name(&self, role: NodeRole) -> &str {
        self.name().unwrap_or(role.sentinel_name())
    }
}

impl Serialize for Selection {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Unselected => serializer.serialize_none(),
            Self::Named(name) => serializer.serialize_str(name),
        }
    }
}

impl<'de> Deserialize<'de> for Selection {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        parse_nullable_via_string(deserializer, "node name", Selection::parse)
    }
}

/// Credential values for one node. Blank values are never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldValues(BTreeMap<String, String>);

static EMPTY_VALUES: FieldValues = FieldValues(BTreeMap::new());

impl FieldValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn set(&mut self, field: &str, value: &str) {
        if value.trim().is_empty() {
            self.0.remove(field);
        } else {
            self.0.insert(field.to_string(), value.to_string());
        }
    }

    pub fn is_filled(&self, field: &str) -> bool {
        self.get(field)
            .map(|value| !value.trim().is_empty())
            .unwrap_or(false)
    }

    pub fn filled_count<S: AsRef<str>>(&self, fields: &[S]) -> usize {
        fields
            .iter()
            .filter(|field| self.is_filled(field.as_ref()))
            .count()
    }

    pub fn has_any_value(&self) -> bool {
        self.0.values().any(|value| !value.trim().is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn as_map(&self) -> &BTreeMap<String, String> {
        &self.0
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FieldValues {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut values = Self::new();
        for (key, value) in iter {
            values.set(&key.into(), &value.into());
        }
        values
    }
}

/// The living canvas configuration.
///
/// Transform values are partitioned by transform kind so that switching the
/// selected transform never leaks one kind's fields into another. The
/// transform node's visible values are always the partition of the current
/// selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CanvasState {
    selected_source: Selection,
    selected_transform: Selection,
    selected_destination: Selection,
    source_values: FieldValues,
    destination_values: FieldValues,
    transform_by_type: BTreeMap<String, FieldValues>,
}

impl CanvasState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selection(&self, role: NodeRole) -> &Selection {
        match role {
            NodeRole::Source => &self.selected_source,
            NodeRole::Transform => &self.selected_transform,
            NodeRole::Destination => &self.selected_destination,
        }
    }

    pub fn values(&self, role: NodeRole) -> &FieldValues {
        match role {
            NodeRole::Source => &self.source_values,
            NodeRole::Destination => &self.destination_values,
            NodeRole::Transform => {
                let key = transform_key(&self.selected_transform);
                self.transform_values_for(key)
            }
        }
    }

    pub fn transform_values_for(&self, kind: &str) -> &FieldValues {
        self.transform_by_type.get(kind).unwrap_or(&EMPTY_VALUES)
    }

    pub fn transform_by_type(&self) -> &BTreeMap<String, FieldValues> {
        &self.transform_by_type
    }

    pub fn is_pristine(&self) -> bool {
        *self == Self::default()
    }

    /// Stable sha256 over selections and every value partition.
    pub fn fingerprint(&self) -> String {
        let canonical = serde_json::json!({
            "selected": {
                "source": self.selected_source.wire_name(NodeRole::Source),
                "transform": self.selected_transform.wire_name(NodeRole::Transform),
                "destination": self.selected_destination.wire_name(NodeRole::Destination),
            },
            "values": {
                "source": &self.source_values,
                "destination": &self.destination_values,
            },
            "transformByType": &self.transform_by_type,
        });
        sha256_hex(canonical.to_string().as_bytes())
    }

    pub(crate) fn from_parts(
        selections: [Selection; 3],
        source_values: FieldValues,
        destination_values: FieldValues,
        transform_by_type: BTreeMap<String, FieldValues>,
    ) -> Self {
        let [selected_source, selected_transform, selected_destination] = selections;
        Self {
            selected_source,
            selected_transform,
            selected_destination,
            source_values,
            destination_values,
            transform_by_type: transform_by_type
                .into_iter()
                .filter(|(_, values)| !values.is_empty())
                .collect(),
        }
    }

    fn select(&mut self, role: NodeRole, selection: Selection) {
        if *self.selection(role) == selection {
            return;
        }
        match role {
            NodeRole::Source => {
                self.selected_source = selection;
                self.source_values = FieldValues::new();
            }
            NodeRole::Destination => {
                self.selected_destination = selection;
                self.destination_values = FieldValues::new();
            }
            NodeRole::Transform => self.selected_transform = selection,
        }
    }

    fn set_field(&mut self, role: NodeRole, field: &str, value: &str) {
        match role {
            NodeRole::Source => self.source_values.set(field, value),
            NodeRole::Destination => self.destination_values.set(field, value),
            NodeRole::Transform => {
                let key = transform_key(&self.selected_transform).to_string();
                self.set_transform_field(&key, field, value);
            }
        }
    }

    fn set_transform_field(&mut self, kind: &str, field: &str, value: &str) {
        let entry = self.transform_by_type.entry(kind.to_string()).or_default();
        entry.set(field, value);
        if entry.is_empty() {
            self.transform_by_type.remove(kind);
        }
    }

    fn replace_transform_values(&mut self, kind: &str, values: FieldValues) {
        if values.is_empty() {
            self.transform_by_type.remove(kind);
        } else {
            self.transform_by_type.insert(kind.to_string(), values);
        }
    }
}

fn transform_key(selection: &Selection) -> &str {
    selection.wire_name(NodeRole::Transform)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeUpdate {
    pub selection: Option<Selection>,
    pub credentials: BTreeMap<String, String>,
}

impl NodeUpdate {
    pub fn select(selection: Selection) -> Self {
        Self {
            selection: Some(selection),
            credentials: BTreeMap::new(),
        }
    }

    pub fn with_credential(mut self, field: &str, value: &str) -> Self {
        self.credentials.insert(field.to_string(), value.to_string());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchUpdate {
    pub source: Option<NodeUpdate>,
    pub transform: Option<NodeUpdate>,
    pub destination: Option<NodeUpdate>,
}

impl BatchUpdate {
    pub fn set(&mut self, role: NodeRole, update: NodeUpdate) {
        match role {
            NodeRole::Source => self.source = Some(update),
            NodeRole::Transform => self.transform = Some(update),
            NodeRole::Destination => self.destination = Some(update),
        }
    }

    pub fn get(&self, role: NodeRole) -> Option<&NodeUpdate> {
        match role {
            NodeRole::Source => self.source.as_ref(),
            NodeRole::Transform => self.transform.as_ref(),
            NodeRole::Destination => self.destination.as_ref(),
        }
    }

    pub fn is_empty(&self) -> bool {
        NODE_ORDER.iter().all(|role| self.get(*role).is_none())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CanvasAction {
    SelectNode {
        role: NodeRole,
        selection: Selection,
    },
    SetField {
        role: NodeRole,
        field: String,
        value: String,
    },
    ClearField {
        role: NodeRole,
        field: String,
    },
    Batch(BatchUpdate),
    SetTransformValues {
        kind: String,
        values: FieldValues,
    },
    Reset,
}

impl CanvasAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SelectNode { .. } => "select_node",
            Self::SetField { .. } => "set_field",
            Self::ClearField { .. } => "clear_field",
            Self::Batch(_) => "batch",
            Self::SetTransformValues { .. } => "set_transform_values",
            Self::Reset => "reset",
        }
    }
}

/// Pure transition function behind [`crate::canvas::ConfigStore`].
pub fn reduce(state: &CanvasState, action: &CanvasAction) -> CanvasState {
    let mut next = state.clone();
    match action {
        CanvasAction::SelectNode { role, selection } => next.select(*role, selection.clone()),
        CanvasAction::SetField { role, field, value } => next.set_field(*role, field, value),
        CanvasAction::ClearField { role, field } => next.set_field(*role, field, ""),
        CanvasAction::Batch(batch) => {
            for role in NODE_ORDER {
                let Some(update) = batch.get(role) else {
                    continue;
                };
                if let Some(selection) = &update.selection {
                    next.select(role, selection.clone());
                }
                for (field, value) in &update.credentials {
                    next.set_field(role, field, value);
                }
            }
        }
        CanvasAction::SetTransformValues { kind, values } => {
            next.replace_transform_values(kind, values.clone())
        }
        CanvasAction::Reset => next = CanvasState::default(),
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_parse_maps_sentinels_to_unselected() {
        assert_eq!(Selection::parse("Dummy Source"), Ok(Selection::Unselected));
        assert_eq!(Selection::parse("dummy destination"), Ok(Selection::Unselected));
        assert_eq!(
            Selection::parse(" Snowflake "),
            Ok(Selection::named("Snowflake"))
        );
        assert!(Selection::parse("   ").is_err());
    }

    #[test]
    fn reselecting_same_connector_keeps_values_but_switching_clears_them() {
        let mut state = CanvasState::new();
        state = reduce(
            &state,
            &CanvasAction::SelectNode {
                role: NodeRole::Source,
                selection: Selection::named("Shopify"),
            },
        );
        state = reduce(
            &state,
            &CanvasAction::SetField {
                role: NodeRole::Source,
                field: "storeDomain".to_string(),
                value: "acme.myshopify.com".to_string(),
            },
        );
        let same = reduce(
            &state,
            &CanvasAction::SelectNode {
                role: NodeRole::Source,
                selection: Selection::named("Shopify"),
            },
        );
        assert_eq!(same.values(NodeRole::Source).get("storeDomain"), Some("acme.myshopify.com"));

        let switched = reduce(
            &state,
            &CanvasAction::SelectNode {
                role: NodeRole::Source,
                selection: Selection::named("Stripe"),
            },
        );
        assert!(switched.values(NodeRole::Source).is_empty());
    }

    #[test]
    fn blank_values_clear_fields() {
        let mut values = FieldValues::new();
        values.set("host", "db.example.com");
        values.set("host", "   ");
        assert!(values.is_empty());
    }

    #[test]
    fn fingerprint_tracks_content_not_identity() {
        let a = CanvasState::new();
        let b = CanvasState::new();
        assert_eq!(a.fingerprint(), b.fingerprint());
        let c = reduce(
            &a,
            &CanvasAction::SelectNode {
                role: NodeRole::Destination,
                selection: Selection::named("Snowflake"),
            },
        );
        assert_ne!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn reset_restores_pristine_state() {
        let state = reduce(
            &CanvasState::new(),
            &CanvasAction::SetTransformValues {
                kind: "Cleanse".to_string(),
                values: [("x", "1")].into_iter().collect(),
            },
        );
        assert!(!state.is_pristine());
        assert!(reduce(&state, &CanvasAction::Reset).is_pristine());
    }
}
