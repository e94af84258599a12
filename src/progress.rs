use crate::canvas::{CanvasState, NodeRole};
use crate::catalog::Catalog;
use crate::status::{node_status, NodeStatus};
use serde::Serialize;

/// Share of the total each role contributes; three roles sum to 100.
pub const ROLE_SHARE: f64 = 100.0 / 3.0;
/// Credit for a connector that is selected but unknown to the catalog.
pub const UNVERIFIED_SHARE: f64 = ROLE_SHARE / 2.0;
const EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ProgressUpdates {
    pub source: f64,
    pub transform: f64,
    pub destination: f64,
}

impl ProgressUpdates {
    pub fn share(&self, role: NodeRole) -> f64 {
        match role {
            NodeRole::Source => self.source,
            NodeRole::Transform => self.transform,
            NodeRole::Destination => self.destination,
        }
    }

    pub fn total(&self) -> f64 {
        (self.source + self.transform + self.destination).clamp(0.0, 100.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStep {
    Source,
    Transform,
    Destination,
    Complete,
}

impl From<NodeRole> for ProgressStep {
    fn from(role: NodeRole) -> Self {
        match role {
            NodeRole::Source => Self::Source,
            NodeRole::Transform => Self::Transform,
            NodeRole::Destination => Self::Destination,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    pub updates: ProgressUpdates,
    pub total: f64,
    pub current_step: ProgressStep,
}

/// Recomputed from scratch on every canvas change.
pub fn calculate_from_canvas_state(state: &CanvasState, catalog: &Catalog) -> ProgressUpdates {
    ProgressUpdates {
        source: credential_share(state, catalog, NodeRole::Source),
        transform: transform_share(state, catalog),
        destination: credential_share(state, catalog, NodeRole::Destination),
    }
}

pub fn progress_snapshot(state: &CanvasState, catalog: &Catalog) -> ProgressSnapshot {
    let updates = calculate_from_canvas_state(state, catalog);
    let total = updates.total();
    let current_step = if total >= 100.0 - EPSILON {
        ProgressStep::Complete
    } else {
        crate::canvas::NODE_ORDER
            .iter()
            .find(|role| updates.share(**role) < ROLE_SHARE - EPSILON)
            .map(|role| ProgressStep::from(*role))
            .unwrap_or(ProgressStep::Complete)
    };
    ProgressSnapshot {
        updates,
        total,
        current_step,
    }
}

fn credential_share(state: &CanvasState, catalog: &Catalog, role: NodeRole) -> f64 {
    let Some(name) = state.selection(role).name() else {
        return 0.0;
    };
    let Some(spec) = catalog.connector(name) else {
        return UNVERIFIED_SHARE;
    };
    let mandatory = &spec.credentials.mandatory;
    if mandatory.is_empty() {
        return ROLE_SHARE;
    }
    let filled = state.values(role).filled_count(mandatory);
    (filled as f64 / mandatory.len() as f64) * ROLE_SHARE
}

fn transform_share(state: &CanvasState, catalog: &Catalog) -> f64 {
    if state.selection(NodeRole::Transform).is_unselected() {
        return 0.0;
    }
    match node_status(state, catalog, NodeRole::Transform) {
        NodeStatus::Pending => ROLE_SHARE * 0.5,
        NodeStatus::Partial => ROLE_SHARE * 0.75,
        NodeStatus::Complete => ROLE_SHARE,
        NodeStatus::Error => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{BatchUpdate, ConfigStore, NodeUpdate, Selection};

    fn catalog() -> Catalog {
        Catalog::builtin().expect("builtin catalog")
    }

    #[test]
    fn pristine_canvas_has_zero_progress_and_starts_at_source() {
        let snapshot = progress_snapshot(&CanvasState::new(), &catalog());
        assert_eq!(snapshot.total, 0.0);
        assert_eq!(snapshot.current_step, ProgressStep::Source);
    }

    #[test]
    fn credential_share_is_proportional_to_filled_mandatory_fields() {
        let mut store = ConfigStore::new();
        store.batch_update_canvas(BatchUpdate {
            destination: Some(
                NodeUpdate::select(Selection::named("Snowflake"))
                    .with_credential("host/account", "acme")
                    .with_credential("user", "etl"),
            ),
            ..BatchUpdate::default()
        });
        let updates = calculate_from_canvas_state(store.state(), &catalog());
        assert!((updates.destination - ROLE_SHARE / 2.0).abs() < 1e-9);
    }

    #[test]
    fn unknown_connectors_earn_half_credit() {
        let mut store = ConfigStore::new();
        store.select_node(NodeRole::Source, Selection::named("Legacy FTP"));
        let updates = calculate_from_canvas_state(store.state(), &catalog());
        assert!((updates.source - UNVERIFIED_SHARE).abs() < 1e-9);
    }

    #[test]
    fn complete_canvas_reaches_one_hundred() {
        let mut store = ConfigStore::new();
        store.batch_update_canvas(BatchUpdate {
            source: Some(
                NodeUpdate::select(Selection::named("Stripe")).with_credential("apiKey", "sk"),
            ),
            transform: Some(NodeUpdate::select(Selection::named("Cleanse"))),
            destination: Some(
                NodeUpdate::select(Selection::named("Webhook"))
                    .with_credential("webhookUrl", "https://hooks.example.com"),
            ),
        });
        let snapshot = progress_snapshot(store.state(), &catalog());
        assert!((snapshot.total - 100.0).abs() < 1e-9);
        assert_eq!(snapshot.current_step, ProgressStep::Complete);
    }
}
