use super::analysis::analyze_canvas_for_collection;
use super::questions::{mandatory_field_question, node_name_question, optional_field_question};
use super::{
    CollectionError, CollectionLedger, CollectionState, CollectionStep, NodeProgress,
    NodeSummaries, NodeSummary, StepKind,
};
use crate::canvas::{CanvasState, NodeRole, NODE_ORDER};
use crate::catalog::{Catalog, CredentialFields};
use crate::status::is_auto_complete_transform;

/// Produces the collection state for the live canvas.
///
/// Nodes are completed one at a time in source, transform, destination
/// order: name, then mandatory fields, then optional fields, each in catalog
/// order. The plan is always re-derived from `state`; there is no cursor.
pub fn create_collection_plan(
    state: &CanvasState,
    catalog: &Catalog,
    ledger: &CollectionLedger,
) -> Result<CollectionState, CollectionError> {
    let analysis = analyze_canvas_for_collection(state, catalog);
    let current_step = if analysis.is_complete() {
        None
    } else {
        Some(first_outstanding(state, catalog, ledger).ok_or(
            CollectionError::InvariantViolation {
                outstanding: analysis.total_steps_needed,
            },
        )?)
    };
    debug_assert!(analysis.is_complete() || current_step.is_some());
    Ok(CollectionState {
        is_complete: current_step.is_none(),
        current_step,
        completed_steps: ledger.completed_steps().to_vec(),
        nodes: node_summaries(state, catalog),
    })
}

/// Next question after `completed`, against the canvas as it is now.
///
/// The node that was just answered is finished first (remaining mandatory
/// fields, then optional ones); only then does collection move on.
pub fn get_next_step(
    completed: &CollectionStep,
    state: &CanvasState,
    catalog: &Catalog,
    ledger: &CollectionLedger,
) -> Result<Option<CollectionStep>, CollectionError> {
    if let Some(step) = outstanding_for_node(state, catalog, ledger, completed.node) {
        return Ok(Some(step));
    }
    let analysis = analyze_canvas_for_collection(state, catalog);
    if analysis.is_complete() {
        return Ok(None);
    }
    match first_outstanding(state, catalog, ledger) {
        Some(step) => Ok(Some(step)),
        None => {
            debug_assert!(false, "analysis reported outstanding work with no step");
            Err(CollectionError::InvariantViolation {
                outstanding: analysis.total_steps_needed,
            })
        }
    }
}

pub fn node_summaries(state: &CanvasState, catalog: &Catalog) -> NodeSummaries {
    let summary = |role: NodeRole| {
        let selection = state.selection(role);
        let values = state.values(role);
        let fields = selection
            .name()
            .and_then(|name| catalog.fields_for(role, name));
        let fields_collected = match fields {
            Some(fields) => fields.all().filter(|field| values.is_filled(field)).count(),
            None => values.iter().filter(|(_, value)| !value.trim().is_empty()).count(),
        };
        NodeSummary {
            name: selection.name().map(str::to_string),
            is_dummy: selection.is_unselected(),
            fields_collected,
        }
    };
    NodeSummaries {
        source: summary(NodeRole::Source),
        transform: summary(NodeRole::Transform),
        destination: summary(NodeRole::Destination),
    }
}

fn first_outstanding(
    state: &CanvasState,
    catalog: &Catalog,
    ledger: &CollectionLedger,
) -> Option<CollectionStep> {
    NODE_ORDER
        .iter()
        .find_map(|role| outstanding_for_node(state, catalog, ledger, *role))
}

fn outstanding_for_node(
    state: &CanvasState,
    catalog: &Catalog,
    ledger: &CollectionLedger,
    role: NodeRole,
) -> Option<CollectionStep> {
    let Some(name) = state.selection(role).name() else {
        return Some(CollectionStep {
            node: role,
            kind: StepKind::NodeName,
            connector: None,
            field: None,
            remaining_fields: Vec::new(),
            completed_fields: Vec::new(),
            question: node_name_question(role, catalog),
            can_skip: false,
            node_progress: NodeProgress::default(),
        });
    };
    if role == NodeRole::Transform && is_auto_complete_transform(name) {
        return None;
    }
    let fields = catalog.fields_for(role, name)?;
    let values = state.values(role);
    let is_done = |field: &String| {
        values.is_filled(field) || ledger.is_skipped(role, name, field)
    };

    let missing_mandatory = fields
        .mandatory
        .iter()
        .filter(|field| !values.is_filled(field))
        .cloned()
        .collect::<Vec<_>>();
    let pending_optional = fields
        .optional
        .iter()
        .filter(|field| !is_done(field))
        .cloned()
        .collect::<Vec<_>>();
    let progress = NodeProgress {
        mandatory_completed: fields.mandatory.len() - missing_mandatory.len(),
        mandatory_total: fields.mandatory.len(),
        optional_completed: fields.optional.len() - pending_optional.len(),
        optional_total: fields.optional.len(),
    };

    if let Some(field) = missing_mandatory.first() {
        let index = fields
            .mandatory
            .iter()
            .position(|candidate| candidate == field)
            .map(|position| position + 1)
            .unwrap_or(1);
        return Some(CollectionStep {
            node: role,
            kind: StepKind::MandatoryField,
            connector: Some(name.to_string()),
            field: Some(field.clone()),
            completed_fields: completed(fields, &missing_mandatory, &pending_optional),
            question: mandatory_field_question(name, field, index, fields.mandatory.len()),
            remaining_fields: missing_mandatory,
            can_skip: false,
            node_progress: progress,
        });
    }

    let field = pending_optional.first()?.clone();
    Some(CollectionStep {
        node: role,
        kind: StepKind::OptionalField,
        connector: Some(name.to_string()),
        completed_fields: completed(fields, &missing_mandatory, &pending_optional),
        question: optional_field_question(name, &field),
        field: Some(field),
        remaining_fields: pending_optional,
        can_skip: true,
        node_progress: progress,
    })
}

fn completed(fields: &CredentialFields, missing: &[String], pending: &[String]) -> Vec<String> {
    fields
        .all()
        .filter(|field| !missing.contains(field) && !pending.contains(field))
        .cloned()
        .collect()
}
