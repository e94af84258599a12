//! Field collection: decides the single next question to ask about the
//! canvas, validates answers, and describes the canvas mutation an accepted
//! answer implies. Nothing here mutates the canvas; callers apply the
//! returned [`CanvasUpdate`] to the [`crate::canvas::ConfigStore`].

use crate::canvas::NodeRole;
use serde::Serialize;
use std::collections::BTreeSet;

pub mod analysis;
pub mod input;
pub mod plan;
pub mod questions;

pub use analysis::{analyze_canvas_for_collection, CanvasAnalysis};
pub use input::{
    is_skip_command, process_input, validate_field_value, CanvasUpdate, ProcessResult,
    SKIP_VOCABULARY,
};
pub use plan::{create_collection_plan, get_next_step, node_summaries};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CollectionError {
    #[error("collection invariant violated: analysis reports {outstanding} outstanding step(s) but no step could be produced")]
    InvariantViolation { outstanding: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepKind {
    NodeName,
    MandatoryField,
    OptionalField,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeProgress {
    pub mandatory_completed: usize,
    pub mandatory_total: usize,
    pub optional_completed: usize,
    pub optional_total: usize,
}

/// One outstanding question. Computed on demand, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionStep {
    pub node: NodeRole,
    pub kind: StepKind,
    pub connector: Option<String>,
    pub field: Option<String>,
    pub remaining_fields: Vec<String>,
    pub completed_fields: Vec<String>,
    pub question: String,
    pub can_skip: bool,
    pub node_progress: NodeProgress,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSummary {
    pub name: Option<String>,
    pub is_dummy: bool,
    pub fields_collected: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeSummaries {
    pub source: NodeSummary,
    pub transform: NodeSummary,
    pub destination: NodeSummary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionState {
    pub current_step: Option<CollectionStep>,
    pub completed_steps: Vec<CollectionStep>,
    pub nodes: NodeSummaries,
    pub is_complete: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct SkippedField {
    role: NodeRole,
    connector: String,
    field: String,
}

/// What the conversation has already settled: answered steps and optional
/// fields the user chose to leave empty. Skips are keyed by connector so
/// they do not carry over when a node switches connector.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionLedger {
    skipped: BTreeSet<SkippedField>,
    completed: Vec<CollectionStep>,
}

impl CollectionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_completed(&mut self, step: &CollectionStep) {
        self.completed.push(step.clone());
    }

    /// Only optional field steps can be skipped; anything else is ignored.
    pub fn record_skip(&mut self, step: &CollectionStep) {
        if step.kind != StepKind::OptionalField {
            return;
        }
        let (Some(connector), Some(field)) = (&step.connector, &step.field) else {
            return;
        };
        self.skipped.insert(SkippedField {
            role: step.node,
            connector: connector.clone(),
            field: field.clone(),
        });
        self.completed.push(step.clone());
    }

    pub fn is_skipped(&self, role: NodeRole, connector: &str, field: &str) -> bool {
        self.skipped.iter().any(|entry| {
            entry.role == role && entry.connector == connector && entry.field == field
        })
    }

    pub fn completed_steps(&self) -> &[CollectionStep] {
        &self.completed
    }

    pub fn clear(&mut self) {
        self.skipped.clear();
        self.completed.clear();
    }
}
