use super::{CollectionStep, StepKind};
use crate::canvas::NodeRole;
use crate::catalog::{resolve_node_name, Catalog};
use serde::Serialize;

/// Replies that mean "leave this optional field empty". Matched on the
/// trimmed, lowercased input by equality or containment, so "no thanks"
/// counts as well.
pub const SKIP_VOCABULARY: [&str; 11] = [
    "skip",
    "no",
    "none",
    "pass",
    "next",
    "continue",
    "not needed",
    "not required",
    "leave empty",
    "ignore",
    "n/a",
];

/// Mutation an accepted answer asks the caller to apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "updateType", rename_all = "kebab-case")]
pub enum CanvasUpdate {
    #[serde(rename_all = "camelCase")]
    NodeName {
        node_type: NodeRole,
        node_name: String,
    },
    #[serde(rename_all = "camelCase")]
    FieldValue {
        node_type: NodeRole,
        field_name: String,
        field_value: String,
    },
}

impl CanvasUpdate {
    pub fn node_type(&self) -> NodeRole {
        match self {
            Self::NodeName { node_type, .. } | Self::FieldValue { node_type, .. } => *node_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum ProcessResult {
    Applied { update: CanvasUpdate },
    Skipped,
    Rejected { message: String },
}

impl ProcessResult {
    fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }

    pub fn was_skipped(&self) -> bool {
        matches!(self, Self::Skipped)
    }

    pub fn canvas_update(&self) -> Option<&CanvasUpdate> {
        match self {
            Self::Applied { update } => Some(update),
            Self::Skipped | Self::Rejected { .. } => None,
        }
    }
}

pub fn is_skip_command(input: &str) -> bool {
    let normalized = input.trim().to_lowercase();
    SKIP_VOCABULARY
        .iter()
        .any(|word| normalized == *word || normalized.contains(word))
}

/// Validates and interprets one answer to `step`. User mistakes come back
/// as [`ProcessResult::Rejected`]; this never panics or errors.
pub fn process_input(input: &str, step: &CollectionStep, catalog: &Catalog) -> ProcessResult {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return ProcessResult::rejected("Please provide a value before continuing.");
    }

    if step.can_skip && is_skip_command(trimmed) {
        return ProcessResult::Skipped;
    }

    match step.kind {
        StepKind::NodeName => resolve_name_answer(trimmed, step.node, catalog),
        StepKind::MandatoryField | StepKind::OptionalField => {
            let Some(field) = step.field.as_deref() else {
                return ProcessResult::rejected("This question has no field to fill.");
            };
            match validate_field_value(field, trimmed) {
                Ok(()) => ProcessResult::Applied {
                    update: CanvasUpdate::FieldValue {
                        node_type: step.node,
                        field_name: field.to_string(),
                        field_value: trimmed.to_string(),
                    },
                },
                Err(message) => ProcessResult::rejected(message),
            }
        }
    }
}

fn resolve_name_answer(input: &str, role: NodeRole, catalog: &Catalog) -> ProcessResult {
    match resolve_node_name(catalog, role, input) {
        Some(name) => ProcessResult::Applied {
            update: CanvasUpdate::NodeName {
                node_type: role,
                node_name: name,
            },
        },
        None => {
            let options = catalog
                .candidate_names(role)
                .into_iter()
                .take(6)
                .collect::<Vec<_>>()
                .join(", ");
            ProcessResult::rejected(format!(
                "I couldn't find a {role} called \"{input}\". Try one of: {options}."
            ))
        }
    }
}

/// Field-name heuristics: names containing "url" need an http(s) scheme,
/// names containing "email" need an `@`. Everything else is accepted.
pub fn validate_field_value(field: &str, value: &str) -> Result<(), String> {
    let lowered = field.to_lowercase();
    if lowered.contains("url") && !(value.starts_with("http://") || value.starts_with("https://"))
    {
        return Err(format!(
            "{field} must be a URL starting with http:// or https://"
        ));
    }
    if lowered.contains("email") && !value.contains('@') {
        return Err(format!("{field} must be an email address containing @"));
    }
    Ok(())
}
