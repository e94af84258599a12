use crate::app::command_support::AppContext;
use crate::canvas::{NodeRole, NODE_ORDER};
use crate::catalog::CredentialFields;

const SUGGESTION_LIMIT: usize = 5;

fn describe_fields(fields: &CredentialFields) -> String {
    let mut parts = vec![format!("required: {}", list_or_none(&fields.mandatory))];
    if !fields.optional.is_empty() {
        parts.push(format!("optional: {}", fields.optional.join(", ")));
    }
    parts.join("; ")
}

fn list_or_none(fields: &[String]) -> String {
    if fields.is_empty() {
        "none".to_string()
    } else {
        fields.join(", ")
    }
}

pub fn cmd_catalog(args: &[String], context: &AppContext) -> Result<String, String> {
    if args.len() > 1 {
        return Err("usage: catalog [source|transform|destination]".to_string());
    }
    let roles = match args.first() {
        Some(raw) => vec![NodeRole::parse(raw)?],
        None => NODE_ORDER.to_vec(),
    };

    let catalog = &context.catalog;
    let mut lines = Vec::new();
    for role in roles {
        lines.push(format!("{role}s:"));
        match role {
            NodeRole::Transform => {
                for kind in catalog.transforms() {
                    let fields = if kind.auto_complete {
                        "no configuration needed".to_string()
                    } else {
                        describe_fields(&kind.credentials)
                    };
                    lines.push(format!("  {:22} {}", kind.name, fields));
                }
            }
            NodeRole::Source | NodeRole::Destination => {
                for spec in catalog.connectors_for(role) {
                    lines.push(format!(
                        "  {:22} [{}] {}",
                        spec.name,
                        spec.category,
                        describe_fields(&spec.credentials)
                    ));
                }
            }
        }
    }
    Ok(lines.join("\n"))
}

pub fn cmd_suggest(args: &[String], context: &AppContext) -> Result<String, String> {
    let text = args.join(" ");
    if text.trim().is_empty() {
        return Err("usage: suggest <text>".to_string());
    }
    let parser = context.intent_parser();
    let guess = parser.parse_intent(&text).map_err(|err| err.to_string())?;
    let suggestions = parser
        .suggest(&text, SUGGESTION_LIMIT)
        .map_err(|err| err.to_string())?;

    let mut lines = Vec::new();
    for role in NODE_ORDER {
        lines.push(format!("{role}={}", guess.get(role).unwrap_or("-")));
    }
    if suggestions.is_empty() {
        lines.push("suggestions: none".to_string());
    } else {
        lines.push("suggestions:".to_string());
        for suggestion in suggestions {
            lines.push(format!(
                "  {} ({:?}, {:.2})",
                suggestion.name, suggestion.kind, suggestion.score
            ));
        }
    }
    Ok(lines.join("\n"))
}
