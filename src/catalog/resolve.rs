use super::Catalog;
use crate::canvas::NodeRole;

/// Shorthands users type for common connectors.
pub const CONNECTOR_ALIASES: &[(&str, &str)] = &[
    ("sf", "Salesforce"),
    ("sfdc", "Salesforce"),
    ("bq", "Google BigQuery"),
    ("bigquery", "Google BigQuery"),
    ("postgres", "PostgreSQL"),
    ("pg", "PostgreSQL"),
    ("s3", "Amazon S3"),
    ("gcs", "Google Cloud Storage"),
    ("ga", "Google Analytics"),
    ("mssql", "Microsoft SQL Server"),
    ("sql server", "Microsoft SQL Server"),
    ("mongo", "MongoDB"),
    ("sheets", "Google Sheets"),
    ("es", "Elasticsearch"),
];

/// Shortest input allowed to match inside a longer catalog name.
const MIN_PARTIAL_LEN: usize = 3;

/// Resolves free text to a catalog name usable for `role`.
///
/// Order: transform fuzzy match (transform role only), exact
/// case-insensitive match, substring match in either direction, alias table.
pub fn resolve_node_name(catalog: &Catalog, role: NodeRole, raw: &str) -> Option<String> {
    let needle = raw.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }
    let candidates = catalog.candidate_names(role);

    if role == NodeRole::Transform {
        if let Some(kind) = match_transform_kind(&candidates, &needle) {
            return Some(kind.to_string());
        }
    }

    if let Some(exact) = candidates
        .iter()
        .find(|name| name.to_lowercase() == needle)
    {
        return Some(exact.to_string());
    }

    if let Some(partial) = candidates.iter().find(|name| {
        let lowered = name.to_lowercase();
        (needle.chars().count() >= MIN_PARTIAL_LEN && lowered.contains(&needle))
            || needle.contains(&lowered)
    }) {
        return Some(partial.to_string());
    }

    CONNECTOR_ALIASES
        .iter()
        .find(|(alias, _)| *alias == needle)
        .map(|(_, target)| *target)
        .filter(|target| candidates.contains(target))
        .map(str::to_string)
}

fn match_transform_kind<'a>(candidates: &[&'a str], needle: &str) -> Option<&'a str> {
    let squashed = squash(needle);
    candidates.iter().copied().find(|kind| {
        let kind_squashed = squash(kind);
        (squashed.len() >= MIN_PARTIAL_LEN && kind_squashed.contains(&squashed))
            || (!kind_squashed.is_empty() && squashed.contains(&kind_squashed))
    })
}

/// Lowercases and drops everything but letters and digits, so
/// "map and validate" and "Map & Validate" compare equal.
fn squash(raw: &str) -> String {
    raw.to_lowercase()
        .replace(" and ", " ")
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect()
}
