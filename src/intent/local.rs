use super::{IntentError, IntentGuess, IntentParser, Suggestion, SuggestionKind};
use crate::canvas::NodeRole;
use crate::catalog::{Catalog, CONNECTOR_ALIASES};
use std::cmp::Ordering;

/// Whole-word cues that pick a transform kind, checked in order.
const TRANSFORM_KEYWORDS: &[(&str, &[&str])] = &[
    ("Enrich & Map", &["enrich", "enriched", "enrichment", "augment"]),
    ("Cleanse", &["clean", "cleanse", "cleaning", "dedupe", "deduplicate", "scrub"]),
    (
        "Data Analysis",
        &["analyze", "analyse", "analysis", "insights", "summarize"],
    ),
    ("Map & Validate", &["map", "mapping", "validate", "validation"]),
];

const SOURCE_CUES: &[&str] = &["from"];
const DESTINATION_CUES: &[&str] = &["to", "into", "->", "→"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cue {
    Source,
    Destination,
    None,
}

#[derive(Debug, Clone)]
struct Mention<'a> {
    name: &'a str,
    end: usize,
    cue: Cue,
}

/// Catalog-backed pattern matcher. Needs no network.
#[derive(Debug, Clone)]
pub struct LocalIntentParser {
    catalog: Catalog,
}

impl LocalIntentParser {
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }

    fn mentions<'a>(&'a self, text: &str) -> Vec<Mention<'a>> {
        let mut found = Vec::new();
        for spec in self.catalog.connectors() {
            if let Some(start) = find_phrase(text, &spec.name.to_lowercase()) {
                found.push((spec.name.as_str(), start, start + spec.name.len()));
            }
        }
        for (alias, target) in CONNECTOR_ALIASES {
            let Some(spec) = self.catalog.connector(target) else {
                continue;
            };
            if let Some(start) = find_phrase(text, alias) {
                found.push((spec.name.as_str(), start, start + alias.len()));
            }
        }
        found.sort_by(|a, b| a.1.cmp(&b.1).then((b.2 - b.1).cmp(&(a.2 - a.1))));

        let mut mentions: Vec<Mention<'a>> = Vec::new();
        for (name, start, end) in found {
            let overlaps = mentions.last().is_some_and(|last| start < last.end);
            if overlaps || mentions.iter().any(|mention| mention.name == name) {
                continue;
            }
            mentions.push(Mention {
                name,
                end,
                cue: cue_before(&text[..start]),
            });
        }
        mentions
    }

    fn allows(&self, name: &str, role: NodeRole) -> bool {
        self.catalog
            .connector(name)
            .is_some_and(|spec| spec.roles.allows(role))
    }

    fn detect_transform(&self, words: &[String]) -> Option<String> {
        TRANSFORM_KEYWORDS
            .iter()
            .find(|(_, keywords)| {
                words
                    .iter()
                    .any(|word| keywords.contains(&word.as_str()))
            })
            .and_then(|(kind, _)| self.catalog.transform(kind))
            .map(|kind| kind.name.clone())
    }
}

impl IntentParser for LocalIntentParser {
    fn parse_intent(&self, text: &str) -> Result<IntentGuess, IntentError> {
        let lowered = text.to_lowercase();
        let mentions = self.mentions(&lowered);

        let source = mentions
            .iter()
            .find(|m| m.cue == Cue::Source && self.allows(m.name, NodeRole::Source))
            .or_else(|| {
                mentions
                    .iter()
                    .find(|m| m.cue == Cue::None && self.allows(m.name, NodeRole::Source))
            })
            .map(|m| m.name);

        let remaining: Vec<&Mention> = mentions
            .iter()
            .filter(|m| Some(m.name) != source && self.allows(m.name, NodeRole::Destination))
            .collect();
        let destination = remaining
            .iter()
            .find(|m| m.cue == Cue::Destination)
            .or_else(|| remaining.iter().rev().find(|m| m.cue != Cue::Source))
            .map(|m| m.name);

        Ok(IntentGuess {
            source: source.map(str::to_string),
            transform: self.detect_transform(&tokenize(&lowered)),
            destination: destination.map(str::to_string),
        })
    }

    fn suggest(&self, partial: &str, limit: usize) -> Result<Vec<Suggestion>, IntentError> {
        let query = partial.trim().to_lowercase();
        if query.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let mut scored: Vec<Suggestion> = Vec::new();
        let connectors = self
            .catalog
            .connectors()
            .iter()
            .map(|spec| (spec.name.as_str(), SuggestionKind::Connector));
        let transforms = self
            .catalog
            .transforms()
            .iter()
            .map(|kind| (kind.name.as_str(), SuggestionKind::Transform));
        for (name, kind) in connectors.chain(transforms) {
            let alias_hit = CONNECTOR_ALIASES
                .iter()
                .any(|(alias, target)| *alias == query && *target == name);
            let score = match (score_name(&query, name), alias_hit) {
                (Some(score), true) => Some(score.max(ALIAS_SCORE)),
                (None, true) => Some(ALIAS_SCORE),
                (score, false) => score,
            };
            if let Some(score) = score {
                scored.push(Suggestion {
                    name: name.to_string(),
                    kind,
                    score,
                });
            }
        }

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.name.cmp(&b.name))
        });
        scored.truncate(limit);
        Ok(scored)
    }
}

const ALIAS_SCORE: f32 = 0.85;

fn score_name(query: &str, name: &str) -> Option<f32> {
    let lowered = name.to_lowercase();
    if lowered == query {
        Some(1.0)
    } else if lowered.starts_with(query) {
        Some(0.9)
    } else if tokenize(&lowered).iter().any(|word| word.starts_with(query)) {
        Some(0.75)
    } else if lowered.contains(query) {
        Some(0.6)
    } else if is_subsequence(query, &lowered) {
        Some(0.3)
    } else {
        None
    }
}

fn is_subsequence(query: &str, haystack: &str) -> bool {
    let mut remaining = haystack.chars();
    query
        .chars()
        .filter(|ch| !ch.is_whitespace())
        .all(|ch| remaining.any(|candidate| candidate == ch))
}

fn tokenize(input: &str) -> Vec<String> {
    input
        .to_lowercase()
        .replace('\'', "")
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// Byte offset of `needle` in `haystack` where it stands as whole words.
fn find_phrase(haystack: &str, needle: &str) -> Option<usize> {
    if needle.is_empty() {
        return None;
    }
    haystack.match_indices(needle).map(|(at, _)| at).find(|at| {
        let before = haystack[..*at].chars().next_back();
        let after = haystack[at + needle.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

fn cue_before(prefix: &str) -> Cue {
    let Some(word) = prefix.split_whitespace().next_back() else {
        return Cue::None;
    };
    if SOURCE_CUES.contains(&word) {
        Cue::Source
    } else if DESTINATION_CUES.contains(&word) {
        Cue::Destination
    } else {
        Cue::None
    }
}
