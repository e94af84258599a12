use super::{IntentError, IntentGuess, IntentParser, Suggestion, SuggestionKind};
use crate::canvas::NodeRole;
use crate::catalog::{resolve_node_name, Catalog};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct RemoteGuess {
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    transform: Option<String>,
    #[serde(default)]
    destination: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RemoteSuggestions {
    #[serde(default)]
    suggestions: Vec<RemoteSuggestion>,
}

#[derive(Debug, Deserialize)]
struct RemoteSuggestion {
    name: String,
    #[serde(default)]
    score: Option<f32>,
}

/// Model-backed parser behind a JSON HTTP endpoint.
///
/// Everything the endpoint returns is resolved against the catalog again, so
/// an answer can never select a connector the catalog does not know.
pub struct RemoteIntentParser {
    endpoint: String,
    api_key: Option<String>,
    agent: ureq::Agent,
    catalog: Catalog,
}

impl RemoteIntentParser {
    pub fn new(
        endpoint: &str,
        api_key: Option<String>,
        timeout: Duration,
        catalog: Catalog,
    ) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            endpoint: endpoint.trim().trim_end_matches('/').to_string(),
            api_key,
            agent,
            catalog,
        }
    }

    fn post<T: for<'de> Deserialize<'de>>(
        &self,
        body: serde_json::Value,
    ) -> Result<T, IntentError> {
        let mut request = self.agent.post(&self.endpoint).set(
            "user-agent",
            concat!("pipewright/", env!("CARGO_PKG_VERSION")),
        );
        if let Some(key) = &self.api_key {
            request = request.set("Authorization", &format!("Bearer {key}"));
        }
        let response = request
            .send_json(body)
            .map_err(|e| IntentError::Request(format!("{}: {e}", self.endpoint)))?;

        let status = response.status();
        if status != 200 {
            return Err(IntentError::Response(format!(
                "unexpected status {status} from {}",
                self.endpoint
            )));
        }
        response
            .into_json::<T>()
            .map_err(|e| IntentError::Response(e.to_string()))
    }

    fn resolve(&self, role: NodeRole, raw: Option<String>) -> Option<String> {
        raw.and_then(|name| resolve_node_name(&self.catalog, role, &name))
    }
}

impl IntentParser for RemoteIntentParser {
    fn parse_intent(&self, text: &str) -> Result<IntentGuess, IntentError> {
        let guess: RemoteGuess = self.post(json!({
            "task": "parse_intent",
            "text": text,
        }))?;
        Ok(IntentGuess {
            source: self.resolve(NodeRole::Source, guess.source),
            transform: self.resolve(NodeRole::Transform, guess.transform),
            destination: self.resolve(NodeRole::Destination, guess.destination),
        })
    }

    fn suggest(&self, partial: &str, limit: usize) -> Result<Vec<Suggestion>, IntentError> {
        let response: RemoteSuggestions = self.post(json!({
            "task": "suggest",
            "text": partial,
            "limit": limit,
        }))?;
        Ok(catalog_suggestions(&self.catalog, response.suggestions, limit))
    }
}

fn catalog_suggestions(
    catalog: &Catalog,
    remote: Vec<RemoteSuggestion>,
    limit: usize,
) -> Vec<Suggestion> {
    let total = remote.len().max(1) as f32;
    let mut suggestions: Vec<Suggestion> = Vec::new();
    for (rank, item) in remote.into_iter().enumerate() {
        let known = if let Some(spec) = catalog.connector(&item.name) {
            Some((spec.name.clone(), SuggestionKind::Connector))
        } else {
            catalog
                .transform(&item.name)
                .map(|kind| (kind.name.clone(), SuggestionKind::Transform))
        };
        let Some((name, kind)) = known else {
            continue;
        };
        if suggestions.iter().any(|existing| existing.name == name) {
            continue;
        }
        let score = item
            .score
            .unwrap_or(1.0 - rank as f32 / total)
            .clamp(0.0, 1.0);
        suggestions.push(Suggestion { name, kind, score });
        if suggestions.len() == limit {
            break;
        }
    }
    suggestions
}
