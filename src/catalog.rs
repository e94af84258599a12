use crate::canvas::{NodeRole, Selection};
use crate::status::is_auto_complete_transform;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

pub mod resolve;

pub use resolve::{resolve_node_name, CONNECTOR_ALIASES};

const BUILTIN_CATALOG: &str = include_str!("catalog/connectors.yaml");

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid catalog yaml: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("catalog validation failed: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectorRoles {
    #[serde(default)]
    pub source: bool,
    #[serde(default)]
    pub destination: bool,
}

impl ConnectorRoles {
    pub fn allows(self, role: NodeRole) -> bool {
        match role {
            NodeRole::Source => self.source,
            NodeRole::Destination => self.destination,
            NodeRole::Transform => false,
        }
    }
}

/// Ordered credential field names. Declaration order is question order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialFields {
    #[serde(default)]
    pub mandatory: Vec<String>,
    #[serde(default)]
    pub optional: Vec<String>,
}

impl CredentialFields {
    pub fn is_empty(&self) -> bool {
        self.mandatory.is_empty() && self.optional.is_empty()
    }

    pub fn all(&self) -> impl Iterator<Item = &String> {
        self.mandatory.iter().chain(self.optional.iter())
    }

    pub fn contains(&self, field: &str) -> bool {
        self.all().any(|candidate| candidate == field)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectorSpec {
    pub name: String,
    pub category: String,
    pub roles: ConnectorRoles,
    #[serde(default)]
    pub credentials: CredentialFields,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformKind {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub auto_complete: bool,
    #[serde(default)]
    pub credentials: CredentialFields,
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    connectors: Vec<ConnectorSpec>,
    #[serde(default)]
    transforms: Vec<TransformKind>,
}

/// Read-only connector and transform catalog.
#[derive(Debug, Clone)]
pub struct Catalog {
    connectors: Vec<ConnectorSpec>,
    transforms: Vec<TransformKind>,
    connector_index: HashMap<String, usize>,
    transform_index: HashMap<String, usize>,
}

impl Catalog {
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_yaml_str(BUILTIN_CATALOG)
    }

    pub fn from_path(path: &Path) -> Result<Self, CatalogError> {
        let raw = fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&raw)
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_yaml::from_str(raw)?;
        Self::new(file.connectors, file.transforms)
    }

    pub fn new(
        connectors: Vec<ConnectorSpec>,
        transforms: Vec<TransformKind>,
    ) -> Result<Self, CatalogError> {
        let issues = validate_entries(&connectors, &transforms);
        if !issues.is_empty() {
            return Err(CatalogError::Invalid(issues));
        }
        let connector_index = connectors
            .iter()
            .enumerate()
            .map(|(idx, spec)| (spec.name.clone(), idx))
            .collect();
        let transform_index = transforms
            .iter()
            .enumerate()
            .map(|(idx, kind)| (kind.name.clone(), idx))
            .collect();
        Ok(Self {
            connectors,
            transforms,
            connector_index,
            transform_index,
        })
    }

    pub fn connector(&self, name: &str) -> Option<&ConnectorSpec> {
        self.connector_index
            .get(name)
            .map(|idx| &self.connectors[*idx])
    }

    pub fn transform(&self, name: &str) -> Option<&TransformKind> {
        self.transform_index
            .get(name)
            .map(|idx| &self.transforms[*idx])
    }

    pub fn connectors(&self) -> &[ConnectorSpec] {
        &self.connectors
    }

    pub fn transforms(&self) -> &[TransformKind] {
        &self.transforms
    }

    pub fn connectors_for(&self, role: NodeRole) -> impl Iterator<Item = &ConnectorSpec> {
        self.connectors
            .iter()
            .filter(move |spec| spec.roles.allows(role))
    }

    /// Names a node with `role` may take, in catalog order.
    pub fn candidate_names(&self, role: NodeRole) -> Vec<&str> {
        match role {
            NodeRole::Transform => self
                .transforms
                .iter()
                .map(|kind| kind.name.as_str())
                .collect(),
            NodeRole::Source | NodeRole::Destination => self
                .connectors_for(role)
                .map(|spec| spec.name.as_str())
                .collect(),
        }
    }

    /// Credential fields declared for the named node, if the catalog knows it.
    pub fn fields_for(&self, role: NodeRole, name: &str) -> Option<&CredentialFields> {
        match role {
            NodeRole::Transform => self.transform(name).map(|kind| &kind.credentials),
            NodeRole::Source | NodeRole::Destination => {
                self.connector(name).map(|spec| &spec.credentials)
            }
        }
    }

    pub fn mandatory_fields(&self, role: NodeRole, selection: &Selection) -> &[String] {
        selection
            .name()
            .and_then(|name| self.fields_for(role, name))
            .map(|fields| fields.mandatory.as_slice())
            .unwrap_or(&[])
    }
}

fn validate_entries(connectors: &[ConnectorSpec], transforms: &[TransformKind]) -> Vec<String> {
    let mut issues = Vec::new();
    let mut names = HashSet::new();
    for spec in connectors {
        if spec.name.trim().is_empty() {
            issues.push("connector name must be non-empty".to_string());
            continue;
        }
        if !names.insert(spec.name.to_ascii_lowercase()) {
            issues.push(format!("duplicate connector `{}`", spec.name));
        }
        if !spec.roles.source && !spec.roles.destination {
            issues.push(format!(
                "connector `{}` must be usable as a source or a destination",
                spec.name
            ));
        }
        issues.extend(duplicate_fields(&spec.name, &spec.credentials));
    }
    let mut transform_names = HashSet::new();
    for kind in transforms {
        if kind.name.trim().is_empty() {
            issues.push("transform name must be non-empty".to_string());
            continue;
        }
        if !transform_names.insert(kind.name.to_ascii_lowercase()) {
            issues.push(format!("duplicate transform `{}`", kind.name));
        }
        if kind.auto_complete != is_auto_complete_transform(&kind.name) {
            issues.push(format!(
                "transform `{}` sets auto_complete: {} but the engine treats it as {}",
                kind.name,
                kind.auto_complete,
                if kind.auto_complete { "collecting fields" } else { "auto-complete" }
            ));
        }
        issues.extend(duplicate_fields(&kind.name, &kind.credentials));
    }
    issues
}

fn duplicate_fields(owner: &str, fields: &CredentialFields) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut issues = Vec::new();
    for field in fields.all() {
        if field.trim().is_empty() {
            issues.push(format!("`{owner}` declares an empty field name"));
        } else if !seen.insert(field.as_str()) {
            issues.push(format!("`{owner}` declares field `{field}` more than once"));
        }
    }
    issues
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_loads_and_validates() {
        let catalog = Catalog::builtin().expect("builtin catalog");
        let shopify = catalog.connector("Shopify").expect("shopify");
        assert_eq!(shopify.credentials.mandatory, vec!["storeDomain", "apiKey/token"]);
        assert!(shopify.roles.source);
        assert!(!shopify.roles.destination);

        let snowflake = catalog.connector("Snowflake").expect("snowflake");
        assert_eq!(
            snowflake.credentials.mandatory,
            vec!["host/account", "user", "password or key", "database/schema"]
        );
        assert!(catalog.transform("Map & Validate").expect("map").auto_complete);
    }

    #[test]
    fn duplicate_fields_and_connectors_are_reported_together() {
        let err = Catalog::from_yaml_str(
            r#"
connectors:
  - name: Alpha
    category: Test
    roles: { source: true }
    credentials: { mandatory: [host], optional: [host] }
  - name: alpha
    category: Test
    roles: { destination: true }
"#,
        )
        .expect_err("invalid catalog");
        let CatalogError::Invalid(issues) = err else {
            panic!("expected validation error");
        };
        assert_eq!(issues.len(), 2);
        assert!(issues[0].contains("`host` more than once"));
        assert!(issues[1].contains("duplicate connector"));
    }

    #[test]
    fn auto_complete_flag_must_agree_with_the_engine() {
        let err = Catalog::from_yaml_str(
            r#"
transforms:
  - name: Pivot
    auto_complete: true
  - name: Cleanse
    auto_complete: false
  - name: Map & Validate
    auto_complete: true
"#,
        )
        .expect_err("mismatched flags");
        let CatalogError::Invalid(issues) = err else {
            panic!("expected validation error");
        };
        assert_eq!(issues.len(), 2);
        assert!(issues[0].contains("transform `Pivot` sets auto_complete: true"));
        assert!(issues[1].contains("transform `Cleanse` sets auto_complete: false"));
    }

    #[test]
    fn candidate_names_respect_roles() {
        let catalog = Catalog::builtin().expect("builtin catalog");
        let sources = catalog.candidate_names(NodeRole::Source);
        assert!(sources.contains(&"Shopify"));
        assert!(!sources.contains(&"Amazon Redshift"));
        assert!(!catalog
            .candidate_names(NodeRole::Destination)
            .contains(&"Shopify"));
        assert_eq!(
            catalog.candidate_names(NodeRole::Transform),
            vec!["Map & Validate", "Cleanse", "Enrich & Map", "Data Analysis"]
        );
    }
}
