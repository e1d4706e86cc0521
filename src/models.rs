//! Payload models for the ESC environments API.
//!
//! Field names follow the service's camelCase JSON.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::Result;
use crate::property::TypedProperty;

/// Top-level properties of an opened environment, by name.
pub type NamedProperties = BTreeMap<String, Value>;

/// A resolved top-level property with its metadata.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Value {
    #[serde(default)]
    pub value: TypedProperty,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unknown: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<Trace>,
}

impl Value {
    pub fn new(value: TypedProperty) -> Self {
        Self {
            value,
            ..Default::default()
        }
    }

    pub fn is_secret(&self) -> bool {
        self.secret.unwrap_or(false)
    }

    pub fn is_unknown(&self) -> bool {
        self.unknown.unwrap_or(false)
    }
}

/// Where a value was defined and what it was merged over.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Trace {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub def: Option<Range>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<Box<Value>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Range {
    #[serde(default)]
    pub environment: String,
    #[serde(default)]
    pub begin: Pos,
    #[serde(default)]
    pub end: Pos,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Pos {
    #[serde(default)]
    pub line: i32,
    #[serde(default)]
    pub column: i32,
    #[serde(default)]
    pub byte: i32,
}

/// An opened (evaluated) environment.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Environment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exprs: Option<BTreeMap<String, JsonValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<NamedProperties>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<JsonValue>,
}

/// Environment summary as returned by the list call.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OrgEnvironment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    pub name: String,
    #[serde(default)]
    pub created: String,
    #[serde(default)]
    pub modified: String,
}

/// One page of environment summaries.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrgEnvironments {
    #[serde(default)]
    pub environments: Vec<OrgEnvironment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
}

impl OrgEnvironments {
    /// Token for the following page; `None` when this is the last page.
    pub fn next_token(&self) -> Option<&str> {
        self.next_token.as_deref().filter(|t| !t.is_empty())
    }
}

/// Handle to an open session.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OpenEnvironment {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<Vec<EnvironmentDiagnostic>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EnvironmentDiagnostic {
    #[serde(default)]
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<Range>,
}

/// Diagnostics returned by an update. Empty or absent means the update was
/// accepted without complaint.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EnvironmentDiagnostics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<Vec<EnvironmentDiagnostic>>,
}

impl EnvironmentDiagnostics {
    pub fn diagnostics(&self) -> &[EnvironmentDiagnostic] {
        self.diagnostics.as_deref().unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics().is_empty()
    }
}

/// Result of checking a candidate definition: the evaluated environment,
/// plus diagnostics when it is invalid.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CheckEnvironment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exprs: Option<BTreeMap<String, JsonValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<NamedProperties>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<Vec<EnvironmentDiagnostic>>,
}

impl CheckEnvironment {
    pub fn diagnostics(&self) -> &[EnvironmentDiagnostic] {
        self.diagnostics.as_deref().unwrap_or_default()
    }

    pub fn is_valid(&self) -> bool {
        self.diagnostics().is_empty()
    }
}

/// An environment definition document: imports plus a values tree.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EnvironmentDefinition {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub imports: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<EnvironmentDefinitionValues>,
}

impl EnvironmentDefinition {
    /// Parse a YAML definition document.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Serialize to the YAML text the service accepts.
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

/// The `values` section of a definition. Well-known sections are broken out;
/// every other top-level key lands in `additional_properties`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentDefinitionValues {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pulumi_config: Option<BTreeMap<String, JsonValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment_variables: Option<BTreeMap<String, JsonValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<BTreeMap<String, JsonValue>>,
    #[serde(flatten)]
    pub additional_properties: BTreeMap<String, JsonValue>,
}
