//! Declarative tool definitions.
//!
//! A route's tool source is a JSON document of the form
//! `{ "tools": [ ToolDefinition, ... ] }`. Field names are matched
//! case-insensitively, unknown fields are ignored and missing fields take
//! their documented defaults.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

use super::request::HttpVerb;

/// Method used when a definition does not name one.
pub const DEFAULT_HTTP_METHOD: &str = "POST";

/// Per-call timeout used when a definition does not set one.
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

const CATALOG_FIELDS: &[&str] = &["tools"];

const TOOL_FIELDS: &[&str] = &[
    "id",
    "name",
    "title",
    "description",
    "endpoint",
    "httpMethod",
    "timeoutSeconds",
    "auth",
    "headers",
    "queryParameters",
    "bodyTemplate",
    "parameterMappings",
    "enabled",
];

const PARAM_FIELDS: &[&str] = &["title", "description", "type", "required", "default", "enum"];

// ============================================================================
// Parameter schema
// ============================================================================

/// Schema of one named tool parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParamConfig {
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,

    #[serde(deserialize_with = "null_as_default")]
    pub description: String,

    /// JSON type name (`string`, `integer`, `boolean`, ...).
    #[serde(rename = "type", deserialize_with = "null_as_default")]
    pub param_type: String,

    pub required: Option<bool>,

    pub default: Option<Value>,

    /// Allowed values, in order.
    #[serde(rename = "enum")]
    pub allowed_values: Option<Vec<Value>>,
}

impl Default for ParamConfig {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            param_type: "string".to_string(),
            required: Some(false),
            default: None,
            allowed_values: None,
        }
    }
}

impl ParamConfig {
    /// Whether the parameter must be supplied by the caller.
    pub fn is_required(&self) -> bool {
        self.required == Some(true)
    }
}

// ============================================================================
// Tool definition
// ============================================================================

/// One invokable HTTP-backed tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ToolDefinition {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,

    #[serde(deserialize_with = "null_as_default")]
    pub name: String,

    #[serde(deserialize_with = "null_as_default")]
    pub title: String,

    #[serde(deserialize_with = "null_as_default")]
    pub description: String,

    /// URL template; `{{name}}` placeholders are bound from arguments.
    #[serde(deserialize_with = "null_as_default")]
    pub endpoint: String,

    #[serde(deserialize_with = "null_as_post")]
    pub http_method: String,

    /// Zero means the default timeout.
    #[serde(deserialize_with = "null_as_default")]
    pub timeout_seconds: u64,

    /// Reserved for upstream authentication; not applied to requests.
    #[serde(deserialize_with = "null_as_default")]
    pub auth: IndexMap<String, String>,

    #[serde(deserialize_with = "null_as_default")]
    pub headers: IndexMap<String, String>,

    #[serde(deserialize_with = "null_as_default")]
    pub query_parameters: IndexMap<String, String>,

    pub body_template: Option<String>,

    #[serde(deserialize_with = "null_as_default")]
    pub parameter_mappings: IndexMap<String, ParamConfig>,

    #[serde(deserialize_with = "null_as_true")]
    pub enabled: bool,
}

impl Default for ToolDefinition {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            title: String::new(),
            description: String::new(),
            endpoint: String::new(),
            http_method: DEFAULT_HTTP_METHOD.to_string(),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            auth: IndexMap::new(),
            headers: IndexMap::new(),
            query_parameters: IndexMap::new(),
            body_template: None,
            parameter_mappings: IndexMap::new(),
            enabled: true,
        }
    }
}

impl ToolDefinition {
    /// The HTTP verb this tool is invoked with.
    pub fn verb(&self) -> HttpVerb {
        HttpVerb::parse(&self.http_method)
    }

    /// Client-side deadline for one invocation.
    pub fn timeout(&self) -> Duration {
        match self.timeout_seconds {
            0 => Duration::from_secs(DEFAULT_TIMEOUT_SECONDS),
            secs => Duration::from_secs(secs),
        }
    }

    /// Names of the parameters flagged as required, in declaration order.
    pub fn required_parameters(&self) -> Vec<String> {
        self.parameter_mappings
            .iter()
            .filter(|(_, param)| param.is_required())
            .map(|(name, _)| name.clone())
            .collect()
    }
}

// ============================================================================
// Catalog document
// ============================================================================

/// The parsed contents of one route's tool source.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCatalog {
    pub tools: Vec<ToolDefinition>,
}

impl ToolCatalog {
    /// Parse a catalog document, matching field names case-insensitively.
    pub fn from_json_str(text: &str) -> serde_json::Result<Self> {
        let mut document: Value = serde_json::from_str(text)?;
        canonicalize_document(&mut document);
        serde_json::from_value(document)
    }
}

/// Rewrite the field names of the root, each tool and each parameter config
/// to their canonical spelling. Keys of user maps such as `headers` are left
/// alone.
fn canonicalize_document(document: &mut Value) {
    let Some(root) = document.as_object_mut() else {
        return;
    };
    canonicalize_keys(root, CATALOG_FIELDS);

    let Some(tools) = root.get_mut("tools").and_then(Value::as_array_mut) else {
        return;
    };
    for tool in tools.iter_mut().filter_map(Value::as_object_mut) {
        canonicalize_keys(tool, TOOL_FIELDS);

        if let Some(params) = tool
            .get_mut("parameterMappings")
            .and_then(Value::as_object_mut)
        {
            for param in params.values_mut().filter_map(Value::as_object_mut) {
                canonicalize_keys(param, PARAM_FIELDS);
            }
        }
    }
}

fn canonicalize_keys(object: &mut Map<String, Value>, known: &[&str]) {
    let keys: Vec<String> = object.keys().cloned().collect();
    for key in keys {
        let Some(canonical) = known.iter().find(|k| k.eq_ignore_ascii_case(&key)) else {
            continue;
        };
        if *canonical == key {
            continue;
        }
        if let Some(value) = object.remove(&key) {
            object.insert((*canonical).to_string(), value);
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_as_post<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?
        .unwrap_or_else(|| DEFAULT_HTTP_METHOD.to_string()))
}

fn null_as_true<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(true))
}
