//! Projection of tool definitions into MCP tool descriptions.

use rmcp::model::{JsonObject, Tool};
use serde_json::{Value, json};
use std::sync::Arc;

use super::definition::{ParamConfig, ToolDefinition};

/// Describe `tool` for a `tools/list` response.
pub fn to_mcp_tool(tool: &ToolDefinition) -> Tool {
    let mut described = Tool::new(
        tool.name.clone(),
        tool.description.clone(),
        Arc::new(input_schema(tool)),
    );
    described.title = (!tool.title.is_empty()).then(|| tool.title.clone());
    described
}

/// JSON Schema of the tool's arguments.
///
/// Property-level `required` flags are folded into the top-level `required`
/// array.
pub fn input_schema(tool: &ToolDefinition) -> JsonObject {
    let properties: JsonObject = tool
        .parameter_mappings
        .iter()
        .map(|(name, param)| (name.clone(), property_schema(param)))
        .collect();

    let schema = json!({
        "type": "object",
        "title": tool.title,
        "properties": properties,
        "required": tool.required_parameters(),
    });

    match schema {
        Value::Object(object) => object,
        _ => JsonObject::new(),
    }
}

fn property_schema(param: &ParamConfig) -> Value {
    let mut property = JsonObject::new();
    property.insert("title".to_string(), json!(param.title));
    property.insert("type".to_string(), json!(param.param_type));
    property.insert("description".to_string(), json!(param.description));
    if let Some(default) = &param.default {
        property.insert("default".to_string(), default.clone());
    }
    if let Some(values) = &param.allowed_values {
        property.insert("enum".to_string(), json!(values));
    }
    Value::Object(property)
}
