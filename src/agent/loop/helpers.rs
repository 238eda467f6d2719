use crate::agent::tools::ToolRegistry;
use crate::agent::tools::base::{Tool, ToolResult};
use crate::providers::base::ToolCallRequest;
use serde_json::{Map, Value};

/// Turn the model's arguments into a JSON object the host will accept.
///
/// Malformed or non-object arguments and schema violations come back as an
/// `INVALID_ARGUMENTS` tool result so the model can see what went wrong.
pub(super) fn prepare_arguments(
    registry: &ToolRegistry,
    call: &ToolCallRequest,
) -> Result<Value, ToolResult> {
    let params = match &call.arguments {
        Value::Object(_) => call.arguments.clone(),
        Value::Null => Value::Object(Map::new()),
        Value::String(raw) => {
            return Err(ToolResult::error_payload(
                "INVALID_ARGUMENTS",
                format!(
                    "Could not parse arguments for tool '{}' as JSON: {}",
                    call.name, raw
                ),
            ));
        }
        other => {
            return Err(ToolResult::error_payload(
                "INVALID_ARGUMENTS",
                format!(
                    "Arguments for tool '{}' must be a JSON object, got {}",
                    call.name,
                    value_type_name(other)
                ),
            ));
        }
    };

    // Unlisted tools go to the host untouched; it owns the error for those
    if let Some(tool) = registry.get(&call.name)
        && let Some(message) = validate_tool_params(tool.as_ref(), &params)
    {
        return Err(ToolResult::error_payload("INVALID_ARGUMENTS", message));
    }
    Ok(params)
}

/// Validate tool arguments against the tool's JSON schema.
/// Checks: (1) required fields are present, (2) field types match schema.
/// Returns None if valid, `Some(error_message)` if invalid.
pub(crate) fn validate_tool_params(tool: &dyn Tool, params: &Value) -> Option<String> {
    let schema = tool.parameters();
    let mut errors = Vec::new();

    if let Some(required) = schema["required"].as_array() {
        for field in required {
            if let Some(field_name) = field.as_str()
                && (params.get(field_name).is_none() || params[field_name].is_null())
            {
                errors.push(format!("missing required parameter '{}'", field_name));
            }
        }
    }

    if let Some(properties) = schema["properties"].as_object() {
        for (field_name, field_schema) in properties {
            if let Some(value) = params.get(field_name)
                && !value.is_null()
                && let Some(expected_type) = field_schema["type"].as_str()
            {
                let type_ok = match expected_type {
                    "string" => value.is_string(),
                    "integer" => value.is_i64() || value.is_u64(),
                    "number" => value.is_number(),
                    "boolean" => value.is_boolean(),
                    "array" => value.is_array(),
                    "object" => value.is_object(),
                    _ => true,
                };
                if !type_ok {
                    errors.push(format!(
                        "parameter '{}' should be {} but got {}",
                        field_name,
                        expected_type,
                        value_type_name(value)
                    ));
                }
            }
        }
    }

    if errors.is_empty() {
        None
    } else {
        Some(format!(
            "Invalid arguments for tool '{}': {}",
            tool.name(),
            errors.join("; ")
        ))
    }
}

fn value_type_name(v: &Value) -> &'static str {
    match v {
        Value::String(_) => "string",
        Value::Number(_) => "number",
        Value::Bool(_) => "boolean",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
        Value::Null => "null",
    }
}
