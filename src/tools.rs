//! Tools offered to the LLM
//!
//! Only one tool exists: `call-transfer`. It is a client tool, so the LLM
//! vendor never calls a URL for it; invocations arrive on the tool hook and
//! are answered with a `llm:tool-output` command.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Name under which the transfer tool is offered
pub const CALL_TRANSFER_TOOL: &str = "call-transfer";

/// Tool-result text when the redirect command went out
pub const TRANSFER_ACCEPTED: &str =
    "Successfully transferred call to agent, telling user to wait for a moment.";

/// Tool-result text when the redirect command could not be issued
pub const TRANSFER_FAILED: &str = "Failed to transfer call";

// ============================================================================
// Tool Definitions
// ============================================================================

/// Tool definition in vendor-neutral form
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

impl ToolDefinition {
    pub fn call_transfer() -> Self {
        Self {
            name: CALL_TRANSFER_TOOL.to_string(),
            description: "Transfers the call to a human agent".to_string(),
            input_schema: json!({
                "type": "object",
                "required": ["conversation_summary"],
                "properties": {
                    "conversation_summary": {
                        "type": "string",
                        "description": "A summary of the conversation so far"
                    }
                }
            }),
        }
    }

    /// Convert to the vendor's `selectedTools` entry. Each schema property
    /// becomes a body parameter.
    pub fn to_selected_tool(&self) -> SelectedTool {
        let required: Vec<&str> = self.input_schema["required"]
            .as_array()
            .map(|names| names.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        let dynamic_parameters = self.input_schema["properties"]
            .as_object()
            .map(|props| {
                props
                    .iter()
                    .map(|(name, schema)| DynamicParameter {
                        name: name.clone(),
                        location: "PARAMETER_LOCATION_BODY".to_string(),
                        schema: schema.clone(),
                        required: required.contains(&name.as_str()),
                    })
                    .collect()
            })
            .unwrap_or_default();

        SelectedTool {
            temporary_tool: TemporaryTool {
                model_tool_name: self.name.clone(),
                description: self.description.clone(),
                dynamic_parameters,
                client: ClientImplementation {},
            },
        }
    }
}

/// One entry of `llmOptions.selectedTools`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedTool {
    pub temporary_tool: TemporaryTool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemporaryTool {
    pub model_tool_name: String,
    pub description: String,
    pub dynamic_parameters: Vec<DynamicParameter>,
    /// Marks the tool as resolved by the client, with no direct output
    pub client: ClientImplementation,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DynamicParameter {
    pub name: String,
    pub location: String,
    pub schema: Value,
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientImplementation {}

// ============================================================================
// Tool Invocations
// ============================================================================

/// Input for the `call-transfer` tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallTransferInput {
    pub conversation_summary: String,
}

/// Strongly typed tool input
#[derive(Debug, Clone, PartialEq)]
pub enum ToolInput {
    CallTransfer(CallTransferInput),
    /// Fallback for unknown tools or parsing failures
    Unknown { name: String, input: Value },
}

impl ToolInput {
    pub fn tool_name(&self) -> &str {
        match self {
            ToolInput::CallTransfer(_) => CALL_TRANSFER_TOOL,
            ToolInput::Unknown { name, .. } => name,
        }
    }

    /// Parse from tool name and JSON arguments
    pub fn from_name_and_value(name: &str, value: Value) -> Self {
        match name {
            CALL_TRANSFER_TOOL => serde_json::from_value(value.clone()).map_or_else(
                |_| ToolInput::Unknown {
                    name: name.to_string(),
                    input: value,
                },
                ToolInput::CallTransfer,
            ),
            _ => ToolInput::Unknown {
                name: name.to_string(),
                input: value,
            },
        }
    }
}

/// A tool invocation from the LLM
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub input: ToolInput,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, input: ToolInput) -> Self {
        Self {
            id: id.into(),
            input,
        }
    }

    pub fn name(&self) -> &str {
        self.input.tool_name()
    }
}

/// Tool-hook payload as delivered by the control layer
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCallPayload {
    pub name: String,
    pub tool_call_id: String,
    #[serde(default)]
    pub args: Value,
}

impl From<ToolCallPayload> for ToolCall {
    fn from(payload: ToolCallPayload) -> Self {
        ToolCall::new(
            payload.tool_call_id,
            ToolInput::from_name_and_value(&payload.name, payload.args),
        )
    }
}

// ============================================================================
// Tool Results
// ============================================================================

/// Result returned to the LLM for one invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolResult {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub invocation_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ToolResult {
    const KIND: &'static str = "client_tool_result";

    pub fn success(invocation_id: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            kind: Self::KIND,
            invocation_id: invocation_id.into(),
            result: Some(output.into()),
            error_message: None,
        }
    }

    pub fn error(invocation_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: Self::KIND,
            invocation_id: invocation_id.into(),
            result: None,
            error_message: Some(message.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error_message.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_transfer_selected_tool_shape() {
        let tool = ToolDefinition::call_transfer().to_selected_tool();
        assert_eq!(
            serde_json::to_value(&tool).unwrap(),
            json!({
                "temporaryTool": {
                    "modelToolName": "call-transfer",
                    "description": "Transfers the call to a human agent",
                    "dynamicParameters": [{
                        "name": "conversation_summary",
                        "location": "PARAMETER_LOCATION_BODY",
                        "schema": {
                            "type": "string",
                            "description": "A summary of the conversation so far"
                        },
                        "required": true
                    }],
                    "client": {}
                }
            })
        );
    }

    #[test]
    fn test_parse_call_transfer() {
        let input = ToolInput::from_name_and_value(
            "call-transfer",
            json!({"conversation_summary": "Caller wants a refund"}),
        );
        assert_eq!(
            input,
            ToolInput::CallTransfer(CallTransferInput {
                conversation_summary: "Caller wants a refund".to_string()
            })
        );
    }

    #[test]
    fn test_missing_summary_falls_back_to_unknown() {
        let input = ToolInput::from_name_and_value("call-transfer", json!({}));
        assert!(matches!(input, ToolInput::Unknown { .. }));
        assert_eq!(input.tool_name(), "call-transfer");
    }

    #[test]
    fn test_unknown_tool() {
        let input = ToolInput::from_name_and_value("book-flight", json!({"to": "SFO"}));
        assert_eq!(input.tool_name(), "book-flight");
    }

    #[test]
    fn test_payload_conversion() {
        let payload: ToolCallPayload = serde_json::from_value(json!({
            "name": "call-transfer",
            "tool_call_id": "abc-123",
            "args": {"conversation_summary": "Billing question"}
        }))
        .unwrap();
        let call = ToolCall::from(payload);
        assert_eq!(call.id, "abc-123");
        assert_eq!(call.name(), "call-transfer");
    }

    #[test]
    fn test_result_payloads() {
        assert_eq!(
            serde_json::to_value(ToolResult::success("id-1", TRANSFER_ACCEPTED)).unwrap(),
            json!({
                "type": "client_tool_result",
                "invocation_id": "id-1",
                "result": TRANSFER_ACCEPTED
            })
        );

        let failure = ToolResult::error("id-2", TRANSFER_FAILED);
        assert!(failure.is_error());
        assert_eq!(
            serde_json::to_value(&failure).unwrap(),
            json!({
                "type": "client_tool_result",
                "invocation_id": "id-2",
                "error_message": TRANSFER_FAILED
            })
        );
    }
}
