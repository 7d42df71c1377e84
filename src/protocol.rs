//! Control-layer WebSocket frames
//!
//! Every inbound frame is JSON with a `type` discriminator. Hook frames name
//! the callback route they belong to in `hook`; that is how they are routed
//! to the call's state machine.

use crate::completion::CompletionEvent;
use crate::routes::Route;
use crate::state_machine::Event;
use crate::tools::{ToolCallPayload, ToolResult};
use crate::verbs::Verb;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// WebSocket subprotocol spoken by the control layer
pub const SUBPROTOCOL: &str = "ws.jambonz.org";

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("{kind} frame is missing `{field}`")]
    MissingField {
        kind: &'static str,
        field: &'static str,
    },
    #[error("bad payload on hook {hook}: {source}")]
    BadPayload {
        hook: String,
        source: serde_json::Error,
    },
}

// ============================================================================
// Inbound Frames
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum MessageKind {
    #[serde(rename = "session:new")]
    SessionNew,
    #[serde(rename = "verb:hook")]
    VerbHook,
    #[serde(rename = "llm:event")]
    LlmEvent,
    #[serde(rename = "llm:tool-call")]
    LlmToolCall,
    #[serde(rename = "call:status")]
    CallStatus,
    #[serde(rename = "jambonz:error")]
    Error,
    #[serde(other)]
    Other,
}

impl MessageKind {
    fn name(self) -> &'static str {
        match self {
            MessageKind::SessionNew => "session:new",
            MessageKind::VerbHook => "verb:hook",
            MessageKind::LlmEvent => "llm:event",
            MessageKind::LlmToolCall => "llm:tool-call",
            MessageKind::CallStatus => "call:status",
            MessageKind::Error => "jambonz:error",
            MessageKind::Other => "unknown",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct InboundMessage {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    #[serde(default)]
    pub msgid: Option<String>,
    #[serde(default)]
    pub call_sid: Option<String>,
    #[serde(default)]
    pub hook: Option<String>,
    #[serde(default)]
    pub data: Value,
}

/// What an inbound frame means for the connection
#[derive(Debug, Clone)]
pub enum Inbound {
    /// A new call arrived; reply to `msgid` with its script
    SessionNew {
        call_sid: String,
        msgid: String,
        env_vars: Map<String, Value>,
    },
    /// Input for the call's state machine
    Event(Event),
    /// Hook frame for a path no handler is attached to
    UnhandledHook { msgid: Option<String>, hook: String },
    CallStatus { data: Value },
    /// Error reported by the control layer; the socket stays open
    ControlError { message: String },
    Ignored,
}

impl InboundMessage {
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn into_inbound(self) -> Result<Inbound, ProtocolError> {
        match self.kind {
            MessageKind::SessionNew => {
                let call_sid = self
                    .call_sid
                    .clone()
                    .or_else(|| {
                        self.data
                            .get("call_sid")
                            .and_then(Value::as_str)
                            .map(str::to_string)
                    })
                    .ok_or_else(|| self.missing("call_sid"))?;
                let msgid = self.msgid.clone().ok_or_else(|| self.missing("msgid"))?;
                let env_vars = self
                    .data
                    .get("env_vars")
                    .and_then(Value::as_object)
                    .cloned()
                    .unwrap_or_default();
                Ok(Inbound::SessionNew {
                    call_sid,
                    msgid,
                    env_vars,
                })
            }
            MessageKind::VerbHook | MessageKind::LlmEvent | MessageKind::LlmToolCall => {
                self.route_hook()
            }
            MessageKind::CallStatus => Ok(Inbound::CallStatus { data: self.data }),
            MessageKind::Error => Ok(Inbound::ControlError {
                message: error_message(&self.data),
            }),
            MessageKind::Other => Ok(Inbound::Ignored),
        }
    }

    fn route_hook(self) -> Result<Inbound, ProtocolError> {
        let hook = self.hook.clone().ok_or_else(|| self.missing("hook"))?;
        let Some(route) = Route::from_path(&hook) else {
            return Ok(Inbound::UnhandledHook {
                msgid: self.msgid,
                hook,
            });
        };

        let event = match route {
            Route::ConversationEvent => Event::ConversationEvent {
                kind: self
                    .data
                    .get("type")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                payload: self.data,
            },
            Route::Completion => Event::Completion {
                msgid: self.msgid.clone().ok_or_else(|| self.missing("msgid"))?,
                completion: completion_event(&self.data),
            },
            Route::ToolInvocation => {
                let payload: ToolCallPayload = serde_json::from_value(self.data)
                    .map_err(|source| ProtocolError::BadPayload { hook, source })?;
                Event::ToolInvocation {
                    tool: payload.into(),
                }
            }
            Route::DialOutcome => Event::DialOutcome {
                msgid: self.msgid.clone().ok_or_else(|| self.missing("msgid"))?,
                payload: self.data,
            },
            Route::Confirmation => Event::Confirmation {
                msgid: self.msgid.clone().ok_or_else(|| self.missing("msgid"))?,
            },
        };

        Ok(Inbound::Event(event))
    }

    fn missing(&self, field: &'static str) -> ProtocolError {
        ProtocolError::MissingField {
            kind: self.kind.name(),
            field,
        }
    }
}

/// Read a completion payload leniently. Fields of the wrong type are
/// treated as absent.
fn completion_event(data: &Value) -> CompletionEvent {
    CompletionEvent {
        completion_reason: data
            .get("completion_reason")
            .and_then(Value::as_str)
            .map(str::to_string),
        error: data.get("error").cloned(),
    }
}

fn error_message(data: &Value) -> String {
    match data.get("error").or_else(|| data.get("message")) {
        Some(Value::String(message)) => message.clone(),
        Some(other) => other.to_string(),
        None => data.to_string(),
    }
}

// ============================================================================
// Outbound Frames
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutboundMessage {
    /// Reply to a hook frame
    Ack {
        msgid: String,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        data: Vec<Verb>,
    },
    /// Unsolicited instruction for the call
    Command(Command),
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "command")]
pub enum Command {
    /// Replace the call's current verb stack
    #[serde(rename = "redirect", rename_all = "camelCase")]
    Redirect {
        queue_command: bool,
        data: Vec<Verb>,
    },
    /// Return a tool result to the LLM
    #[serde(rename = "llm:tool-output")]
    ToolOutput {
        tool_call_id: String,
        data: ToolResult,
    },
}

impl OutboundMessage {
    pub fn ack(msgid: impl Into<String>, verbs: Vec<Verb>) -> Self {
        OutboundMessage::Ack {
            msgid: msgid.into(),
            data: verbs,
        }
    }

    pub fn redirect(verbs: Vec<Verb>) -> Self {
        OutboundMessage::Command(Command::Redirect {
            queue_command: false,
            data: verbs,
        })
    }

    pub fn tool_output(result: ToolResult) -> Self {
        OutboundMessage::Command(Command::ToolOutput {
            tool_call_id: result.invocation_id.clone(),
            data: result,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{ToolInput, TRANSFER_FAILED};
    use serde_json::json;

    fn inbound(frame: Value) -> Inbound {
        InboundMessage::parse(&frame.to_string())
            .unwrap()
            .into_inbound()
            .unwrap()
    }

    #[test]
    fn test_session_new() {
        let frame = json!({
            "type": "session:new",
            "msgid": "m0",
            "call_sid": "CA123",
            "data": {
                "call_sid": "CA123",
                "from": "+15550000000",
                "env_vars": {"CALL_TRANSFER": "Warm"}
            }
        });

        match inbound(frame) {
            Inbound::SessionNew {
                call_sid,
                msgid,
                env_vars,
            } => {
                assert_eq!(call_sid, "CA123");
                assert_eq!(msgid, "m0");
                assert_eq!(env_vars["CALL_TRANSFER"], "Warm");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_session_new_without_msgid_is_error() {
        let err = InboundMessage::parse(r#"{"type":"session:new","call_sid":"CA1"}"#)
            .unwrap()
            .into_inbound()
            .unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::MissingField {
                field: "msgid",
                ..
            }
        ));
    }

    #[test]
    fn test_tool_call_routes_to_invocation() {
        let frame = json!({
            "type": "llm:tool-call",
            "hook": "/toolCall",
            "data": {
                "name": "call-transfer",
                "tool_call_id": "tc1",
                "args": {"conversation_summary": "wants a human"}
            }
        });

        match inbound(frame) {
            Inbound::Event(Event::ToolInvocation { tool }) => {
                assert_eq!(tool.id, "tc1");
                assert!(matches!(tool.input, ToolInput::CallTransfer(_)));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_tool_call_without_id_is_bad_payload() {
        let err = InboundMessage::parse(
            r#"{"type":"llm:tool-call","hook":"/toolCall","data":{"name":"call-transfer"}}"#,
        )
        .unwrap()
        .into_inbound()
        .unwrap_err();
        assert!(matches!(err, ProtocolError::BadPayload { .. }));
    }

    #[test]
    fn test_verb_hooks_route_by_path() {
        let completion = inbound(json!({
            "type": "verb:hook",
            "msgid": "m1",
            "hook": "/final",
            "data": {"completion_reason": "server failure", "error": "oops"}
        }));
        match completion {
            Inbound::Event(Event::Completion { msgid, completion }) => {
                assert_eq!(msgid, "m1");
                assert_eq!(completion.completion_reason.as_deref(), Some("server failure"));
            }
            other => panic!("unexpected {other:?}"),
        }

        let confirm = inbound(json!({"type": "verb:hook", "msgid": "m2", "hook": "/confirmAction"}));
        assert!(matches!(confirm, Inbound::Event(Event::Confirmation { .. })));

        let dial = inbound(json!({"type": "verb:hook", "msgid": "m3", "hook": "/dialAction", "data": {}}));
        assert!(matches!(dial, Inbound::Event(Event::DialOutcome { .. })));
    }

    #[test]
    fn test_conversation_event_kind() {
        let event = inbound(json!({
            "type": "llm:event",
            "hook": "/event",
            "data": {"type": "transcript", "text": "hi"}
        }));
        match event {
            Inbound::Event(Event::ConversationEvent { kind, .. }) => {
                assert_eq!(kind.as_deref(), Some("transcript"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_unknown_hook_is_unhandled() {
        let frame = inbound(json!({"type": "verb:hook", "msgid": "m4", "hook": "/elsewhere"}));
        assert!(matches!(
            frame,
            Inbound::UnhandledHook { msgid: Some(_), .. }
        ));
    }

    #[test]
    fn test_unknown_type_ignored_and_error_reported() {
        assert!(matches!(
            inbound(json!({"type": "session:reconnect"})),
            Inbound::Ignored
        ));
        match inbound(json!({"type": "jambonz:error", "data": {"error": "media timeout"}})) {
            Inbound::ControlError { message } => assert_eq!(message, "media timeout"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_outbound_shapes() {
        assert_eq!(
            serde_json::to_value(OutboundMessage::ack("m1", vec![])).unwrap(),
            json!({"type": "ack", "msgid": "m1"})
        );
        assert_eq!(
            serde_json::to_value(OutboundMessage::redirect(vec![Verb::Hangup])).unwrap(),
            json!({
                "type": "command",
                "command": "redirect",
                "queueCommand": false,
                "data": [{"verb": "hangup"}]
            })
        );
        assert_eq!(
            serde_json::to_value(OutboundMessage::tool_output(ToolResult::error(
                "tc1",
                TRANSFER_FAILED
            )))
            .unwrap(),
            json!({
                "type": "command",
                "command": "llm:tool-output",
                "tool_call_id": "tc1",
                "data": {
                    "type": "client_tool_result",
                    "invocation_id": "tc1",
                    "error_message": "Failed to transfer call"
                }
            })
        );
    }
}
