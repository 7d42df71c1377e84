//! Effects produced by state transitions

use crate::tools::{ToolResult, TRANSFER_ACCEPTED};
use crate::verbs::{RedirectCommand, Verb};
use serde_json::Value;

/// Effects to be executed after state transition
#[derive(Debug, Clone)]
pub enum Effect {
    /// Answer a hook frame with the verbs to run next
    Reply { msgid: String, verbs: Vec<Verb> },

    /// Send a redirect command. The runtime reports the outcome back as
    /// `RedirectIssued` or `RedirectFailed`.
    IssueRedirect {
        tool_call_id: String,
        command: RedirectCommand,
    },

    /// Return a tool result to the LLM
    SendToolResult { result: ToolResult },

    /// Record a mid-conversation event
    LogConversationEvent { kind: Option<String>, payload: Value },

    /// Record the end of the session
    LogSessionEnd { code: Option<u16>, reason: String },
}

impl Effect {
    pub fn reply(msgid: impl Into<String>, verbs: Vec<Verb>) -> Self {
        Effect::Reply {
            msgid: msgid.into(),
            verbs,
        }
    }

    pub fn tool_accepted(tool_call_id: impl Into<String>) -> Self {
        Effect::SendToolResult {
            result: ToolResult::success(tool_call_id, TRANSFER_ACCEPTED),
        }
    }

    pub fn tool_failed(tool_call_id: impl Into<String>, message: impl Into<String>) -> Self {
        Effect::SendToolResult {
            result: ToolResult::error(tool_call_id, message),
        }
    }
}
