//! Events that can occur on a call

use crate::completion::CompletionEvent;
use crate::tools::ToolCall;
use serde_json::Value;

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // Conversation events
    ConversationEvent {
        kind: Option<String>,
        payload: Value,
    },
    Completion {
        msgid: String,
        completion: CompletionEvent,
    },

    // Tool events
    ToolInvocation {
        tool: ToolCall,
    },
    /// Redirect command accepted by the transport
    RedirectIssued {
        tool_call_id: String,
    },
    /// Redirect command could not be sent
    RedirectFailed {
        tool_call_id: String,
        message: String,
    },

    // Transfer leg events
    DialOutcome {
        msgid: String,
        payload: Value,
    },
    Confirmation {
        msgid: String,
    },

    // Session events
    SessionClosed {
        code: Option<u16>,
        reason: String,
    },
    SessionError {
        message: String,
    },
}

impl Event {
    /// Message id of the hook frame that expects a reply, if any
    pub fn hook_msgid(&self) -> Option<&str> {
        match self {
            Event::Completion { msgid, .. }
            | Event::DialOutcome { msgid, .. }
            | Event::Confirmation { msgid } => Some(msgid),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Event::ConversationEvent { .. } => "conversation_event",
            Event::Completion { .. } => "completion",
            Event::ToolInvocation { .. } => "tool_invocation",
            Event::RedirectIssued { .. } => "redirect_issued",
            Event::RedirectFailed { .. } => "redirect_failed",
            Event::DialOutcome { .. } => "dial_outcome",
            Event::Confirmation { .. } => "confirmation",
            Event::SessionClosed { .. } => "session_closed",
            Event::SessionError { .. } => "session_error",
        }
    }
}
