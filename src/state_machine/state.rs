//! Call state types

use crate::config::CallConfig;
use std::sync::Arc;

/// Transfer progress of one call
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CallState {
    /// Conversation active, no transfer requested
    #[default]
    Idle,

    /// Transfer tool fired; redirect command being issued
    ToolInvoked {
        tool_call_id: String,
        summary: String,
        /// Whether the command being issued carries a confirmation hook
        confirm_armed: bool,
    },

    /// Redirect command issued, waiting on the transfer leg
    Transferring {
        /// Conversation summary captured from the tool invocation
        summary: String,
        confirm_armed: bool,
    },

    /// Transfer leg answered, summary being played to it (warm dial only)
    ConfirmPending { summary: String },

    /// Transfer leg ended; caller told and hung up
    Transferred,

    /// Session closed or failed (terminal)
    Closed { code: Option<u16>, reason: String },
}

impl CallState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, CallState::Closed { .. })
    }

    pub fn name(&self) -> &'static str {
        match self {
            CallState::Idle => "idle",
            CallState::ToolInvoked { .. } => "tool_invoked",
            CallState::Transferring { .. } => "transferring",
            CallState::ConfirmPending { .. } => "confirm_pending",
            CallState::Transferred => "transferred",
            CallState::Closed { .. } => "closed",
        }
    }

    /// The stored conversation summary, while a transfer holds one
    pub fn summary(&self) -> Option<&str> {
        match self {
            CallState::ToolInvoked { summary, .. }
            | CallState::Transferring { summary, .. }
            | CallState::ConfirmPending { summary } => Some(summary),
            _ => None,
        }
    }
}

/// Context for a call (immutable configuration)
#[derive(Debug, Clone)]
pub struct CallContext {
    pub call_sid: String,
    pub config: Arc<CallConfig>,
}

impl CallContext {
    pub fn new(call_sid: impl Into<String>, config: CallConfig) -> Self {
        Self {
            call_sid: call_sid.into(),
            config: Arc::new(config),
        }
    }
}
