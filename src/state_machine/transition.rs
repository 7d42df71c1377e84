//! Pure state transition function

use super::{CallContext, CallState, Effect, Event};
use crate::completion::classify;
use crate::config::{CallConfig, TransferMode, TransferTarget};
use crate::routes::Route;
use crate::tools::{ToolCall, ToolInput, CALL_TRANSFER_TOOL, TRANSFER_FAILED};
use crate::verbs::{DialTarget, DialVerb, RedirectCommand, Verb, RINGBACK_MEDIA};
use thiserror::Error;

/// Pause before the summary is read to the transfer target, in seconds
const CONFIRM_PAUSE_SECS: f64 = 1.0;

const SUMMARY_PREFIX: &str = "The summary of the conversation so far is: ";
const CALL_ENDED: &str = "The call has ended";

const TRANSFER_UNAVAILABLE: &str = "Call transfer is not available on this call";
const INVALID_TRANSFER_INPUT: &str = "Invalid input: conversation_summary is required";

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: CallState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: CallState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error)]
pub enum TransitionError {
    #[error("Transfer already requested (state: {0})")]
    TransferInProgress(&'static str),
    #[error("No confirmation armed (state: {0})")]
    ConfirmationNotArmed(&'static str),
    #[error("No transfer leg to report on (state: {0})")]
    NoTransferLeg(&'static str),
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function
///
/// Given the same inputs it always produces the same outputs. Nothing is
/// sent here; every reply or command is an effect for the runtime.
pub fn transition(
    state: &CallState,
    context: &CallContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // Closed absorbs everything, silently
        (CallState::Closed { .. }, _) => Ok(TransitionResult::new(state.clone())),

        // ============================================================
        // Session lifecycle
        // ============================================================
        (_, Event::SessionClosed { code, reason }) => Ok(TransitionResult::new(
            CallState::Closed {
                code,
                reason: reason.clone(),
            },
        )
        .with_effect(Effect::LogSessionEnd { code, reason })),

        (_, Event::SessionError { message }) => Ok(TransitionResult::new(CallState::Closed {
            code: None,
            reason: message.clone(),
        })
        .with_effect(Effect::LogSessionEnd {
            code: None,
            reason: message,
        })),

        // ============================================================
        // Conversation events
        // ============================================================
        (_, Event::ConversationEvent { kind, payload }) => {
            let result = TransitionResult::new(state.clone());
            if kind.as_deref() == Some("transcript") {
                Ok(result)
            } else {
                Ok(result.with_effect(Effect::LogConversationEvent { kind, payload }))
            }
        }

        (_, Event::Completion { msgid, completion }) => {
            let classification = classify(&completion);
            Ok(TransitionResult::new(state.clone())
                .with_effect(Effect::reply(msgid, classification.reply_verbs())))
        }

        // ============================================================
        // Tool invocation
        // ============================================================
        (CallState::Idle, Event::ToolInvocation { tool }) => Ok(start_transfer(context, tool)),

        (_, Event::ToolInvocation { .. }) => Err(TransitionError::TransferInProgress(state.name())),

        (
            CallState::ToolInvoked {
                tool_call_id,
                summary,
                confirm_armed,
            },
            Event::RedirectIssued {
                tool_call_id: issued,
            },
        ) if *tool_call_id == issued => Ok(TransitionResult::new(CallState::Transferring {
            summary: summary.clone(),
            confirm_armed: *confirm_armed,
        })
        .with_effect(Effect::tool_accepted(issued))),

        (
            CallState::ToolInvoked { tool_call_id, .. },
            Event::RedirectFailed {
                tool_call_id: failed,
                ..
            },
        ) if *tool_call_id == failed => Ok(TransitionResult::new(CallState::Idle)
            .with_effect(Effect::tool_failed(failed, TRANSFER_FAILED))),

        // ============================================================
        // Transfer leg
        // ============================================================
        (
            CallState::Transferring {
                summary,
                confirm_armed: true,
            },
            Event::Confirmation { msgid },
        ) => Ok(TransitionResult::new(CallState::ConfirmPending {
            summary: summary.clone(),
        })
        .with_effect(Effect::reply(
            msgid,
            vec![
                Verb::pause(CONFIRM_PAUSE_SECS),
                Verb::say(format!("{SUMMARY_PREFIX}{summary}")),
            ],
        ))),

        (_, Event::Confirmation { .. }) => {
            Err(TransitionError::ConfirmationNotArmed(state.name()))
        }

        (
            CallState::Transferring { .. } | CallState::ConfirmPending { .. },
            Event::DialOutcome { msgid, .. },
        ) => Ok(TransitionResult::new(CallState::Transferred).with_effect(Effect::reply(
            msgid,
            vec![Verb::say(CALL_ENDED), Verb::Hangup],
        ))),

        (_, Event::DialOutcome { .. }) => Err(TransitionError::NoTransferLeg(state.name())),

        (state, event) => Err(TransitionError::InvalidTransition(format!(
            "No transition from {} on {}",
            state.name(),
            event.name()
        ))),
    }
}

/// Handle a tool invocation while idle. Anything that cannot start a
/// transfer is answered with a failure result and leaves the call idle.
fn start_transfer(context: &CallContext, tool: ToolCall) -> TransitionResult {
    let summary = match tool.input {
        ToolInput::CallTransfer(input) => input.conversation_summary,
        ToolInput::Unknown { ref name, .. } if name == CALL_TRANSFER_TOOL => {
            return TransitionResult::new(CallState::Idle)
                .with_effect(Effect::tool_failed(tool.id, INVALID_TRANSFER_INPUT));
        }
        ToolInput::Unknown { name, .. } => {
            return TransitionResult::new(CallState::Idle)
                .with_effect(Effect::tool_failed(tool.id, format!("Unknown tool: {name}")));
        }
    };

    let Some(command) = redirect_command(&context.config) else {
        return TransitionResult::new(CallState::Idle)
            .with_effect(Effect::tool_failed(tool.id, TRANSFER_UNAVAILABLE));
    };

    TransitionResult::new(CallState::ToolInvoked {
        tool_call_id: tool.id.clone(),
        summary,
        confirm_armed: command.confirm_hook().is_some(),
    })
    .with_effect(Effect::IssueRedirect {
        tool_call_id: tool.id,
        command,
    })
}

/// The redirect a transfer issues for this call, if it offers one.
/// Only a warm transfer over dial arms the confirmation hook.
pub fn redirect_command(config: &CallConfig) -> Option<RedirectCommand> {
    if !config.transfer_mode.offers_transfer() {
        return None;
    }

    match config.transfer_target.as_ref()? {
        TransferTarget::Dial {
            number,
            caller_id,
            carrier,
        } => Some(RedirectCommand::Dial(DialVerb {
            action_hook: Route::DialOutcome.path().to_string(),
            caller_id: caller_id.clone(),
            dial_music: RINGBACK_MEDIA.to_string(),
            target: vec![DialTarget::Phone {
                number: number.clone(),
                trunk: carrier.clone(),
            }],
            confirm_hook: (config.transfer_mode == TransferMode::Warm)
                .then(|| Route::Confirmation.path().to_string()),
        })),
        TransferTarget::Refer { address } => Some(RedirectCommand::Refer {
            refer_to: address.clone(),
        }),
    }
}
