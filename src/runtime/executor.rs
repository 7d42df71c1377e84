//! Call runtime executor

use super::traits::CallTransport;
use crate::protocol::OutboundMessage;
use crate::state_machine::{transition, CallContext, CallState, Effect, Event};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Drives one call: feeds events through the state machine and carries out
/// the resulting effects on the transport.
pub struct CallRuntime<T: CallTransport + 'static> {
    context: CallContext,
    state: CallState,
    transport: Arc<T>,
    event_rx: mpsc::Receiver<Event>,
}

impl<T: CallTransport + 'static> CallRuntime<T> {
    pub fn new(context: CallContext, transport: Arc<T>, event_rx: mpsc::Receiver<Event>) -> Self {
        Self {
            context,
            state: CallState::Idle,
            transport,
            event_rx,
        }
    }

    /// Run until the session closes or every event sender is dropped.
    /// Returns the final state.
    pub async fn run(mut self) -> CallState {
        tracing::info!(call_sid = %self.context.call_sid, "Starting call runtime");

        while let Some(event) = self.event_rx.recv().await {
            if let Err(e) = self.process_event(event).await {
                tracing::warn!(error = %e, state = self.state.name(), "Error handling event");
            }
            if self.state.is_terminal() {
                break;
            }
        }

        tracing::info!(
            call_sid = %self.context.call_sid,
            state = self.state.name(),
            "Call runtime stopped"
        );
        self.state
    }

    async fn process_event(&mut self, event: Event) -> Result<(), String> {
        // Effects may generate follow-up events; process them in a loop
        let mut events_to_process = vec![event];

        while let Some(current_event) = events_to_process.pop() {
            let event_name = current_event.name();
            if let Event::ToolInvocation { tool } = &current_event {
                tracing::info!(tool = tool.name(), tool_call_id = %tool.id, "Tool invoked");
            }
            let ack_msgid = current_event.hook_msgid().map(str::to_string);

            let result = match transition(&self.state, &self.context, current_event) {
                Ok(r) => r,
                Err(e) => {
                    // Hook frames still need an answer or the control layer waits on them
                    if let Some(msgid) = ack_msgid {
                        if let Err(send_err) =
                            self.transport.send(OutboundMessage::ack(msgid, vec![])).await
                        {
                            tracing::warn!(error = %send_err, "Failed to ack rejected hook");
                        }
                    }
                    return Err(format!("{event_name}: {e}"));
                }
            };

            let old_state = std::mem::replace(&mut self.state, result.new_state);
            if old_state.name() != self.state.name() {
                tracing::info!(
                    from = old_state.name(),
                    to = self.state.name(),
                    event = event_name,
                    summary_held = self.state.summary().is_some(),
                    "State transition"
                );
            }

            for effect in result.effects {
                if let Some(generated_event) = self.execute_effect(effect).await? {
                    events_to_process.push(generated_event);
                }
            }
        }

        Ok(())
    }

    async fn execute_effect(&mut self, effect: Effect) -> Result<Option<Event>, String> {
        match effect {
            Effect::Reply { msgid, verbs } => {
                self.transport
                    .send(OutboundMessage::ack(msgid, verbs))
                    .await
                    .map_err(|e| e.to_string())?;
                Ok(None)
            }

            Effect::IssueRedirect {
                tool_call_id,
                command,
            } => {
                let verbs = command.into_verbs();
                tracing::info!(
                    tool_call_id = %tool_call_id,
                    verb = verbs.first().map_or("none", |v| v.name()),
                    "Issuing transfer redirect"
                );
                match self.transport.send(OutboundMessage::redirect(verbs)).await {
                    Ok(()) => Ok(Some(Event::RedirectIssued { tool_call_id })),
                    Err(e) => {
                        tracing::error!(error = %e, "Error transferring call");
                        Ok(Some(Event::RedirectFailed {
                            tool_call_id,
                            message: e.to_string(),
                        }))
                    }
                }
            }

            Effect::SendToolResult { result } => {
                tracing::debug!(
                    invocation_id = %result.invocation_id,
                    is_error = result.is_error(),
                    "Sending tool result"
                );
                self.transport
                    .send(OutboundMessage::tool_output(result))
                    .await
                    .map_err(|e| e.to_string())?;
                Ok(None)
            }

            Effect::LogConversationEvent { kind, payload } => {
                tracing::info!(
                    kind = kind.as_deref().unwrap_or("unknown"),
                    payload = %payload,
                    "Conversation event"
                );
                Ok(None)
            }

            Effect::LogSessionEnd { code, reason } => {
                tracing::info!(code = ?code, reason = %reason, "Session closed");
                Ok(None)
            }
        }
    }
}
