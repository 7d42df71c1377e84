//! Per-call WebSocket connection

use crate::protocol::{Inbound, InboundMessage, OutboundMessage};
use crate::runtime::{CallHandle, CallRegistry, CallTransport, Outgoing, SocketTransport};
use crate::state_machine::Event;
use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::Instrument;
use uuid::Uuid;

const OUTBOUND_CHANNEL_CAPACITY: usize = 64;

/// Serve one control-layer connection until it closes
pub(super) async fn serve_socket(socket: WebSocket, registry: Arc<CallRegistry>) {
    let span = tracing::info_span!("connection", id = %Uuid::new_v4());
    run_socket(socket, registry).instrument(span).await;
}

async fn run_socket(socket: WebSocket, registry: Arc<CallRegistry>) {
    let (mut sink, mut stream) = socket.split();
    let (out_tx, mut out_rx) = mpsc::channel::<Outgoing>(OUTBOUND_CHANNEL_CAPACITY);

    // Writer task: sole owner of the sink. Ends when every transport clone
    // is dropped or after a close frame.
    tokio::spawn(
        async move {
            while let Some(outgoing) = out_rx.recv().await {
                let message = match outgoing {
                    Outgoing::Text(text) => Message::Text(text),
                    Outgoing::Close { code, reason } => {
                        let frame = CloseFrame {
                            code,
                            reason: reason.into(),
                        };
                        if let Err(e) = sink.send(Message::Close(Some(frame))).await {
                            tracing::debug!(error = %e, "Failed to send close frame");
                        }
                        break;
                    }
                };
                if let Err(e) = sink.send(message).await {
                    tracing::warn!(error = %e, "Failed to write frame");
                    break;
                }
            }
        }
        .in_current_span(),
    );

    let transport = Arc::new(SocketTransport::new(out_tx));
    let mut connection = Connection::new(registry, transport);
    tracing::info!("Connection opened");

    let end = loop {
        match stream.next().await {
            Some(Ok(Message::Text(text))) => connection.handle_text(&text).await,
            Some(Ok(Message::Close(frame))) => {
                break Event::SessionClosed {
                    code: frame.as_ref().map(|f| f.code),
                    reason: frame.map(|f| f.reason.into_owned()).unwrap_or_default(),
                };
            }
            // Pings are answered by the socket itself
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                break Event::SessionError {
                    message: e.to_string(),
                };
            }
            None => {
                break Event::SessionClosed {
                    code: None,
                    reason: "connection dropped".to_string(),
                };
            }
        }
    };

    connection.finish(end).await;
}

/// Routes the frames of one connection to its call
pub struct Connection<T: CallTransport + 'static> {
    registry: Arc<CallRegistry>,
    transport: Arc<T>,
    call: Option<CallHandle>,
}

impl<T: CallTransport + 'static> Connection<T> {
    pub fn new(registry: Arc<CallRegistry>, transport: Arc<T>) -> Self {
        Self {
            registry,
            transport,
            call: None,
        }
    }

    pub async fn handle_text(&mut self, text: &str) {
        let inbound = match InboundMessage::parse(text).and_then(InboundMessage::into_inbound) {
            Ok(inbound) => inbound,
            Err(e) => {
                tracing::warn!(error = %e, "Dropping inbound frame");
                return;
            }
        };

        match inbound {
            Inbound::SessionNew {
                call_sid,
                msgid,
                env_vars,
            } => {
                if let Some(call) = &self.call {
                    tracing::warn!(call_sid = %call.call_sid, "Ignoring repeated session:new");
                    return;
                }
                tracing::info!(call_sid = %call_sid, "New call");
                let started = self
                    .registry
                    .start_call(&call_sid, &msgid, &env_vars, Arc::clone(&self.transport))
                    .await;
                // Setup errors are logged and the connection closed by the registry
                self.call = started.ok();
            }

            Inbound::Event(event) => match &self.call {
                Some(call) => {
                    if !call.send(event).await {
                        tracing::debug!(call_sid = %call.call_sid, "Event after call ended");
                    }
                }
                None => {
                    tracing::warn!(event = event.name(), "Event before session:new");
                    if let Some(msgid) = event.hook_msgid() {
                        self.ack_empty(msgid).await;
                    }
                }
            },

            Inbound::UnhandledHook { msgid, hook } => {
                tracing::warn!(hook = %hook, "No handler for hook");
                if let Some(msgid) = msgid {
                    self.ack_empty(&msgid).await;
                }
            }

            Inbound::CallStatus { data } => {
                tracing::info!(
                    call_status = data.get("call_status").and_then(|s| s.as_str()).unwrap_or("unknown"),
                    "Call status"
                );
            }

            Inbound::ControlError { message } => {
                tracing::warn!(error = %message, "Control layer reported an error");
            }

            Inbound::Ignored => tracing::debug!("Ignoring frame"),
        }
    }

    async fn ack_empty(&self, msgid: &str) {
        if let Err(e) = self.transport.send(OutboundMessage::ack(msgid, vec![])).await {
            tracing::warn!(error = %e, "Failed to ack hook");
        }
    }

    /// Hand the connection's end to the call, which stops its runtime
    pub async fn finish(self, end: Event) {
        tracing::info!(event = end.name(), "Connection ended");
        if let Some(call) = self.call {
            call.send(end).await;
        }
    }
}
