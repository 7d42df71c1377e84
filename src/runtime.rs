//! Runtime for executing calls
//!
//! One `CallRuntime` task per call. The registry tracks the live ones so
//! the socket layer can route events to them.

mod executor;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::CallRuntime;
pub use traits::*;

use crate::protocol::OutboundMessage;
use crate::script::{configure_call, SetupError};
use crate::state_machine::{CallContext, Event};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::Instrument;

/// Close code sent when a call cannot be set up
pub const SETUP_FAILED_CLOSE_CODE: u16 = 1011;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Handle to interact with a running call
#[derive(Debug, Clone)]
pub struct CallHandle {
    pub call_sid: String,
    pub event_tx: mpsc::Sender<Event>,
}

impl CallHandle {
    /// Deliver an event to the call. Returns false once the call has ended.
    pub async fn send(&self, event: Event) -> bool {
        self.event_tx.send(event).await.is_ok()
    }
}

/// Registry of all live calls
pub struct CallRegistry {
    /// Fallback values for per-call settings
    call_defaults: HashMap<String, String>,
    calls: RwLock<HashMap<String, CallHandle>>,
}

impl CallRegistry {
    pub fn new(call_defaults: HashMap<String, String>) -> Self {
        Self {
            call_defaults,
            calls: RwLock::new(HashMap::new()),
        }
    }

    pub async fn active_calls(&self) -> usize {
        self.calls.read().await.len()
    }

    /// Configure a new call, start its runtime and answer `session:new`
    /// with the call script.
    ///
    /// The runtime is registered before the script goes out, so no event
    /// the script provokes can arrive ahead of it. On a configuration error
    /// the connection is closed and no runtime is started.
    pub async fn start_call<T: CallTransport + 'static>(
        self: &Arc<Self>,
        call_sid: &str,
        msgid: &str,
        env_vars: &Map<String, Value>,
        transport: Arc<T>,
    ) -> Result<CallHandle, SetupError> {
        let (config, script) = match configure_call(env_vars, &self.call_defaults) {
            Ok(configured) => configured,
            Err(e) => {
                tracing::error!(call_sid, error = %e, "Call setup failed");
                if let Err(close_err) = transport
                    .close(SETUP_FAILED_CLOSE_CODE, "call setup failed")
                    .await
                {
                    tracing::warn!(error = %close_err, "Failed to close connection");
                }
                return Err(e);
            }
        };

        tracing::info!(
            call_sid,
            transfer_mode = ?config.transfer_mode,
            transfer_mechanism = ?config.transfer_mechanism,
            "Call configured"
        );

        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let handle = CallHandle {
            call_sid: call_sid.to_string(),
            event_tx,
        };

        {
            let mut calls = self.calls.write().await;
            if calls.insert(call_sid.to_string(), handle.clone()).is_some() {
                tracing::warn!(call_sid, "Replacing runtime for duplicate call_sid");
            }
        }

        let context = CallContext::new(call_sid, config);
        let runtime = CallRuntime::new(context, Arc::clone(&transport), event_rx);
        let registry = Arc::clone(self);
        let sid = call_sid.to_string();
        let span = tracing::info_span!("call", call_sid = %sid);
        let own_tx = handle.event_tx.clone();

        tokio::spawn(
            async move {
                runtime.run().await;
                registry.remove(&sid, &own_tx).await;
            }
            .instrument(span),
        );

        if let Err(e) = transport.send(OutboundMessage::ack(msgid, script)).await {
            let _ = handle
                .send(Event::SessionError {
                    message: e.to_string(),
                })
                .await;
            return Err(e.into());
        }

        Ok(handle)
    }

    /// Drop a finished call, unless its sid was taken over by a newer one
    async fn remove(&self, call_sid: &str, event_tx: &mpsc::Sender<Event>) {
        let mut calls = self.calls.write().await;
        if calls
            .get(call_sid)
            .is_some_and(|h| h.event_tx.same_channel(event_tx))
        {
            calls.remove(call_sid);
        }
    }
}
