//! Trait abstractions for runtime I/O
//!
//! The executor only talks to the control layer through `CallTransport`, so
//! it can be tested with the mock in `testing`.

use crate::protocol::OutboundMessage;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection closed")]
    Closed,
    #[error("failed to encode frame: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Outbound side of one call's control connection
#[async_trait]
pub trait CallTransport: Send + Sync {
    /// Send one frame
    async fn send(&self, message: OutboundMessage) -> Result<(), TransportError>;

    /// Close the connection with a close code and reason
    async fn close(&self, code: u16, reason: &str) -> Result<(), TransportError>;
}

#[async_trait]
impl<T: CallTransport + ?Sized> CallTransport for Arc<T> {
    async fn send(&self, message: OutboundMessage) -> Result<(), TransportError> {
        (**self).send(message).await
    }

    async fn close(&self, code: u16, reason: &str) -> Result<(), TransportError> {
        (**self).close(code, reason).await
    }
}

// ============================================================================
// Production Implementation
// ============================================================================

/// Frames queued for a socket's writer task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outgoing {
    Text(String),
    Close { code: u16, reason: String },
}

/// Transport backed by the writer task of a WebSocket
#[derive(Debug, Clone)]
pub struct SocketTransport {
    tx: mpsc::Sender<Outgoing>,
}

impl SocketTransport {
    pub fn new(tx: mpsc::Sender<Outgoing>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl CallTransport for SocketTransport {
    async fn send(&self, message: OutboundMessage) -> Result<(), TransportError> {
        let text = serde_json::to_string(&message)?;
        self.tx
            .send(Outgoing::Text(text))
            .await
            .map_err(|_| TransportError::Closed)
    }

    async fn close(&self, code: u16, reason: &str) -> Result<(), TransportError> {
        self.tx
            .send(Outgoing::Close {
                code,
                reason: reason.to_string(),
            })
            .await
            .map_err(|_| TransportError::Closed)
    }
}
