//! Mock implementations for testing

use super::traits::{CallTransport, TransportError};
use crate::protocol::{Command, OutboundMessage};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Transport that records every frame it is asked to send
#[derive(Default)]
pub struct MockTransport {
    sent: Mutex<Vec<OutboundMessage>>,
    closed: Mutex<Option<(u16, String)>>,
    fail_redirects: AtomicBool,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every redirect command fail to send
    pub fn fail_redirects(&self) {
        self.fail_redirects.store(true, Ordering::SeqCst);
    }

    /// Frames sent so far, as JSON
    pub fn frames(&self) -> Vec<Value> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|m| serde_json::to_value(m).unwrap())
            .collect()
    }

    pub fn closed_with(&self) -> Option<(u16, String)> {
        self.closed.lock().unwrap().clone()
    }

    /// Wait until at least `count` frames were sent, then return them
    pub async fn wait_for_frames(&self, count: usize) -> Vec<Value> {
        for _ in 0..200 {
            if self.sent.lock().unwrap().len() >= count {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        self.frames()
    }
}

#[async_trait]
impl CallTransport for MockTransport {
    async fn send(&self, message: OutboundMessage) -> Result<(), TransportError> {
        if self.closed.lock().unwrap().is_some() {
            return Err(TransportError::Closed);
        }
        if matches!(message, OutboundMessage::Command(Command::Redirect { .. }))
            && self.fail_redirects.load(Ordering::SeqCst)
        {
            return Err(TransportError::Closed);
        }
        self.sent.lock().unwrap().push(message);
        Ok(())
    }

    async fn close(&self, code: u16, reason: &str) -> Result<(), TransportError> {
        *self.closed.lock().unwrap() = Some((code, reason.to_string()));
        Ok(())
    }
}
