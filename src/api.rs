//! HTTP and WebSocket surface
//!
//! The control layer opens one WebSocket per call on the configured path.
//! `/health` and `/version` are plain HTTP.

mod handlers;
mod socket;
mod types;

pub use handlers::create_router;

use crate::runtime::CallRegistry;
use std::collections::HashMap;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<CallRegistry>,
}

impl AppState {
    pub fn new(call_defaults: HashMap<String, String>) -> Self {
        Self {
            registry: Arc::new(CallRegistry::new(call_defaults)),
        }
    }
}
