//! HTTP request handlers

use super::socket::serve_socket;
use super::types::{ErrorResponse, HealthResponse, VersionResponse};
use super::AppState;
use crate::protocol::SUBPROTOCOL;
use axum::{
    extract::{ws::WebSocketUpgrade, State},
    http::{header::SEC_WEBSOCKET_PROTOCOL, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};

/// Create the API router. Call sockets are accepted on `ws_path`.
pub fn create_router(state: AppState, ws_path: &str) -> Router {
    Router::new()
        .route(ws_path, get(upgrade_call_socket))
        .route("/health", get(health))
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Call Socket
// ============================================================

async fn upgrade_call_socket(
    State(state): State<AppState>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Result<Response, AppError> {
    if !offers_subprotocol(&headers) {
        return Err(AppError::BadRequest(format!(
            "WebSocket subprotocol {SUBPROTOCOL} required"
        )));
    }

    Ok(ws
        .protocols([SUBPROTOCOL])
        .on_upgrade(move |socket| serve_socket(socket, state.registry)))
}

fn offers_subprotocol(headers: &HeaderMap) -> bool {
    headers
        .get_all(SEC_WEBSOCKET_PROTOCOL)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .any(|protocol| protocol.trim() == SUBPROTOCOL)
}

// ============================================================
// Health
// ============================================================

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        active_calls: state.registry.active_calls().await,
    })
}

async fn get_version() -> Json<VersionResponse> {
    Json(VersionResponse {
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
