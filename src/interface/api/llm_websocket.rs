//! Call session WebSocket endpoint (`/llm-websocket/:call_id`)

use super::app_state::AppState;
use crate::application::{CallSessionHandler, SessionOutcome};
use crate::domain::shared::CallId;
use axum::{
    extract::{
        ws::{WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::Response,
};
use futures::StreamExt;
use std::sync::Arc;
use tracing::info;

/// Upgrade the voice platform's connection for one call
pub async fn llm_websocket_handler(
    ws: WebSocketUpgrade,
    Path(call_id): Path<String>,
    State(state): State<AppState>,
) -> Response {
    ws.on_upgrade(move |socket| handle_call_socket(socket, CallId::new(call_id), state))
}

async fn handle_call_socket(socket: WebSocket, call_id: CallId, state: AppState) {
    let lease = state.sessions.open(call_id.clone()).await;
    let (sender, receiver) = socket.split();

    let handler = CallSessionHandler::new(
        call_id.clone(),
        Arc::clone(&state.registry),
        Arc::clone(&state.agent),
        state.session_settings,
    );
    let outcome = handler.run(receiver, sender, lease.shutdown_signal()).await;

    let released = state.sessions.close(&lease).await;
    if outcome != SessionOutcome::Disconnected {
        info!(call_id = %call_id, outcome = ?outcome, released, "LLM WebSocket connection closed");
    }
}
