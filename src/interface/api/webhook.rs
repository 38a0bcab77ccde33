//! Webhook ingress for call lifecycle notifications (`POST /webhook`)

use super::app_state::AppState;
use super::error::ApiError;
use crate::domain::webhook::WebhookNotification;
use crate::infrastructure::metrics;
use axum::{body::Bytes, extract::State, http::StatusCode};
use tracing::{debug, error, info};

/// Broadcast one notification to every observer and acknowledge with 204.
///
/// The body is taken raw so that a parse failure is reported as a server
/// fault rather than the extractor's 4xx.
pub async fn webhook_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let notification = WebhookNotification::from_slice(&body).map_err(|e| {
        error!(error = %e, "Error processing webhook");
        ApiError::InvalidPayload(e.to_string())
    })?;

    info!(
        event = %notification.event,
        call_id = notification.call_id(),
        "Received webhook event"
    );
    metrics::record_webhook_event(&notification.event);

    let report = state.registry.broadcast_json(&notification).await;
    debug!(recipients = report.delivered, "Webhook event broadcast");

    Ok(StatusCode::NO_CONTENT)
}
