//! Test delivery for a receiver that is not (yet) part of the config.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use rand::Rng;
use tracing::{info, warn};

use herald_notify::NotifyError;
use herald_routing::validation::resolve_receiver;
use herald_routing::{GlobalConfig, Receiver};

use crate::state::AppState;

use super::{decode_object, ApiError, ErrorResponse};

fn parse_receiver(body: &[u8]) -> Result<Receiver, ApiError> {
    let mut receiver: Receiver = decode_object(body, "receiver")?;
    if receiver.name.is_empty() {
        receiver.name = format!("receiver-test-{}", rand::thread_rng().gen_range(0..1000));
    }
    Ok(receiver)
}

/// Send one synthetic alert through every integration of the receiver.
///
/// Global defaults of the running config (or the startup defaults when no
/// config is loaded) are filled in first. The receiver is not stored.
#[utoipa::path(
    post,
    path = "/api/v1/testReceiver",
    tag = "Receivers",
    request_body(content = Object, description = "Receiver definition"),
    responses(
        (status = 200, description = "Test notification delivered"),
        (status = 400, description = "Invalid receiver", body = ErrorResponse),
        (status = 500, description = "Delivery failed", body = ErrorResponse)
    )
)]
pub async fn test_receiver(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let mut receiver = parse_receiver(&body)?;
    let global = state
        .coordinator
        .config()
        .and_then(|c| c.global.clone())
        .unwrap_or_else(|| GlobalConfig::from_defaults(&state.settings.routing, &state.settings.smtp));
    resolve_receiver(&mut receiver, &global)
        .map_err(|e| ApiError::bad_data(format!("invalid receiver ({}): {e}", receiver.name)))?;

    let name = receiver.name.clone();
    herald_notify::test_receiver(&receiver, state.dispatcher.settings())
        .await
        .map_err(|e| {
            warn!(receiver = %name, error = %e, "Test notification failed");
            match &e {
                NotifyError::Config(_) | NotifyError::Template(_) => {
                    ApiError::internal(format!("failed to prepare message for select config: {e}"))
                }
                _ => ApiError::internal(format!("failed to send test message to channel ({name}): {e}")),
            }
        })?;
    info!(receiver = %name, "Test notification delivered");
    Ok(StatusCode::OK)
}
