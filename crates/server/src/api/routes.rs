//! Channel mutations: each channel is a receiver plus a top-level route
//! that points at it.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;
use tracing::{info, warn};
use utoipa::ToSchema;

use herald_routing::loader::decode_channel;
use herald_routing::{Receiver, Route};

use crate::state::AppState;

use super::{blocking, decode_object, ApiError, ErrorResponse};

/// Body of a delete request. Other receiver fields are ignored.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ChannelName {
    #[serde(default)]
    pub name: String,
}

fn parse_channel(body: &[u8]) -> Result<(Route, Receiver), ApiError> {
    let text = std::str::from_utf8(body)
        .map_err(|e| ApiError::bad_data(format!("request body is not valid UTF-8: {e}")))?;
    let (mut route, receiver) =
        decode_channel(text).map_err(|e| ApiError::bad_data(format!("invalid receiver: {e}")))?;
    if receiver.name.is_empty() {
        return Err(ApiError::bad_data("missing receiver name"));
    }
    route.continue_matching = true;
    Ok((route, receiver))
}

/// Add a channel.
///
/// The body is a receiver definition; route keys (`group_by`, `matchers`,
/// intervals) may be mixed in and configure the channel's route.
#[utoipa::path(
    post,
    path = "/api/v1/routes",
    tag = "Routes",
    request_body(content = Object, description = "Receiver definition, optionally with route keys"),
    responses(
        (status = 200, description = "Channel added"),
        (status = 400, description = "Malformed receiver", body = ErrorResponse),
        (status = 500, description = "Change rejected", body = ErrorResponse)
    )
)]
pub async fn add_route(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let (route, receiver) = parse_channel(&body)?;
    let name = receiver.name.clone();
    let coordinator = state.coordinator.clone();
    blocking(move || coordinator.add_route(route, receiver))
        .await?
        .map_err(|e| {
            warn!(channel = %name, error = %e, "Failed to add channel");
            ApiError::internal(format!("failed to update channel ({name}): {e}"))
        })?;
    info!(channel = %name, "Channel added");
    Ok(StatusCode::OK)
}

/// Replace an existing channel.
#[utoipa::path(
    put,
    path = "/api/v1/routes",
    tag = "Routes",
    request_body(content = Object, description = "Receiver definition, optionally with route keys"),
    responses(
        (status = 200, description = "Channel updated"),
        (status = 400, description = "Malformed receiver", body = ErrorResponse),
        (status = 500, description = "Change rejected", body = ErrorResponse)
    )
)]
pub async fn edit_route(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let (route, receiver) = parse_channel(&body)?;
    let name = receiver.name.clone();
    let coordinator = state.coordinator.clone();
    blocking(move || coordinator.edit_route(route, receiver))
        .await?
        .map_err(|e| {
            warn!(channel = %name, error = %e, "Failed to edit channel");
            ApiError::internal(format!("failed to update channel ({name}): {e}"))
        })?;
    info!(channel = %name, "Channel updated");
    Ok(StatusCode::OK)
}

/// Remove a channel by receiver name.
#[utoipa::path(
    delete,
    path = "/api/v1/routes",
    tag = "Routes",
    request_body = ChannelName,
    responses(
        (status = 200, description = "Channel deleted"),
        (status = 400, description = "Malformed request", body = ErrorResponse),
        (status = 500, description = "Change rejected", body = ErrorResponse)
    )
)]
pub async fn delete_route(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let ChannelName { name } = decode_object::<ChannelName>(&body, "request body")?;
    if name.is_empty() {
        return Err(ApiError::bad_data("missing receiver name"));
    }
    let coordinator = state.coordinator.clone();
    let target = name.clone();
    blocking(move || coordinator.delete_route(&target))
        .await?
        .map_err(|e| {
            warn!(channel = %name, error = %e, "Failed to delete channel");
            ApiError::internal(format!("failed to delete channel ({name}): {e}"))
        })?;
    info!(channel = %name, "Channel deleted");
    Ok(StatusCode::OK)
}
