//! Health, status and reload endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};
use utoipa::ToSchema;

use herald_routing::CoordinatorMetrics;

use crate::startup;
use crate::state::AppState;

use super::{ApiError, ErrorResponse};

/// Keys whose values are credentials and never leave the process.
const SECRET_KEYS: &[&str] = &[
    "api_key",
    "api_secret",
    "api_url",
    "auth_password",
    "auth_secret",
    "bearer_token",
    "opsgenie_api_key",
    "password",
    "routing_key",
    "service_key",
    "slack_api_url",
    "smtp_auth_password",
    "smtp_auth_secret",
    "token",
    "user_key",
    "victorops_api_key",
    "webhook_url",
    "wechat_api_secret",
];

const REDACTED: &str = "<secret>";

/// Integration lists whose `url` is a credential (it usually embeds a token).
const SECRET_URL_LISTS: &[&str] = &["webhook_configs"];

fn redact_string(v: &mut Value) -> bool {
    if matches!(v, Value::String(s) if !s.is_empty()) {
        *v = Value::String(REDACTED.to_string());
        return true;
    }
    false
}

/// Replace every non-empty secret value in `value` with a placeholder.
pub(crate) fn redact_secrets(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, v) in map.iter_mut() {
                if SECRET_KEYS.contains(&key.as_str()) && redact_string(v) {
                    continue;
                }
                if SECRET_URL_LISTS.contains(&key.as_str()) {
                    if let Value::Array(items) = v {
                        for url in items.iter_mut().filter_map(|item| item.get_mut("url")) {
                            redact_string(url);
                        }
                    }
                }
                redact_secrets(v);
            }
        }
        Value::Array(items) => items.iter_mut().for_each(redact_secrets),
        _ => {}
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    #[schema(value_type = String)]
    pub status: &'static str,
    #[schema(value_type = String)]
    pub version: &'static str,
    pub config_loaded: bool,
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    )
)]
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        config_loaded: state.coordinator.config().is_some(),
    })
}

/// Reload gauges of the coordinator.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReloadMetrics {
    pub config_hash: f64,
    pub last_reload_successful: bool,
    /// Unix seconds; 0 until the first successful reload.
    pub last_reload_success_timestamp_seconds: i64,
}

impl From<CoordinatorMetrics> for ReloadMetrics {
    fn from(m: CoordinatorMetrics) -> Self {
        Self {
            config_hash: m.config_hash,
            last_reload_successful: m.last_reload_successful,
            last_reload_success_timestamp_seconds: m.last_reload_success_timestamp_seconds,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StatusResponse {
    pub metrics: ReloadMetrics,
    /// Receivers with live notifiers, sorted by name.
    pub receivers: Vec<String>,
    /// Installed config with credentials redacted; null before the first load.
    #[schema(value_type = Object)]
    pub config: Option<Value>,
    #[schema(value_type = Object)]
    pub settings: Value,
}

#[utoipa::path(
    get,
    path = "/api/v1/status",
    tag = "Health",
    responses(
        (status = 200, description = "Reload metrics and the installed config", body = StatusResponse),
        (status = 500, description = "Config could not be encoded", body = ErrorResponse)
    )
)]
pub async fn status(State(state): State<Arc<AppState>>) -> Result<Json<StatusResponse>, ApiError> {
    let config = match state.coordinator.config() {
        Some(cfg) => {
            let mut value = serde_json::to_value(cfg.as_ref())
                .map_err(|e| ApiError::internal(format!("failed to encode config: {e}")))?;
            redact_secrets(&mut value);
            Some(value)
        }
        None => None,
    };
    Ok(Json(StatusResponse {
        metrics: state.coordinator.metrics().into(),
        receivers: state.dispatcher.receivers(),
        config,
        settings: state.settings.redacted_summary(),
    }))
}

/// Reload the config from its source now.
#[utoipa::path(
    post,
    path = "/-/reload",
    tag = "Health",
    responses(
        (status = 200, description = "Config reloaded"),
        (status = 500, description = "Reload failed; the previous config stays active", body = ErrorResponse)
    )
)]
pub async fn reload(State(state): State<Arc<AppState>>) -> Result<StatusCode, ApiError> {
    startup::reload(&state.coordinator).await.map_err(|e| {
        warn!(error = %e, "Config reload failed");
        ApiError::internal(format!("failed to reload config: {e:#}"))
    })?;
    info!("Config reloaded");
    Ok(StatusCode::OK)
}
