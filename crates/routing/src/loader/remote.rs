//! Loader backed by the query service's stored notification channels.
//!
//! `GET {base}/api/v1/channels` returns `{"data": [{id, name, type, data}]}`
//! where `data` is a JSON receiver. Route keys in the payload (`group_by`,
//! `matchers`, ...) configure the channel's route; everything else is the
//! receiver. Each channel is added as a flat child of the root route.

use std::time::Duration;

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, error, warn};

use super::ConfigLoader;
use crate::error::{ConfigError, Result};
use crate::schema::{Config, Receiver, Route};

const ROUTE_KEYS: &[&str] = &[
    "receiver",
    "group_by",
    "match",
    "match_re",
    "matchers",
    "mute_time_intervals",
    "continue",
    "routes",
    "group_wait",
    "group_interval",
    "repeat_interval",
];

#[derive(Debug, Clone, Deserialize)]
pub struct ChannelItem {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub data: String,
}

#[derive(Debug, Deserialize)]
struct ChannelResponse {
    #[serde(default)]
    data: Option<Vec<ChannelItem>>,
}

/// Split a stored channel payload into its route and receiver.
pub fn decode_channel(data: &str) -> Result<(Route, Receiver)> {
    let value: Value = serde_json::from_str(data)?;
    let Value::Object(fields) = value else {
        return Err(ConfigError::Remote("channel payload must be a JSON object".to_string()));
    };
    let (route_fields, receiver_fields): (Map<String, Value>, Map<String, Value>) =
        fields.into_iter().partition(|(k, _)| ROUTE_KEYS.contains(&k.as_str()));

    let receiver: Receiver = serde_json::from_value(Value::Object(receiver_fields))?;
    let mut route: Route = serde_json::from_value(Value::Object(route_fields))?;
    if route.receiver.is_empty() {
        route.receiver = receiver.name.clone();
    }
    Ok((route, receiver))
}

#[derive(Debug, Clone)]
pub struct ChannelLoader {
    channel_url: String,
    timeout: Duration,
}

impl ChannelLoader {
    pub fn new(query_service_url: &str) -> Result<Self> {
        if query_service_url.is_empty() {
            return Err(ConfigError::Remote(
                "query service url is required for fetching stored config".to_string(),
            ));
        }
        let base = if query_service_url.ends_with('/') {
            query_service_url.to_string()
        } else {
            format!("{query_service_url}/")
        };
        Ok(Self {
            channel_url: format!("{base}api/v1/channels"),
            timeout: Duration::from_secs(10),
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn channel_url(&self) -> &str {
        &self.channel_url
    }

    /// Blocking fetch; must not run on an async runtime thread.
    fn fetch_channels(&self) -> Result<Vec<ChannelItem>> {
        let remote = |msg: String| ConfigError::Remote(msg);
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| remote(format!("failed to build http client: {}", e.without_url())))?;
        let resp = client
            .get(&self.channel_url)
            .send()
            .map_err(|e| remote(format!("error in http get: {}", e.without_url())))?;
        let status = resp.status();
        let body = resp
            .text()
            .map_err(|e| remote(format!("failed to read response body: {}", e.without_url())))?;
        if !status.is_success() {
            return Err(remote(format!("unexpected status code {}", status.as_u16())));
        }
        let parsed: ChannelResponse = serde_json::from_str(&body).map_err(|e| {
            error!(error = %e, "failed to parse channel list");
            remote(format!("failed to unmarshal api response: {e}"))
        })?;
        Ok(parsed.data.unwrap_or_default())
    }
}

impl ConfigLoader for ChannelLoader {
    fn load(&self, config: &mut Config) -> Result<()> {
        debug!(url = %self.channel_url, "loading config from query service");
        let channels = self.fetch_channels().map_err(|e| {
            ConfigError::Remote(format!(
                "received an error from query service while fetching config: {e}"
            ))
        })?;

        if channels.is_empty() {
            warn!("no channels found in query service");
            return Ok(());
        }

        // Keep going past bad channels; report the last failure.
        let mut last_error = None;
        for channel in &channels {
            let applied = decode_channel(&channel.data)
                .and_then(|(route, receiver)| config.add_route(route, receiver));
            if let Err(e) = applied {
                error!(channel = %channel.name, id = channel.id, kind = %channel.kind, error = %e, "failed to load channel");
                last_error = Some(e);
            }
        }
        match last_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
