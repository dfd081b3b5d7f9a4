//! Receivers and their integration configurations.
//!
//! A receiver is a named bundle of integration lists. Each integration
//! carries `send_resolved` plus its destination-specific settings; most also
//! carry an optional HTTP client config that falls back to the global one.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::values::{HostPort, HttpUrl, Secret};

fn yes() -> bool {
    true
}

fn is_false(v: &bool) -> bool {
    !*v
}

// ── HTTP client ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HttpClientConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub basic_auth: Option<BasicAuth>,
    #[serde(skip_serializing_if = "Secret::is_empty")]
    pub bearer_token: Secret,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub bearer_token_file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy_url: Option<HttpUrl>,
    pub tls_config: TlsConfig,
    pub follow_redirects: bool,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            basic_auth: None,
            bearer_token: Secret::default(),
            bearer_token_file: String::new(),
            proxy_url: None,
            tls_config: TlsConfig::default(),
            follow_redirects: true,
        }
    }
}

impl HttpClientConfig {
    /// At most one authentication mechanism may be configured.
    pub fn validate(&self) -> Result<(), String> {
        let bearer = !self.bearer_token.is_empty() || !self.bearer_token_file.is_empty();
        if !self.bearer_token.is_empty() && !self.bearer_token_file.is_empty() {
            return Err("at most one of bearer_token & bearer_token_file must be configured".to_string());
        }
        if let Some(basic) = &self.basic_auth {
            if bearer {
                return Err("at most one of basic_auth, bearer_token & bearer_token_file must be configured".to_string());
            }
            if !basic.password.is_empty() && !basic.password_file.is_empty() {
                return Err("at most one of basic_auth password & password_file must be configured".to_string());
            }
        }
        Ok(())
    }

    /// Resolve relative file references against `dir`.
    pub fn set_directory(&mut self, dir: &Path) {
        join_dir(dir, &mut self.bearer_token_file);
        if let Some(basic) = &mut self.basic_auth {
            join_dir(dir, &mut basic.password_file);
        }
        join_dir(dir, &mut self.tls_config.ca_file);
        join_dir(dir, &mut self.tls_config.cert_file);
        join_dir(dir, &mut self.tls_config.key_file);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BasicAuth {
    pub username: String,
    #[serde(skip_serializing_if = "Secret::is_empty")]
    pub password: Secret,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub password_file: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TlsConfig {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub ca_file: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub cert_file: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub key_file: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub server_name: String,
    #[serde(skip_serializing_if = "is_false")]
    pub insecure_skip_verify: bool,
}

/// Make a relative path absolute against `dir`; empty and absolute paths are left alone.
pub(crate) fn join_dir(dir: &Path, path: &mut String) {
    if !path.is_empty() && Path::new(path.as_str()).is_relative() {
        *path = dir.join(path.as_str()).to_string_lossy().into_owned();
    }
}

// ── Integrations ────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EmailConfig {
    #[serde(default)]
    pub send_resolved: bool,
    pub to: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub from: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub hello: String,
    #[serde(default, skip_serializing_if = "HostPort::is_empty")]
    pub smarthost: HostPort,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub auth_username: String,
    #[serde(default, skip_serializing_if = "Secret::is_empty")]
    pub auth_password: Secret,
    #[serde(default, skip_serializing_if = "Secret::is_empty")]
    pub auth_secret: Secret,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub auth_identity: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_tls: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WebhookConfig {
    #[serde(default = "yes")]
    pub send_resolved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_config: Option<HttpClientConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<HttpUrl>,
    /// Zero means unlimited.
    #[serde(default)]
    pub max_alerts: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SlackConfig {
    #[serde(default)]
    pub send_resolved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_config: Option<HttpClientConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<HttpUrl>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_url_file: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub channel: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub username: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub color: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title_link: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub icon_emoji: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub icon_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MsTeamsConfig {
    #[serde(default = "yes")]
    pub send_resolved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_config: Option<HttpClientConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<HttpUrl>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PagerdutyConfig {
    #[serde(default = "yes")]
    pub send_resolved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_config: Option<HttpClientConfig>,
    #[serde(default, skip_serializing_if = "Secret::is_empty")]
    pub service_key: Secret,
    #[serde(default, skip_serializing_if = "Secret::is_empty")]
    pub routing_key: Secret,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<HttpUrl>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub client: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub client_url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub severity: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OpsGenieConfig {
    #[serde(default = "yes")]
    pub send_resolved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_config: Option<HttpClientConfig>,
    #[serde(default, skip_serializing_if = "Secret::is_empty")]
    pub api_key: Secret,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_key_file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<HttpUrl>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub priority: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tags: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WechatConfig {
    #[serde(default)]
    pub send_resolved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_config: Option<HttpClientConfig>,
    #[serde(default, skip_serializing_if = "Secret::is_empty")]
    pub api_secret: Secret,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub corp_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<HttpUrl>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub to_user: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub agent_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PushoverConfig {
    #[serde(default = "yes")]
    pub send_resolved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_config: Option<HttpClientConfig>,
    #[serde(default)]
    pub user_key: Secret,
    #[serde(default)]
    pub token: Secret,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub priority: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VictorOpsConfig {
    #[serde(default = "yes")]
    pub send_resolved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_config: Option<HttpClientConfig>,
    #[serde(default, skip_serializing_if = "Secret::is_empty")]
    pub api_key: Secret,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<HttpUrl>,
    #[serde(default)]
    pub routing_key: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message_type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub entity_display_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub state_message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SnsConfig {
    #[serde(default = "yes")]
    pub send_resolved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_config: Option<HttpClientConfig>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub topic_arn: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub phone_number: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub target_arn: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub subject: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}

/// Common view over the HTTP-based integration configs.
pub trait HttpIntegration {
    fn http_config_mut(&mut self) -> &mut Option<HttpClientConfig>;
}

macro_rules! http_integration {
    ($($ty:ty),* $(,)?) => {
        $(impl HttpIntegration for $ty {
            fn http_config_mut(&mut self) -> &mut Option<HttpClientConfig> {
                &mut self.http_config
            }
        })*
    };
}

http_integration!(
    WebhookConfig,
    SlackConfig,
    MsTeamsConfig,
    PagerdutyConfig,
    OpsGenieConfig,
    WechatConfig,
    PushoverConfig,
    VictorOpsConfig,
    SnsConfig,
);

// ── Receiver ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Receiver {
    /// Unique name; referenced by routes.
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub email_configs: Vec<EmailConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pagerduty_configs: Vec<PagerdutyConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub slack_configs: Vec<SlackConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub webhook_configs: Vec<WebhookConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub opsgenie_configs: Vec<OpsGenieConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub wechat_configs: Vec<WechatConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pushover_configs: Vec<PushoverConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub victorops_configs: Vec<VictorOpsConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sns_configs: Vec<SnsConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub msteams_configs: Vec<MsTeamsConfig>,
}

impl Receiver {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Self::default() }
    }

    pub fn integration_count(&self) -> usize {
        self.email_configs.len()
            + self.pagerduty_configs.len()
            + self.slack_configs.len()
            + self.webhook_configs.len()
            + self.opsgenie_configs.len()
            + self.wechat_configs.len()
            + self.pushover_configs.len()
            + self.victorops_configs.len()
            + self.sns_configs.len()
            + self.msteams_configs.len()
    }

    /// Checks a change request carries enough to be routed to.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() {
            return Err("receiver name is mandatory".to_string());
        }
        if self.webhook_configs.iter().any(|w| w.url.is_none()) {
            return Err("webhook url is mandatory".to_string());
        }
        Ok(())
    }

    /// Visit every HTTP-based integration config.
    pub fn for_each_http_integration(&mut self, mut visit: impl FnMut(&mut dyn HttpIntegration)) {
        self.pagerduty_configs.iter_mut().for_each(|c| visit(c));
        self.slack_configs.iter_mut().for_each(|c| visit(c));
        self.webhook_configs.iter_mut().for_each(|c| visit(c));
        self.opsgenie_configs.iter_mut().for_each(|c| visit(c));
        self.wechat_configs.iter_mut().for_each(|c| visit(c));
        self.pushover_configs.iter_mut().for_each(|c| visit(c));
        self.victorops_configs.iter_mut().for_each(|c| visit(c));
        self.sns_configs.iter_mut().for_each(|c| visit(c));
        self.msteams_configs.iter_mut().for_each(|c| visit(c));
    }

    /// Resolve relative file references against `dir`.
    pub fn set_directory(&mut self, dir: &Path) {
        self.for_each_http_integration(|c| {
            if let Some(http) = c.http_config_mut() {
                http.set_directory(dir);
            }
        });
        for slack in &mut self.slack_configs {
            join_dir(dir, &mut slack.api_url_file);
        }
        for og in &mut self.opsgenie_configs {
            join_dir(dir, &mut og.api_key_file);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_for_send_resolved_differ_per_integration() {
        let r: Receiver = serde_yaml::from_str(
            r#"
name: team
webhook_configs: [{ url: "http://hook.local/x" }]
slack_configs: [{ channel: '#ops' }]
email_configs: [{ to: "ops@example.com" }]
"#,
        )
        .unwrap();
        assert!(r.webhook_configs[0].send_resolved);
        assert!(!r.slack_configs[0].send_resolved);
        assert!(!r.email_configs[0].send_resolved);
        assert_eq!(r.integration_count(), 3);
    }

    #[test]
    fn http_config_defaults_follow_redirects() {
        let http: HttpClientConfig = serde_yaml::from_str("bearer_token: abc").unwrap();
        assert!(http.follow_redirects);
        assert!(http.validate().is_ok());
    }

    #[test]
    fn http_config_rejects_two_auth_methods() {
        let http: HttpClientConfig = serde_yaml::from_str(
            "basic_auth: { username: u, password: p }\nbearer_token: abc\n",
        )
        .unwrap();
        assert!(http.validate().is_err());
    }

    #[test]
    fn change_request_requires_name_and_webhook_url() {
        assert!(Receiver::new("").validate().is_err());
        let r: Receiver = serde_json::from_str(r#"{"name":"x","webhook_configs":[{}]}"#).unwrap();
        assert_eq!(r.validate().unwrap_err(), "webhook url is mandatory");
        assert!(Receiver::new("x").validate().is_ok());
    }

    #[test]
    fn set_directory_only_touches_relative_paths() {
        let mut r: Receiver = serde_yaml::from_str(
            r#"
name: x
slack_configs: [{ api_url_file: "slack.url" }]
opsgenie_configs: [{ api_key_file: "/abs/key" }]
webhook_configs:
  - url: "http://hook.local/"
    http_config: { bearer_token_file: "token" }
"#,
        )
        .unwrap();
        r.set_directory(Path::new("/etc/herald"));
        assert_eq!(r.slack_configs[0].api_url_file, "/etc/herald/slack.url");
        assert_eq!(r.opsgenie_configs[0].api_key_file, "/abs/key");
        let http = r.webhook_configs[0].http_config.as_ref().unwrap();
        assert_eq!(http.bearer_token_file, "/etc/herald/token");
    }
}
