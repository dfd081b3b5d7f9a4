use herald_core::settings::{RouteDefaults, SmtpDefaults};
use serde::{Deserialize, Serialize};

use super::receiver::HttpClientConfig;
use super::values::{HostPort, HttpUrl, PromDuration, Secret};

pub const DEFAULT_PAGERDUTY_URL: &str = "https://events.pagerduty.com/v2/enqueue";
pub const DEFAULT_OPSGENIE_API_URL: &str = "https://api.opsgenie.com/";
pub const DEFAULT_WECHAT_API_URL: &str = "https://qyapi.weixin.qq.com/cgi-bin/";
pub const DEFAULT_VICTOROPS_API_URL: &str = "https://alert.victorops.com/integrations/generic/20131114/alert/";

/// Defaults inherited by every receiver integration that leaves a field unset.
///
/// Fields missing from a `global:` block take the values from
/// [`GlobalConfig::default`], which reads the `ALERTMANAGER_*` environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GlobalConfig {
    pub resolve_timeout: PromDuration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_config: Option<HttpClientConfig>,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub smtp_from: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub smtp_hello: String,
    #[serde(skip_serializing_if = "HostPort::is_empty")]
    pub smtp_smarthost: HostPort,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub smtp_auth_username: String,
    #[serde(skip_serializing_if = "Secret::is_empty")]
    pub smtp_auth_password: Secret,
    #[serde(skip_serializing_if = "Secret::is_empty")]
    pub smtp_auth_secret: Secret,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub smtp_auth_identity: String,
    pub smtp_require_tls: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub slack_api_url: Option<HttpUrl>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub slack_api_url_file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagerduty_url: Option<HttpUrl>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opsgenie_api_url: Option<HttpUrl>,
    #[serde(skip_serializing_if = "Secret::is_empty")]
    pub opsgenie_api_key: Secret,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub opsgenie_api_key_file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wechat_api_url: Option<HttpUrl>,
    #[serde(skip_serializing_if = "Secret::is_empty")]
    pub wechat_api_secret: Secret,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub wechat_api_corp_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub victorops_api_url: Option<HttpUrl>,
    #[serde(skip_serializing_if = "Secret::is_empty")]
    pub victorops_api_key: Secret,
}

impl GlobalConfig {
    pub fn from_defaults(routing: &RouteDefaults, smtp: &SmtpDefaults) -> Self {
        Self {
            resolve_timeout: routing.resolve_timeout.into(),
            http_config: Some(HttpClientConfig::default()),
            smtp_from: smtp.from.clone(),
            smtp_hello: "localhost".to_string(),
            smtp_smarthost: HostPort::new(smtp.host.clone(), smtp.port.clone()),
            smtp_auth_username: String::new(),
            smtp_auth_password: Secret::default(),
            smtp_auth_secret: Secret::default(),
            smtp_auth_identity: String::new(),
            smtp_require_tls: true,
            slack_api_url: None,
            slack_api_url_file: String::new(),
            pagerduty_url: HttpUrl::parse(DEFAULT_PAGERDUTY_URL).ok(),
            opsgenie_api_url: HttpUrl::parse(DEFAULT_OPSGENIE_API_URL).ok(),
            opsgenie_api_key: Secret::default(),
            opsgenie_api_key_file: String::new(),
            wechat_api_url: HttpUrl::parse(DEFAULT_WECHAT_API_URL).ok(),
            wechat_api_secret: Secret::default(),
            wechat_api_corp_id: String::new(),
            victorops_api_url: HttpUrl::parse(DEFAULT_VICTOROPS_API_URL).ok(),
            victorops_api_key: Secret::default(),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.slack_api_url.is_some() && !self.slack_api_url_file.is_empty() {
            return Err("at most one of slack_api_url & slack_api_url_file must be configured".to_string());
        }
        if !self.opsgenie_api_key.is_empty() && !self.opsgenie_api_key_file.is_empty() {
            return Err("at most one of opsgenie_api_key & opsgenie_api_key_file must be configured".to_string());
        }
        if let Some(http) = &self.http_config {
            http.validate()?;
        }
        Ok(())
    }
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self::from_defaults(&RouteDefaults::default(), &SmtpDefaults::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_block_keeps_defaults() {
        let g: GlobalConfig = serde_yaml::from_str("smtp_from: ops@example.com").unwrap();
        assert_eq!(g.smtp_from, "ops@example.com");
        assert_eq!(g.smtp_hello, "localhost");
        assert!(g.smtp_require_tls);
        assert_eq!(g.opsgenie_api_url.unwrap().as_str(), DEFAULT_OPSGENIE_API_URL);
        assert!(g.http_config.is_some());
    }

    #[test]
    fn slack_url_and_file_are_exclusive() {
        let g: GlobalConfig = serde_yaml::from_str(
            "slack_api_url: https://hooks.slack.com/x\nslack_api_url_file: /run/slack",
        )
        .unwrap();
        assert!(g.validate().is_err());
    }
}
