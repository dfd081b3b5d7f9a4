//! Slack incoming-webhook notifier.

use herald_core::Alert;
use herald_routing::schema::SlackConfig;
use serde::Serialize;

use crate::http::HttpSender;
use crate::retrier::Retrier;
use crate::templating::{TemplateData, TemplateRenderer, DEFAULT_TEXT, DEFAULT_TITLE};
use crate::traits::{Notifier, NotifierSettings, NotifyContext, NotifyError};
use crate::util::{redact_in, truncate_in_runes};

/// Slack rejects attachment titles longer than this.
const MAX_TITLE_RUNES: usize = 1024;

const DEFAULT_USERNAME: &str = "Herald";

#[derive(Debug, Serialize)]
struct SlackMessage {
    #[serde(skip_serializing_if = "String::is_empty")]
    channel: String,
    username: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    icon_emoji: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    icon_url: String,
    attachments: Vec<SlackAttachment>,
}

#[derive(Debug, Serialize)]
struct SlackAttachment {
    title: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    title_link: String,
    text: String,
    fallback: String,
    color: String,
    mrkdwn_in: Vec<&'static str>,
}

#[derive(Debug)]
enum ApiUrl {
    Inline(String),
    File(String),
}

#[derive(Debug)]
pub struct SlackNotifier {
    conf: SlackConfig,
    api_url: ApiUrl,
    sender: HttpSender,
    renderer: TemplateRenderer,
}

impl SlackNotifier {
    pub fn from_config(conf: &SlackConfig, settings: &NotifierSettings) -> Result<Self, NotifyError> {
        let api_url = match (&conf.api_url, conf.api_url_file.is_empty()) {
            (Some(url), _) => ApiUrl::Inline(url.as_str().to_string()),
            (None, false) => ApiUrl::File(conf.api_url_file.clone()),
            (None, true) => return Err(NotifyError::Config("slack api_url or api_url_file is mandatory".to_string())),
        };
        Ok(Self {
            conf: conf.clone(),
            api_url,
            sender: HttpSender::from_config(conf.http_config.as_ref(), settings)?,
            renderer: TemplateRenderer::new(),
        })
    }

    /// The file variant is read on every notification.
    async fn resolve_url(&self) -> Result<String, NotifyError> {
        match &self.api_url {
            ApiUrl::Inline(url) => Ok(url.clone()),
            ApiUrl::File(path) => tokio::fs::read_to_string(path)
                .await
                .map(|s| s.trim().to_string())
                .map_err(|e| NotifyError::Config(format!("unable to read slack api_url_file {path}: {e}"))),
        }
    }

    fn build_message(&self, data: &TemplateData) -> Result<SlackMessage, NotifyError> {
        let r = &self.renderer;
        let rendered_title = r.render_or(&self.conf.title, DEFAULT_TITLE, data)?;
        let (title, truncated) = truncate_in_runes(&rendered_title, MAX_TITLE_RUNES);
        if truncated {
            tracing::warn!(receiver = %data.receiver, max = MAX_TITLE_RUNES, "truncated slack title");
        }
        let default_color = if data.is_firing() { "danger" } else { "good" };
        let username = if self.conf.username.is_empty() {
            DEFAULT_USERNAME.to_string()
        } else {
            r.render(&self.conf.username, data)?
        };

        Ok(SlackMessage {
            channel: r.render(&self.conf.channel, data)?,
            username,
            icon_emoji: r.render(&self.conf.icon_emoji, data)?,
            icon_url: r.render(&self.conf.icon_url, data)?,
            attachments: vec![SlackAttachment {
                fallback: title.clone(),
                title,
                title_link: r.render_or(&self.conf.title_link, "{{ externalURL }}", data)?,
                text: r.render_or(&self.conf.text, DEFAULT_TEXT, data)?,
                color: r.render_or(&self.conf.color, default_color, data)?,
                mrkdwn_in: vec!["fallback", "pretext", "text"],
            }],
        })
    }
}

#[async_trait::async_trait]
impl Notifier for SlackNotifier {
    async fn notify(&self, ctx: &NotifyContext, alerts: &[Alert]) -> Result<(), NotifyError> {
        let data = TemplateData::new(ctx, alerts);
        let message = self.build_message(&data)?;
        let url = self.resolve_url().await?;

        let response = self.sender.post_json(&url, &message).await?;
        // Slack answers with plain text; the URL itself is the credential.
        let retrier = Retrier::new()
            .with_details(move |_, body| redact_in(String::from_utf8_lossy(body).trim(), &url));
        retrier.classify(response.status, &response.body)
    }

    fn integration(&self) -> &str {
        "slack"
    }

    fn send_resolved(&self) -> bool {
        self.conf.send_resolved
    }
}
