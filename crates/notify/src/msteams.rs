//! Microsoft Teams notifier posting an adaptive card.
//!
//! Teams signals throttling with a 2xx response whose body carries the
//! error, so the retrier treats that body as a soft failure.

use herald_core::{Alert, AlertStatus, LabelSet};
use herald_routing::schema::MsTeamsConfig;
use serde::Serialize;

use crate::http::HttpSender;
use crate::retrier::Retrier;
use crate::templating::{TemplateData, TemplateRenderer, DEFAULT_TITLE};
use crate::traits::{Notifier, NotifierSettings, NotifyContext, NotifyError};
use crate::util::redact_in;

pub const THROTTLED_PATTERN: &str = "Microsoft Teams endpoint returned HTTP error 429";

/// Redundant with the card title.
const LABELS_TO_SKIP: &[&str] = &["alertname", "severity", "ruleId", "ruleSource"];
/// Kept out to stay under the payload size limit.
const ANNOTATIONS_TO_SKIP: &[&str] = &["summary", "related_logs", "related_traces"];

const COLOR_RED: &str = "Attention";
const COLOR_GREEN: &str = "Good";

#[derive(Debug, Serialize)]
struct TeamsMessage {
    #[serde(rename = "type")]
    kind: &'static str,
    attachments: Vec<Attachment>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Attachment {
    content_type: &'static str,
    content_url: Option<String>,
    content: Card,
}

#[derive(Debug, Serialize)]
struct Card {
    #[serde(rename = "$schema")]
    schema: &'static str,
    #[serde(rename = "type")]
    kind: &'static str,
    version: &'static str,
    body: Vec<Block>,
    actions: Vec<Action>,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct Block {
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(skip_serializing_if = "String::is_empty")]
    text: String,
    #[serde(skip_serializing_if = "str::is_empty")]
    weight: &'static str,
    #[serde(skip_serializing_if = "str::is_empty")]
    size: &'static str,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    wrap: bool,
    #[serde(skip_serializing_if = "str::is_empty")]
    style: &'static str,
    #[serde(skip_serializing_if = "str::is_empty")]
    color: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    facts: Vec<Fact>,
}

#[derive(Debug, Serialize)]
struct Fact {
    title: String,
    value: String,
}

#[derive(Debug, Serialize)]
struct Action {
    #[serde(rename = "type")]
    kind: &'static str,
    title: &'static str,
    url: String,
}

fn heading(text: &str) -> Block {
    Block {
        kind: "TextBlock",
        text: text.to_string(),
        weight: "Bolder",
        size: "Medium",
        ..Block::default()
    }
}

fn facts(set: &LabelSet, skip: &[&str]) -> Block {
    Block {
        kind: "FactSet",
        facts: set
            .iter()
            .filter(|(k, _)| !skip.contains(&k.as_str()))
            .map(|(k, v)| Fact { title: k.clone(), value: v.clone() })
            .collect(),
        ..Block::default()
    }
}

fn push_alert(body: &mut Vec<Block>, alert: &Alert) {
    body.push(heading("Labels"));
    body.push(facts(&alert.labels, LABELS_TO_SKIP));
    body.push(heading("Annotations"));
    body.push(facts(&alert.annotations, ANNOTATIONS_TO_SKIP));
}

#[derive(Debug)]
pub struct MsTeamsNotifier {
    conf: MsTeamsConfig,
    webhook_url: String,
    sender: HttpSender,
    retrier: Retrier,
    renderer: TemplateRenderer,
}

impl MsTeamsNotifier {
    pub fn from_config(conf: &MsTeamsConfig, settings: &NotifierSettings) -> Result<Self, NotifyError> {
        let webhook_url = conf
            .webhook_url
            .as_ref()
            .map(|u| u.as_str().to_string())
            .ok_or_else(|| NotifyError::Config("msteams webhook_url is mandatory".to_string()))?;
        let secret_url = webhook_url.clone();
        let retrier = Retrier::new()
            .with_retry_codes([429])
            .with_soft_failure_patterns([THROTTLED_PATTERN])
            .with_details(move |_, body| redact_in(String::from_utf8_lossy(body).trim(), &secret_url));
        Ok(Self {
            conf: conf.clone(),
            webhook_url,
            sender: HttpSender::from_config(conf.http_config.as_ref(), settings)?,
            retrier,
            renderer: TemplateRenderer::new(),
        })
    }

    fn build_message(&self, data: &TemplateData, alerts: &[Alert]) -> Result<TeamsMessage, NotifyError> {
        let title = self.renderer.render_or(&self.conf.title, DEFAULT_TITLE, data)?;
        let color = if data.is_firing() { COLOR_RED } else { COLOR_GREEN };
        let rule_source = alerts
            .iter()
            .filter_map(|a| a.labels.get("ruleSource"))
            .last()
            .cloned()
            .unwrap_or_default();

        let mut body = vec![Block {
            kind: "TextBlock",
            text: title,
            weight: "Bolder",
            size: "Medium",
            wrap: true,
            style: "heading",
            color,
            ..Block::default()
        }];
        for alert in alerts {
            if alert.status() == AlertStatus::Resolved {
                body.push(Block {
                    wrap: true,
                    color: COLOR_GREEN,
                    ..heading("Resolved Alerts")
                });
            }
            push_alert(&mut body, alert);
        }

        Ok(TeamsMessage {
            kind: "message",
            attachments: vec![Attachment {
                content_type: "application/vnd.microsoft.card.adaptive",
                content_url: None,
                content: Card {
                    schema: "http://adaptivecards.io/schemas/adaptive-card.json",
                    kind: "AdaptiveCard",
                    version: "1.2",
                    body,
                    actions: vec![Action {
                        kind: "Action.OpenUrl",
                        title: "View Alert",
                        url: rule_source,
                    }],
                },
            }],
        })
    }
}

#[async_trait::async_trait]
impl Notifier for MsTeamsNotifier {
    async fn notify(&self, ctx: &NotifyContext, alerts: &[Alert]) -> Result<(), NotifyError> {
        tracing::debug!(incident = %ctx.group_key, "sending msteams notification");
        let data = TemplateData::new(ctx, alerts);
        let message = self.build_message(&data, alerts)?;
        let response = self.sender.post_json(&self.webhook_url, &message).await?;
        self.retrier.classify(response.status, &response.body)
    }

    fn integration(&self) -> &str {
        "msteams"
    }

    fn send_resolved(&self) -> bool {
        self.conf.send_resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrier::Reason;
    use crate::templating::sample_alert;
    use crate::test_support::serve;
    use herald_routing::schema::HttpUrl;

    fn notifier(url: &str) -> MsTeamsNotifier {
        let conf = MsTeamsConfig {
            send_resolved: true,
            http_config: None,
            webhook_url: Some(HttpUrl::parse(url).unwrap()),
            title: String::new(),
            text: String::new(),
        };
        MsTeamsNotifier::from_config(&conf, &NotifierSettings::default()).unwrap()
    }

    #[test]
    fn card_skips_redundant_labels_and_large_annotations() {
        let n = notifier("http://teams.local/webhook");
        let alerts = [sample_alert("HighLatency", false)];
        let data = TemplateData::new(&NotifyContext::new("ops", "g"), &alerts);
        let card = serde_json::to_value(n.build_message(&data, &alerts).unwrap()).unwrap();
        let content = &card["attachments"][0]["content"];

        assert_eq!(content["body"][0]["text"], "[FIRING:1] HighLatency");
        assert_eq!(content["body"][0]["color"], COLOR_RED);
        let label_facts = content["body"][2]["facts"].as_array().unwrap();
        assert_eq!(label_facts.len(), 1);
        assert_eq!(label_facts[0]["title"], "service");
        let annotation_facts = content["body"][4]["facts"].as_array().unwrap();
        assert_eq!(annotation_facts.len(), 1);
        assert_eq!(annotation_facts[0]["title"], "runbook");
        assert_eq!(content["actions"][0]["url"], "http://signoz.local/alerts/edit?ruleId=7");
    }

    #[test]
    fn resolved_alerts_get_their_own_heading() {
        let n = notifier("http://teams.local/webhook");
        let alerts = [sample_alert("HighLatency", true)];
        let data = TemplateData::new(&NotifyContext::new("ops", "g"), &alerts);
        let card = serde_json::to_value(n.build_message(&data, &alerts).unwrap()).unwrap();
        let body = &card["attachments"][0]["content"]["body"];
        assert_eq!(body[0]["color"], COLOR_GREEN);
        assert_eq!(body[1]["text"], "Resolved Alerts");
    }

    #[tokio::test]
    async fn throttled_success_is_retried() {
        let (url, _captured) = serve(vec![(200, THROTTLED_PATTERN)]).await;
        let err = notifier(&url)
            .notify(&NotifyContext::new("ops", "g"), &[sample_alert("A", false)])
            .await
            .unwrap_err();
        assert!(err.should_retry());
        assert_eq!(err.reason(), Reason::ClientError);
    }

    #[tokio::test]
    async fn too_many_requests_is_retried() {
        let (url, _captured) = serve(vec![(429, "")]).await;
        let err = notifier(&url)
            .notify(&NotifyContext::new("ops", "g"), &[sample_alert("A", false)])
            .await
            .unwrap_err();
        assert!(err.should_retry());
    }
}
