//! Generic HTTP webhook notifier.
//!
//! Posts the alert group as a version 4 JSON message: the template data
//! plus `version`, `groupKey` and `truncatedAlerts`.

use herald_core::Alert;
use herald_routing::schema::WebhookConfig;
use serde::Serialize;

use crate::http::HttpSender;
use crate::retrier::Retrier;
use crate::templating::TemplateData;
use crate::traits::{Notifier, NotifierSettings, NotifyContext, NotifyError};
use crate::util::redact_in;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookMessage {
    #[serde(flatten)]
    pub data: TemplateData,
    pub version: &'static str,
    pub group_key: String,
    pub truncated_alerts: u64,
}

/// Keep at most `max` alerts (`0` keeps all); returns the number dropped.
pub fn truncate_alerts(max: u64, alerts: &[Alert]) -> (&[Alert], u64) {
    match usize::try_from(max) {
        Ok(max) if max > 0 && alerts.len() > max => (&alerts[..max], (alerts.len() - max) as u64),
        _ => (alerts, 0),
    }
}

#[derive(Debug)]
pub struct WebhookNotifier {
    url: String,
    max_alerts: u64,
    send_resolved: bool,
    sender: HttpSender,
    retrier: Retrier,
}

impl WebhookNotifier {
    pub fn from_config(conf: &WebhookConfig, settings: &NotifierSettings) -> Result<Self, NotifyError> {
        let url = conf
            .url
            .as_ref()
            .map(|u| u.as_str().to_string())
            .ok_or_else(|| NotifyError::Config("webhook url is mandatory".to_string()))?;
        let sender = HttpSender::from_config(conf.http_config.as_ref(), settings)?;

        // Response bodies may echo the URL, which often embeds a token.
        let secret_url = url.clone();
        let retrier = Retrier::new()
            .with_details(move |_, body| redact_in(String::from_utf8_lossy(body).trim(), &secret_url));

        Ok(Self {
            url,
            max_alerts: conf.max_alerts,
            send_resolved: conf.send_resolved,
            sender,
            retrier,
        })
    }
}

#[async_trait::async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, ctx: &NotifyContext, alerts: &[Alert]) -> Result<(), NotifyError> {
        let (kept, truncated) = truncate_alerts(self.max_alerts, alerts);
        if truncated > 0 {
            tracing::debug!(receiver = %ctx.receiver, truncated, "webhook alerts truncated");
        }
        let message = WebhookMessage {
            data: TemplateData::new(ctx, kept),
            version: "4",
            group_key: ctx.group_key.clone(),
            truncated_alerts: truncated,
        };

        let response = self.sender.post_json(&self.url, &message).await?;
        self.retrier.classify(response.status, &response.body)?;

        tracing::debug!(
            receiver = %ctx.receiver,
            status = response.status,
            alerts = kept.len(),
            "webhook notification delivered"
        );
        Ok(())
    }

    fn integration(&self) -> &str {
        "webhook"
    }

    fn send_resolved(&self) -> bool {
        self.send_resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrier::Reason;
    use crate::templating::sample_alert;
    use crate::test_support::serve;
    use herald_routing::schema::HttpUrl;

    fn config(url: &str, max_alerts: u64) -> WebhookConfig {
        WebhookConfig {
            send_resolved: true,
            http_config: None,
            url: Some(HttpUrl::parse(url).unwrap()),
            max_alerts,
        }
    }

    #[test]
    fn truncation_respects_limit() {
        let alerts = vec![sample_alert("A", false), sample_alert("B", false), sample_alert("C", false)];
        assert_eq!(truncate_alerts(0, &alerts).1, 0);
        assert_eq!(truncate_alerts(5, &alerts).1, 0);
        let (kept, dropped) = truncate_alerts(2, &alerts);
        assert_eq!((kept.len(), dropped), (2, 1));
    }

    #[test]
    fn url_is_mandatory() {
        let mut conf = config("http://hook.local/", 0);
        conf.url = None;
        let err = WebhookNotifier::from_config(&conf, &NotifierSettings::default()).unwrap_err();
        assert!(err.to_string().contains("webhook url is mandatory"));
    }

    #[tokio::test]
    async fn posts_version_four_message() {
        let (url, captured) = serve(vec![(200, "")]).await;
        let notifier = WebhookNotifier::from_config(&config(&url, 1), &NotifierSettings::default()).unwrap();
        let ctx = NotifyContext::new("ops", "group-1");
        notifier
            .notify(&ctx, &[sample_alert("A", false), sample_alert("B", false)])
            .await
            .unwrap();

        let body = captured.await.unwrap().remove(0).json();
        assert_eq!(body["version"], "4");
        assert_eq!(body["groupKey"], "group-1");
        assert_eq!(body["truncatedAlerts"], 1);
        assert_eq!(body["receiver"], "ops");
        assert_eq!(body["status"], "firing");
        assert_eq!(body["alerts"].as_array().unwrap().len(), 1);
        assert_eq!(body["alerts"][0]["labels"]["alertname"], "A");
    }

    #[tokio::test]
    async fn server_error_is_retryable_and_redacted() {
        let (url, _captured) = serve(vec![(503, "upstream down")]).await;
        let notifier = WebhookNotifier::from_config(&config(&url, 0), &NotifierSettings::default()).unwrap();
        let err = notifier
            .notify(&NotifyContext::new("ops", "g"), &[sample_alert("A", false)])
            .await
            .unwrap_err();
        assert!(err.should_retry());
        assert_eq!(err.reason(), Reason::ServerError);
        assert_eq!(err.to_string(), "unexpected status code 503: upstream down");
    }

    #[tokio::test]
    async fn client_error_is_permanent() {
        let (url, _captured) = serve(vec![(404, "")]).await;
        let notifier = WebhookNotifier::from_config(&config(&url, 0), &NotifierSettings::default()).unwrap();
        let err = notifier
            .notify(&NotifyContext::new("ops", "g"), &[sample_alert("A", false)])
            .await
            .unwrap_err();
        assert!(!err.should_retry());
        assert_eq!(err.reason(), Reason::ClientError);
    }
}
