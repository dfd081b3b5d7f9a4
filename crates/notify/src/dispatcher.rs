//! Per-receiver notifier registry and the generic delivery loop.
//!
//! The [`Dispatcher`] subscribes to config installs and rebuilds its
//! notifiers from the receivers of every new config. Delivery goes through
//! one retry loop for all integrations: a bounded number of attempts, each
//! under its own timeout, with exponential backoff between retryable
//! failures.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use chrono::Utc;
use herald_core::settings::DeliverySettings;
use herald_core::{Alert, AlertStatus, LabelSet};
use herald_routing::schema::{Config, Receiver};
use herald_routing::SubscriberResult;
use rand::Rng;

use crate::email::EmailNotifier;
use crate::msteams::MsTeamsNotifier;
use crate::slack::SlackNotifier;
use crate::traits::{DispatchResult, Notifier, NotifierSettings, NotifyContext, NotifyError};
use crate::webhook::WebhookNotifier;

/// Attempt and backoff limits for one delivery.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub attempt_timeout: Duration,
    pub backoff_base: Duration,
    pub backoff_max: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            attempt_timeout: Duration::from_secs(10),
            backoff_base: Duration::from_millis(500),
            backoff_max: Duration::from_secs(30),
        }
    }
}

impl From<&DeliverySettings> for RetryPolicy {
    fn from(s: &DeliverySettings) -> Self {
        Self {
            max_attempts: s.max_attempts.max(1),
            attempt_timeout: s.attempt_timeout,
            backoff_base: s.backoff_base,
            backoff_max: s.backoff_max,
        }
    }
}

impl RetryPolicy {
    /// Delay after the `attempt`-th failure: doubling from the base, capped,
    /// plus up to 25% jitter.
    fn backoff(&self, attempt: u32) -> Duration {
        let exp = self
            .backoff_base
            .saturating_mul(1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX))
            .min(self.backoff_max);
        let jitter_ms = (exp.as_millis() / 4) as u64;
        if jitter_ms == 0 {
            return exp;
        }
        exp + Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms))
    }
}

/// Build notifiers for every supported integration configured on `receiver`.
///
/// Integrations without a delivery implementation are skipped with a warning.
pub fn build_notifiers(
    receiver: &Receiver,
    settings: &NotifierSettings,
) -> Result<Vec<Arc<dyn Notifier>>, NotifyError> {
    let mut notifiers: Vec<Arc<dyn Notifier>> = Vec::new();
    for conf in &receiver.webhook_configs {
        notifiers.push(Arc::new(WebhookNotifier::from_config(conf, settings)?));
    }
    for conf in &receiver.slack_configs {
        notifiers.push(Arc::new(SlackNotifier::from_config(conf, settings)?));
    }
    for conf in &receiver.msteams_configs {
        notifiers.push(Arc::new(MsTeamsNotifier::from_config(conf, settings)?));
    }
    for conf in &receiver.email_configs {
        notifiers.push(Arc::new(EmailNotifier::from_config(conf)?));
    }

    let unsupported = [
        ("pagerduty", receiver.pagerduty_configs.len()),
        ("opsgenie", receiver.opsgenie_configs.len()),
        ("wechat", receiver.wechat_configs.len()),
        ("pushover", receiver.pushover_configs.len()),
        ("victorops", receiver.victorops_configs.len()),
        ("sns", receiver.sns_configs.len()),
    ];
    for (integration, count) in unsupported {
        if count > 0 {
            tracing::warn!(
                receiver = %receiver.name,
                integration,
                count,
                "integration has no delivery support; skipping"
            );
        }
    }
    Ok(notifiers)
}

type Registry = HashMap<String, Vec<Arc<dyn Notifier>>>;

/// Routes alert groups to the notifiers of a named receiver.
pub struct Dispatcher {
    settings: NotifierSettings,
    policy: RetryPolicy,
    receivers: RwLock<Registry>,
}

impl Dispatcher {
    pub fn new(settings: NotifierSettings, policy: RetryPolicy) -> Self {
        Self {
            settings,
            policy,
            receivers: RwLock::new(HashMap::new()),
        }
    }

    pub fn settings(&self) -> &NotifierSettings {
        &self.settings
    }

    /// Replace all notifiers with ones built from `config`.
    ///
    /// Nothing is replaced unless every receiver builds.
    pub fn rebuild(&self, config: &Config) -> Result<(), NotifyError> {
        let mut registry = Registry::with_capacity(config.receivers.len());
        let mut total = 0;
        for receiver in &config.receivers {
            let notifiers = build_notifiers(receiver, &self.settings).map_err(|e| {
                NotifyError::Config(format!("receiver {:?}: {e}", receiver.name))
            })?;
            total += notifiers.len();
            registry.insert(receiver.name.clone(), notifiers);
        }

        let receivers = registry.len();
        *self.receivers.write().expect("notifier registry lock poisoned") = registry;
        tracing::info!(receivers, notifiers = total, "notifiers rebuilt");
        Ok(())
    }

    /// Coordinator subscriber that calls [`Dispatcher::rebuild`].
    pub fn subscriber(self: &Arc<Self>) -> impl Fn(&Config) -> SubscriberResult + Send + Sync + 'static {
        let dispatcher = Arc::clone(self);
        move |config: &Config| dispatcher.rebuild(config).map_err(Into::into)
    }

    /// Names of receivers with a registry entry, sorted.
    pub fn receivers(&self) -> Vec<String> {
        let registry = self.receivers.read().expect("notifier registry lock poisoned");
        let mut names: Vec<String> = registry.keys().cloned().collect();
        names.sort();
        names
    }

    #[cfg(test)]
    fn set_receiver(&self, name: &str, notifiers: Vec<Arc<dyn Notifier>>) {
        self.receivers
            .write()
            .expect("notifier registry lock poisoned")
            .insert(name.to_string(), notifiers);
    }

    /// Deliver `alerts` through every notifier of `receiver`.
    ///
    /// One failing integration does not stop the others; per-integration
    /// outcomes are in the returned results.
    pub async fn dispatch(
        &self,
        receiver: &str,
        ctx: &NotifyContext,
        alerts: &[Alert],
    ) -> Result<Vec<DispatchResult>, NotifyError> {
        let notifiers = self
            .receivers
            .read()
            .expect("notifier registry lock poisoned")
            .get(receiver)
            .cloned()
            .ok_or_else(|| NotifyError::Config(format!("unknown receiver {receiver:?}")))?;

        let mut results = Vec::with_capacity(notifiers.len());
        for notifier in &notifiers {
            results.push(deliver(notifier.as_ref(), &self.policy, ctx, alerts).await);
        }
        Ok(results)
    }
}

async fn deliver(
    notifier: &dyn Notifier,
    policy: &RetryPolicy,
    ctx: &NotifyContext,
    alerts: &[Alert],
) -> DispatchResult {
    let start = Instant::now();
    let integration = notifier.integration().to_string();
    let now = Utc::now();

    let filtered: Vec<Alert>;
    let alerts = if notifier.send_resolved() {
        alerts
    } else {
        filtered = alerts
            .iter()
            .filter(|a| a.status_at(now) == AlertStatus::Firing)
            .cloned()
            .collect();
        &filtered[..]
    };

    let result = |success, attempts, err: Option<&NotifyError>| DispatchResult {
        receiver: ctx.receiver.clone(),
        integration: integration.clone(),
        success,
        attempts,
        reason: err.map(NotifyError::reason),
        error: err.map(ToString::to_string),
        duration_ms: start.elapsed().as_millis() as u64,
    };

    if alerts.is_empty() {
        tracing::debug!(receiver = %ctx.receiver, integration = %integration, "nothing to send");
        return result(true, 0, None);
    }

    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        let outcome = match tokio::time::timeout(policy.attempt_timeout, notifier.notify(ctx, alerts)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(NotifyError::Timeout(policy.attempt_timeout)),
        };

        let err = match outcome {
            Ok(()) => {
                let done = result(true, attempt, None);
                tracing::info!(
                    receiver = %ctx.receiver,
                    integration = %integration,
                    attempts = attempt,
                    duration_ms = done.duration_ms,
                    "Notification delivered"
                );
                return done;
            }
            Err(err) => err,
        };

        if !err.should_retry() || attempt >= max_attempts {
            let failed = result(false, attempt, Some(&err));
            tracing::warn!(
                receiver = %ctx.receiver,
                integration = %integration,
                attempts = attempt,
                reason = %err.reason(),
                error = %err,
                duration_ms = failed.duration_ms,
                "Notification delivery failed"
            );
            return failed;
        }

        let delay = policy.backoff(attempt);
        tracing::debug!(
            receiver = %ctx.receiver,
            integration = %integration,
            attempt,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "retrying notification"
        );
        tokio::time::sleep(delay).await;
    }
}

pub const TEST_ALERT_TEXT: &str = "Test Alert fired from Herald";

fn test_labels() -> LabelSet {
    LabelSet::from([
        ("alertname".to_string(), "TestAlert".to_string()),
        ("severity".to_string(), "info".to_string()),
    ])
}

/// Send one synthetic alert through every supported integration of `receiver`.
///
/// `receiver` should already have its global defaults resolved. Nothing is
/// registered with the dispatcher.
pub async fn test_receiver(receiver: &Receiver, settings: &NotifierSettings) -> Result<(), NotifyError> {
    let notifiers = build_notifiers(receiver, settings)?;
    if notifiers.is_empty() {
        return Err(NotifyError::Config(format!(
            "unsupported integration: receiver {:?} has no integration that can be tested",
            receiver.name
        )));
    }

    let annotations = LabelSet::from([
        ("description".to_string(), TEST_ALERT_TEXT.to_string()),
        ("summary".to_string(), TEST_ALERT_TEXT.to_string()),
    ]);
    let alert = Alert::new(test_labels(), annotations, Utc::now());
    let ctx = NotifyContext {
        receiver: receiver.name.clone(),
        group_key: "1".to_string(),
        group_labels: test_labels(),
        repeat_interval: Some(Duration::from_secs(3600)),
        external_url: settings.external_url.clone(),
    };

    for notifier in notifiers {
        notifier.notify(&ctx, std::slice::from_ref(&alert)).await?;
        tracing::info!(receiver = %receiver.name, integration = notifier.integration(), "test notification sent");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrier::{Reason, StatusError};
    use crate::templating::sample_alert;
    use crate::test_support::serve;
    use herald_routing::schema::{ConfigOpts, HttpUrl, PagerdutyConfig, WebhookConfig};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Fails with the queued errors, then succeeds.
    struct MockNotifier {
        name: String,
        calls: Arc<AtomicUsize>,
        failures: Mutex<Vec<NotifyError>>,
        send_resolved: bool,
        seen: Arc<Mutex<Vec<usize>>>,
    }

    impl MockNotifier {
        fn new(name: &str, failures: Vec<NotifyError>) -> Self {
            Self {
                name: name.to_string(),
                calls: Arc::new(AtomicUsize::new(0)),
                failures: Mutex::new(failures),
                send_resolved: true,
                seen: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    #[async_trait::async_trait]
    impl Notifier for MockNotifier {
        async fn notify(&self, _ctx: &NotifyContext, alerts: &[Alert]) -> Result<(), NotifyError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(alerts.len());
            match self.failures.lock().unwrap().pop() {
                Some(err) => Err(err),
                None => Ok(()),
            }
        }
        fn integration(&self) -> &str {
            &self.name
        }
        fn send_resolved(&self) -> bool {
            self.send_resolved
        }
    }

    fn server_error() -> NotifyError {
        NotifyError::Delivery {
            reason: Reason::ServerError,
            retry: true,
            source: StatusError { status: 502, retry: true, message: "unexpected status code 502".into() },
        }
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            attempt_timeout: Duration::from_secs(5),
            backoff_base: Duration::from_millis(1),
            backoff_max: Duration::from_millis(2),
        }
    }

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(NotifierSettings::default(), fast_policy())
    }

    #[tokio::test]
    async fn retryable_failures_are_retried_until_success() {
        let mock = MockNotifier::new("mock", vec![server_error(), server_error()]);
        let calls = mock.calls.clone();
        let d = dispatcher();
        d.set_receiver("ops", vec![Arc::new(mock)]);

        let results = d
            .dispatch("ops", &NotifyContext::new("ops", "g"), &[sample_alert("A", false)])
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].success);
        assert_eq!(results[0].attempts, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_failure_stops_immediately() {
        let mock = MockNotifier::new("mock", vec![NotifyError::Config("bad".into())]);
        let calls = mock.calls.clone();
        let ok = MockNotifier::new("ok", vec![]);
        let ok_calls = ok.calls.clone();
        let d = dispatcher();
        d.set_receiver("ops", vec![Arc::new(mock), Arc::new(ok)]);

        let results = d
            .dispatch("ops", &NotifyContext::new("ops", "g"), &[sample_alert("A", false)])
            .await
            .unwrap();
        assert!(!results[0].success);
        assert_eq!(results[0].attempts, 1);
        assert_eq!(results[0].reason, Some(Reason::Default));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(results[1].success);
        assert_eq!(ok_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn attempts_are_bounded() {
        let mock = MockNotifier::new("mock", (0..10).map(|_| server_error()).collect());
        let d = dispatcher();
        d.set_receiver("ops", vec![Arc::new(mock)]);
        let results = d
            .dispatch("ops", &NotifyContext::new("ops", "g"), &[sample_alert("A", false)])
            .await
            .unwrap();
        assert!(!results[0].success);
        assert_eq!(results[0].attempts, 3);
        assert_eq!(results[0].reason, Some(Reason::ServerError));
    }

    #[tokio::test]
    async fn resolved_alerts_are_dropped_when_not_wanted() {
        let mut mock = MockNotifier::new("mock", vec![]);
        mock.send_resolved = false;
        let seen = mock.seen.clone();
        let d = dispatcher();
        d.set_receiver("ops", vec![Arc::new(mock)]);

        let ctx = NotifyContext::new("ops", "g");
        d.dispatch("ops", &ctx, &[sample_alert("A", false), sample_alert("B", true)])
            .await
            .unwrap();
        let results = d.dispatch("ops", &ctx, &[sample_alert("B", true)]).await.unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![1]);
        assert!(results[0].success);
        assert_eq!(results[0].attempts, 0);
    }

    #[tokio::test]
    async fn unknown_receiver_is_an_error() {
        let err = dispatcher()
            .dispatch("nope", &NotifyContext::default(), &[])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("unknown receiver"));
    }

    #[test]
    fn backoff_grows_and_is_capped() {
        let policy = RetryPolicy {
            backoff_base: Duration::from_millis(100),
            backoff_max: Duration::from_millis(300),
            ..RetryPolicy::default()
        };
        let first = policy.backoff(1);
        assert!(first >= Duration::from_millis(100) && first <= Duration::from_millis(125));
        let second = policy.backoff(2);
        assert!(second >= Duration::from_millis(200) && second <= Duration::from_millis(250));
        let capped = policy.backoff(40);
        assert!(capped >= Duration::from_millis(300) && capped <= Duration::from_millis(375));
    }

    fn webhook_receiver(name: &str, url: &str) -> Receiver {
        let mut receiver = Receiver::new(name);
        receiver.webhook_configs.push(WebhookConfig {
            send_resolved: true,
            http_config: None,
            url: Some(HttpUrl::parse(url).unwrap()),
            max_alerts: 0,
        });
        receiver
    }

    #[test]
    fn rebuild_registers_every_receiver_and_skips_unsupported() {
        let mut config = Config::initial(&ConfigOpts::default());
        let mut pager = Receiver::new("pager");
        pager.pagerduty_configs.push(serde_json::from_str::<PagerdutyConfig>(r#"{"routing_key":"k"}"#).unwrap());
        config.receivers.push(pager);
        config.receivers.push(webhook_receiver("hook", "http://hook.local/"));

        let d = Arc::new(dispatcher());
        let subscriber = d.subscriber();
        subscriber(&config).unwrap();
        assert_eq!(d.receivers(), vec!["default-receiver", "hook", "pager"]);
    }

    #[test]
    fn failed_rebuild_keeps_previous_notifiers() {
        let mut config = Config::initial(&ConfigOpts::default());
        let d = dispatcher();
        d.rebuild(&config).unwrap();

        let mut broken = Receiver::new("broken");
        broken.webhook_configs.push(WebhookConfig {
            send_resolved: true,
            http_config: None,
            url: None,
            max_alerts: 0,
        });
        config.receivers.push(broken);
        let err = d.rebuild(&config).unwrap_err();
        assert!(err.to_string().contains("broken"));
        assert_eq!(d.receivers(), vec!["default-receiver"]);
    }

    #[tokio::test]
    async fn test_receiver_sends_synthetic_alert() {
        let (url, captured) = serve(vec![(200, "")]).await;
        test_receiver(&webhook_receiver("receiver-test-1", &url), &NotifierSettings::default())
            .await
            .unwrap();

        let body = captured.await.unwrap().remove(0).json();
        assert_eq!(body["receiver"], "receiver-test-1");
        assert_eq!(body["groupKey"], "1");
        assert_eq!(body["alerts"][0]["labels"]["alertname"], "TestAlert");
        assert_eq!(body["alerts"][0]["annotations"]["summary"], TEST_ALERT_TEXT);
        assert_eq!(body["groupLabels"]["severity"], "info");
    }

    #[tokio::test]
    async fn test_receiver_without_supported_integration_fails() {
        let err = test_receiver(&Receiver::new("empty"), &NotifierSettings::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("unsupported integration"));
    }
}
