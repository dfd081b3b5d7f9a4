//! Minijinja template rendering for notification titles and bodies.
//!
//! Templates are arbitrary strings from receiver configs (not
//! pre-registered), so a fresh [`minijinja::Environment`] is created per
//! render call. Templates see a [`TemplateData`] value, the same structure
//! the webhook integration posts.

use chrono::{DateTime, SecondsFormat, Utc};
use herald_core::alert::{aggregate_status, common_pairs};
use herald_core::{Alert, LabelSet};
use serde::Serialize;

use crate::traits::{NotifyContext, NotifyError};

pub const DEFAULT_TITLE: &str =
    "[{{ status | upper }}{% if status == \"firing\" %}:{{ alerts | length }}{% endif %}] {{ commonLabels.alertname }}";

pub const DEFAULT_TEXT: &str = "{% for alert in alerts %}[{{ alert.status }}] {{ alert.labels.alertname }}: \
{{ alert.annotations.summary or alert.annotations.description }}\n{% endfor %}";

/// Zero time used for unset end timestamps on the wire.
const ZERO_TIME: &str = "0001-01-01T00:00:00Z";

fn rfc3339(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// One alert as exposed to templates and webhook payloads.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateAlert {
    pub status: String,
    pub labels: LabelSet,
    pub annotations: LabelSet,
    pub starts_at: String,
    pub ends_at: String,
    #[serde(rename = "generatorURL")]
    pub generator_url: String,
    pub fingerprint: String,
}

/// Alert-group data available to templates.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateData {
    pub receiver: String,
    pub status: String,
    pub alerts: Vec<TemplateAlert>,
    pub group_labels: LabelSet,
    pub common_labels: LabelSet,
    pub common_annotations: LabelSet,
    #[serde(rename = "externalURL")]
    pub external_url: String,
}

impl TemplateData {
    pub fn new(ctx: &NotifyContext, alerts: &[Alert]) -> Self {
        let now = Utc::now();
        Self {
            receiver: ctx.receiver.clone(),
            status: aggregate_status(alerts).to_string(),
            alerts: alerts
                .iter()
                .map(|a| TemplateAlert {
                    status: a.status_at(now).to_string(),
                    labels: a.labels.clone(),
                    annotations: a.annotations.clone(),
                    starts_at: rfc3339(a.starts_at),
                    ends_at: a.ends_at.map(rfc3339).unwrap_or_else(|| ZERO_TIME.to_string()),
                    generator_url: a.generator_url.clone(),
                    fingerprint: a.fingerprint(),
                })
                .collect(),
            group_labels: ctx.group_labels.clone(),
            common_labels: common_pairs(alerts.iter().map(|a| &a.labels)),
            common_annotations: common_pairs(alerts.iter().map(|a| &a.annotations)),
            external_url: ctx.external_url.clone(),
        }
    }

    pub fn is_firing(&self) -> bool {
        self.status == "firing"
    }
}

/// Renders notification templates using minijinja.
#[derive(Debug)]
pub struct TemplateRenderer {
    _private: (),
}

impl TemplateRenderer {
    pub fn new() -> Self {
        Self { _private: () }
    }

    fn build_env() -> minijinja::Environment<'static> {
        let mut env = minijinja::Environment::new();
        env.add_filter("lower", lower_filter);
        env.add_filter("upper", upper_filter);
        env
    }

    /// Render a template string against alert-group data.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Template`] if the template is invalid or
    /// rendering fails.
    pub fn render(&self, template_str: &str, data: &TemplateData) -> Result<String, NotifyError> {
        let env = Self::build_env();
        env.render_str(template_str, data)
            .map_err(|e| NotifyError::Template(e.to_string()))
    }

    /// Render `template_str`, or `fallback` when it is empty.
    pub fn render_or(&self, template_str: &str, fallback: &str, data: &TemplateData) -> Result<String, NotifyError> {
        if template_str.is_empty() {
            self.render(fallback, data)
        } else {
            self.render(template_str, data)
        }
    }

    /// Check syntax without evaluating.
    pub fn validate(&self, template_str: &str) -> Result<(), NotifyError> {
        let env = Self::build_env();
        env.template_from_str(template_str)
            .map_err(|e| NotifyError::Template(e.to_string()))?;
        Ok(())
    }
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new()
    }
}

fn lower_filter(value: String) -> String {
    value.to_lowercase()
}

fn upper_filter(value: String) -> String {
    value.to_uppercase()
}

#[cfg(test)]
pub(crate) fn sample_alert(name: &str, resolved: bool) -> Alert {
    let mut labels = LabelSet::new();
    labels.insert("alertname".into(), name.into());
    labels.insert("severity".into(), "critical".into());
    labels.insert("ruleSource".into(), "http://signoz.local/alerts/edit?ruleId=7".into());
    labels.insert("service".into(), "checkout".into());
    let mut annotations = LabelSet::new();
    annotations.insert("summary".into(), format!("{name} is failing"));
    annotations.insert("runbook".into(), "http://wiki.local/runbook".into());
    let now = Utc::now();
    let mut alert = Alert::new(labels, annotations, now - chrono::Duration::minutes(10));
    if resolved {
        alert.ends_at = Some(now - chrono::Duration::minutes(1));
    }
    alert
}
