//! Notifier trait definition and shared error types.

use std::time::Duration;

use herald_core::{Alert, LabelSet};

use crate::retrier::{Reason, StatusError};
use crate::util::default_user_agent;

/// Errors that can occur during alert delivery.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// Transport failure. The URL has already been stripped; build with
    /// [`crate::util::redact_url`].
    #[error("HTTP request failed: {0}")]
    Http(reqwest::Error),

    #[error("SMTP delivery failed: {message}")]
    Smtp { message: String, transient: bool },

    #[error("Template rendering failed: {0}")]
    Template(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// The endpoint answered, but not with success.
    #[error("{source}")]
    Delivery {
        reason: Reason,
        retry: bool,
        source: StatusError,
    },

    #[error("delivery attempt timed out after {0:?}")]
    Timeout(Duration),
}

impl NotifyError {
    /// Whether the dispatcher should try again.
    pub fn should_retry(&self) -> bool {
        match self {
            NotifyError::Http(_) | NotifyError::Timeout(_) => true,
            NotifyError::Smtp { transient, .. } => *transient,
            NotifyError::Delivery { retry, .. } => *retry,
            NotifyError::Template(_) | NotifyError::Config(_) => false,
        }
    }

    pub fn reason(&self) -> Reason {
        match self {
            NotifyError::Delivery { reason, .. } => *reason,
            _ => Reason::Default,
        }
    }
}

/// Per-notification context: which receiver and alert group is being notified.
#[derive(Debug, Clone, Default)]
pub struct NotifyContext {
    pub receiver: String,
    pub group_key: String,
    pub group_labels: LabelSet,
    pub repeat_interval: Option<Duration>,
    pub external_url: String,
}

impl NotifyContext {
    pub fn new(receiver: impl Into<String>, group_key: impl Into<String>) -> Self {
        Self {
            receiver: receiver.into(),
            group_key: group_key.into(),
            ..Self::default()
        }
    }
}

/// Construction-time settings shared by every notifier.
#[derive(Debug, Clone)]
pub struct NotifierSettings {
    pub user_agent: String,
    pub external_url: String,
    /// Request timeout applied to the HTTP client.
    pub timeout: Duration,
}

impl Default for NotifierSettings {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            external_url: String::new(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// A single delivery channel for alert groups.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver `alerts` once. Retrying is the caller's job; the error says
    /// whether it is worth it via [`NotifyError::should_retry`].
    async fn notify(&self, ctx: &NotifyContext, alerts: &[Alert]) -> Result<(), NotifyError>;

    /// Integration name (e.g. "webhook", "email").
    fn integration(&self) -> &str;

    /// Whether resolved alerts are delivered at all.
    fn send_resolved(&self) -> bool {
        true
    }
}

/// Result of delivering one alert group through a single notifier.
#[derive(Debug)]
pub struct DispatchResult {
    pub receiver: String,
    pub integration: String,
    pub success: bool,
    pub attempts: u32,
    pub reason: Option<Reason>,
    pub error: Option<String>,
    pub duration_ms: u64,
}
