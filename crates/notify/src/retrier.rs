//! Retry decisions for HTTP delivery outcomes.
//!
//! 2xx responses succeed unless their body matches a configured soft-failure
//! pattern (some endpoints report throttling with a 200). 5xx responses and
//! any integration-specific extra codes are retried; everything else fails
//! permanently. A `Retrier` owns no mutable state and can be shared freely.

use std::fmt;
use std::sync::Arc;

use crate::traits::NotifyError;

/// Extracts a human-readable detail string from a response.
pub type DetailsFn = Arc<dyn Fn(u16, &[u8]) -> String + Send + Sync>;

/// Coarse classification of a failed delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reason {
    Default,
    ClientError,
    ServerError,
}

impl Reason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Reason::Default => "other",
            Reason::ClientError => "clientError",
            Reason::ServerError => "serverError",
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A non-successful response together with the retry recommendation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct StatusError {
    pub status: u16,
    pub retry: bool,
    pub message: String,
}

impl StatusError {
    pub fn should_retry(&self) -> bool {
        self.retry
    }
}

#[derive(Clone, Default)]
pub struct Retrier {
    retry_codes: Vec<u16>,
    soft_failure_patterns: Vec<String>,
    details: Option<DetailsFn>,
}

impl fmt::Debug for Retrier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Retrier")
            .field("retry_codes", &self.retry_codes)
            .field("soft_failure_patterns", &self.soft_failure_patterns)
            .field("details", &self.details.is_some())
            .finish()
    }
}

impl Retrier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extra status codes (besides 5xx) that should be retried.
    pub fn with_retry_codes(mut self, codes: impl IntoIterator<Item = u16>) -> Self {
        self.retry_codes.extend(codes);
        self
    }

    /// Body substrings that mark a response as a retryable failure regardless of status.
    pub fn with_soft_failure_patterns<S: Into<String>>(mut self, patterns: impl IntoIterator<Item = S>) -> Self {
        self.soft_failure_patterns
            .extend(patterns.into_iter().map(Into::into).filter(|p: &String| !p.is_empty()));
        self
    }

    pub fn with_details<F>(mut self, details: F) -> Self
    where
        F: Fn(u16, &[u8]) -> String + Send + Sync + 'static,
    {
        self.details = Some(Arc::new(details));
        self
    }

    fn details(&self, status: u16, body: &[u8]) -> String {
        match &self.details {
            Some(details) => details(status, body),
            None => String::from_utf8_lossy(body).into_owned(),
        }
    }

    fn is_soft_failure(&self, text: &str) -> bool {
        !text.is_empty() && self.soft_failure_patterns.iter().any(|p| text.contains(p.as_str()))
    }

    /// Decide the outcome of a response. `Ok` means delivered.
    pub fn check(&self, status: u16, body: &[u8]) -> Result<(), StatusError> {
        let details = self.details(status, body);
        let soft_failure = self.is_soft_failure(&details);
        let success = status / 100 == 2;
        if success && !soft_failure {
            return Ok(());
        }

        let retry = soft_failure || status / 100 == 5 || self.retry_codes.contains(&status);

        let message = if details.is_empty() {
            format!("unexpected status code {status}")
        } else if success {
            details
        } else {
            format!("unexpected status code {status}: {details}")
        };
        Err(StatusError { status, retry, message })
    }

    pub fn failure_reason(&self, status: u16, text: &str) -> Reason {
        match status / 100 {
            2 if self.is_soft_failure(text) => Reason::ClientError,
            4 => Reason::ClientError,
            5 => Reason::ServerError,
            _ => Reason::Default,
        }
    }

    /// [`Retrier::check`] with the failure wrapped as a classified [`NotifyError`].
    pub fn classify(&self, status: u16, body: &[u8]) -> Result<(), NotifyError> {
        self.check(status, body).map_err(|err| NotifyError::Delivery {
            reason: self.failure_reason(status, &err.message),
            retry: err.retry,
            source: err,
        })
    }
}
