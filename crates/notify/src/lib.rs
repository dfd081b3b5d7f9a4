//! Alert delivery engine.
//!
//! This crate provides:
//! - `Retrier` and `Reason`: deciding whether an HTTP delivery outcome is retryable
//! - `Notifier` trait with webhook, Slack, Microsoft Teams and email implementations
//! - Minijinja rendering for titles and message bodies
//! - `Dispatcher`: per-receiver notifiers rebuilt on every config install,
//!   with one generic retry loop for all integrations

pub mod dispatcher;
pub mod email;
pub mod http;
pub mod msteams;
pub mod retrier;
pub mod slack;
pub mod templating;
pub mod traits;
pub mod util;
pub mod webhook;

pub use dispatcher::{build_notifiers, test_receiver, Dispatcher, RetryPolicy};
pub use retrier::{Reason, Retrier, StatusError};
pub use traits::{DispatchResult, Notifier, NotifierSettings, NotifyContext, NotifyError};
pub use util::{redact_in, redact_url, truncate, truncate_in_runes};

#[cfg(test)]
mod test_support;
