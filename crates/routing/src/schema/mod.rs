//! Configuration schema types with strict serde decoding.
//!
//! Defines the complete type hierarchy of a routing configuration:
//! - `Config`: the top-level document (global, route, receivers, ...)
//! - `GlobalConfig`: defaults inherited by receiver integrations
//! - `Route` / `Matcher`: the routing tree and its label matchers
//! - `Receiver`: named bundles of integration configs
//!
//! Unknown fields are rejected everywhere so typos fail loudly.

mod config;
mod global;
mod inhibit;
mod receiver;
mod route;
mod time_interval;
mod values;

pub use self::config::{Config, ConfigOpts, DEFAULT_RECEIVER};
pub use self::global::{
    GlobalConfig, DEFAULT_OPSGENIE_API_URL, DEFAULT_PAGERDUTY_URL, DEFAULT_VICTOROPS_API_URL,
    DEFAULT_WECHAT_API_URL,
};
pub use self::inhibit::InhibitRule;
pub use self::receiver::{
    BasicAuth, EmailConfig, HttpClientConfig, HttpIntegration, MsTeamsConfig, OpsGenieConfig,
    PagerdutyConfig, PushoverConfig, Receiver, SlackConfig, SnsConfig, TlsConfig, VictorOpsConfig,
    WebhookConfig, WechatConfig,
};
pub(crate) use self::receiver::join_dir;
pub use self::route::{MatchType, Matcher, Pattern, Route, GROUP_BY_ALL};
pub use self::time_interval::{MuteTimeInterval, TimeInterval};
pub use self::values::{is_valid_label_name, HostPort, HttpUrl, PromDuration, Secret};
