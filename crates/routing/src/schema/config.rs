use herald_core::settings::{RouteDefaults, SmtpDefaults};
use serde::{Deserialize, Serialize};

use super::global::GlobalConfig;
use super::inhibit::InhibitRule;
use super::receiver::Receiver;
use super::route::Route;
use super::time_interval::MuteTimeInterval;
use super::values::PromDuration;
use crate::error::Result;

/// Receiver every initial configuration routes to.
pub const DEFAULT_RECEIVER: &str = "default-receiver";

/// Process-wide defaults for building the initial configuration.
#[derive(Debug, Clone)]
pub struct ConfigOpts {
    pub resolve_timeout: PromDuration,
    pub group_wait: PromDuration,
    pub group_interval: PromDuration,
    pub repeat_interval: PromDuration,
    pub group_by: Vec<String>,
    pub smtp: SmtpDefaults,
}

impl ConfigOpts {
    pub fn from_defaults(routing: &RouteDefaults, smtp: &SmtpDefaults) -> Self {
        Self {
            resolve_timeout: routing.resolve_timeout.into(),
            group_wait: routing.group_wait.into(),
            group_interval: routing.group_interval.into(),
            repeat_interval: routing.repeat_interval.into(),
            group_by: vec!["alertname".to_string()],
            smtp: smtp.clone(),
        }
    }

    fn route_defaults(&self) -> RouteDefaults {
        RouteDefaults {
            group_wait: self.group_wait.as_duration(),
            group_interval: self.group_interval.as_duration(),
            repeat_interval: self.repeat_interval.as_duration(),
            resolve_timeout: self.resolve_timeout.as_duration(),
        }
    }
}

impl Default for ConfigOpts {
    fn default() -> Self {
        Self::from_defaults(&RouteDefaults::default(), &SmtpDefaults::default())
    }
}

/// The complete routing configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global: Option<GlobalConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<Route>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inhibit_rules: Vec<InhibitRule>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub receivers: Vec<Receiver>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub templates: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mute_time_intervals: Vec<MuteTimeInterval>,

    /// Textual form of the installed version.
    #[serde(skip)]
    original: String,
}

impl Config {
    /// A config with one empty default receiver that the root route points at.
    pub fn initial(opts: &ConfigOpts) -> Self {
        let route = Route {
            receiver: DEFAULT_RECEIVER.to_string(),
            group_by: opts.group_by.clone(),
            group_wait: Some(opts.group_wait),
            group_interval: Some(opts.group_interval),
            repeat_interval: Some(opts.repeat_interval),
            ..Route::default()
        };
        Self {
            global: Some(GlobalConfig::from_defaults(&opts.route_defaults(), &opts.smtp)),
            route: Some(route),
            receivers: vec![Receiver::new(DEFAULT_RECEIVER)],
            ..Self::default()
        }
    }

    pub fn original(&self) -> &str {
        &self.original
    }

    pub(crate) fn set_original_text(&mut self, text: String) {
        self.original = text;
    }

    /// Re-derive the textual form from the current structure (JSON).
    pub fn refresh_original(&mut self) -> Result<()> {
        self.original = serde_json::to_string(self)?;
        Ok(())
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn receiver(&self, name: &str) -> Option<&Receiver> {
        self.receivers.iter().find(|r| r.name == name)
    }

    pub fn root_route(&self) -> Option<&Route> {
        self.route.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_config_points_at_default_receiver() {
        let opts = ConfigOpts {
            group_by: vec!["alertname".into(), "cluster".into()],
            ..ConfigOpts::default()
        };
        let cfg = Config::initial(&opts);
        let route = cfg.root_route().unwrap();
        assert_eq!(route.receiver, DEFAULT_RECEIVER);
        assert_eq!(route.group_by, ["alertname", "cluster"]);
        assert_eq!(route.repeat_interval, Some(opts.repeat_interval));
        assert!(cfg.receiver(DEFAULT_RECEIVER).is_some());
        assert_eq!(cfg.receivers.len(), 1);
        assert!(cfg.original().is_empty());
    }

    #[test]
    fn original_is_not_serialized() {
        let mut cfg = Config::initial(&ConfigOpts::default());
        cfg.refresh_original().unwrap();
        assert!(!cfg.original().is_empty());
        let json: serde_json::Value = serde_json::from_str(cfg.original()).unwrap();
        assert!(json.get("original").is_none());
        assert_eq!(json["route"]["receiver"], DEFAULT_RECEIVER);
    }
}
