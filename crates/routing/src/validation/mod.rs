//! Whole-config validation.
//!
//! Checks run in a fixed order and stop at the first failure:
//! root route constraints, global block, receivers (uniqueness and
//! global-default inheritance), route tree, receiver references, mute
//! time intervals, inhibition rules.
//!
//! Inheritance is applied to a working copy and written back only when
//! every check passes, so a rejected config is left untouched and
//! validating an already-valid config changes nothing.

mod receiver_checks;
mod route_checks;

pub use self::receiver_checks::resolve_receiver;

use std::collections::BTreeSet;

use crate::error::{ConfigError, Result};
use crate::schema::Config;

impl Config {
    /// Validate this config, filling unset integration fields from `global`.
    pub fn validate(&mut self) -> Result<()> {
        validate(self)
    }
}

pub fn validate(config: &mut Config) -> Result<()> {
    let root = config
        .route
        .as_ref()
        .ok_or_else(|| ConfigError::validation("no route provided in config"))?;
    route_checks::check_root(root)?;

    let global = config.global.clone().unwrap_or_default();
    global.validate().map_err(ConfigError::Validation)?;

    let mut receivers = config.receivers.clone();
    let mut names = BTreeSet::new();
    for receiver in &mut receivers {
        if receiver.name.is_empty() {
            return Err(ConfigError::validation("missing name in receiver"));
        }
        if !names.insert(receiver.name.clone()) {
            return Err(ConfigError::validation(format!(
                "notification config name {:?} is not unique",
                receiver.name
            )));
        }
        resolve_receiver(receiver, &global)?;
    }

    route_checks::check_tree(root)?;
    route_checks::check_receivers(root, &names)?;

    let mut intervals = BTreeSet::new();
    for mt in &config.mute_time_intervals {
        if mt.name.is_empty() {
            return Err(ConfigError::validation("missing name in mute time interval"));
        }
        if !intervals.insert(mt.name.as_str()) {
            return Err(ConfigError::validation(format!(
                "mute time interval {:?} is not unique",
                mt.name
            )));
        }
    }
    route_checks::check_time_intervals(root, &intervals)?;

    for rule in &config.inhibit_rules {
        rule.validate().map_err(ConfigError::Validation)?;
    }

    config.global = Some(global);
    config.receivers = receivers;
    Ok(())
}
