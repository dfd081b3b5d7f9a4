//! Route tree checks: root constraints, node validity, references.

use std::collections::BTreeSet;

use crate::error::{ConfigError, Result};
use crate::schema::Route;

/// The root route is the fallback for every alert.
pub(super) fn check_root(root: &Route) -> Result<()> {
    if root.continue_matching {
        return Err(ConfigError::validation("cannot have continue in root route"));
    }
    if root.receiver.is_empty() {
        return Err(ConfigError::validation("root route must specify a default receiver"));
    }
    if root.has_matchers() {
        return Err(ConfigError::validation("root route must not have any matchers"));
    }
    if !root.mute_time_intervals.is_empty() {
        return Err(ConfigError::validation("root route must not have any mute time intervals"));
    }
    Ok(())
}

pub(super) fn check_tree(root: &Route) -> Result<()> {
    let mut result = Ok(());
    root.walk(&mut |r| {
        if result.is_ok() {
            result = r.validate().map_err(ConfigError::Validation);
        }
    });
    result
}

/// Every route's receiver must name a defined receiver. Child routes may
/// leave it empty and inherit from their parent.
pub(super) fn check_receivers(root: &Route, names: &BTreeSet<String>) -> Result<()> {
    let mut result = Ok(());
    root.walk(&mut |r| {
        if result.is_ok() && !r.receiver.is_empty() && !names.contains(&r.receiver) {
            result = Err(ConfigError::validation(format!(
                "undefined receiver {:?} used in route",
                r.receiver
            )));
        }
    });
    result
}

pub(super) fn check_time_intervals(root: &Route, intervals: &BTreeSet<&str>) -> Result<()> {
    let mut result = Ok(());
    root.walk(&mut |r| {
        if result.is_err() {
            return;
        }
        if let Some(name) = r.mute_time_intervals.iter().find(|n| !intervals.contains(n.as_str())) {
            result = Err(ConfigError::validation(format!(
                "undefined time interval {name:?} used in route"
            )));
        }
    });
    result
}
