use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Label or annotation set. Ordered so rendered output is stable.
pub type LabelSet = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Firing,
    Resolved,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::Firing => "firing",
            AlertStatus::Resolved => "resolved",
        }
    }
}

impl fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single alert as handed to the delivery engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    #[serde(default)]
    pub labels: LabelSet,
    #[serde(default)]
    pub annotations: LabelSet,
    pub starts_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ends_at: Option<DateTime<Utc>>,
    #[serde(default, rename = "generatorURL")]
    pub generator_url: String,
}

impl Alert {
    pub fn new(labels: LabelSet, annotations: LabelSet, starts_at: DateTime<Utc>) -> Self {
        Self {
            labels,
            annotations,
            starts_at,
            ends_at: None,
            generator_url: String::new(),
        }
    }

    pub fn name(&self) -> &str {
        self.labels.get("alertname").map(String::as_str).unwrap_or("")
    }

    /// Resolved once `ends_at` lies at or before `now`.
    pub fn status_at(&self, now: DateTime<Utc>) -> AlertStatus {
        match self.ends_at {
            Some(end) if end <= now => AlertStatus::Resolved,
            _ => AlertStatus::Firing,
        }
    }

    pub fn status(&self) -> AlertStatus {
        self.status_at(Utc::now())
    }

    /// Stable hex fingerprint of the label set (FNV-1a).
    pub fn fingerprint(&self) -> String {
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for (k, v) in &self.labels {
            for b in k.bytes().chain([0xff]).chain(v.bytes()).chain([0xff]) {
                hash ^= u64::from(b);
                hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
            }
        }
        format!("{hash:016x}")
    }
}

/// Group status: firing while any member is firing.
pub fn aggregate_status(alerts: &[Alert]) -> AlertStatus {
    let now = Utc::now();
    if alerts.iter().any(|a| a.status_at(now) == AlertStatus::Firing) {
        AlertStatus::Firing
    } else {
        AlertStatus::Resolved
    }
}

/// Pairs shared by every set in `sets`.
pub fn common_pairs<'a>(mut sets: impl Iterator<Item = &'a LabelSet>) -> LabelSet {
    let Some(first) = sets.next() else {
        return LabelSet::new();
    };
    let mut common = first.clone();
    for set in sets {
        common.retain(|k, v| set.get(k) == Some(v));
    }
    common
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn labels(pairs: &[(&str, &str)]) -> LabelSet {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn status_follows_end_time() {
        let now = Utc::now();
        let mut alert = Alert::new(labels(&[("alertname", "A")]), LabelSet::new(), now);
        assert_eq!(alert.status_at(now), AlertStatus::Firing);
        alert.ends_at = Some(now + Duration::minutes(5));
        assert_eq!(alert.status_at(now), AlertStatus::Firing);
        alert.ends_at = Some(now - Duration::seconds(1));
        assert_eq!(alert.status_at(now), AlertStatus::Resolved);
    }

    #[test]
    fn group_is_firing_if_any_member_fires() {
        let now = Utc::now();
        let mut resolved = Alert::new(LabelSet::new(), LabelSet::new(), now);
        resolved.ends_at = Some(now - Duration::minutes(1));
        let firing = Alert::new(LabelSet::new(), LabelSet::new(), now);
        assert_eq!(aggregate_status(&[resolved.clone()]), AlertStatus::Resolved);
        assert_eq!(aggregate_status(&[resolved, firing]), AlertStatus::Firing);
    }

    #[test]
    fn common_pairs_intersects() {
        let a = labels(&[("alertname", "A"), ("env", "prod"), ("pod", "1")]);
        let b = labels(&[("alertname", "A"), ("env", "prod"), ("pod", "2")]);
        let common = common_pairs([&a, &b].into_iter());
        assert_eq!(common, labels(&[("alertname", "A"), ("env", "prod")]));
        assert!(common_pairs(std::iter::empty()).is_empty());
    }

    #[test]
    fn fingerprint_depends_on_labels_only() {
        let now = Utc::now();
        let a = Alert::new(labels(&[("a", "b")]), labels(&[("x", "1")]), now);
        let b = Alert::new(labels(&[("a", "b")]), labels(&[("x", "2")]), now);
        let c = Alert::new(labels(&[("ab", "")]), LabelSet::new(), now);
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
    }
}
