//! Route tree and label matchers.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use herald_core::LabelSet;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::values::{is_valid_label_name, PromDuration};

/// `group_by` entry that groups by every label.
pub const GROUP_BY_ALL: &str = "...";

// ── Anchored regex ──────────────────────────────────────────────────

/// A regular expression anchored at both ends, kept with its source text.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    regex: regex::Regex,
}

impl Pattern {
    pub fn new(source: &str) -> Result<Self, String> {
        let regex = regex::Regex::new(&format!("^(?:{source})$"))
            .map_err(|e| format!("invalid regex {source:?}: {e}"))?;
        Ok(Self { source: source.to_string(), regex })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_match(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Serialize for Pattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}

impl<'de> Deserialize<'de> for Pattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Pattern::new(&s).map_err(D::Error::custom)
    }
}

// ── Matchers ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchType {
    Equal,
    NotEqual,
    Regexp,
    NotRegexp,
}

impl MatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchType::Equal => "=",
            MatchType::NotEqual => "!=",
            MatchType::Regexp => "=~",
            MatchType::NotRegexp => "!~",
        }
    }
}

/// A single label matcher such as `severity=~"critical|page"`.
#[derive(Debug, Clone, PartialEq)]
pub struct Matcher {
    pub name: String,
    pub op: MatchType,
    pub value: String,
    pattern: Option<Pattern>,
}

impl Matcher {
    pub fn new(op: MatchType, name: impl Into<String>, value: impl Into<String>) -> Result<Self, String> {
        let name = name.into();
        let value = value.into();
        if !is_valid_label_name(&name) {
            return Err(format!("invalid label name {name:?} in matcher"));
        }
        let pattern = match op {
            MatchType::Regexp | MatchType::NotRegexp => Some(Pattern::new(&value)?),
            MatchType::Equal | MatchType::NotEqual => None,
        };
        Ok(Self { name, op, value, pattern })
    }

    pub fn matches(&self, value: &str) -> bool {
        match (self.op, &self.pattern) {
            (MatchType::Equal, _) => self.value == value,
            (MatchType::NotEqual, _) => self.value != value,
            (MatchType::Regexp, Some(p)) => p.is_match(value),
            (MatchType::NotRegexp, Some(p)) => !p.is_match(value),
            (_, None) => false,
        }
    }

    /// A missing label matches as the empty string.
    pub fn matches_labels(&self, labels: &LabelSet) -> bool {
        self.matches(labels.get(&self.name).map(String::as_str).unwrap_or(""))
    }
}

impl FromStr for Matcher {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let pos = s
            .find(['=', '!'])
            .ok_or_else(|| format!("bad matcher format: {s}"))?;
        let (name, rest) = s.split_at(pos);
        let (op, rest) = if let Some(r) = rest.strip_prefix("=~") {
            (MatchType::Regexp, r)
        } else if let Some(r) = rest.strip_prefix("!~") {
            (MatchType::NotRegexp, r)
        } else if let Some(r) = rest.strip_prefix("!=") {
            (MatchType::NotEqual, r)
        } else if let Some(r) = rest.strip_prefix('=') {
            (MatchType::Equal, r)
        } else {
            return Err(format!("bad matcher format: {s}"));
        };
        let rest = rest.trim();
        let value = match rest.strip_prefix('"').and_then(|r| r.strip_suffix('"')) {
            Some(quoted) => quoted.replace("\\\"", "\"").replace("\\\\", "\\"),
            None => rest.to_string(),
        };
        Matcher::new(op, name.trim(), value)
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let escaped = self.value.replace('\\', "\\\\").replace('"', "\\\"");
        write!(f, "{}{}\"{}\"", self.name, self.op.as_str(), escaped)
    }
}

impl Serialize for Matcher {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Matcher {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}

// ── Route ───────────────────────────────────────────────────────────

/// A node in the routing tree. Children are evaluated in order; `continue`
/// lets matching proceed to later siblings after this node matched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Route {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub receiver: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub group_by: Vec<String>,
    #[serde(default, rename = "match", skip_serializing_if = "BTreeMap::is_empty")]
    pub match_labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub match_re: BTreeMap<String, Pattern>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub matchers: Vec<Matcher>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mute_time_intervals: Vec<String>,
    #[serde(default, rename = "continue")]
    pub continue_matching: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub routes: Vec<Route>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_wait: Option<PromDuration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_interval: Option<PromDuration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat_interval: Option<PromDuration>,
}

impl Route {
    /// The flat child route created for a channel: matches everything and
    /// lets later siblings see the alert too.
    pub fn for_receiver(name: impl Into<String>) -> Self {
        Self {
            receiver: name.into(),
            continue_matching: true,
            ..Self::default()
        }
    }

    pub fn has_matchers(&self) -> bool {
        !self.match_labels.is_empty() || !self.match_re.is_empty() || !self.matchers.is_empty()
    }

    /// Whether `group_by` contains the all-labels wildcard.
    pub fn groups_by_all(&self) -> bool {
        self.group_by.iter().any(|l| l == GROUP_BY_ALL)
    }

    /// True when every matcher on this node accepts `labels`.
    pub fn matches(&self, labels: &LabelSet) -> bool {
        let get = |name: &str| labels.get(name).map(String::as_str).unwrap_or("");
        self.match_labels.iter().all(|(k, v)| get(k) == v)
            && self.match_re.iter().all(|(k, p)| p.is_match(get(k)))
            && self.matchers.iter().all(|m| m.matches_labels(labels))
    }

    /// Depth-first, pre-order visit of this node and all descendants.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Route)) {
        visit(self);
        for child in &self.routes {
            child.walk(visit);
        }
    }

    /// Node-local checks: label names, `group_by` shape, non-zero intervals.
    pub fn validate(&self) -> Result<(), String> {
        for name in self.match_labels.keys().chain(self.match_re.keys()) {
            if !is_valid_label_name(name) {
                return Err(format!("invalid label name {name:?}"));
            }
        }
        let mut seen = std::collections::BTreeSet::new();
        for label in &self.group_by {
            if label != GROUP_BY_ALL && !is_valid_label_name(label) {
                return Err(format!("invalid label name {label:?} in group_by list"));
            }
            if !seen.insert(label.as_str()) {
                return Err(format!("duplicated label {label:?} in group_by"));
            }
        }
        if self.groups_by_all() && self.group_by.len() > 1 {
            return Err("cannot have wildcard group_by (`...`) and other labels at the same time".to_string());
        }
        if self.group_interval.is_some_and(|d| d.is_zero()) {
            return Err("group_interval cannot be zero".to_string());
        }
        if self.repeat_interval.is_some_and(|d| d.is_zero()) {
            return Err("repeat_interval cannot be zero".to_string());
        }
        Ok(())
    }
}
