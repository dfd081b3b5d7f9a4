use std::collections::BTreeMap;

use herald_core::LabelSet;
use serde::{Deserialize, Serialize};

use super::route::{Matcher, Pattern};
use super::values::is_valid_label_name;

/// Mutes alerts matching the target side while an alert matching the source
/// side is firing, provided both agree on every label in `equal`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InhibitRule {
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub source_match: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub source_match_re: BTreeMap<String, Pattern>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub source_matchers: Vec<Matcher>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub target_match: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub target_match_re: BTreeMap<String, Pattern>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub target_matchers: Vec<Matcher>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub equal: Vec<String>,
}

impl InhibitRule {
    pub fn validate(&self) -> Result<(), String> {
        let names = self
            .source_match
            .keys()
            .chain(self.target_match.keys())
            .chain(self.source_match_re.keys())
            .chain(self.target_match_re.keys())
            .chain(self.equal.iter());
        for name in names {
            if !is_valid_label_name(name) {
                return Err(format!("invalid label name {name:?}"));
            }
        }
        Ok(())
    }

    /// Whether an alert with `source` labels inhibits one with `target` labels.
    pub fn inhibits(&self, source: &LabelSet, target: &LabelSet) -> bool {
        side_matches(&self.source_match, &self.source_match_re, &self.source_matchers, source)
            && side_matches(&self.target_match, &self.target_match_re, &self.target_matchers, target)
            && self.equal.iter().all(|l| source.get(l) == target.get(l))
    }
}

fn side_matches(
    exact: &BTreeMap<String, String>,
    re: &BTreeMap<String, Pattern>,
    matchers: &[Matcher],
    labels: &LabelSet,
) -> bool {
    let get = |name: &str| labels.get(name).map(String::as_str).unwrap_or("");
    exact.iter().all(|(k, v)| get(k) == v)
        && re.iter().all(|(k, p)| p.is_match(get(k)))
        && matchers.iter().all(|m| m.matches_labels(labels))
}
