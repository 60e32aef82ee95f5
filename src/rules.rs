/// Domain grouping rules (the `rules` storage record)
use crate::color::GroupColor;
use crate::domain::normalize_host;
use crate::error::RuleError;
use log::warn;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// A validated rule: tabs on `domain` belong in the group `group_title`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    domain: String,
    group_title: String,
    color: GroupColor,
}

impl Rule {
    /// Build a rule from user or stored input
    ///
    /// The domain is trimmed, lowercased and stripped of a leading "www.",
    /// then checked against hostname syntax. The group title is trimmed
    /// and must not be empty.
    pub fn new(domain: &str, group_title: &str, color: GroupColor) -> Result<Rule, RuleError> {
        let domain = normalize_host(domain).ok_or(RuleError::EmptyDomain)?;
        if !hostname_pattern().is_match(&domain) {
            return Err(RuleError::InvalidDomain(domain));
        }

        let group_title = group_title.trim();
        if group_title.is_empty() {
            return Err(RuleError::EmptyGroupTitle);
        }

        Ok(Rule {
            domain,
            group_title: group_title.to_string(),
            color,
        })
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn group_title(&self) -> &str {
        &self.group_title
    }

    pub fn color(&self) -> GroupColor {
        self.color
    }
}

fn hostname_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[a-z0-9]([a-z0-9-]*[a-z0-9])?(\.[a-z0-9]([a-z0-9-]*[a-z0-9])?)*$")
            .expect("hostname pattern is valid")
    })
}

/// A rule as it is stored: `{ "group": "...", "color": "..." }` keyed by domain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRule {
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub color: GroupColor,
}

/// All rules, keyed by bare domain
///
/// Decoding drops entries that fail validation so malformed stored data
/// never reaches the grouping logic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, StoredRule>", into = "BTreeMap<String, StoredRule>")]
pub struct RuleSet {
    rules: BTreeMap<String, Rule>,
}

impl RuleSet {
    pub fn new() -> Self {
        RuleSet {
            rules: BTreeMap::new(),
        }
    }

    /// Rules installed when the store has none
    pub fn defaults() -> Self {
        let mut rules = RuleSet::new();
        for (domain, group, color) in [
            ("facebook.com", "Social", GroupColor::Blue),
            ("twitter.com", "Social", GroupColor::Blue),
            ("youtube.com", "Entertainment", GroupColor::Red),
            ("github.com", "Work", GroupColor::Green),
        ] {
            if let Ok(rule) = Rule::new(domain, group, color) {
                rules.insert(rule);
            }
        }
        rules
    }

    /// Insert or replace the rule for its domain
    pub fn insert(&mut self, rule: Rule) {
        self.rules.insert(rule.domain().to_string(), rule);
    }

    /// Exact-match lookup on a bare hostname
    pub fn lookup(&self, hostname: &str) -> Option<&Rule> {
        self.rules.get(hostname)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl From<BTreeMap<String, StoredRule>> for RuleSet {
    fn from(stored: BTreeMap<String, StoredRule>) -> Self {
        let mut rules = RuleSet::new();
        for (domain, entry) in stored {
            match Rule::new(&domain, &entry.group, entry.color) {
                Ok(rule) => rules.insert(rule),
                Err(e) => warn!("Dropping stored rule for {:?}: {}", domain, e),
            }
        }
        rules
    }
}

impl From<RuleSet> for BTreeMap<String, StoredRule> {
    fn from(rules: RuleSet) -> Self {
        rules
            .rules
            .into_values()
            .map(|rule| {
                (
                    rule.domain,
                    StoredRule {
                        group: rule.group_title,
                        color: rule.color,
                    },
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_normalizes_domain() {
        let rule = Rule::new(" WWW.GitHub.com ", " Work ", GroupColor::Green).unwrap();
        assert_eq!(rule.domain(), "github.com");
        assert_eq!(rule.group_title(), "Work");
        assert_eq!(rule.color(), GroupColor::Green);
    }

    #[test]
    fn test_rule_rejects_bad_input() {
        assert_eq!(Rule::new("", "Work", GroupColor::Grey), Err(RuleError::EmptyDomain));
        assert_eq!(Rule::new("github.com", "   ", GroupColor::Grey), Err(RuleError::EmptyGroupTitle));
        assert_eq!(
            Rule::new("https://github.com/x", "Work", GroupColor::Grey),
            Err(RuleError::InvalidDomain("https://github.com/x".to_string()))
        );
        assert!(Rule::new("-bad-.com", "Work", GroupColor::Grey).is_err());
    }

    #[test]
    fn test_lookup_is_exact() {
        let rules = RuleSet::defaults();
        assert_eq!(rules.lookup("github.com").map(|r| r.group_title()), Some("Work"));
        assert!(rules.lookup("gist.github.com").is_none());
        assert!(rules.lookup("hub.com").is_none());
    }

    #[test]
    fn test_defaults() {
        let rules = RuleSet::defaults();
        assert_eq!(rules.len(), 4);
        assert_eq!(rules.lookup("twitter.com").map(|r| r.color()), Some(GroupColor::Blue));
        assert_eq!(
            rules.lookup("youtube.com").map(|r| r.group_title()),
            Some("Entertainment")
        );
    }

    #[test]
    fn test_decode_drops_invalid_entries() {
        let json = r#"{
            "github.com": { "group": "Work", "color": "green" },
            "www.reddit.com": { "group": "Fun" },
            "bad domain": { "group": "Oops", "color": "red" },
            "example.com": { "group": "", "color": "blue" }
        }"#;

        let rules: RuleSet = serde_json::from_str(json).unwrap();

        assert_eq!(rules.len(), 2);
        assert_eq!(rules.lookup("reddit.com").map(|r| r.color()), Some(GroupColor::Grey));
        assert!(rules.lookup("example.com").is_none());
    }

    #[test]
    fn test_stored_shape() {
        let json = serde_json::to_value(RuleSet::defaults()).unwrap();
        assert_eq!(
            json["github.com"],
            serde_json::json!({ "group": "Work", "color": "green" })
        );
    }
}
