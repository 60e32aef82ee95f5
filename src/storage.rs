/// Persisted records and the key-value store they live in

use crate::color::GroupColor;
use crate::error::StoreError;
use crate::rules::RuleSet;
use crate::tab_data::GroupId;
use async_trait::async_trait;
use log::warn;
use regex::Regex;
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;
use std::time::Duration;

pub const RULES_KEY: &str = "rules";
pub const AVAILABLE_GROUPS_KEY: &str = "availableGroups";
pub const SETTINGS_KEY: &str = "settings";

/// Persistent key-value store holding rules, known groups and settings
#[async_trait(?Send)]
pub trait RuleStore {
    async fn load_rules(&self) -> Result<RuleSet, StoreError>;

    async fn save_rules(&self, rules: &RuleSet) -> Result<(), StoreError>;

    async fn load_available_groups(&self) -> Result<AvailableGroups, StoreError>;

    async fn save_available_groups(&self, groups: &AvailableGroups) -> Result<(), StoreError>;

    async fn load_settings(&self) -> Result<Settings, StoreError>;
}

/// A group known to the extension, keyed by title in `AvailableGroups`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "StoredAvailableGroup")]
pub struct AvailableGroup {
    pub group_id: Option<GroupId>,
    pub color: GroupColor,
    pub color_code: String,
}

impl AvailableGroup {
    pub fn new(group_id: GroupId, color: GroupColor) -> AvailableGroup {
        AvailableGroup {
            group_id: Some(group_id),
            color,
            color_code: color.display_code().to_string(),
        }
    }

    pub fn recolor(&mut self, color: GroupColor) {
        self.color = color;
        self.color_code = color.display_code().to_string();
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredAvailableGroup {
    #[serde(default)]
    group_id: Option<GroupId>,
    #[serde(default)]
    color: GroupColor,
    #[serde(default)]
    color_code: String,
}

impl From<StoredAvailableGroup> for AvailableGroup {
    fn from(stored: StoredAvailableGroup) -> Self {
        let color_code = if color_code_pattern().is_match(&stored.color_code) {
            stored.color_code
        } else {
            stored.color.display_code().to_string()
        };

        AvailableGroup {
            group_id: stored.group_id,
            color: stored.color,
            color_code,
        }
    }
}

fn color_code_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^#[0-9A-Fa-f]{6}$").expect("color code pattern is valid"))
}

/// The `availableGroups` record: group title → group
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AvailableGroups {
    groups: BTreeMap<String, AvailableGroup>,
}

impl AvailableGroups {
    pub fn new() -> Self {
        AvailableGroups {
            groups: BTreeMap::new(),
        }
    }

    pub fn upsert(&mut self, title: &str, group: AvailableGroup) {
        self.groups.insert(title.to_string(), group);
    }

    /// Drop every entry pointing at `group_id`, returning the removed titles
    pub fn remove_group_id(&mut self, group_id: GroupId) -> Vec<String> {
        let titles: Vec<String> = self
            .groups
            .iter()
            .filter(|(_, group)| group.group_id == Some(group_id))
            .map(|(title, _)| title.clone())
            .collect();

        for title in &titles {
            self.groups.remove(title);
        }
        titles
    }

    pub fn get(&self, title: &str) -> Option<&AvailableGroup> {
        self.groups.get(title)
    }

    pub fn get_mut(&mut self, title: &str) -> Option<&mut AvailableGroup> {
        self.groups.get_mut(title)
    }

    /// Move an entry to a new title, replacing anything already there
    pub fn rename(&mut self, old_title: &str, new_title: &str) -> bool {
        match self.groups.remove(old_title) {
            Some(group) => {
                self.groups.insert(new_title.to_string(), group);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// User settings (the `settings` record)
///
/// Each field decodes on its own: a value of the wrong shape falls back to
/// that field's default instead of rejecting the whole record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    #[serde(deserialize_with = "lenient_auto_group")]
    pub auto_group: bool,
    #[serde(deserialize_with = "lenient_auto_collapse")]
    pub auto_collapse: bool,
    /// Seconds a group may sit idle before it is collapsed
    #[serde(deserialize_with = "lenient_seconds")]
    pub auto_collapse_time: u64,
}

/// A boolean as an options form may store it
#[derive(Deserialize)]
#[serde(untagged)]
enum FlagField {
    Flag(bool),
    Text(String),
    Other(IgnoredAny),
}

impl FlagField {
    fn or(self, default: bool) -> bool {
        match self {
            FlagField::Flag(flag) => flag,
            FlagField::Text(text) => match text.trim() {
                "true" => true,
                "false" => false,
                _ => {
                    warn!("Ignoring setting {:?}, not a boolean", text);
                    default
                }
            },
            FlagField::Other(_) => default,
        }
    }
}

/// A number of seconds, possibly fractional or typed as text
#[derive(Deserialize)]
#[serde(untagged)]
enum SecondsField {
    Whole(u64),
    Fractional(f64),
    Text(String),
    Other(IgnoredAny),
}

impl SecondsField {
    fn or(self, default: u64) -> u64 {
        let secs = match self {
            SecondsField::Whole(secs) => return secs,
            SecondsField::Fractional(secs) => secs,
            SecondsField::Text(text) => match text.trim().parse::<f64>() {
                Ok(secs) => secs,
                Err(_) => {
                    warn!("Ignoring idle time {:?}, not a number", text);
                    return default;
                }
            },
            SecondsField::Other(_) => return default,
        };

        if secs.is_finite() && secs >= 0.0 {
            secs.round() as u64
        } else {
            warn!("Ignoring idle time {}", secs);
            default
        }
    }
}

fn lenient_auto_group<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(FlagField::deserialize(deserializer)?.or(Settings::default().auto_group))
}

fn lenient_auto_collapse<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(FlagField::deserialize(deserializer)?.or(Settings::default().auto_collapse))
}

fn lenient_seconds<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    Ok(SecondsField::deserialize(deserializer)?.or(Settings::default().auto_collapse_time))
}

impl Settings {
    pub fn idle_threshold(&self) -> Duration {
        Duration::from_secs(self.auto_collapse_time)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            auto_group: true,
            auto_collapse: true,
            auto_collapse_time: 120,
        }
    }
}
