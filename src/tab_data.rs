/// Data structures for tabs and native tab groups
use crate::color::GroupColor;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Host value meaning "not in any group"
pub const TAB_GROUP_ID_NONE: i32 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(pub i32);

/// Opaque handle of a native tab group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub i32);

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Information about a browser tab
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabInfo {
    #[serde(default)]
    pub id: Option<TabId>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub incognito: bool,
    #[serde(
        default,
        deserialize_with = "deserialize_group_id",
        serialize_with = "serialize_group_id"
    )]
    pub group_id: Option<GroupId>,
}

impl TabInfo {
    pub fn new(id: i32, url: &str) -> TabInfo {
        TabInfo {
            id: Some(TabId(id)),
            url: Some(url.to_string()),
            incognito: false,
            group_id: None,
        }
    }
}

/// A native tab group as reported by the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupInfo {
    pub id: GroupId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub color: GroupColor,
    #[serde(default)]
    pub collapsed: bool,
}

/// Properties to change on a native group; unset fields are left alone
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GroupUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<GroupColor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collapsed: Option<bool>,
}

impl GroupUpdate {
    pub fn collapse() -> GroupUpdate {
        GroupUpdate {
            collapsed: Some(true),
            ..GroupUpdate::default()
        }
    }

    pub fn titled(title: &str, color: GroupColor) -> GroupUpdate {
        GroupUpdate {
            title: Some(title.to_string()),
            color: Some(color),
            ..GroupUpdate::default()
        }
    }
}

fn deserialize_group_id<'de, D>(deserializer: D) -> Result<Option<GroupId>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<i32>::deserialize(deserializer)?;
    Ok(raw.filter(|id| *id != TAB_GROUP_ID_NONE).map(GroupId))
}

fn serialize_group_id<S>(group_id: &Option<GroupId>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_i32(group_id.map_or(TAB_GROUP_ID_NONE, |id| id.0))
}
