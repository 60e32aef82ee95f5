/// Tab group colors and their display codes
use serde::{Deserialize, Serialize};
use std::fmt;

/// The colors a native tab group can take.
///
/// Stored and sent to the host by lowercase name. Unknown names decode as
/// `Grey` rather than failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum GroupColor {
    #[default]
    Grey,
    Blue,
    Red,
    Yellow,
    Green,
    Pink,
    Purple,
    Cyan,
    Orange,
}

impl GroupColor {
    pub const ALL: [GroupColor; 9] = [
        GroupColor::Grey,
        GroupColor::Blue,
        GroupColor::Red,
        GroupColor::Yellow,
        GroupColor::Green,
        GroupColor::Pink,
        GroupColor::Purple,
        GroupColor::Cyan,
        GroupColor::Orange,
    ];

    /// Name understood by the host tab group API
    pub fn name(self) -> &'static str {
        match self {
            GroupColor::Grey => "grey",
            GroupColor::Blue => "blue",
            GroupColor::Red => "red",
            GroupColor::Yellow => "yellow",
            GroupColor::Green => "green",
            GroupColor::Pink => "pink",
            GroupColor::Purple => "purple",
            GroupColor::Cyan => "cyan",
            GroupColor::Orange => "orange",
        }
    }

    /// Hex code shown by the options and popup pages
    pub fn display_code(self) -> &'static str {
        match self {
            GroupColor::Grey => "#9E9E9E",
            GroupColor::Blue => "#2196F3",
            GroupColor::Red => "#F44336",
            GroupColor::Yellow => "#FFEB3B",
            GroupColor::Green => "#4CAF50",
            GroupColor::Pink => "#E91E63",
            GroupColor::Purple => "#9C27B0",
            GroupColor::Cyan => "#00BCD4",
            GroupColor::Orange => "#FF9800",
        }
    }

    /// Look up a color by name, falling back to grey
    pub fn from_name(name: &str) -> GroupColor {
        let name = name.trim();
        GroupColor::ALL
            .into_iter()
            .find(|color| color.name().eq_ignore_ascii_case(name))
            .unwrap_or_default()
    }

    /// Look up a color by display code, falling back to grey
    pub fn from_display_code(code: &str) -> GroupColor {
        let code = code.trim();
        GroupColor::ALL
            .into_iter()
            .find(|color| color.display_code().eq_ignore_ascii_case(code))
            .unwrap_or_default()
    }
}

impl From<String> for GroupColor {
    fn from(name: String) -> Self {
        GroupColor::from_name(&name)
    }
}

impl fmt::Display for GroupColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
