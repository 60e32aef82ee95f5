/// Startup configuration handed over by the background script
use serde::Deserialize;
use std::time::Duration;

const MIN_TICK_INTERVAL_MS: u64 = 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GrouperConfig {
    /// How often the idle monitor scans tracked groups
    pub tick_interval_ms: u64,
}

impl GrouperConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(MIN_TICK_INTERVAL_MS))
    }
}

impl Default for GrouperConfig {
    fn default() -> Self {
        GrouperConfig {
            tick_interval_ms: 5_000,
        }
    }
}
