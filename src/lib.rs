/// Tab Grouper - Chrome Extension that sorts tabs into named groups
/// Built with Rust + WASM

mod activity;
mod background;
mod color;
mod config;
mod domain;
mod error;
mod grouper;
mod host;
mod membership;
mod monitor;
mod operations;
mod resolver;
mod rules;
mod storage;
mod tab_data;

#[cfg(test)]
mod testing;

pub use activity::ActivityTracker;
pub use color::GroupColor;
pub use config::GrouperConfig;
pub use error::{HostError, RuleError, StoreError};
pub use grouper::Grouper;
pub use host::{Clock, TabHost, Ticker};
pub use membership::Assignment;
pub use monitor::{IdleMonitor, MonitorState, TickReport};
pub use operations::{Command, rule_for_tab};
pub use resolver::find_group_by_title;
pub use rules::{Rule, RuleSet, StoredRule};
pub use storage::{AvailableGroup, AvailableGroups, RuleStore, Settings};
pub use tab_data::{GroupId, GroupInfo, GroupUpdate, TabId, TabInfo};

use wasm_bindgen::prelude::*;

// Set up panic hook for better error messages in the browser console
#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::default());
}

// Re-export hostname normalization for the popup's domain field
#[wasm_bindgen]
pub fn bare_hostname(url: &str) -> Option<String> {
    domain::bare_hostname(url)
}

// Display code for a color name, grey when unknown
#[wasm_bindgen]
pub fn color_code(name: &str) -> String {
    GroupColor::from_name(name).display_code().to_string()
}

// Start the background grouper; `config` may be undefined
#[wasm_bindgen]
pub fn start_background(config: JsValue) {
    let config = if config.is_null() || config.is_undefined() {
        GrouperConfig::default()
    } else {
        serde_wasm_bindgen::from_value(config).unwrap_or_else(|e| {
            log::warn!("Invalid grouper config, using defaults: {}", e);
            GrouperConfig::default()
        })
    };
    background::start(config);
}
