/// The background context shared by every event handler
use crate::activity::ActivityTracker;
use crate::config::GrouperConfig;
use crate::host::{Clock, TabHost, Ticker};
use crate::monitor::IdleMonitor;
use crate::storage::{RuleStore, Settings};
use crate::tab_data::GroupId;
use log::{info, warn};
use std::cell::RefCell;
use std::collections::HashMap;

/// Owns the in-memory caches and the collaborators they are built from.
///
/// Handlers run on one thread and may interleave at every host or store
/// call, so `state` is only borrowed between awaits, never across one.
pub struct Grouper {
    pub(crate) host: Box<dyn TabHost>,
    pub(crate) store: Box<dyn RuleStore>,
    clock: Box<dyn Clock>,
    pub(crate) ticker: Box<dyn Ticker>,
    pub(crate) config: GrouperConfig,
    pub(crate) state: RefCell<GrouperState>,
}

#[derive(Debug, Default)]
pub(crate) struct GrouperState {
    /// Group title → native handle
    pub groups: HashMap<String, GroupId>,
    pub activity: ActivityTracker,
    pub monitor: IdleMonitor,
    pub settings: Settings,
}

impl Grouper {
    pub fn new(
        host: impl TabHost + 'static,
        store: impl RuleStore + 'static,
        clock: impl Clock + 'static,
        ticker: impl Ticker + 'static,
        config: GrouperConfig,
    ) -> Grouper {
        Grouper {
            host: Box::new(host),
            store: Box::new(store),
            clock: Box::new(clock),
            ticker: Box::new(ticker),
            config,
            state: RefCell::new(GrouperState::default()),
        }
    }

    /// Load settings and rebuild the title → handle cache from live groups
    ///
    /// Activity history cannot be recovered and starts empty.
    pub async fn initialize(&self) {
        match self.store.load_settings().await {
            Ok(settings) => self.state.borrow_mut().settings = settings,
            Err(e) => warn!("Using default settings: {}", e),
        }

        match self.host.query_groups().await {
            Ok(groups) => {
                let mut state = self.state.borrow_mut();
                for group in &groups {
                    if !group.title.is_empty() {
                        state.groups.entry(group.title.clone()).or_insert(group.id);
                    }
                    if group.collapsed {
                        state.activity.mark_collapsed(group.id);
                    }
                }
                info!("Restored {} existing tab groups", groups.len());
            }
            Err(e) => warn!("Could not query existing tab groups: {}", e),
        }
    }

    pub fn settings(&self) -> Settings {
        self.state.borrow().settings
    }

    /// Apply settings pushed by the store's change notification
    pub fn on_settings_changed(&self, settings: Settings) {
        info!(
            "Settings changed: autoGroup={} autoCollapse={} autoCollapseTime={}s",
            settings.auto_group, settings.auto_collapse, settings.auto_collapse_time
        );
        let tracking = {
            let mut state = self.state.borrow_mut();
            state.settings = settings;
            state.activity.tracked_len() > 0
        };

        if !settings.auto_collapse {
            self.stop_monitor();
        } else if tracking {
            self.ensure_monitor();
        }
    }

    pub fn cached_group(&self, title: &str) -> Option<GroupId> {
        self.state.borrow().groups.get(title).copied()
    }

    pub(crate) fn now(&self) -> f64 {
        self.clock.now_ms()
    }

    /// Drop `title` from the cache if it still points at `group_id`
    pub(crate) fn forget_cached_title(&self, title: &str, group_id: GroupId) {
        let mut state = self.state.borrow_mut();
        if state.groups.get(title) == Some(&group_id) {
            state.groups.remove(title);
        }
    }

    /// Drop every cache entry pointing at `group_id`
    pub(crate) fn forget_cached_group(&self, group_id: GroupId) {
        self.state
            .borrow_mut()
            .groups
            .retain(|_, cached| *cached != group_id);
    }
}
