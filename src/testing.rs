/// In-memory host, store, clock and ticker for handler tests
use crate::color::GroupColor;
use crate::config::GrouperConfig;
use crate::error::{HostError, StoreError};
use crate::grouper::Grouper;
use crate::host::{Clock, TabHost, Ticker};
use crate::rules::RuleSet;
use crate::storage::{
    AvailableGroup, AvailableGroups, RuleStore, Settings, AVAILABLE_GROUPS_KEY, RULES_KEY, SETTINGS_KEY,
};
use crate::tab_data::{GroupId, GroupInfo, GroupUpdate, TabId, TabInfo};
use async_trait::async_trait;
use futures::channel::oneshot;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Duration;

#[derive(Default)]
struct HostState {
    groups: BTreeMap<GroupId, GroupInfo>,
    tabs: BTreeMap<TabId, TabInfo>,
    next_id: i32,
    fail_all: Option<String>,
    fail_create: Option<String>,
    vanish_on_move: Option<GroupId>,
    update_gate: Option<oneshot::Receiver<()>>,
}

impl HostState {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn check(&self) -> Result<(), HostError> {
        match &self.fail_all {
            Some(message) => Err(HostError::Failed(message.clone())),
            None => Ok(()),
        }
    }

    fn group(&self, group_id: GroupId) -> Result<&GroupInfo, HostError> {
        self.groups
            .get(&group_id)
            .ok_or_else(|| HostError::GroupNotFound(format!("No group with id: {}.", group_id)))
    }

    fn drop_group(&mut self, group_id: GroupId) {
        self.groups.remove(&group_id);
        for tab in self.tabs.values_mut() {
            if tab.group_id == Some(group_id) {
                tab.group_id = None;
            }
        }
    }
}

/// Tab and group host that behaves like the browser for the calls we make
#[derive(Clone, Default)]
pub struct FakeHost {
    state: Rc<RefCell<HostState>>,
}

impl FakeHost {
    pub fn add_group(&self, title: &str, color: GroupColor) -> GroupId {
        let mut state = self.state.borrow_mut();
        let id = GroupId(state.next_id());
        state.groups.insert(
            id,
            GroupInfo {
                id,
                title: title.to_string(),
                color,
                collapsed: false,
            },
        );
        id
    }

    pub fn add_tab(&self, url: &str, group_id: Option<GroupId>) -> TabId {
        let mut state = self.state.borrow_mut();
        let id = state.next_id();
        let mut tab = TabInfo::new(id, url);
        tab.group_id = group_id;
        state.tabs.insert(TabId(id), tab);
        TabId(id)
    }

    pub fn tab(&self, tab_id: TabId) -> TabInfo {
        self.state.borrow().tabs[&tab_id].clone()
    }

    pub fn group(&self, group_id: GroupId) -> GroupInfo {
        self.state.borrow().groups[&group_id].clone()
    }

    pub fn group_count(&self) -> usize {
        self.state.borrow().groups.len()
    }

    pub fn groups_titled(&self, title: &str) -> usize {
        self.state
            .borrow()
            .groups
            .values()
            .filter(|group| group.title == title)
            .count()
    }

    pub fn set_collapsed(&self, group_id: GroupId, collapsed: bool) {
        if let Some(group) = self.state.borrow_mut().groups.get_mut(&group_id) {
            group.collapsed = collapsed;
        }
    }

    pub fn rename_group(&self, group_id: GroupId, title: &str) {
        if let Some(group) = self.state.borrow_mut().groups.get_mut(&group_id) {
            group.title = title.to_string();
        }
    }

    pub fn close_tab(&self, tab_id: TabId) {
        self.state.borrow_mut().tabs.remove(&tab_id);
    }

    pub fn remove_group(&self, group_id: GroupId) {
        self.state.borrow_mut().drop_group(group_id);
    }

    /// Every call fails with `message`
    pub fn fail_all(&self, message: &str) {
        self.state.borrow_mut().fail_all = Some(message.to_string());
    }

    /// Creating a new group fails with `message`
    pub fn fail_group_creation(&self, message: &str) {
        self.state.borrow_mut().fail_create = Some(message.to_string());
    }

    /// The next move into `group_id` finds it closed
    pub fn vanish_on_move(&self, group_id: GroupId) {
        self.state.borrow_mut().vanish_on_move = Some(group_id);
    }

    /// The next `update_group` call suspends until the returned sender fires
    pub fn hold_next_update(&self) -> oneshot::Sender<()> {
        let (release, gate) = oneshot::channel();
        self.state.borrow_mut().update_gate = Some(gate);
        release
    }
}

#[async_trait(?Send)]
impl TabHost for FakeHost {
    async fn query_groups(&self) -> Result<Vec<GroupInfo>, HostError> {
        let state = self.state.borrow();
        state.check()?;
        Ok(state.groups.values().cloned().collect())
    }

    async fn get_group(&self, group_id: GroupId) -> Result<GroupInfo, HostError> {
        let state = self.state.borrow();
        state.check()?;
        state.group(group_id).cloned()
    }

    async fn group_tabs(&self, tabs: &[TabId], group_id: Option<GroupId>) -> Result<GroupId, HostError> {
        let mut state = self.state.borrow_mut();
        state.check()?;
        for tab_id in tabs {
            if !state.tabs.contains_key(tab_id) {
                return Err(HostError::TabNotFound(format!("No tab with id: {}.", tab_id)));
            }
        }

        let target = match group_id {
            Some(group_id) => {
                if state.vanish_on_move == Some(group_id) {
                    state.vanish_on_move = None;
                    state.drop_group(group_id);
                }
                state.group(group_id)?.id
            }
            None => {
                if let Some(message) = &state.fail_create {
                    return Err(HostError::Failed(message.clone()));
                }
                let id = GroupId(state.next_id());
                state.groups.insert(
                    id,
                    GroupInfo {
                        id,
                        title: String::new(),
                        color: GroupColor::Grey,
                        collapsed: false,
                    },
                );
                id
            }
        };

        for tab_id in tabs {
            if let Some(tab) = state.tabs.get_mut(tab_id) {
                tab.group_id = Some(target);
            }
        }
        Ok(target)
    }

    async fn update_group(&self, group_id: GroupId, update: &GroupUpdate) -> Result<GroupInfo, HostError> {
        let gate = self.state.borrow_mut().update_gate.take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }

        let mut state = self.state.borrow_mut();
        state.check()?;
        let group = state
            .groups
            .get_mut(&group_id)
            .ok_or_else(|| HostError::GroupNotFound(format!("No group with id: {}.", group_id)))?;
        if let Some(title) = &update.title {
            group.title = title.clone();
        }
        if let Some(color) = update.color {
            group.color = color;
        }
        if let Some(collapsed) = update.collapsed {
            group.collapsed = collapsed;
        }
        Ok(group.clone())
    }

    async fn query_tabs(&self) -> Result<Vec<TabInfo>, HostError> {
        let state = self.state.borrow();
        state.check()?;
        Ok(state.tabs.values().cloned().collect())
    }

    async fn get_tab(&self, tab_id: TabId) -> Result<TabInfo, HostError> {
        let state = self.state.borrow();
        state.check()?;
        state
            .tabs
            .get(&tab_id)
            .cloned()
            .ok_or_else(|| HostError::TabNotFound(format!("No tab with id: {}.", tab_id)))
    }
}

#[derive(Default)]
struct StoreState {
    rules: RuleSet,
    groups: AvailableGroups,
    settings: Settings,
    fail_reads: bool,
    fail_writes: bool,
    writes: usize,
}

impl StoreState {
    fn read(&self, key: &str) -> Result<(), StoreError> {
        if self.fail_reads {
            return Err(StoreError::Read {
                key: key.to_string(),
                message: "storage unavailable".to_string(),
            });
        }
        Ok(())
    }

    fn write(&mut self, key: &str) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(StoreError::Write {
                key: key.to_string(),
                message: "QUOTA_BYTES quota exceeded".to_string(),
            });
        }
        self.writes += 1;
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct FakeStore {
    state: Rc<RefCell<StoreState>>,
}

impl FakeStore {
    pub fn set_rules(&self, rules: RuleSet) {
        self.state.borrow_mut().rules = rules;
    }

    pub fn rules(&self) -> RuleSet {
        self.state.borrow().rules.clone()
    }

    pub fn set_settings(&self, settings: Settings) {
        self.state.borrow_mut().settings = settings;
    }

    pub fn put_group(&self, title: &str, group: AvailableGroup) {
        self.state.borrow_mut().groups.upsert(title, group);
    }

    pub fn groups(&self) -> AvailableGroups {
        self.state.borrow().groups.clone()
    }

    pub fn write_count(&self) -> usize {
        self.state.borrow().writes
    }

    pub fn fail_reads(&self) {
        self.state.borrow_mut().fail_reads = true;
    }

    pub fn fail_writes(&self) {
        self.state.borrow_mut().fail_writes = true;
    }
}

#[async_trait(?Send)]
impl RuleStore for FakeStore {
    async fn load_rules(&self) -> Result<RuleSet, StoreError> {
        let state = self.state.borrow();
        state.read(RULES_KEY)?;
        Ok(state.rules.clone())
    }

    async fn save_rules(&self, rules: &RuleSet) -> Result<(), StoreError> {
        let mut state = self.state.borrow_mut();
        state.write(RULES_KEY)?;
        state.rules = rules.clone();
        Ok(())
    }

    async fn load_available_groups(&self) -> Result<AvailableGroups, StoreError> {
        let state = self.state.borrow();
        state.read(AVAILABLE_GROUPS_KEY)?;
        Ok(state.groups.clone())
    }

    async fn save_available_groups(&self, groups: &AvailableGroups) -> Result<(), StoreError> {
        let mut state = self.state.borrow_mut();
        state.write(AVAILABLE_GROUPS_KEY)?;
        state.groups = groups.clone();
        Ok(())
    }

    async fn load_settings(&self) -> Result<Settings, StoreError> {
        let state = self.state.borrow();
        state.read(SETTINGS_KEY)?;
        Ok(state.settings)
    }
}

#[derive(Clone)]
pub struct ManualClock {
    now: Rc<Cell<f64>>,
}

impl ManualClock {
    pub fn now(&self) -> f64 {
        self.now.get()
    }

    pub fn advance_secs(&self, secs: f64) {
        self.now.set(self.now.get() + secs * 1000.0);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        ManualClock {
            now: Rc::new(Cell::new(1_700_000_000_000.0)),
        }
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> f64 {
        self.now.get()
    }
}

#[derive(Default)]
struct TickerState {
    running: bool,
    starts: usize,
    stops: usize,
}

#[derive(Clone, Default)]
pub struct FakeTicker {
    state: Rc<RefCell<TickerState>>,
}

impl FakeTicker {
    pub fn is_running(&self) -> bool {
        self.state.borrow().running
    }

    pub fn starts(&self) -> usize {
        self.state.borrow().starts
    }

    pub fn stops(&self) -> usize {
        self.state.borrow().stops
    }
}

impl Ticker for FakeTicker {
    fn start(&self, _interval: Duration) {
        let mut state = self.state.borrow_mut();
        if !state.running {
            state.running = true;
            state.starts += 1;
        }
    }

    fn stop(&self) {
        let mut state = self.state.borrow_mut();
        if state.running {
            state.running = false;
            state.stops += 1;
        }
    }
}

/// A grouper wired to fakes, with handles to inspect them
pub struct Fixture {
    pub grouper: Grouper,
    pub host: FakeHost,
    pub store: FakeStore,
    pub clock: ManualClock,
    pub ticker: FakeTicker,
}

impl Fixture {
    pub fn new() -> Fixture {
        let host = FakeHost::default();
        let store = FakeStore::default();
        let clock = ManualClock::default();
        let ticker = FakeTicker::default();
        let grouper = Grouper::new(
            host.clone(),
            store.clone(),
            clock.clone(),
            ticker.clone(),
            GrouperConfig::default(),
        );

        Fixture {
            grouper,
            host,
            store,
            clock,
            ticker,
        }
    }
}
