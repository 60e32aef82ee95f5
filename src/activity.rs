/// Per-group activity tracking driven by tab and group events
use crate::grouper::Grouper;
use crate::storage::AvailableGroups;
use crate::tab_data::{GroupId, GroupInfo, TabId};
use log::{debug, info, warn};
use std::collections::{HashMap, HashSet};
use std::time::Duration;

/// Last-active timestamps per group plus the currently active tab and group.
///
/// Timestamps are milliseconds since the epoch. Tracking is per group, not
/// per tab: switching tabs inside one group never touches its stamp.
#[derive(Debug, Default)]
pub struct ActivityTracker {
    last_active: HashMap<GroupId, f64>,
    collapsed: HashSet<GroupId>,
    active_group: Option<GroupId>,
    active_tab: Option<TabId>,
}

impl ActivityTracker {
    pub fn stamp(&mut self, group_id: GroupId, now: f64) {
        self.last_active.insert(group_id, now);
    }

    pub fn last_active(&self, group_id: GroupId) -> Option<f64> {
        self.last_active.get(&group_id).copied()
    }

    pub fn tracked_len(&self) -> usize {
        self.last_active.len()
    }

    pub fn active_group(&self) -> Option<GroupId> {
        self.active_group
    }

    pub fn active_tab(&self) -> Option<TabId> {
        self.active_tab
    }

    pub fn set_active(&mut self, tab_id: TabId, group_id: Option<GroupId>) {
        self.active_tab = Some(tab_id);
        self.active_group = group_id;
    }

    pub fn was_collapsed(&self, group_id: GroupId) -> bool {
        self.collapsed.contains(&group_id)
    }

    /// Group was expanded: it becomes the active group, active from `now`
    pub fn mark_expanded(&mut self, group_id: GroupId, now: f64) {
        self.collapsed.remove(&group_id);
        self.stamp(group_id, now);
        self.active_group = Some(group_id);
    }

    /// Group was collapsed: stop tracking it until it is expanded again
    pub fn mark_collapsed(&mut self, group_id: GroupId) {
        self.last_active.remove(&group_id);
        self.collapsed.insert(group_id);
        if self.active_group == Some(group_id) {
            self.active_group = None;
        }
    }

    /// A collapse we started did not happen; the group stays untracked
    pub fn forget_collapse(&mut self, group_id: GroupId) {
        self.collapsed.remove(&group_id);
    }

    /// Group no longer exists
    pub fn remove(&mut self, group_id: GroupId) {
        self.last_active.remove(&group_id);
        self.collapsed.remove(&group_id);
        if self.active_group == Some(group_id) {
            self.active_group = None;
        }
    }

    /// Tracked groups, other than the active one, idle for longer than `threshold`
    pub fn idle_groups(&self, now: f64, threshold: Duration) -> Vec<GroupId> {
        let threshold_ms = threshold.as_secs_f64() * 1000.0;
        let mut idle: Vec<GroupId> = self
            .last_active
            .iter()
            .filter(|(group_id, _)| Some(**group_id) != self.active_group)
            .filter(|(_, last_active)| now - **last_active > threshold_ms)
            .map(|(group_id, _)| *group_id)
            .collect();
        idle.sort();
        idle
    }

    /// False once nothing is tracked, or the only tracked group is the active one
    pub fn needs_monitoring(&self) -> bool {
        self.last_active
            .keys()
            .any(|group_id| Some(*group_id) != self.active_group)
    }
}

impl Grouper {
    /// Stamp a group active as of now and make sure the idle monitor runs
    pub(crate) fn record_activity(&self, group_id: GroupId) {
        let now = self.now();
        self.state.borrow_mut().activity.stamp(group_id, now);
        self.ensure_monitor();
    }

    /// A tab became the active tab
    ///
    /// If the previously active tab sat in a different group, that group
    /// goes idle from this moment. Tabs that can no longer be fetched are
    /// skipped.
    pub async fn on_tab_activated(&self, tab_id: TabId) {
        let previous_tab = self.state.borrow().activity.active_tab();

        let new_group = match self.host.get_tab(tab_id).await {
            Ok(tab) => tab.group_id,
            Err(e) => {
                debug!("Activated tab {} is gone: {}", tab_id, e);
                return;
            }
        };

        let previous_group = match previous_tab {
            Some(previous) if previous != tab_id => match self.host.get_tab(previous).await {
                Ok(tab) => tab.group_id,
                Err(e) => {
                    debug!("Previously active tab {} is gone: {}", previous, e);
                    None
                }
            },
            _ => None,
        };

        self.state
            .borrow_mut()
            .activity
            .set_active(tab_id, new_group);

        if let Some(previous_group) = previous_group {
            if Some(previous_group) != new_group {
                debug!("Group {} went idle", previous_group);
                self.record_activity(previous_group);
            }
        }
    }

    /// Route a host group-updated event
    ///
    /// The host reports only the current state, so an expand is a
    /// transition out of a collapse we saw. Title and color are synced to
    /// the registry on every update, collapsed or not.
    pub async fn on_group_updated(&self, group: &GroupInfo) {
        if group.collapsed {
            self.on_group_collapsed(group.id);
        } else if self.state.borrow().activity.was_collapsed(group.id) {
            self.on_group_expanded(group.id);
        }

        self.sync_group_metadata(group).await;
    }

    pub fn on_group_expanded(&self, group_id: GroupId) {
        debug!("Group {} expanded", group_id);
        let now = self.now();
        self.state
            .borrow_mut()
            .activity
            .mark_expanded(group_id, now);
        self.ensure_monitor();
    }

    pub fn on_group_collapsed(&self, group_id: GroupId) {
        debug!("Group {} collapsed", group_id);
        self.state.borrow_mut().activity.mark_collapsed(group_id);
    }

    /// The host removed a group: forget it everywhere, including the registry
    pub async fn on_group_removed(&self, group_id: GroupId) {
        self.state.borrow_mut().activity.remove(group_id);
        self.forget_cached_group(group_id);

        let mut groups = match self.store.load_available_groups().await {
            Ok(groups) => groups,
            Err(e) => {
                warn!("Could not load groups to forget group {}: {}", group_id, e);
                return;
            }
        };

        let removed = groups.remove_group_id(group_id);
        if removed.is_empty() {
            return;
        }

        match self.store.save_available_groups(&groups).await {
            Ok(()) => info!("Forgot removed group {} ({:?})", group_id, removed),
            Err(e) => warn!("Could not forget removed group {}: {}", group_id, e),
        }
    }

    async fn sync_group_metadata(&self, group: &GroupInfo) {
        if group.title.is_empty() {
            return;
        }

        let old_title = {
            let state = self.state.borrow();
            state
                .groups
                .iter()
                .find(|(_, cached)| **cached == group.id)
                .map(|(title, _)| title.clone())
        };
        let Some(old_title) = old_title else {
            return;
        };

        if old_title != group.title {
            let mut state = self.state.borrow_mut();
            state.groups.remove(&old_title);
            state.groups.insert(group.title.clone(), group.id);
        }

        let mut groups = match self.store.load_available_groups().await {
            Ok(groups) => groups,
            Err(e) => {
                warn!("Could not load groups to sync group {}: {}", group.id, e);
                return;
            }
        };

        if !apply_metadata(&mut groups, &old_title, group) {
            return;
        }

        match self.store.save_available_groups(&groups).await {
            Ok(()) => info!("Synced group {} as {:?} ({})", group.id, group.title, group.color),
            Err(e) => warn!("Could not sync group {}: {}", group.id, e),
        }
    }
}

/// Apply a host rename/recolor to the registry; true if anything changed
fn apply_metadata(groups: &mut AvailableGroups, old_title: &str, group: &GroupInfo) -> bool {
    let mut changed = false;
    if old_title != group.title && groups.rename(old_title, &group.title) {
        changed = true;
    }
    if let Some(entry) = groups.get_mut(&group.title) {
        if entry.group_id == Some(group.id) && entry.color != group.color {
            entry.recolor(group.color);
            changed = true;
        }
    }
    changed
}
