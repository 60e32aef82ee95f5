/// The browser surfaces the grouping logic runs against
use crate::error::HostError;
use crate::tab_data::{GroupId, GroupInfo, GroupUpdate, TabId, TabInfo};
use async_trait::async_trait;
use std::time::Duration;

/// Host tab and tab group API
///
/// Every call may fail independently; a group or tab that vanished between
/// calls is reported as `HostError::GroupNotFound` / `HostError::TabNotFound`.
#[async_trait(?Send)]
pub trait TabHost {
    async fn query_groups(&self) -> Result<Vec<GroupInfo>, HostError>;

    async fn get_group(&self, group_id: GroupId) -> Result<GroupInfo, HostError>;

    /// Move `tabs` into `group_id`, or into a new group when `None`
    async fn group_tabs(&self, tabs: &[TabId], group_id: Option<GroupId>) -> Result<GroupId, HostError>;

    async fn update_group(&self, group_id: GroupId, update: &GroupUpdate) -> Result<GroupInfo, HostError>;

    async fn query_tabs(&self) -> Result<Vec<TabInfo>, HostError>;

    async fn get_tab(&self, tab_id: TabId) -> Result<TabInfo, HostError>;
}

/// Wall clock in milliseconds since the epoch
pub trait Clock {
    fn now_ms(&self) -> f64;
}

/// Recurring timer driving the idle monitor
///
/// `start` while running and `stop` while stopped are no-ops.
pub trait Ticker {
    fn start(&self, interval: Duration);

    fn stop(&self);
}
