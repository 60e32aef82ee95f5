/// Resolving a group title to a live native group
use crate::error::HostError;
use crate::grouper::Grouper;
use crate::tab_data::{GroupId, GroupInfo};
use log::debug;

/// First group whose title matches exactly (case-sensitive, no trimming)
pub fn find_group_by_title(groups: &[GroupInfo], title: &str) -> Option<GroupId> {
    groups
        .iter()
        .find(|group| group.title == title)
        .map(|group| group.id)
}

impl Grouper {
    /// Ask the host which live group carries `title`, refreshing the cache
    ///
    /// The answer is point-in-time: the group may close before the caller
    /// uses it, which surfaces later as `HostError::GroupNotFound`.
    pub async fn resolve(&self, title: &str) -> Result<Option<GroupId>, HostError> {
        let groups = self.host.query_groups().await?;
        let found = find_group_by_title(&groups, title);

        let mut state = self.state.borrow_mut();
        match found {
            Some(group_id) => {
                state.groups.insert(title.to_string(), group_id);
            }
            None => {
                state.groups.remove(title);
            }
        }
        Ok(found)
    }

    /// Cache first; a cached handle is confirmed with the host before use
    pub(crate) async fn lookup_group(&self, title: &str) -> Result<Option<GroupId>, HostError> {
        if let Some(group_id) = self.cached_group(title) {
            match self.host.get_group(group_id).await {
                Ok(group) if group.title == title => return Ok(Some(group_id)),
                Ok(group) => debug!(
                    "Cached group {} for {:?} is now titled {:?}",
                    group_id, title, group.title
                ),
                Err(e) if e.is_group_not_found() => {
                    debug!("Cached group {} for {:?} is gone", group_id, title)
                }
                Err(e) => return Err(e),
            }
            self.forget_cached_title(title, group_id);
        }

        self.resolve(title).await
    }
}
