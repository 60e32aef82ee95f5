/// Moving tabs into named groups
use crate::color::GroupColor;
use crate::error::StoreError;
use crate::grouper::Grouper;
use crate::storage::AvailableGroup;
use crate::tab_data::{GroupId, GroupUpdate, TabId, TabInfo};
use log::{debug, error, info, warn};

/// How a grouping request ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assignment {
    /// Nothing to do: empty title, tab without id, or incognito tab
    Skipped,
    AlreadyMember(GroupId),
    Moved(GroupId),
    Created(GroupId),
    /// A host call failed; already logged
    Failed,
}

impl Assignment {
    pub fn group_id(&self) -> Option<GroupId> {
        match self {
            Assignment::AlreadyMember(id) | Assignment::Moved(id) | Assignment::Created(id) => Some(*id),
            Assignment::Skipped | Assignment::Failed => None,
        }
    }
}

impl Grouper {
    /// Put `tab` into the group titled `title`, creating it if needed
    ///
    /// Never fails outward: host errors are logged and reported as
    /// `Assignment::Failed`. A group that vanishes between lookup and move
    /// is recreated.
    pub async fn assign_tab_to_group(&self, tab: &TabInfo, title: &str, color: GroupColor) -> Assignment {
        if title.trim().is_empty() {
            debug!("Ignoring grouping request with empty title");
            return Assignment::Skipped;
        }
        let Some(tab_id) = tab.id else {
            debug!("Ignoring grouping request for a tab without id");
            return Assignment::Skipped;
        };
        if tab.incognito {
            return Assignment::Skipped;
        }

        match self.lookup_group(title).await {
            Ok(Some(group_id)) => {
                if tab.group_id == Some(group_id) {
                    return Assignment::AlreadyMember(group_id);
                }
                match self.host.group_tabs(&[tab_id], Some(group_id)).await {
                    Ok(_) => {
                        self.record_activity(group_id);
                        info!("Moved tab {} into {:?} ({})", tab_id, title, group_id);
                        return Assignment::Moved(group_id);
                    }
                    Err(e) if e.is_group_not_found() => {
                        info!("Group {:?} ({}) vanished, creating a new one", title, group_id);
                        self.forget_cached_title(title, group_id);
                    }
                    Err(e) => {
                        error!("Error adding tab {} to group {:?}: {}", tab_id, title, e);
                        return Assignment::Failed;
                    }
                }
            }
            Ok(None) => {}
            Err(e) => {
                error!("Error resolving group {:?}: {}", title, e);
                return Assignment::Failed;
            }
        }

        self.create_group(tab_id, title, color).await
    }

    async fn create_group(&self, tab_id: TabId, title: &str, color: GroupColor) -> Assignment {
        let group_id = match self.host.group_tabs(&[tab_id], None).await {
            Ok(group_id) => group_id,
            Err(e) => {
                error!("Error creating group {:?} for tab {}: {}", title, tab_id, e);
                return Assignment::Failed;
            }
        };

        if let Err(e) = self
            .host
            .update_group(group_id, &GroupUpdate::titled(title, color))
            .await
        {
            error!("Error updating group {} to {:?}: {}", group_id, title, e);
            return Assignment::Failed;
        }

        self.state
            .borrow_mut()
            .groups
            .insert(title.to_string(), group_id);
        self.record_activity(group_id);

        if let Err(e) = self
            .register_available_group(title, AvailableGroup::new(group_id, color))
            .await
        {
            warn!("Could not record group {:?}: {}", title, e);
        }

        info!("Created group {:?} ({}, {}) for tab {}", title, group_id, color, tab_id);
        Assignment::Created(group_id)
    }

    /// Upsert a group into the stored `availableGroups` registry
    pub async fn register_available_group(&self, title: &str, group: AvailableGroup) -> Result<(), StoreError> {
        let mut groups = self.store.load_available_groups().await?;
        groups.upsert(title, group);
        self.store.save_available_groups(&groups).await
    }
}
